use std::time::{Duration, Instant};

use crate::error::SessionError;

#[derive(Clone, Debug)]
struct Pending<A> {
    due: Instant,
    action: A,
}

/// Single-slot, cancelable timer for the auto-advance that follows a correct
/// answer.
///
/// Nothing runs on its own: the event loop calls [`DeferredAdvance::poll`]
/// with the current time and performs the returned action. Any navigation
/// must `cancel` first, or a stale advance fires against the moved cursor.
#[derive(Clone, Debug)]
pub struct DeferredAdvance<A> {
    pending: Option<Pending<A>>,
}

impl<A> Default for DeferredAdvance<A> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<A> DeferredAdvance<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `action` to fire `delay` after `now`. The slot must be free: it is
    /// freed by the previous action firing or by `cancel`.
    pub fn schedule(&mut self, now: Instant, delay: Duration, action: A) -> Result<(), SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::AlreadyArmed);
        }
        self.pending = Some(Pending {
            due: now + delay,
            action,
        });
        Ok(())
    }

    /// Drop the pending action, if any. Returns whether one was armed.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.pending.take().is_some();
        if was_armed {
            tracing::debug!("canceled pending advance");
        }
        was_armed
    }

    /// Hand out the action once it is due, disarming the slot.
    pub fn poll(&mut self, now: Instant) -> Option<A> {
        if self.pending.as_ref().is_some_and(|p| now >= p.due) {
            self.pending.take().map(|p| p.action)
        } else {
            None
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}
