use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::session::presenter::Presenter;

/// How long a success or error flash stays up.
pub const FLASH_TIME: Duration = Duration::from_millis(1200);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flash {
    Success,
    Error,
}

/// Feedback shown under the exercise, updated between frames.
#[derive(Debug, Default)]
pub struct Status {
    pub flash: Option<(Flash, Instant)>,
    /// Size of the last confetti burst; zero once it has faded.
    pub confetti: u32,
    pub coins: u64,
    pub notice: Option<String>,
}

impl Status {
    pub fn new(coins: u64) -> Self {
        Self {
            coins,
            ..Self::default()
        }
    }

    /// Drop a flash and its confetti once they have been up long enough.
    pub fn expire(&mut self, now: Instant) {
        if let Some((_, at)) = self.flash
            && now.saturating_duration_since(at) >= FLASH_TIME
        {
            self.flash = None;
            self.confetti = 0;
        }
    }
}

pub type SharedStatus = Rc<RefCell<Status>>;

/// Records the engine's feedback hooks into the status line.
pub struct StatusPresenter(pub SharedStatus);

impl Presenter for StatusPresenter {
    fn flash_success(&mut self) {
        self.0.borrow_mut().flash = Some((Flash::Success, Instant::now()));
    }

    fn flash_error(&mut self) {
        self.0.borrow_mut().flash = Some((Flash::Error, Instant::now()));
    }

    fn confetti(&mut self, count: u32) {
        self.0.borrow_mut().confetti = count;
    }
}
