/// Fire-and-forget feedback hooks. The engine never depends on what these do,
/// so every method defaults to a no-op.
pub trait Presenter {
    fn flash_success(&mut self) {}

    fn flash_error(&mut self) {}

    fn confetti(&mut self, _count: u32) {}
}

pub struct NullPresenter;

impl Presenter for NullPresenter {}
