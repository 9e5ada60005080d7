pub mod coins;
pub mod progress;
