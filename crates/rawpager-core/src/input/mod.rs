//! Input abstraction layer.

mod button;
mod mock;
mod touch;

pub use button::{ButtonTiming, PressClassifier};
pub use mock::MockInput;
pub use touch::{TouchCalibration, TouchClassifier};

/// Logical actions consumed by the pager app.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputEvent {
    PrevPage,
    NextPage,
    ForceRefetch,
}

/// Polled input provider.
pub trait InputProvider {
    type Error;

    fn poll_event(&mut self, now_ms: u64) -> Result<Option<InputEvent>, Self::Error>;

    /// Drops partially observed gestures, e.g. a button held across a
    /// blocking fetch.
    fn discard_pending(&mut self) {}
}
