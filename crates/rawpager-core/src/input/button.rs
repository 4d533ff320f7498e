use super::InputEvent;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ButtonTiming {
    settle_ms: u64,
    long_press_ms: u64,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self {
            settle_ms: 50,
            long_press_ms: 800,
        }
    }
}

impl ButtonTiming {
    pub const fn with_settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    pub const fn with_long_press_ms(mut self, long_press_ms: u64) -> Self {
        self.long_press_ms = long_press_ms;
        self
    }
}

/// Classifies a single push button on release.
///
/// Holds shorter than the settle time are bounce and produce nothing. A
/// hold of at least `long_press_ms` is a forced refetch, anything between
/// is a page advance.
#[derive(Clone, Copy, Debug)]
pub struct PressClassifier {
    timing: ButtonTiming,
    pressed_since_ms: Option<u64>,
    /// A cancelled press whose release must not be classified.
    swallow_release: bool,
}

impl PressClassifier {
    pub const fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            pressed_since_ms: None,
            swallow_release: false,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_since_ms.is_some() || self.swallow_release
    }

    /// Forgets the press in progress; its release produces nothing.
    pub fn cancel(&mut self) {
        if self.pressed_since_ms.take().is_some() {
            self.swallow_release = true;
        }
    }

    pub fn update(&mut self, pressed: bool, now_ms: u64) -> Option<InputEvent> {
        if self.swallow_release {
            self.swallow_release = pressed;
            return None;
        }

        match (pressed, self.pressed_since_ms) {
            (true, None) => {
                self.pressed_since_ms = Some(now_ms);
                None
            }
            (false, Some(since)) => {
                self.pressed_since_ms = None;
                let held = now_ms.saturating_sub(since);
                if held < self.timing.settle_ms {
                    None
                } else if held >= self.timing.long_press_ms {
                    Some(InputEvent::ForceRefetch)
                } else {
                    Some(InputEvent::NextPage)
                }
            }
            _ => None,
        }
    }
}
