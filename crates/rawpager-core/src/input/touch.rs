use super::InputEvent;

/// Raw XPT2046 X range and the panel width it maps onto.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TouchCalibration {
    raw_min: u16,
    raw_max: u16,
    width: u16,
    debounce_ms: u64,
}

impl Default for TouchCalibration {
    fn default() -> Self {
        Self {
            raw_min: 200,
            raw_max: 3700,
            width: 320,
            debounce_ms: 250,
        }
    }
}

impl TouchCalibration {
    pub const fn with_raw_range(mut self, raw_min: u16, raw_max: u16) -> Self {
        self.raw_min = raw_min;
        self.raw_max = raw_max;
        self
    }

    pub const fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }

    pub const fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Screen X of a raw reading, clamped to the panel.
    pub fn screen_x(&self, raw_x: u16) -> u16 {
        let span = i32::from(self.raw_max) - i32::from(self.raw_min);
        if span <= 0 || self.width == 0 {
            return 0;
        }

        let scaled = (i32::from(raw_x) - i32::from(self.raw_min)) * i32::from(self.width) / span;
        scaled.clamp(0, i32::from(self.width) - 1) as u16
    }
}

/// Turns pen-down samples into page taps: right half is next, left half prev.
#[derive(Clone, Copy, Debug)]
pub struct TouchClassifier {
    calibration: TouchCalibration,
    last_accepted_ms: Option<u64>,
}

impl TouchClassifier {
    pub const fn new(calibration: TouchCalibration) -> Self {
        Self {
            calibration,
            last_accepted_ms: None,
        }
    }

    /// Call for every sample taken while the pen is down.
    pub fn on_touch(&mut self, raw_x: u16, now_ms: u64) -> Option<InputEvent> {
        if let Some(last) = self.last_accepted_ms
            && now_ms.saturating_sub(last) <= self.calibration.debounce_ms
        {
            return None;
        }
        self.last_accepted_ms = Some(now_ms);

        let x = self.calibration.screen_x(raw_x);
        if x >= self.calibration.width / 2 {
            Some(InputEvent::NextPage)
        } else {
            Some(InputEvent::PrevPage)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_range_maps_onto_panel_width() {
        let calibration = TouchCalibration::default();
        assert_eq!(calibration.screen_x(200), 0);
        assert_eq!(calibration.screen_x(1950), 160);
        assert_eq!(calibration.screen_x(100), 0);
        assert_eq!(calibration.screen_x(4000), 319);
    }

    #[test]
    fn halves_select_direction() {
        let mut touch = TouchClassifier::new(TouchCalibration::default());
        assert_eq!(touch.on_touch(3000, 1_000), Some(InputEvent::NextPage));
        assert_eq!(touch.on_touch(500, 2_000), Some(InputEvent::PrevPage));
        assert_eq!(touch.on_touch(1950, 3_000), Some(InputEvent::NextPage));
    }

    #[test]
    fn taps_within_debounce_are_dropped() {
        let mut touch = TouchClassifier::new(TouchCalibration::default());
        assert!(touch.on_touch(3000, 1_000).is_some());
        assert_eq!(touch.on_touch(3000, 1_100), None);
        assert_eq!(touch.on_touch(3000, 1_250), None);
        assert!(touch.on_touch(3000, 1_251).is_some());
    }
}
