use embedded_hal::{digital::InputPin, spi::SpiDevice};
use rawpager_core::input::{
    ButtonTiming, InputEvent, InputProvider, PressClassifier, TouchCalibration, TouchClassifier,
};

use super::xpt2046::{TouchError, Xpt2046};

#[derive(Debug)]
pub enum CydInputError<SpiErr, IrqErr, BtnErr> {
    Touch(TouchError<SpiErr, IrqErr>),
    Button(BtnErr),
}

/// Touch panel plus the active-low BOOT button, mapped to pager actions.
///
/// The button is checked first; a tap on either half of the panel pages
/// back or forward.
#[derive(Debug)]
pub struct CydInput<SPI, IRQ, BTN> {
    touch: Xpt2046<SPI, IRQ>,
    button: BTN,
    taps: TouchClassifier,
    presses: PressClassifier,
}

impl<SPI, IRQ, BTN> CydInput<SPI, IRQ, BTN>
where
    SPI: SpiDevice<u8>,
    IRQ: InputPin,
    BTN: InputPin,
{
    pub fn new(
        touch: Xpt2046<SPI, IRQ>,
        button: BTN,
        calibration: TouchCalibration,
        timing: ButtonTiming,
    ) -> Self {
        Self {
            touch,
            button,
            taps: TouchClassifier::new(calibration),
            presses: PressClassifier::new(timing),
        }
    }

    /// Raw BOOT level, used by the boot window before the app runs.
    pub fn button_held(&mut self) -> Result<bool, BTN::Error> {
        self.button.is_low()
    }
}

impl<SPI, IRQ, BTN> InputProvider for CydInput<SPI, IRQ, BTN>
where
    SPI: SpiDevice<u8>,
    IRQ: InputPin,
    BTN: InputPin,
{
    type Error = CydInputError<SPI::Error, IRQ::Error, BTN::Error>;

    fn poll_event(&mut self, now_ms: u64) -> Result<Option<InputEvent>, Self::Error> {
        let pressed = self.button.is_low().map_err(CydInputError::Button)?;
        if let Some(event) = self.presses.update(pressed, now_ms) {
            return Ok(Some(event));
        }
        if self.presses.is_pressed() {
            return Ok(None);
        }

        let Some(sample) = self.touch.read().map_err(CydInputError::Touch)? else {
            return Ok(None);
        };
        Ok(self.taps.on_touch(sample.raw_x, now_ms))
    }

    fn discard_pending(&mut self) {
        self.presses.cancel();
    }
}

#[cfg(test)]
mod tests {
    use core::{cell::Cell, convert::Infallible};

    use embedded_hal::{
        digital::{self, InputPin},
        spi::{self, Operation, SpiDevice},
    };

    use super::*;
    use crate::input::xpt2046::TouchConfig;

    /// Reports a constant firm press at `raw_x`.
    struct SteadyPanel {
        raw_x: u16,
    }

    impl spi::ErrorType for SteadyPanel {
        type Error = Infallible;
    }

    impl SpiDevice<u8> for SteadyPanel {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
            for op in operations {
                if let Operation::Transfer(read, write) = op {
                    let value: u16 = match write[0] {
                        0xB1 => 1000,
                        0xC1 => 1000,
                        0x91 => self.raw_x,
                        _ => 2000,
                    };
                    read[1..3].copy_from_slice(&(value << 3).to_be_bytes());
                }
            }
            Ok(())
        }
    }

    struct SharedPin<'a>(&'a Cell<bool>);

    impl digital::ErrorType for SharedPin<'_> {
        type Error = Infallible;
    }

    impl InputPin for SharedPin<'_> {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }
    }

    fn input<'a>(
        raw_x: u16,
        irq: &'a Cell<bool>,
        boot: &'a Cell<bool>,
    ) -> CydInput<SteadyPanel, SharedPin<'a>, SharedPin<'a>> {
        CydInput::new(
            Xpt2046::new(SteadyPanel { raw_x }, SharedPin(irq), TouchConfig::default()),
            SharedPin(boot),
            TouchCalibration::default(),
            ButtonTiming::default(),
        )
    }

    #[test]
    fn right_half_tap_pages_forward_once_per_debounce() {
        let irq = Cell::new(false);
        let boot = Cell::new(true);
        let mut input = input(3500, &irq, &boot);

        assert_eq!(input.poll_event(1_000).unwrap(), Some(InputEvent::NextPage));
        assert_eq!(input.poll_event(1_100).unwrap(), None);
        irq.set(true);
        assert_eq!(input.poll_event(1_400).unwrap(), None);
    }

    #[test]
    fn left_half_tap_pages_back() {
        let irq = Cell::new(false);
        let boot = Cell::new(true);
        let mut input = input(400, &irq, &boot);
        assert_eq!(input.poll_event(0).unwrap(), Some(InputEvent::PrevPage));
    }

    #[test]
    fn discarded_hold_releases_silently() {
        let irq = Cell::new(true);
        let boot = Cell::new(false);
        let mut input = input(3500, &irq, &boot);

        assert_eq!(input.poll_event(0).unwrap(), None);
        input.discard_pending();
        boot.set(true);
        assert_eq!(input.poll_event(3_000).unwrap(), None);

        boot.set(false);
        assert_eq!(input.poll_event(3_100).unwrap(), None);
        boot.set(true);
        assert_eq!(input.poll_event(3_200).unwrap(), Some(InputEvent::NextPage));
    }

    #[test]
    fn boot_hold_wins_over_touch() {
        let irq = Cell::new(false);
        let boot = Cell::new(false);
        let mut input = input(3500, &irq, &boot);

        assert!(input.button_held().unwrap());
        assert_eq!(input.poll_event(0).unwrap(), None);
        assert_eq!(input.poll_event(500).unwrap(), None);
        boot.set(true);
        assert_eq!(
            input.poll_event(900).unwrap(),
            Some(InputEvent::ForceRefetch)
        );
    }
}
