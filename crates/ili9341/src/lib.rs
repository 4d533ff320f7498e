#![cfg_attr(not(test), no_std)]

//! ILI9341 (240x320 TFT, RGB565) SPI driver primitives.

pub mod protocol;

#[cfg(feature = "embedded-graphics")]
mod graphics;

use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};

pub use protocol::Orientation;

/// Pixels staged per SPI write when streaming a solid fill.
const FILL_CHUNK_PIXELS: usize = 64;

/// Driver configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Expected SPI clock in Hz (documented for board glue).
    pub spi_hz: u32,
    pub orientation: Orientation,
    /// Some panel batches ship with inverted color polarity.
    pub invert_colors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spi_hz: 40_000_000,
            orientation: Orientation::Landscape,
            invert_colors: false,
        }
    }
}

impl Config {
    pub const fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub const fn with_invert_colors(mut self, invert_colors: bool) -> Self {
        self.invert_colors = invert_colors;
        self
    }
}

/// Driver errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Error<SpiErr, DcErr> {
    /// SPI transaction failed.
    Spi(SpiErr),
    /// Data/command pin operation failed.
    Dc(DcErr),
    /// Window lies outside the panel or is empty.
    InvalidInput,
}

pub type DriverResult<SpiErr, DcErr> = Result<(), Error<SpiErr, DcErr>>;

/// ILI9341 driver over a 4-wire SPI bus (separate D/C line).
#[derive(Debug)]
pub struct Ili9341<SPI, DC> {
    spi: SPI,
    dc: DC,
    config: Config,
}

impl<SPI, DC> Ili9341<SPI, DC>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    /// Creates a new driver instance. Call [`Self::init`] before drawing.
    pub fn new(spi: SPI, dc: DC, config: Config) -> Self {
        Self { spi, dc, config }
    }

    /// Returns current configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Releases owned bus and pin.
    pub fn release(self) -> (SPI, DC) {
        (self.spi, self.dc)
    }

    /// `(width, height)` in the current orientation.
    pub fn size(&self) -> (u16, u16) {
        self.config.orientation.size()
    }

    /// Software reset followed by the power-up sequence.
    pub fn init<D: DelayNs>(&mut self, delay: &mut D) -> DriverResult<SPI::Error, DC::Error> {
        self.write_command(protocol::SWRESET, &[])?;
        delay.delay_ms(protocol::RESET_DELAY_MS);

        for step in protocol::INIT_SEQUENCE {
            self.write_command(step.command, step.params)?;
            if step.delay_ms > 0 {
                delay.delay_ms(step.delay_ms);
            }
        }

        let inversion = if self.config.invert_colors {
            protocol::INVON
        } else {
            protocol::INVOFF
        };
        self.write_command(inversion, &[])?;
        self.set_orientation(self.config.orientation)
    }

    pub fn set_orientation(
        &mut self,
        orientation: Orientation,
    ) -> DriverResult<SPI::Error, DC::Error> {
        self.write_command(protocol::MADCTL, &[orientation.madctl()])?;
        self.config.orientation = orientation;
        Ok(())
    }

    /// Fills a rectangle with one RGB565 color.
    pub fn fill_rect(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        color: u16,
    ) -> DriverResult<SPI::Error, DC::Error> {
        self.set_window(x, y, width, height)?;

        let [high, low] = color.to_be_bytes();
        let mut chunk = [0u8; FILL_CHUNK_PIXELS * 2];
        for pixel in chunk.chunks_exact_mut(2) {
            pixel[0] = high;
            pixel[1] = low;
        }

        let mut remaining = usize::from(width) * usize::from(height);
        while remaining > 0 {
            let pixels = remaining.min(FILL_CHUNK_PIXELS);
            self.spi.write(&chunk[..pixels * 2]).map_err(Error::Spi)?;
            remaining -= pixels;
        }
        Ok(())
    }

    /// Streams RGB565 pixels row-major into a window.
    ///
    /// Missing pixels leave the rest of the window untouched; extra pixels
    /// are ignored.
    pub fn write_pixels<I>(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        colors: I,
    ) -> DriverResult<SPI::Error, DC::Error>
    where
        I: IntoIterator<Item = u16>,
    {
        self.set_window(x, y, width, height)?;

        let total = usize::from(width) * usize::from(height);
        let mut chunk = [0u8; FILL_CHUNK_PIXELS * 2];
        let mut staged = 0usize;
        for color in colors.into_iter().take(total) {
            chunk[staged * 2..staged * 2 + 2].copy_from_slice(&color.to_be_bytes());
            staged += 1;
            if staged == FILL_CHUNK_PIXELS {
                self.spi.write(&chunk).map_err(Error::Spi)?;
                staged = 0;
            }
        }
        if staged > 0 {
            self.spi.write(&chunk[..staged * 2]).map_err(Error::Spi)?;
        }
        Ok(())
    }

    /// Sets the address window and leaves the controller in memory-write mode.
    fn set_window(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    ) -> DriverResult<SPI::Error, DC::Error> {
        let (columns, pages) =
            protocol::address_window(self.config.orientation, x, y, width, height)
                .ok_or(Error::InvalidInput)?;

        self.write_command(protocol::CASET, &columns)?;
        self.write_command(protocol::PASET, &pages)?;
        self.write_command(protocol::RAMWR, &[])
    }

    fn write_command(&mut self, command: u8, params: &[u8]) -> DriverResult<SPI::Error, DC::Error> {
        self.dc.set_low().map_err(Error::Dc)?;
        self.spi.write(&[command]).map_err(Error::Spi)?;
        self.dc.set_high().map_err(Error::Dc)?;
        if !params.is_empty() {
            self.spi.write(params).map_err(Error::Spi)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;
    use std::vec::Vec;

    use embedded_hal::{
        digital::ErrorType as PinErrorType,
        spi::{ErrorType, Operation},
    };

    use super::*;

    /// Records bytes per D/C level: `(is_data, byte)`.
    #[derive(Default)]
    struct Wire {
        bytes: Vec<(bool, u8)>,
        data_mode: bool,
    }

    struct RecordingSpi<'a>(&'a core::cell::RefCell<Wire>);
    struct RecordingDc<'a>(&'a core::cell::RefCell<Wire>);

    impl ErrorType for RecordingSpi<'_> {
        type Error = Infallible;
    }

    impl SpiDevice<u8> for RecordingSpi<'_> {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Infallible> {
            let mut wire = self.0.borrow_mut();
            for operation in operations {
                if let Operation::Write(bytes) = operation {
                    let data = wire.data_mode;
                    wire.bytes.extend(bytes.iter().map(|byte| (data, *byte)));
                }
            }
            Ok(())
        }
    }

    impl PinErrorType for RecordingDc<'_> {
        type Error = Infallible;
    }

    impl OutputPin for RecordingDc<'_> {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().data_mode = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().data_mode = true;
            Ok(())
        }
    }

    fn commands(wire: &Wire) -> Vec<u8> {
        wire.bytes
            .iter()
            .filter(|(data, _)| !data)
            .map(|(_, byte)| *byte)
            .collect()
    }

    #[test]
    fn fill_rect_sets_window_then_streams_color() {
        let wire = core::cell::RefCell::new(Wire::default());
        let mut panel = Ili9341::new(RecordingSpi(&wire), RecordingDc(&wire), Config::default());

        panel.fill_rect(10, 20, 100, 2, 0xF800).unwrap();

        let wire = wire.borrow();
        assert_eq!(commands(&wire), [protocol::CASET, protocol::PASET, protocol::RAMWR]);
        let payload: Vec<u8> = wire.bytes.iter().skip(11).map(|(_, byte)| *byte).collect();
        assert_eq!(payload.len(), 400);
        assert!(payload.chunks(2).all(|pixel| pixel == [0xF8, 0x00]));
        assert_eq!(&wire.bytes[1..5], &[(true, 0), (true, 10), (true, 0), (true, 109)]);
    }

    #[test]
    fn write_pixels_stops_at_window_size() {
        let wire = core::cell::RefCell::new(Wire::default());
        let mut panel = Ili9341::new(RecordingSpi(&wire), RecordingDc(&wire), Config::default());

        panel
            .write_pixels(0, 0, 2, 2, [0x0001u16, 0x0002, 0x0003, 0x0004, 0x0005])
            .unwrap();

        let wire = wire.borrow();
        let payload: Vec<u8> = wire.bytes.iter().skip(11).map(|(_, byte)| *byte).collect();
        assert_eq!(payload, [0, 1, 0, 2, 0, 3, 0, 4]);
    }

    #[test]
    fn out_of_bounds_window_is_rejected() {
        let wire = core::cell::RefCell::new(Wire::default());
        let mut panel = Ili9341::new(RecordingSpi(&wire), RecordingDc(&wire), Config::default());

        assert_eq!(
            panel.fill_rect(300, 0, 40, 10, 0),
            Err(Error::InvalidInput)
        );
        assert!(wire.borrow().bytes.is_empty());
    }

    #[test]
    fn init_ends_with_orientation() {
        struct NoDelay;
        impl DelayNs for NoDelay {
            fn delay_ns(&mut self, _ns: u32) {}
        }

        let wire = core::cell::RefCell::new(Wire::default());
        let mut panel = Ili9341::new(
            RecordingSpi(&wire),
            RecordingDc(&wire),
            Config::default().with_invert_colors(true),
        );
        panel.init(&mut NoDelay).unwrap();

        let wire = wire.borrow();
        let sent = commands(&wire);
        assert_eq!(sent.first(), Some(&protocol::SWRESET));
        assert!(sent.contains(&protocol::INVON));
        assert_eq!(sent.last(), Some(&protocol::MADCTL));
        assert_eq!(wire.bytes.last(), Some(&(true, Orientation::Landscape.madctl())));
    }
}
