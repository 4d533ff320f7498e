use embedded_graphics::{
    Pixel,
    pixelcolor::Rgb565,
    prelude::{Dimensions, DrawTarget, OriginDimensions, Size},
    primitives::Rectangle,
};
use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};
use ili9341::{Config, Ili9341};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DisplayError<SpiErr, DcErr, BlErr> {
    Panel(ili9341::Error<SpiErr, DcErr>),
    Backlight(BlErr),
}

pub type CydDisplayResult<SpiErr, DcErr, BlErr> = Result<(), DisplayError<SpiErr, DcErr, BlErr>>;

/// ILI9341 panel plus the CYD backlight switch.
#[derive(Debug)]
pub struct CydDisplay<SPI, DC, BL> {
    panel: Ili9341<SPI, DC>,
    backlight: BL,
}

impl<SPI, DC, BL> CydDisplay<SPI, DC, BL>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    BL: OutputPin,
{
    pub fn new(spi: SPI, dc: DC, backlight: BL, config: Config) -> Self {
        Self {
            panel: Ili9341::new(spi, dc, config),
            backlight,
        }
    }

    /// Runs the panel power-up sequence, clears to black and lights the panel.
    pub fn initialize<D>(
        &mut self,
        delay: &mut D,
    ) -> CydDisplayResult<SPI::Error, DC::Error, BL::Error>
    where
        D: DelayNs,
    {
        self.backlight.set_low().map_err(DisplayError::Backlight)?;
        self.panel.init(delay).map_err(DisplayError::Panel)?;
        self.clear_black()?;
        self.backlight.set_high().map_err(DisplayError::Backlight)?;
        Ok(())
    }

    pub fn clear_black(&mut self) -> CydDisplayResult<SPI::Error, DC::Error, BL::Error> {
        let (width, height) = self.panel.size();
        self.panel
            .fill_rect(0, 0, width, height, 0x0000)
            .map_err(DisplayError::Panel)
    }
}

impl<SPI, DC, BL> OriginDimensions for CydDisplay<SPI, DC, BL>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    fn size(&self) -> Size {
        let (width, height) = self.panel.size();
        Size::new(width as u32, height as u32)
    }
}

impl<SPI, DC, BL> DrawTarget for CydDisplay<SPI, DC, BL>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    BL: OutputPin,
{
    type Color = Rgb565;
    type Error = DisplayError<SPI::Error, DC::Error, BL::Error>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.panel.draw_iter(pixels).map_err(DisplayError::Panel)
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.panel
            .fill_contiguous(area, colors)
            .map_err(DisplayError::Panel)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.panel
            .fill_solid(area, color)
            .map_err(DisplayError::Panel)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let area = self.bounding_box();
        self.fill_solid(&area, color)
    }
}
