use embedded_graphics_core::{
    Pixel,
    draw_target::DrawTarget,
    geometry::{Dimensions, OriginDimensions, Size},
    pixelcolor::{IntoStorage, Rgb565},
    primitives::{PointsIter, Rectangle},
};
use embedded_hal::{digital::OutputPin, spi::SpiDevice};

use crate::{Error, Ili9341};

impl<SPI, DC> DrawTarget for Ili9341<SPI, DC>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    type Color = Rgb565;
    type Error = Error<SPI::Error, DC::Error>;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.size();
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 || point.x >= i32::from(width) || point.y >= i32::from(height)
            {
                continue;
            }
            self.fill_rect(point.x as u16, point.y as u16, 1, 1, color.into_storage())?;
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        let clipped = area.intersection(&self.bounding_box());
        if clipped.is_zero_sized() {
            return Ok(());
        }

        if clipped != *area {
            // Partially off-screen: fall back to per-pixel writes for the visible part.
            let pixels = area
                .points()
                .zip(colors)
                .filter(|(point, _)| clipped.contains(*point))
                .map(|(point, color)| Pixel(point, color));
            return self.draw_iter(pixels);
        }

        self.write_pixels(
            area.top_left.x as u16,
            area.top_left.y as u16,
            area.size.width as u16,
            area.size.height as u16,
            colors.into_iter().map(IntoStorage::into_storage),
        )
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let clipped = area.intersection(&self.bounding_box());
        if clipped.is_zero_sized() {
            return Ok(());
        }

        self.fill_rect(
            clipped.top_left.x as u16,
            clipped.top_left.y as u16,
            clipped.size.width as u16,
            clipped.size.height as u16,
            color.into_storage(),
        )
    }
}

impl<SPI, DC> OriginDimensions for Ili9341<SPI, DC> {
    fn size(&self) -> Size {
        let (width, height) = self.config.orientation.size();
        Size::new(u32::from(width), u32::from(height))
    }
}
