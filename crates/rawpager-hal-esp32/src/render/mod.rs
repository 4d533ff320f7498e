pub mod pager;

use embedded_graphics::{pixelcolor::Rgb565, prelude::DrawTarget};
use rawpager_core::render::Screen;

pub trait ScreenRenderer {
    fn render<D>(&mut self, screen: Screen<'_>, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>;
}
