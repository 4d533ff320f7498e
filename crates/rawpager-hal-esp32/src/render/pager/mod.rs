use embedded_graphics::{
    pixelcolor::{Rgb565, raw::RawU16},
    prelude::{Dimensions, DrawTarget, Point, Size},
    primitives::Rectangle,
};
use rawpager_core::{
    layout::STATUS_BAR_HEIGHT,
    render::{BLACK, CYAN, DirtyRegions, GRAY, GREEN, NavHint, PageView, Screen, WHITE, YELLOW},
};

use super::ScreenRenderer;

mod glyph;

use self::glyph::*;

const STATUS_TEXT_X: i32 = 4;
const STATUS_TEXT_Y: i32 = 6;
const FOOTER_TEXT_X: i32 = 4;
/// Footer baseline sits this far above the bottom edge.
const FOOTER_INSET: i32 = 10;
const CLOCK_RIGHT_MARGIN: i32 = 3;

/// Draws the pager view model onto any RGB565 surface.
///
/// Only the regions flagged dirty are redrawn; the setup screen is always
/// drawn in full.
#[derive(Debug, Default, Clone)]
pub struct PagerRenderer {
    frames: u32,
}

impl PagerRenderer {
    pub const fn new() -> Self {
        Self { frames: 0 }
    }

    pub fn frames_drawn(&self) -> u32 {
        self.frames
    }

    fn render_reader<D>(
        &mut self,
        target: &mut D,
        status: &str,
        page: Option<PageView<'_>>,
        hint: Option<NavHint>,
        clock: Option<&str>,
        dirty: DirtyRegions,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let bounds = target.bounding_box();
        let width = bounds.size.width;
        let height = bounds.size.height as i32;

        if dirty.status {
            let bar = Rectangle::new(Point::zero(), Size::new(width, STATUS_BAR_HEIGHT as u32));
            target.fill_solid(&bar, color(BLACK))?;
            draw_text(target, status, STATUS_TEXT_X, STATUS_TEXT_Y, 1, WHITE, width)?;
        }

        if dirty.page {
            let top = STATUS_BAR_HEIGHT as i32;
            let content = Rectangle::new(
                Point::new(0, top),
                Size::new(width, (height - top).max(0) as u32),
            );
            target.fill_solid(&content, color(BLACK))?;

            if let Some(page) = page {
                let scale = page.geometry.scale as u32;
                for run in page.runs() {
                    draw_text(
                        target,
                        run.text,
                        run.x as i32,
                        run.y as i32,
                        scale,
                        run.color,
                        width,
                    )?;
                }
            }
        }

        // A page redraw clears the footer strip along with the content.
        if dirty.footer || dirty.page {
            let y = height - FOOTER_INSET;
            if !dirty.page {
                let strip = Rectangle::new(
                    Point::new(0, y - 1),
                    Size::new(width, (FOOTER_INSET + 1) as u32),
                );
                target.fill_solid(&strip, color(BLACK))?;
            }
            if let Some(hint) = hint {
                draw_text(target, hint.label(), FOOTER_TEXT_X, y, 1, GRAY, width)?;
            }
            if let Some(clock) = clock {
                let x = width as i32 - text_width(clock, 1) as i32 - CLOCK_RIGHT_MARGIN;
                draw_text(target, clock, x, y, 1, GRAY, width)?;
            }
        }

        Ok(())
    }

    fn render_setup<D>(
        &mut self,
        target: &mut D,
        access_point: &str,
        address: &str,
        has_settings: bool,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let width = target.bounding_box().size.width;
        target.clear(color(BLACK))?;

        let lines: [(&str, i32, i32, u32, u16); 8] = [
            ("RawPager Setup", 22, 5, 2, CYAN),
            ("Raw Text File Viewer", 50, 26, 1, WHITE),
            ("1. Connect to WiFi:", 4, 46, 1, YELLOW),
            (access_point, 14, 58, 2, CYAN),
            ("2. Open your browser and go to:", 4, 82, 1, YELLOW),
            (address, 50, 94, 2, CYAN),
            ("3. Enter WiFi & raw URL, then", 4, 118, 1, YELLOW),
            ("   tap Save & Connect.", 4, 130, 1, YELLOW),
        ];
        for (text, x, y, scale, fg) in lines {
            draw_text(target, text, x, y, scale, fg, width)?;
        }

        if has_settings {
            draw_text(target, "Existing settings found. Tap", 4, 152, 1, GREEN, width)?;
            draw_text(target, "'No Changes' to keep them.", 4, 164, 1, GREEN, width)?;
        }
        Ok(())
    }
}

impl ScreenRenderer for PagerRenderer {
    fn render<D>(&mut self, screen: Screen<'_>, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        match screen {
            Screen::Reader {
                status,
                page,
                hint,
                clock,
                dirty,
            } => self.render_reader(target, status, page, hint, clock, dirty)?,
            Screen::Setup {
                access_point,
                address,
                has_settings,
            } => self.render_setup(target, access_point, address, has_settings)?,
        }
        self.frames = self.frames.wrapping_add(1);
        Ok(())
    }
}

fn color(raw: u16) -> Rgb565 {
    Rgb565::from(RawU16::new(raw))
}

fn text_width(text: &str, scale: u32) -> u32 {
    text.chars().count() as u32 * CELL_WIDTH * scale.max(1)
}

/// Draws `text` left to right on a black background, stopping at the
/// first cell that would cross `limit_x`.
fn draw_text<D>(
    target: &mut D,
    text: &str,
    x: i32,
    y: i32,
    scale: u32,
    fg: u16,
    limit_x: u32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb565>,
{
    let advance = (CELL_WIDTH * scale.max(1)) as i32;
    let mut cursor = x;
    for c in text.chars() {
        if cursor + advance > limit_x as i32 {
            break;
        }
        draw_glyph_cell(target, cursor, y, c, scale, color(fg), color(BLACK))?;
        cursor += advance;
    }
    Ok(())
}
