//! App-level view models, text sizes and the RGB565 palette.

use crate::layout::{PageGeometry, PageLayout};

pub const BLACK: u16 = 0x0000;
pub const WHITE: u16 = 0xFFFF;
pub const GRAY: u16 = 0x7BEF;
pub const GREEN: u16 = 0x07E0;
pub const CYAN: u16 = 0x07FF;
pub const YELLOW: u16 = 0xFFE0;
pub const ORANGE: u16 = 0xFD20;
pub const RED: u16 = 0xF800;
pub const MAGENTA: u16 = 0xF81F;

/// Cycle used by [`TextColor::Rainbow`], one step per rendered segment.
pub const RAINBOW: [u16; 7] = [CYAN, GREEN, YELLOW, ORANGE, RED, MAGENTA, WHITE];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TextSize {
    #[default]
    Small,
    Medium,
    Large,
}

impl TextSize {
    pub const ALL: [Self; 3] = [Self::Small, Self::Medium, Self::Large];

    /// Glyph scale factor applied to the 5x7 font.
    pub const fn scale(self) -> u8 {
        match self {
            Self::Small => 1,
            Self::Medium => 2,
            Self::Large => 3,
        }
    }

    /// Persisted level, 1..=3.
    pub const fn level(self) -> u8 {
        self.scale()
    }

    /// Out-of-range levels are clamped.
    pub const fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => Self::Small,
            2 => Self::Medium,
            _ => Self::Large,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "Small (default)",
            Self::Medium => "Medium",
            Self::Large => "Large",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PaletteColor {
    White,
    Green,
    Cyan,
    Yellow,
    Orange,
    Red,
}

impl PaletteColor {
    pub const ALL: [Self; 6] = [
        Self::White,
        Self::Green,
        Self::Cyan,
        Self::Yellow,
        Self::Orange,
        Self::Red,
    ];

    pub const fn rgb565(self) -> u16 {
        match self {
            Self::White => WHITE,
            Self::Green => GREEN,
            Self::Cyan => CYAN,
            Self::Yellow => YELLOW,
            Self::Orange => ORANGE,
            Self::Red => RED,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::White => "White",
            Self::Green => "Green",
            Self::Cyan => "Cyan",
            Self::Yellow => "Yellow",
            Self::Orange => "Orange",
            Self::Red => "Red",
        }
    }
}

/// Body text color: one palette entry, or cycling per segment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextColor {
    Fixed(PaletteColor),
    Rainbow,
}

impl Default for TextColor {
    fn default() -> Self {
        Self::Fixed(PaletteColor::White)
    }
}

impl TextColor {
    pub const RAINBOW_INDEX: u8 = 6;

    /// Maps the persisted index (0..=5 fixed, 6 rainbow); larger values clamp to rainbow.
    pub const fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Fixed(PaletteColor::White),
            1 => Self::Fixed(PaletteColor::Green),
            2 => Self::Fixed(PaletteColor::Cyan),
            3 => Self::Fixed(PaletteColor::Yellow),
            4 => Self::Fixed(PaletteColor::Orange),
            5 => Self::Fixed(PaletteColor::Red),
            _ => Self::Rainbow,
        }
    }

    pub const fn index(self) -> u8 {
        match self {
            Self::Fixed(color) => color as u8,
            Self::Rainbow => Self::RAINBOW_INDEX,
        }
    }

    /// Color of the `step`-th segment rendered on a page.
    pub const fn segment_color(self, step: usize) -> u16 {
        match self {
            Self::Fixed(color) => color.rgb565(),
            Self::Rainbow => RAINBOW[step % RAINBOW.len()],
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Fixed(color) => color.label(),
            Self::Rainbow => "Rainbow (multi-color)",
        }
    }
}

/// Screen areas that changed since the last frame.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DirtyRegions {
    /// Top status bar.
    pub status: bool,
    /// Content area, cleared and redrawn as a whole.
    pub page: bool,
    /// Hint line and clock.
    pub footer: bool,
}

impl DirtyRegions {
    pub const NONE: Self = Self {
        status: false,
        page: false,
        footer: false,
    };
    pub const ALL: Self = Self {
        status: true,
        page: true,
        footer: true,
    };

    pub const fn any(self) -> bool {
        self.status || self.page || self.footer
    }

    pub const fn union(self, other: Self) -> Self {
        Self {
            status: self.status || other.status,
            page: self.page || other.page,
            footer: self.footer || other.footer,
        }
    }
}

/// Navigation hint shown bottom-left under the page.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NavHint {
    More,
    LastPage,
}

impl NavHint {
    pub const fn label(self) -> &'static str {
        match self {
            Self::More => "< prev     next >    hold=refetch",
            Self::LastPage => "< prev   restart >   hold=refetch",
        }
    }
}

/// One laid-out page together with the text it indexes into.
#[derive(Clone, Copy, Debug)]
pub struct PageView<'a> {
    pub doc: &'a str,
    pub layout: &'a PageLayout,
    pub geometry: PageGeometry,
}

/// A positioned run of body text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TextRun<'a> {
    pub text: &'a str,
    pub x: u16,
    pub y: u16,
    pub color: u16,
}

impl<'a> PageView<'a> {
    pub fn runs(&self) -> impl Iterator<Item = TextRun<'a>> + '_ {
        let doc = self.doc;
        self.layout.lines().iter().map(move |line| TextRun {
            text: &doc[line.start..line.end],
            x: self.geometry.left,
            y: self.geometry.row_y(line.row as usize),
            color: line.color,
        })
    }
}

/// App-level view model consumed by the board renderer.
pub enum Screen<'a> {
    Reader {
        status: &'a str,
        page: Option<PageView<'a>>,
        hint: Option<NavHint>,
        clock: Option<&'a str>,
        dirty: DirtyRegions,
    },
    Setup {
        access_point: &'a str,
        address: &'a str,
        has_settings: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_index_round_trips_and_clamps() {
        for index in 0..=6u8 {
            assert_eq!(TextColor::from_index(index).index(), index);
        }
        assert_eq!(TextColor::from_index(42), TextColor::Rainbow);
        assert_eq!(TextColor::default().segment_color(3), WHITE);
    }

    #[test]
    fn rainbow_cycles_through_seven_colors() {
        let color = TextColor::Rainbow;
        assert_eq!(color.segment_color(0), CYAN);
        assert_eq!(color.segment_color(6), WHITE);
        assert_eq!(color.segment_color(7), CYAN);
    }

    #[test]
    fn text_size_levels_clamp() {
        assert_eq!(TextSize::from_level(0), TextSize::Small);
        assert_eq!(TextSize::from_level(2), TextSize::Medium);
        assert_eq!(TextSize::from_level(9), TextSize::Large);
        assert_eq!(TextSize::Large.level(), 3);
    }
}
