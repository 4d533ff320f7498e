//! Command-level protocol helpers for the ILI9341 controller.

/// Native (portrait) panel width in pixels.
pub const NATIVE_WIDTH: u16 = 240;
/// Native (portrait) panel height in pixels.
pub const NATIVE_HEIGHT: u16 = 320;

pub const SWRESET: u8 = 0x01;
pub const SLPOUT: u8 = 0x11;
pub const INVOFF: u8 = 0x20;
pub const INVON: u8 = 0x21;
pub const DISPON: u8 = 0x29;
pub const CASET: u8 = 0x2A;
pub const PASET: u8 = 0x2B;
pub const RAMWR: u8 = 0x2C;
pub const MADCTL: u8 = 0x36;
pub const PIXFMT: u8 = 0x3A;

/// Delay after a software reset before the next command is accepted.
pub const RESET_DELAY_MS: u32 = 150;

const MADCTL_MY: u8 = 0x80;
const MADCTL_MX: u8 = 0x40;
const MADCTL_MV: u8 = 0x20;
const MADCTL_BGR: u8 = 0x08;

/// One command of the power-up sequence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct InitStep {
    pub command: u8,
    pub params: &'static [u8],
    /// Wait after the command, in milliseconds.
    pub delay_ms: u32,
}

const fn step(command: u8, params: &'static [u8]) -> InitStep {
    InitStep {
        command,
        params,
        delay_ms: 0,
    }
}

/// Vendor power-up sequence (power control, VCOM, 16-bit pixels, gamma),
/// ending with sleep-out and display-on.
pub const INIT_SEQUENCE: &[InitStep] = &[
    step(0xEF, &[0x03, 0x80, 0x02]),
    step(0xCF, &[0x00, 0xC1, 0x30]),
    step(0xED, &[0x64, 0x03, 0x12, 0x81]),
    step(0xE8, &[0x85, 0x00, 0x78]),
    step(0xCB, &[0x39, 0x2C, 0x00, 0x34, 0x02]),
    step(0xF7, &[0x20]),
    step(0xEA, &[0x00, 0x00]),
    // Power control 1/2, VCOM control 1/2.
    step(0xC0, &[0x23]),
    step(0xC1, &[0x10]),
    step(0xC5, &[0x3E, 0x28]),
    step(0xC7, &[0x86]),
    step(MADCTL, &[MADCTL_MX | MADCTL_BGR]),
    step(0x37, &[0x00]),
    // RGB565.
    step(PIXFMT, &[0x55]),
    step(0xB1, &[0x00, 0x18]),
    step(0xB6, &[0x08, 0x82, 0x27]),
    step(0xF2, &[0x00]),
    step(0x26, &[0x01]),
    step(
        0xE0,
        &[
            0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1, 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09,
            0x00,
        ],
    ),
    step(
        0xE1,
        &[
            0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1, 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36,
            0x0F,
        ],
    ),
    InitStep {
        command: SLPOUT,
        params: &[],
        delay_ms: 120,
    },
    InitStep {
        command: DISPON,
        params: &[],
        delay_ms: 20,
    },
];

/// Panel orientation, applied through `MADCTL`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Orientation {
    Portrait,
    #[default]
    Landscape,
    PortraitFlipped,
    LandscapeFlipped,
}

impl Orientation {
    /// `MADCTL` value, BGR panel order included.
    pub const fn madctl(self) -> u8 {
        match self {
            Self::Portrait => MADCTL_MX | MADCTL_BGR,
            Self::Landscape => MADCTL_MV | MADCTL_BGR,
            Self::PortraitFlipped => MADCTL_MY | MADCTL_BGR,
            Self::LandscapeFlipped => MADCTL_MX | MADCTL_MY | MADCTL_MV | MADCTL_BGR,
        }
    }

    /// `(width, height)` as seen by drawing code.
    pub const fn size(self) -> (u16, u16) {
        match self {
            Self::Portrait | Self::PortraitFlipped => (NATIVE_WIDTH, NATIVE_HEIGHT),
            Self::Landscape | Self::LandscapeFlipped => (NATIVE_HEIGHT, NATIVE_WIDTH),
        }
    }
}

/// Inclusive `start..=end` range as sent with `CASET`/`PASET`.
#[inline]
pub const fn encode_range(start: u16, end: u16) -> [u8; 4] {
    let start = start.to_be_bytes();
    let end = end.to_be_bytes();
    [start[0], start[1], end[0], end[1]]
}

/// Column and page parameters for a `width` x `height` window at `(x, y)`.
///
/// Returns `None` for empty windows or windows leaving the panel.
pub fn address_window(
    orientation: Orientation,
    x: u16,
    y: u16,
    width: u16,
    height: u16,
) -> Option<([u8; 4], [u8; 4])> {
    let (panel_width, panel_height) = orientation.size();
    if width == 0 || height == 0 {
        return None;
    }

    let x_end = x.checked_add(width - 1)?;
    let y_end = y.checked_add(height - 1)?;
    if x_end >= panel_width || y_end >= panel_height {
        return None;
    }

    Some((encode_range(x, x_end), encode_range(y, y_end)))
}
