//! Application state machine for fetching, paginating and showing one document.

use alloc::string::String;
use core::fmt::Write;

use heapless::String as BoundedString;
use log::{debug, info, warn};

use crate::{
    clock::WallClock,
    input::{InputEvent, InputProvider},
    layout::PageGeometry,
    navigation::{PageFormat, PageNavigator},
    refresh::{ConfigurationMissing, FetchError, RefreshPolicy, RefreshScheduler},
    render::{DirtyRegions, NavHint, PageView, Screen},
    settings::{MAX_URL_BYTES, PagerSettings},
    text_policy::{ellipsize, utc_clock_label},
    text_store::TextStore,
};

/// Characters that fit in the status bar at the small font on a 320 px panel.
const STATUS_MAX_CHARS: usize = 52;
const STATUS_TEXT_BYTES: usize = 96;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TickResult {
    NoRender,
    RenderRequested,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PagerConfig {
    pub surface_width: u16,
    pub surface_height: u16,
    pub refresh: RefreshPolicy,
    pub clock_interval_ms: u64,
}

impl Default for PagerConfig {
    fn default() -> Self {
        Self {
            surface_width: 320,
            surface_height: 240,
            refresh: RefreshPolicy::default(),
            clock_interval_ms: 60_000,
        }
    }
}

/// What the status bar currently reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    BootWindow,
    Connecting,
    WifiFailed,
    Connected,
    Fetching,
    /// A document is loaded; the bar shows its URL.
    Showing,
    FetchFailed,
    NoUrl,
    EmptyDocument,
}

/// A fetch the board should perform and report back through
/// [`PagerApp::complete_refresh`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefreshRequest {
    pub url: BoundedString<{ MAX_URL_BYTES + 1 }>,
}

pub struct PagerApp<IN>
where
    IN: InputProvider,
{
    input: IN,
    config: PagerConfig,
    settings: PagerSettings,
    document: TextStore,
    navigator: PageNavigator,
    scheduler: RefreshScheduler,
    clock: WallClock,
    status: Status,
    status_text: BoundedString<STATUS_TEXT_BYTES>,
    clock_text: Option<BoundedString<12>>,
    next_clock_ms: u64,
    pending: DirtyRegions,
    frame: DirtyRegions,
    input_faults: u32,
}

include!("view.rs");
include!("input.rs");
include!("runtime.rs");

#[cfg(test)]
mod tests;
