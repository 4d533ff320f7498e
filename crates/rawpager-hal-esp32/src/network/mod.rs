//! Wi-Fi/network state shared between async network workers and the UI loop.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

/// High-level station state for the status line and logs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum ConnectivityState {
    Disconnected = 0,
    Connecting = 1,
    LinkUpNoIp = 2,
    Connected = 3,
    /// The last association attempt failed; a retry is scheduled.
    Failed = 4,
}

impl ConnectivityState {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::LinkUpNoIp,
            3 => Self::Connected,
            4 => Self::Failed,
            _ => Self::Disconnected,
        }
    }
}

/// Immutable connectivity snapshot for the board loop.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConnectivitySnapshot {
    pub state: ConnectivityState,
    pub link_up: bool,
    pub has_ipv4: bool,
    pub revision: u32,
}

impl ConnectivitySnapshot {
    /// Link plus IPv4 configuration, enough to open sockets.
    pub const fn is_online(self) -> bool {
        self.link_up && self.has_ipv4
    }
}

/// Lock-free shared connectivity status.
#[derive(Debug)]
pub struct ConnectivityHandle {
    state: AtomicU8,
    link_up: AtomicBool,
    has_ipv4: AtomicBool,
    revision: AtomicU32,
}

impl ConnectivityHandle {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectivityState::Disconnected as u8),
            link_up: AtomicBool::new(false),
            has_ipv4: AtomicBool::new(false),
            revision: AtomicU32::new(0),
        }
    }

    pub fn snapshot(&self) -> ConnectivitySnapshot {
        ConnectivitySnapshot {
            state: ConnectivityState::from_raw(self.state.load(Ordering::Acquire)),
            link_up: self.link_up.load(Ordering::Acquire),
            has_ipv4: self.has_ipv4.load(Ordering::Acquire),
            revision: self.revision.load(Ordering::Acquire),
        }
    }

    /// Association started; keeps the link flags as they are.
    pub fn mark_connecting(&self) {
        if self.swap_state(ConnectivityState::Connecting) {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
    }

    pub fn mark_failed(&self) {
        self.apply(ConnectivityState::Failed, false, false);
    }

    pub fn mark_disconnected(&self) {
        self.apply(ConnectivityState::Disconnected, false, false);
    }

    /// Derives the state from what the network stack reports.
    pub fn update_link_ip(&self, link_up: bool, has_ipv4: bool) {
        let state = match (link_up, has_ipv4) {
            (false, _) => ConnectivityState::Disconnected,
            (true, false) => ConnectivityState::LinkUpNoIp,
            (true, true) => ConnectivityState::Connected,
        };
        self.apply(state, link_up, has_ipv4);
    }

    fn apply(&self, state: ConnectivityState, link_up: bool, has_ipv4: bool) {
        // Non-short-circuit `|` so every field is stored.
        let changed = (self.link_up.swap(link_up, Ordering::AcqRel) != link_up)
            | (self.has_ipv4.swap(has_ipv4, Ordering::AcqRel) != has_ipv4)
            | self.swap_state(state);
        if changed {
            self.revision.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn swap_state(&self, next: ConnectivityState) -> bool {
        self.state.swap(next as u8, Ordering::AcqRel) != next as u8
    }
}

impl Default for ConnectivityHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A wall-clock sample published by the SNTP worker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimeSync {
    pub unix_secs: u64,
    /// Uptime at which `unix_secs` was valid.
    pub at_ms: u64,
    pub revision: u32,
}

/// Latest SNTP result, readable without locking.
///
/// Seconds and uptime are stored as 32-bit halves; the revision is
/// bumped last so a reader that sees a new revision sees the whole sample.
#[derive(Debug)]
pub struct TimeSyncHandle {
    unix_secs: AtomicU32,
    at_ms_low: AtomicU32,
    at_ms_high: AtomicU32,
    revision: AtomicU32,
}

impl TimeSyncHandle {
    pub const fn new() -> Self {
        Self {
            unix_secs: AtomicU32::new(0),
            at_ms_low: AtomicU32::new(0),
            at_ms_high: AtomicU32::new(0),
            revision: AtomicU32::new(0),
        }
    }

    pub fn publish(&self, unix_secs: u64, at_ms: u64) {
        self.unix_secs
            .store(unix_secs.min(u32::MAX as u64) as u32, Ordering::Release);
        self.at_ms_low.store(at_ms as u32, Ordering::Release);
        self.at_ms_high.store((at_ms >> 32) as u32, Ordering::Release);
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns the latest sample if it is newer than `seen_revision`.
    pub fn newer_than(&self, seen_revision: u32) -> Option<TimeSync> {
        let revision = self.revision.load(Ordering::Acquire);
        if revision == seen_revision {
            return None;
        }

        let at_ms = ((self.at_ms_high.load(Ordering::Acquire) as u64) << 32)
            | self.at_ms_low.load(Ordering::Acquire) as u64;
        Some(TimeSync {
            unix_secs: self.unix_secs.load(Ordering::Acquire) as u64,
            at_ms,
            revision,
        })
    }
}

impl Default for TimeSyncHandle {
    fn default() -> Self {
        Self::new()
    }
}
