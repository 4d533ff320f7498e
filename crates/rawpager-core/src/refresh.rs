//! Periodic document refresh timing.

use alloc::string::String;

pub const REFRESH_INTERVAL_MS: u64 = 15 * 60 * 1_000;
pub const RETRY_DELAY_MS: u64 = 60 * 1_000;

/// A fetch failed. The board logs the underlying cause.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FetchError;

/// No source URL is configured. Shown as a status; polling continues in
/// case the settings change.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConfigurationMissing;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RefreshPolicy {
    pub interval_ms: u64,
    pub retry_ms: u64,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval_ms: REFRESH_INTERVAL_MS,
            retry_ms: RETRY_DELAY_MS,
        }
    }
}

impl RefreshPolicy {
    pub const fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub const fn with_retry_ms(mut self, retry_ms: u64) -> Self {
        self.retry_ms = retry_ms;
        self
    }
}

/// Decides when the next fetch is due.
///
/// Starts out due. After a success the next fetch is one interval away,
/// after a failure (or a skipped fetch) one retry delay away.
#[derive(Clone, Copy, Debug)]
pub struct RefreshScheduler {
    policy: RefreshPolicy,
    next_due_ms: Option<u64>,
    in_flight: bool,
}

impl RefreshScheduler {
    pub const fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            next_due_ms: None,
            in_flight: false,
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        !self.in_flight && self.next_due_ms.is_none_or(|due| now_ms >= due)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn begin(&mut self) {
        self.in_flight = true;
    }

    pub fn on_success(&mut self, now_ms: u64) {
        self.in_flight = false;
        self.next_due_ms = Some(now_ms.saturating_add(self.policy.interval_ms));
    }

    pub fn on_failure(&mut self, now_ms: u64) {
        self.in_flight = false;
        self.next_due_ms = Some(now_ms.saturating_add(self.policy.retry_ms));
    }

    /// Makes a fetch due at the next check.
    pub fn force(&mut self) {
        self.next_due_ms = None;
    }

    pub fn next_due_ms(&self) -> Option<u64> {
        self.next_due_ms
    }
}

/// Redirect hops followed before a fetch is given up.
pub const MAX_REDIRECTS: u8 = 5;

/// Resolves a `Location` header against the URL that produced it.
///
/// Absolute targets pass through, `//host/path` keeps the scheme and
/// `/path` keeps scheme and authority. Other relative forms replace the
/// last path segment.
pub fn resolve_redirect(base: &str, location: &str) -> Option<String> {
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    if location.starts_with("http://") || location.starts_with("https://") {
        return Some(String::from(location));
    }

    let (scheme, rest) = base.split_once("://")?;
    if let Some(authority_path) = location.strip_prefix("//") {
        let mut url = String::from(scheme);
        url.push_str("://");
        url.push_str(authority_path);
        return Some(url);
    }

    let authority_end = rest.find('/').unwrap_or(rest.len());
    let origin_len = scheme.len() + 3 + authority_end;
    let mut url = String::from(&base[..origin_len]);
    if location.starts_with('/') {
        url.push_str(location);
        return Some(url);
    }

    let path = &rest[authority_end..];
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let dir_end = path.rfind('/').map_or(0, |slash| slash + 1);
    if dir_end == 0 {
        url.push('/');
    } else {
        url.push_str(&path[..dir_end]);
    }
    url.push_str(location);
    Some(url)
}
