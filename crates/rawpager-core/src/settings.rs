//! Persisted user settings abstraction.

use heapless::String;

use crate::{
    refresh::ConfigurationMissing,
    render::{TextColor, TextSize},
};

pub const MAX_SSID_BYTES: usize = 63;
pub const MAX_PASSWORD_BYTES: usize = 63;
pub const MAX_URL_BYTES: usize = 255;

/// Settings collected by the configuration portal.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PagerSettings {
    pub ssid: String<{ MAX_SSID_BYTES + 1 }>,
    pub password: String<{ MAX_PASSWORD_BYTES + 1 }>,
    pub source_url: String<{ MAX_URL_BYTES + 1 }>,
    pub text_color: TextColor,
    pub text_size: TextSize,
}

impl PagerSettings {
    /// Builds settings from raw field values, truncating over-long ones.
    pub fn new(ssid: &str, password: &str, source_url: &str) -> Self {
        Self {
            ssid: copy_truncated(ssid, MAX_SSID_BYTES),
            password: copy_truncated(password, MAX_PASSWORD_BYTES),
            source_url: copy_truncated(source_url, MAX_URL_BYTES),
            text_color: TextColor::default(),
            text_size: TextSize::default(),
        }
    }

    pub const fn with_text_color(mut self, text_color: TextColor) -> Self {
        self.text_color = text_color;
        self
    }

    pub const fn with_text_size(mut self, text_size: TextSize) -> Self {
        self.text_size = text_size;
        self
    }

    /// Settings count as configured once an SSID is present.
    pub fn has_credentials(&self) -> bool {
        !self.ssid.is_empty()
    }

    pub fn has_source(&self) -> bool {
        !self.source_url.trim().is_empty()
    }

    /// The URL to fetch, trimmed.
    pub fn source(&self) -> Result<&str, ConfigurationMissing> {
        let url = self.source_url.trim();
        if url.is_empty() {
            Err(ConfigurationMissing)
        } else {
            Ok(url)
        }
    }
}

/// Copies at most `max_bytes` of `text`, cutting on a char boundary.
pub fn copy_truncated<const N: usize>(text: &str, max_bytes: usize) -> String<N> {
    let mut limit = max_bytes.min(N).min(text.len());
    while !text.is_char_boundary(limit) {
        limit -= 1;
    }

    let mut out = String::new();
    let _ = out.push_str(&text[..limit]);
    out
}

/// Abstract settings persistence backend.
pub trait SettingsStore {
    type Error;

    fn load(&mut self) -> Result<Option<PagerSettings>, Self::Error>;
    fn save(&mut self, settings: &PagerSettings) -> Result<(), Self::Error>;
}
