//! Fixed-size little-endian settings record stored in one flash sector.

use rawpager_core::{
    render::{TextColor, TextSize},
    settings::{MAX_PASSWORD_BYTES, MAX_SSID_BYTES, MAX_URL_BYTES, PagerSettings},
};

pub const SETTINGS_MAGIC: u32 = 0x3147_5052; // "RPG1"
pub const SETTINGS_VERSION: u8 = 1;

const HEADER_LEN: usize = 12;
const SSID_FIELD: usize = 64;
const PASSWORD_FIELD: usize = 64;
const URL_FIELD: usize = 256;

const SSID_AT: usize = HEADER_LEN;
const PASSWORD_AT: usize = SSID_AT + SSID_FIELD;
const URL_AT: usize = PASSWORD_AT + PASSWORD_FIELD;
const CHECKSUM_AT: usize = URL_AT + URL_FIELD;

pub const SETTINGS_RECORD_LEN: usize = CHECKSUM_AT + 4;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RecordError {
    Corrupted,
}

pub fn encode(settings: &PagerSettings) -> [u8; SETTINGS_RECORD_LEN] {
    let mut buf = [0u8; SETTINGS_RECORD_LEN];
    let ssid = settings.ssid.as_bytes();
    let password = settings.password.as_bytes();
    let url = settings.source_url.as_bytes();

    buf[0..4].copy_from_slice(&SETTINGS_MAGIC.to_le_bytes());
    buf[4] = SETTINGS_VERSION;
    buf[5] = settings.text_color.index();
    buf[6] = settings.text_size.level();
    buf[7] = ssid.len() as u8;
    buf[8] = password.len() as u8;
    buf[9..11].copy_from_slice(&(url.len() as u16).to_le_bytes());

    buf[SSID_AT..SSID_AT + ssid.len()].copy_from_slice(ssid);
    buf[PASSWORD_AT..PASSWORD_AT + password.len()].copy_from_slice(password);
    buf[URL_AT..URL_AT + url.len()].copy_from_slice(url);

    let checksum = checksum32(&buf[..CHECKSUM_AT]);
    buf[CHECKSUM_AT..].copy_from_slice(&checksum.to_le_bytes());
    buf
}

/// Erased flash, a foreign magic or an unknown version read as "no
/// settings"; a record that claims to be ours but fails validation is an
/// error.
pub fn decode(buf: &[u8; SETTINGS_RECORD_LEN]) -> Result<Option<PagerSettings>, RecordError> {
    if buf.iter().all(|b| *b == 0xFF) {
        return Ok(None);
    }

    let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    if magic != SETTINGS_MAGIC || buf[4] != SETTINGS_VERSION {
        return Ok(None);
    }

    let expected = u32::from_le_bytes([
        buf[CHECKSUM_AT],
        buf[CHECKSUM_AT + 1],
        buf[CHECKSUM_AT + 2],
        buf[CHECKSUM_AT + 3],
    ]);
    if checksum32(&buf[..CHECKSUM_AT]) != expected {
        return Err(RecordError::Corrupted);
    }

    if buf[5] > TextColor::RAINBOW_INDEX || !(1..=3).contains(&buf[6]) {
        return Err(RecordError::Corrupted);
    }

    let ssid = field(buf, SSID_AT, buf[7] as usize, MAX_SSID_BYTES)?;
    let password = field(buf, PASSWORD_AT, buf[8] as usize, MAX_PASSWORD_BYTES)?;
    let url_len = u16::from_le_bytes([buf[9], buf[10]]) as usize;
    let url = field(buf, URL_AT, url_len, MAX_URL_BYTES)?;

    Ok(Some(
        PagerSettings::new(ssid, password, url)
            .with_text_color(TextColor::from_index(buf[5]))
            .with_text_size(TextSize::from_level(buf[6])),
    ))
}

fn field(buf: &[u8], at: usize, len: usize, max: usize) -> Result<&str, RecordError> {
    if len > max {
        return Err(RecordError::Corrupted);
    }
    core::str::from_utf8(&buf[at..at + len]).map_err(|_| RecordError::Corrupted)
}

/// FNV-1a over the record body.
pub fn checksum32(bytes: &[u8]) -> u32 {
    let mut hash = 0x811C9DC5u32;
    for b in bytes {
        hash ^= *b as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}
