//! Owner of the document currently shown on screen.

use alloc::{string::String, vec::Vec};

/// Bodies larger than this are cut on a char boundary before being stored.
pub const MAX_DOCUMENT_BYTES: usize = 48 * 1024;

/// Holds the current document body. Replaced wholesale, never edited.
#[derive(Debug, Default)]
pub struct TextStore {
    body: String,
}

impl TextStore {
    pub const fn new() -> Self {
        Self { body: String::new() }
    }

    pub fn replace(&mut self, mut body: String) {
        truncate_on_char_boundary(&mut body, MAX_DOCUMENT_BYTES);
        self.body = body;
    }

    pub fn clear(&mut self) {
        // Release the allocation too; the heap is shared with the radio.
        self.body = String::new();
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Decodes a fetched body, replacing invalid UTF-8 with U+FFFD.
///
/// Valid bodies are reused without copying.
pub fn decode_body(bytes: Vec<u8>) -> String {
    let mut body = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    };
    truncate_on_char_boundary(&mut body, MAX_DOCUMENT_BYTES);
    body
}

/// Drops a UTF-8 sequence left incomplete by a byte-count cut, so a capped
/// body does not decode to a trailing U+FFFD.
pub fn trim_partial_char(bytes: &mut Vec<u8>) {
    let window = bytes.len().saturating_sub(3)..bytes.len();
    let Some(lead) = window.rev().find(|&index| bytes[index] & 0xC0 != 0x80) else {
        return;
    };
    let width = match bytes[lead] {
        0xF0.. => 4,
        0xE0.. => 3,
        0xC0.. => 2,
        _ => 1,
    };
    if lead + width > bytes.len() {
        bytes.truncate(lead);
    }
}

pub fn truncate_on_char_boundary(text: &mut String, max_bytes: usize) {
    if text.len() <= max_bytes {
        return;
    }

    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}
