//! Shared text truncation and label formatting for the status bar and footer.

use core::fmt::Write;

use heapless::String;

const ELLIPSIS: &str = "...";

/// Copies `text` into a bounded string, cutting it to `max_chars` with a
/// trailing "..." when it does not fit.
pub fn ellipsize<const N: usize>(text: &str, max_chars: usize) -> String<N> {
    let mut out = String::new();
    let char_count = text.chars().count();

    if char_count <= max_chars && text.len() <= N {
        let _ = out.push_str(text);
        return out;
    }

    let room_chars = max_chars.saturating_sub(ELLIPSIS.len());
    let room_bytes = N.saturating_sub(ELLIPSIS.len());
    for ch in text.chars().take(room_chars) {
        if out.len() + ch.len_utf8() > room_bytes {
            break;
        }
        let _ = out.push(ch);
    }

    if max_chars >= ELLIPSIS.len() {
        let _ = out.push_str(ELLIPSIS);
    }
    out
}

/// `"HH:MM UTC"` for the footer clock.
pub fn utc_clock_label(unix_secs: u64) -> String<12> {
    let seconds_of_day = unix_secs % 86_400;
    let hours = seconds_of_day / 3_600;
    let minutes = (seconds_of_day % 3_600) / 60;

    let mut out = String::new();
    let _ = write!(out, "{hours:02}:{minutes:02} UTC");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        let text: String<16> = ellipsize("WiFi connected", 52);
        assert_eq!(text.as_str(), "WiFi connected");
    }

    #[test]
    fn long_text_gets_ellipsis() {
        let text: String<16> = ellipsize("https://example.com/some/file.txt", 10);
        assert_eq!(text.as_str(), "https:/...");

        let tight: String<8> = ellipsize("abcdefghijkl", 52);
        assert_eq!(tight.as_str(), "abcde...");
    }

    #[test]
    fn ellipsis_counts_chars() {
        let text: String<32> = ellipsize("ééééééé", 6);
        assert_eq!(text.as_str(), "ééé...");
    }

    #[test]
    fn clock_label_is_zero_padded() {
        assert_eq!(utc_clock_label(0).as_str(), "00:00 UTC");
        assert_eq!(utc_clock_label(1_704_067_200 + 9 * 3_600 + 5 * 60 + 59).as_str(), "09:05 UTC");
        assert_eq!(utc_clock_label(86_399).as_str(), "23:59 UTC");
    }
}
