//! Configuration portal protocol logic.
//!
//! The board owns the sockets; this module turns request bytes into
//! responses and reports when the user finished configuring the device.

pub mod dhcp;
pub mod dns;
mod html;

use alloc::{string::String, vec::Vec};
use core::fmt::Write;

use crate::{
    render::{TextColor, TextSize},
    settings::PagerSettings,
};

pub const PORTAL_SSID: &str = "RawPager_Setup";
pub const PORTAL_ADDRESS: [u8; 4] = [192, 168, 4, 1];
pub const PORTAL_PREFIX_LEN: u8 = 24;
pub const HTTP_PORT: u16 = 80;
/// Requests (headers plus form body) larger than this are rejected.
pub const MAX_REQUEST_BYTES: usize = 2048;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Other,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Request<'a> {
    pub method: Method,
    /// Path without the query string.
    pub path: &'a str,
    pub body: &'a [u8],
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestError {
    /// Keep reading; headers or body are not complete yet.
    Incomplete,
    Malformed,
    TooLarge,
}

/// Parses one HTTP/1.x request from the bytes read so far.
pub fn parse_request(bytes: &[u8]) -> Result<Request<'_>, RequestError> {
    let Some(head_len) = find_subslice(bytes, b"\r\n\r\n") else {
        return Err(if bytes.len() >= MAX_REQUEST_BYTES {
            RequestError::TooLarge
        } else {
            RequestError::Incomplete
        });
    };

    let head = core::str::from_utf8(&bytes[..head_len]).map_err(|_| RequestError::Malformed)?;
    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or(RequestError::Malformed)?;

    let mut parts = request_line.split(' ');
    let method = match parts.next() {
        Some("GET") | Some("HEAD") => Method::Get,
        Some("POST") => Method::Post,
        Some(token) if !token.is_empty() => Method::Other,
        _ => return Err(RequestError::Malformed),
    };
    let target = parts.next().ok_or(RequestError::Malformed)?;
    if !parts.next().is_some_and(|version| version.starts_with("HTTP/")) {
        return Err(RequestError::Malformed);
    }
    let path = target.split('?').next().unwrap_or(target);

    let mut content_length = 0usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = value
                .trim()
                .parse()
                .map_err(|_| RequestError::Malformed)?;
        }
    }

    let body_start = head_len + 4;
    let body_end = body_start
        .checked_add(content_length)
        .ok_or(RequestError::TooLarge)?;
    if body_end > MAX_REQUEST_BYTES {
        return Err(RequestError::TooLarge);
    }
    if bytes.len() < body_end {
        return Err(RequestError::Incomplete);
    }

    Ok(Request {
        method,
        path,
        body: &bytes[body_start..body_end],
    })
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    PayloadTooLarge,
}

impl StatusCode {
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::PayloadTooLarge => 413,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::BadRequest => "Bad Request",
            Self::PayloadTooLarge => "Payload Too Large",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
}

impl Response {
    pub fn html(status: StatusCode, body: String) -> Self {
        Self { status, body }
    }

    /// Response for a request the parser rejected.
    pub fn for_error(error: RequestError) -> Self {
        match error {
            RequestError::TooLarge => Self::html(StatusCode::PayloadTooLarge, html::error_page()),
            RequestError::Incomplete | RequestError::Malformed => {
                Self::html(StatusCode::BadRequest, html::error_page())
            }
        }
    }

    /// Status line and headers, including the blank separator line.
    pub fn head(&self) -> heapless::String<160> {
        let mut head = heapless::String::new();
        let _ = write!(
            head,
            "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
            self.status.code(),
            self.status.reason(),
            self.body.len()
        );
        head
    }
}

/// How the user left the portal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PortalOutcome {
    Saved(PagerSettings),
    KeepCurrent,
}

/// Routes portal requests against the currently stored settings.
pub struct PortalSession {
    current: Option<PagerSettings>,
    outcome: Option<PortalOutcome>,
}

impl PortalSession {
    pub fn new(current: Option<PagerSettings>) -> Self {
        Self {
            current: current.filter(PagerSettings::has_credentials),
            outcome: None,
        }
    }

    pub fn has_settings(&self) -> bool {
        self.current.is_some()
    }

    /// Set once a save or keep-current request was answered.
    pub fn outcome(&self) -> Option<&PortalOutcome> {
        self.outcome.as_ref()
    }

    pub fn take_outcome(&mut self) -> Option<PortalOutcome> {
        self.outcome.take()
    }

    pub fn handle(&mut self, request: &Request<'_>) -> Response {
        match (request.method, request.path) {
            (Method::Post, "/save") => self.save(request.body),
            (Method::Post, "/nochange") if self.current.is_some() => {
                log::info!("portal: keeping stored settings");
                self.outcome = Some(PortalOutcome::KeepCurrent);
                Response::html(StatusCode::Ok, html::nochange_page())
            }
            _ => Response::html(StatusCode::Ok, html::form_page(self.current.as_ref())),
        }
    }

    fn save(&mut self, body: &[u8]) -> Response {
        let form = FormFields::parse(body);
        let ssid = form.get("ssid").unwrap_or_default();
        if ssid.is_empty() {
            return Response::html(StatusCode::BadRequest, html::empty_ssid_page());
        }

        let color = form
            .get("color")
            .map_or(0, |value| parse_leading_int(&value).clamp(0, 6));
        let size = form
            .get("size")
            .map_or(1, |value| parse_leading_int(&value).clamp(1, 3));

        let settings = PagerSettings::new(
            &ssid,
            &form.get("pass").unwrap_or_default(),
            form.get("url").unwrap_or_default().trim(),
        )
        .with_text_color(TextColor::from_index(color as u8))
        .with_text_size(TextSize::from_level(size as u8));

        log::info!(
            "portal: settings submitted ssid_len={} url_len={} color={} size={}",
            settings.ssid.len(),
            settings.source_url.len(),
            color,
            size
        );

        let page = html::saved_page(&settings);
        self.outcome = Some(PortalOutcome::Saved(settings));
        Response::html(StatusCode::Ok, page)
    }
}

/// Decoded `application/x-www-form-urlencoded` pairs.
struct FormFields {
    pairs: Vec<(String, String)>,
}

impl FormFields {
    fn parse(body: &[u8]) -> Self {
        let pairs = body
            .split(|byte| *byte == b'&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = match pair.iter().position(|byte| *byte == b'=') {
                    Some(split) => (&pair[..split], &pair[split + 1..]),
                    None => (pair, &[][..]),
                };
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self { pairs }
    }

    /// First value for `key`.
    fn get(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.clone())
    }
}

/// Percent-decodes one form component; `+` is a space. Malformed escapes
/// are kept literally and invalid UTF-8 is replaced.
pub fn decode_component(raw: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(raw.len());
    let mut index = 0;
    while index < raw.len() {
        match raw[index] {
            b'+' => bytes.push(b' '),
            b'%' if index + 2 < raw.len() => {
                match (hex_value(raw[index + 1]), hex_value(raw[index + 2])) {
                    (Some(high), Some(low)) => {
                        bytes.push((high << 4) | low);
                        index += 2;
                    }
                    _ => bytes.push(b'%'),
                }
            }
            byte => bytes.push(byte),
        }
        index += 1;
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Leading optional sign and digits; anything else reads as 0.
pub fn parse_leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(byte - b'0'));
    }
    if negative { -value } else { value }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(path: &str, body: &str) -> alloc::vec::Vec<u8> {
        alloc::format!(
            "POST {path} HTTP/1.1\r\nHost: 192.168.4.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()
    }

    fn configured() -> PagerSettings {
        PagerSettings::new("home", "secret", "https://example.com/notes.txt")
    }

    #[test]
    fn parses_get_and_strips_query() {
        let request = parse_request(b"GET /generate_204?x=1 HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/generate_204");
        assert!(request.body.is_empty());
    }

    #[test]
    fn waits_for_full_body() {
        let bytes = post("/save", "ssid=home");
        assert_eq!(
            parse_request(&bytes[..bytes.len() - 2]),
            Err(RequestError::Incomplete)
        );
        assert_eq!(parse_request(&bytes).unwrap().body, b"ssid=home");
        assert_eq!(parse_request(b"GET / HTTP/1.1\r\n"), Err(RequestError::Incomplete));
    }

    #[test]
    fn rejects_malformed_and_oversized() {
        assert_eq!(parse_request(b"GET\r\n\r\n"), Err(RequestError::Malformed));
        assert_eq!(
            parse_request(b"POST /save HTTP/1.1\r\nContent-Length: 9999\r\n\r\n"),
            Err(RequestError::TooLarge)
        );
        let flood = [b'a'; MAX_REQUEST_BYTES];
        assert_eq!(parse_request(&flood), Err(RequestError::TooLarge));
    }

    #[test]
    fn save_decodes_and_clamps_fields() {
        let mut session = PortalSession::new(None);
        let bytes = post(
            "/save",
            "ssid=My+Net%21&pass=p%40ss&url=https%3A%2F%2Fexample.com%2Fa.txt&color=9&size=0",
        );
        let response = session.handle(&parse_request(&bytes).unwrap());
        assert_eq!(response.status, StatusCode::Ok);

        let Some(PortalOutcome::Saved(settings)) = session.outcome() else {
            panic!("expected saved outcome");
        };
        assert_eq!(settings.ssid.as_str(), "My Net!");
        assert_eq!(settings.password.as_str(), "p@ss");
        assert_eq!(settings.source_url.as_str(), "https://example.com/a.txt");
        assert_eq!(settings.text_color, TextColor::Rainbow);
        assert_eq!(settings.text_size, TextSize::Small);
    }

    #[test]
    fn non_numeric_selects_fall_back() {
        let mut session = PortalSession::new(None);
        let bytes = post("/save", "ssid=x&color=abc&size=-4");
        session.handle(&parse_request(&bytes).unwrap());
        let Some(PortalOutcome::Saved(settings)) = session.take_outcome() else {
            panic!("expected saved outcome");
        };
        assert_eq!(settings.text_color, TextColor::default());
        assert_eq!(settings.text_size, TextSize::Small);
        assert!(session.outcome().is_none());
    }

    #[test]
    fn empty_ssid_is_bad_request() {
        let mut session = PortalSession::new(None);
        let bytes = post("/save", "ssid=&pass=x&url=");
        let response = session.handle(&parse_request(&bytes).unwrap());
        assert_eq!(response.status, StatusCode::BadRequest);
        assert!(response.head().starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(session.outcome().is_none());
    }

    #[test]
    fn overlong_fields_are_truncated() {
        let mut session = PortalSession::new(None);
        let ssid = "s".repeat(80);
        let bytes = post("/save", &alloc::format!("ssid={ssid}&url=u"));
        session.handle(&parse_request(&bytes).unwrap());
        let Some(PortalOutcome::Saved(settings)) = session.outcome() else {
            panic!("expected saved outcome");
        };
        assert_eq!(settings.ssid.len(), 63);
    }

    #[test]
    fn nochange_only_with_existing_settings() {
        let bytes = post("/nochange", "");

        let mut fresh = PortalSession::new(None);
        let response = fresh.handle(&parse_request(&bytes).unwrap());
        assert!(response.body.contains("name='ssid'"));
        assert!(fresh.outcome().is_none());

        let mut session = PortalSession::new(Some(configured()));
        session.handle(&parse_request(&bytes).unwrap());
        assert_eq!(session.outcome(), Some(&PortalOutcome::KeepCurrent));
    }

    #[test]
    fn unknown_paths_serve_the_form() {
        let mut session = PortalSession::new(Some(configured()));
        let request = parse_request(b"GET /hotspot-detect.html HTTP/1.1\r\n\r\n").unwrap();
        let response = session.handle(&request);
        assert_eq!(response.status, StatusCode::Ok);
        assert!(response.body.contains("action='/save'"));
        assert!(response.body.contains("action='/nochange'"));
        assert!(response.body.contains("value='home'"));
    }

    #[test]
    fn form_escapes_stored_values() {
        let settings = PagerSettings::new("a'b<c>", "", "https://x/?a=1&b=2");
        let mut session = PortalSession::new(Some(settings));
        let response = session.handle(&parse_request(b"GET / HTTP/1.1\r\n\r\n").unwrap());
        assert!(response.body.contains("value='a&#39;b&lt;c&gt;'"));
        assert!(response.body.contains("a=1&amp;b=2"));
    }

    #[test]
    fn head_reports_body_length() {
        let response = Response::html(StatusCode::Ok, String::from("hello"));
        let head = response.head();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Length: 5\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn decoding_handles_bad_escapes() {
        assert_eq!(decode_component(b"100%"), "100%");
        assert_eq!(decode_component(b"%zz"), "%zz");
        assert_eq!(decode_component(b"%C3%A9"), "é");
        assert_eq!(parse_leading_int(" 42abc"), 42);
        assert_eq!(parse_leading_int("x"), 0);
    }
}
