use alloc::string::String;
use core::fmt::Write;

use crate::{
    render::{PaletteColor, TextColor, TextSize},
    settings::{MAX_PASSWORD_BYTES, MAX_SSID_BYTES, MAX_URL_BYTES, PagerSettings},
};

use super::PORTAL_SSID;

const STYLE: &str = "<style>\
body{background:#001a33;color:#00ccff;font-family:Arial,sans-serif;text-align:center;padding:20px;max-width:480px;margin:auto;}\
h1,h2{color:#00ffff;}\
p{color:#88aacc;font-size:0.9em;}\
label{display:block;text-align:left;margin:14px 0 4px;color:#88ddff;font-weight:bold;}\
input,select{width:100%;box-sizing:border-box;background:#002244;color:#00ccff;border:2px solid #0066aa;border-radius:6px;padding:10px;font-size:1em;}\
.btn{display:block;width:100%;padding:14px;margin:10px 0;font-size:1.05em;border-radius:8px;cursor:pointer;font-weight:bold;}\
.save{background:#004488;color:#00ffff;border:2px solid #0099dd;}\
.keep{background:#1a1a2e;color:#667788;border:2px solid #334455;}\
.note{color:#445566;font-size:0.82em;margin-top:16px;}\
.err{color:#ff5555;}\
small{color:#445566;word-break:break-all;}\
hr{border:1px solid #113355;margin:20px 0;}\
</style>";

fn open_page(out: &mut String, title: &str) {
    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset='UTF-8'>\
         <meta name='viewport' content='width=device-width,initial-scale=1'>\
         <title>{title}</title>{STYLE}</head><body>"
    );
}

fn close_page(out: &mut String) {
    out.push_str("</body></html>");
}

/// Escapes text for use inside element content and single-quoted attributes.
pub(super) fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

fn push_input(out: &mut String, label: &str, kind: &str, name: &str, value: &str, max_len: usize, extra: &str) {
    let _ = write!(out, "<label>{label}</label><input type='{kind}' name='{name}' value='");
    push_escaped(out, value);
    let _ = write!(out, "' maxlength='{max_len}'{extra}>");
}

fn push_option(out: &mut String, value: u8, selected: bool, label: &str) {
    let _ = write!(out, "<option value='{value}'");
    if selected {
        out.push_str(" selected");
    }
    let _ = write!(out, ">{label}</option>");
}

pub(super) fn form_page(current: Option<&PagerSettings>) -> String {
    let defaults = PagerSettings::default();
    let settings = current.unwrap_or(&defaults);

    let mut out = String::with_capacity(4096);
    open_page(&mut out, "RawPager Setup");
    out.push_str(
        "<h1>RawPager Setup</h1>\
         <p>Show any plain-text file from the web on your display.</p>\
         <form method='post' action='/save'>",
    );

    push_input(
        &mut out,
        "WiFi Network Name (SSID):",
        "text",
        "ssid",
        &settings.ssid,
        MAX_SSID_BYTES,
        " placeholder='Your 2.4 GHz WiFi name' required",
    );
    push_input(
        &mut out,
        "WiFi Password:",
        "password",
        "pass",
        &settings.password,
        MAX_PASSWORD_BYTES,
        " placeholder='Leave blank if open network'",
    );
    push_input(
        &mut out,
        "Text File URL:",
        "url",
        "url",
        &settings.source_url,
        MAX_URL_BYTES,
        " placeholder='https://example.com/notes.txt' required",
    );

    out.push_str("<label>Text Color:</label><select name='color'>");
    let selected_color = settings.text_color.index();
    for color in PaletteColor::ALL {
        let color = TextColor::Fixed(color);
        push_option(&mut out, color.index(), color.index() == selected_color, color.label());
    }
    push_option(
        &mut out,
        TextColor::RAINBOW_INDEX,
        selected_color == TextColor::RAINBOW_INDEX,
        TextColor::Rainbow.label(),
    );
    out.push_str("</select>");

    out.push_str("<label>Text Size:</label><select name='size'>");
    for size in TextSize::ALL {
        push_option(&mut out, size.level(), size == settings.text_size, size.label());
    }
    out.push_str("</select>");

    out.push_str("<br><button class='btn save' type='submit'>Save &amp; Connect</button></form>");

    if current.is_some() {
        out.push_str(
            "<hr><form method='post' action='/nochange'>\
             <button class='btn keep' type='submit'>No Changes - Use Current Settings</button>\
             </form>",
        );
    }

    out.push_str(
        "<p class='note'>Only 2.4 GHz WiFi networks are supported.</p>\
         <p class='note'>The URL must point at a plain-text file (http:// or https://).</p>",
    );
    close_page(&mut out);
    out
}

pub(super) fn saved_page(settings: &PagerSettings) -> String {
    let mut out = String::with_capacity(1024);
    open_page(&mut out, "Settings Saved");
    out.push_str("<h2>Settings Saved!</h2><p>Connecting to <b>");
    push_escaped(&mut out, &settings.ssid);
    out.push_str("</b>...</p><p><small>");
    push_escaped(&mut out, &settings.source_url);
    let _ = write!(
        out,
        "</small></p><p>You can close this page and disconnect from <b>{PORTAL_SSID}</b>.</p>"
    );
    close_page(&mut out);
    out
}

pub(super) fn nochange_page() -> String {
    let mut out = String::with_capacity(768);
    open_page(&mut out, "No Changes");
    let _ = write!(
        out,
        "<h2>No Changes</h2><p>Using your saved settings. Device is connecting now.</p>\
         <p>You can close this page and disconnect from <b>{PORTAL_SSID}</b>.</p>"
    );
    close_page(&mut out);
    out
}

pub(super) fn empty_ssid_page() -> String {
    let mut out = String::with_capacity(768);
    open_page(&mut out, "RawPager Setup");
    out.push_str("<h2 class='err'>SSID cannot be empty!</h2><a href='/'>Go Back</a>");
    close_page(&mut out);
    out
}

pub(super) fn error_page() -> String {
    let mut out = String::with_capacity(768);
    open_page(&mut out, "RawPager Setup");
    out.push_str("<h2 class='err'>Request could not be read.</h2><a href='/'>Go Back</a>");
    close_page(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        let mut out = String::new();
        push_escaped(&mut out, "<a href=\"x\">'&'</a>");
        assert_eq!(out, "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn form_preselects_current_choices() {
        let settings = PagerSettings::new("net", "", "")
            .with_text_color(TextColor::Rainbow)
            .with_text_size(TextSize::Medium);
        let page = form_page(Some(&settings));
        assert!(page.contains("<option value='6' selected>Rainbow (multi-color)</option>"));
        assert!(page.contains("<option value='2' selected>Medium</option>"));
        assert!(page.contains("<option value='0'>White</option>"));
    }

    #[test]
    fn fresh_form_has_no_keep_button() {
        let page = form_page(None);
        assert!(!page.contains("/nochange"));
        assert!(page.contains("<option value='1' selected>Small (default)</option>"));
    }

    #[test]
    fn saved_page_escapes_ssid() {
        let page = saved_page(&PagerSettings::new("<b>", "", ""));
        assert!(page.contains("&lt;b&gt;"));
        assert!(!page.contains("<b><b>"));
    }
}
