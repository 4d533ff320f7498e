use alloc::{format, string::String, vec::Vec};

use super::*;
use crate::{
    input::{ButtonTiming, InputEvent, InputProvider, MockInput, PressClassifier},
    render::{NavHint, Screen, TextColor, TextSize},
};

const URL: &str = "https://example.com/notes.txt";

/// Delivers one scripted slot per poll; `None` is an idle poll.
struct ScriptedInput<'a> {
    slots: &'a [Option<InputEvent>],
    cursor: usize,
}

impl<'a> ScriptedInput<'a> {
    const fn new(slots: &'a [Option<InputEvent>]) -> Self {
        Self { slots, cursor: 0 }
    }
}

impl InputProvider for ScriptedInput<'_> {
    type Error = ();

    fn poll_event(&mut self, _now_ms: u64) -> Result<Option<InputEvent>, Self::Error> {
        let slot = self.slots.get(self.cursor).copied().flatten();
        self.cursor = self.cursor.saturating_add(1);
        Ok(slot)
    }
}

/// BOOT button fed one scripted level per poll; released once the script ends.
struct ButtonLevels<'a> {
    levels: &'a [bool],
    cursor: usize,
    presses: PressClassifier,
}

impl<'a> ButtonLevels<'a> {
    fn new(levels: &'a [bool]) -> Self {
        Self {
            levels,
            cursor: 0,
            presses: PressClassifier::new(ButtonTiming::default()),
        }
    }
}

impl InputProvider for ButtonLevels<'_> {
    type Error = ();

    fn poll_event(&mut self, now_ms: u64) -> Result<Option<InputEvent>, Self::Error> {
        let pressed = self.levels.get(self.cursor).copied().unwrap_or(false);
        self.cursor = self.cursor.saturating_add(1);
        Ok(self.presses.update(pressed, now_ms))
    }

    fn discard_pending(&mut self) {
        self.presses.cancel();
    }
}

struct FailingInput;

impl InputProvider for FailingInput {
    type Error = ();

    fn poll_event(&mut self, _now_ms: u64) -> Result<Option<InputEvent>, Self::Error> {
        Err(())
    }
}

fn settings() -> PagerSettings {
    PagerSettings::new("home", "secret", URL)
}

/// 100 short lines: five pages of twenty rows at the small size.
fn long_document() -> String {
    let mut doc = String::new();
    for index in 0..100 {
        doc.push_str(&format!("line {index}\n"));
    }
    doc
}

fn loaded_app(slots: &[Option<InputEvent>]) -> PagerApp<ScriptedInput<'_>> {
    let mut app = PagerApp::new(ScriptedInput::new(slots), settings(), PagerConfig::default());
    let request = app.take_refresh_request(0).expect("first refresh is due");
    assert_eq!(request.url.as_str(), URL);
    app.complete_refresh(Ok(long_document()), 0);
    app
}

fn rendered_rows(app: &PagerApp<ScriptedInput<'_>>) -> Vec<String> {
    let mut rows = Vec::new();
    app.with_screen(|screen| {
        if let Screen::Reader { page: Some(page), .. } = screen {
            rows.extend(page.runs().map(|run| String::from(run.text)));
        }
    });
    rows
}

#[test]
fn first_tick_requests_full_frame() {
    let mut app = PagerApp::new(MockInput::new(), settings(), PagerConfig::default());
    assert_eq!(app.tick(0), TickResult::RenderRequested);

    let mut dirty = None;
    app.with_screen(|screen| {
        if let Screen::Reader { dirty: regions, page, hint, .. } = screen {
            assert!(page.is_none());
            assert!(hint.is_none());
            dirty = Some(regions);
        }
    });
    assert_eq!(dirty, Some(DirtyRegions::ALL));
    assert_eq!(app.tick(10), TickResult::NoRender);
}

#[test]
fn refresh_shows_fetching_then_url() {
    let mut app = PagerApp::new(MockInput::new(), settings(), PagerConfig::default());
    let _ = app.take_refresh_request(0).unwrap();
    assert_eq!(app.status_text(), "Fetching...");
    assert_eq!(app.take_render(), TickResult::RenderRequested);

    // Nothing new is due while the fetch is outstanding.
    assert!(app.take_refresh_request(1).is_none());

    app.complete_refresh(Ok(String::from("hello")), 2_000);
    assert_eq!(app.status(), Status::Showing);
    assert_eq!(app.status_text(), URL);
    assert_eq!(app.next_refresh_ms(), Some(2_000 + 15 * 60 * 1_000));
    assert_eq!(app.nav_hint(), Some(NavHint::LastPage));
}

#[test]
fn missing_url_reports_status_and_retries() {
    let mut app = PagerApp::new(
        MockInput::new(),
        PagerSettings::new("home", "", ""),
        PagerConfig::default(),
    );
    assert!(app.take_refresh_request(0).is_none());
    assert_eq!(app.status_text(), "No URL set - hold BOOT to configure");
    assert_eq!(app.next_refresh_ms(), Some(60_000));

    assert!(app.take_refresh_request(59_999).is_none());
    assert!(app.take_refresh_request(60_000).is_none());
    assert_eq!(app.next_refresh_ms(), Some(120_000));
}

#[test]
fn navigation_moves_through_pages_and_wraps() {
    let slots = [
        Some(InputEvent::NextPage),
        Some(InputEvent::NextPage),
        Some(InputEvent::PrevPage),
    ];
    let mut app = loaded_app(&slots);
    assert_eq!(rendered_rows(&app)[0], "line 0");

    let _ = app.tick(100);
    assert_eq!(rendered_rows(&app)[0], "line 20");
    let _ = app.tick(200);
    assert_eq!(rendered_rows(&app)[0], "line 40");
    assert_eq!(app.history_len(), 2);
    let _ = app.tick(300);
    assert_eq!(rendered_rows(&app)[0], "line 20");
    assert_eq!(app.history_len(), 1);
}

#[test]
fn next_on_last_page_restarts() {
    let slots = [Some(InputEvent::NextPage); 5];
    let mut app = loaded_app(&slots);

    for step in 0..4 {
        let _ = app.tick(step * 100);
    }
    assert_eq!(app.nav_hint(), Some(NavHint::LastPage));
    assert_eq!(rendered_rows(&app).last().map(String::as_str), Some("line 99"));

    let _ = app.tick(1_000);
    assert_eq!(app.current_offset(), 0);
    assert_eq!(app.history_len(), 0);
    assert_eq!(app.nav_hint(), Some(NavHint::More));
}

#[test]
fn navigation_keeps_status_line() {
    let slots = [Some(InputEvent::NextPage)];
    let mut app = loaded_app(&slots);
    let _ = app.take_render();

    assert_eq!(app.tick(100), TickResult::RenderRequested);
    assert_eq!(app.status_text(), URL);

    let mut dirty = None;
    app.with_screen(|screen| {
        if let Screen::Reader { dirty: regions, .. } = screen {
            dirty = Some(regions);
        }
    });
    let dirty = dirty.unwrap();
    assert!(dirty.page && dirty.footer && !dirty.status);
}

#[test]
fn fetch_failure_leaves_page_untouched() {
    let slots = [
        Some(InputEvent::NextPage),
        None,
        Some(InputEvent::NextPage),
        Some(InputEvent::PrevPage),
    ];

    // Same navigation twice, one run with a failed refresh in between.
    let mut clean = loaded_app(&slots);
    let mut failed = loaded_app(&slots);
    let _ = clean.tick(100);
    let _ = failed.tick(100);

    let due = 15 * 60 * 1_000;
    assert!(failed.take_refresh_request(due).is_some());
    failed.complete_refresh(Err(FetchError), due);
    assert_eq!(failed.status_text(), "Fetch failed - retrying in 60s");
    assert_eq!(failed.next_refresh_ms(), Some(due + 60_000));
    assert_eq!(failed.current_offset(), clean.current_offset());

    for now in [due + 100, due + 200, due + 300] {
        let _ = clean.tick(now);
        let _ = failed.tick(now);
        assert_eq!(failed.current_offset(), clean.current_offset());
        assert_eq!(failed.history_len(), clean.history_len());
        assert_eq!(rendered_rows(&failed), rendered_rows(&clean));
    }
    assert_ne!(failed.status_text(), clean.status_text());
}

#[test]
fn successful_refresh_resets_position() {
    let slots = [Some(InputEvent::NextPage), Some(InputEvent::NextPage)];
    let mut app = loaded_app(&slots);
    let _ = app.tick(100);
    let _ = app.tick(200);
    assert_ne!(app.current_offset(), 0);

    let due = 15 * 60 * 1_000 + 200;
    assert!(app.take_refresh_request(due).is_some());
    app.complete_refresh(Ok(String::from("fresh text")), due);
    assert_eq!(app.current_offset(), 0);
    assert_eq!(app.history_len(), 0);
    assert_eq!(rendered_rows(&app), ["fresh text"]);
}

#[test]
fn long_press_clears_document_and_refetches() {
    let slots = [Some(InputEvent::NextPage), Some(InputEvent::ForceRefetch)];
    let mut app = loaded_app(&slots);
    let _ = app.tick(100);
    let _ = app.tick(200);

    assert!(app.document().is_empty());
    assert_eq!(app.current_offset(), 0);
    assert_eq!(app.history_len(), 0);
    assert!(rendered_rows(&app).is_empty());
    assert!(app.take_refresh_request(201).is_some());
}

#[test]
fn press_spanning_a_fetch_is_dropped() {
    let mut app = PagerApp::new(ButtonLevels::new(&[true]), settings(), PagerConfig::default());
    let _ = app.tick(0);
    assert!(app.take_refresh_request(0).is_some());
    app.complete_refresh(Ok(long_document()), 3_000);

    // BOOT comes up 50 ms after the fetch; the hold began before it.
    let _ = app.tick(3_050);
    assert!(!app.document().is_empty());
    assert_eq!(app.status(), Status::Showing);
    assert_eq!(app.current_offset(), 0);
    assert!(app.take_refresh_request(3_051).is_none());

    // The next tap is classified normally.
    let mut app = PagerApp::new(
        ButtonLevels::new(&[true, false, true, false]),
        settings(),
        PagerConfig::default(),
    );
    let _ = app.tick(0);
    assert!(app.take_refresh_request(0).is_some());
    app.complete_refresh(Ok(long_document()), 3_000);
    let _ = app.tick(3_050);
    let _ = app.tick(3_100);
    let _ = app.tick(3_200);
    assert!(app.current_offset() > 0);
}

#[test]
fn empty_body_counts_as_failure() {
    let mut app = loaded_app(&[]);
    let due = 15 * 60 * 1_000;
    assert!(app.take_refresh_request(due).is_some());
    app.complete_refresh(Ok(String::new()), due);

    assert_eq!(app.status(), Status::EmptyDocument);
    assert_eq!(app.next_refresh_ms(), Some(due + 60_000));
    assert_eq!(rendered_rows(&app)[0], "line 0");
}

#[test]
fn navigation_on_empty_document_is_noop() {
    let slots = [Some(InputEvent::NextPage), Some(InputEvent::PrevPage)];
    let mut app = PagerApp::new(ScriptedInput::new(&slots), settings(), PagerConfig::default());
    let _ = app.take_render();

    assert_eq!(app.tick(100), TickResult::NoRender);
    assert_eq!(app.tick(200), TickResult::NoRender);
    assert_eq!(app.current_offset(), 0);
}

#[test]
fn clock_label_appears_after_sync_and_ticks_every_minute() {
    let mut app = loaded_app(&[]);
    let _ = app.take_render();

    let mut clock = None;
    app.with_screen(|screen| {
        if let Screen::Reader { clock: label, .. } = screen {
            clock = label.map(String::from);
        }
    });
    assert_eq!(clock, None);

    // 12:34:30 UTC
    app.sync_clock(45_270, 1_000);
    assert_eq!(app.tick(1_000), TickResult::RenderRequested);
    app.with_screen(|screen| {
        if let Screen::Reader { clock: label, dirty, .. } = screen {
            assert_eq!(label, Some("12:34 UTC"));
            assert!(dirty.footer && !dirty.page);
        }
    });

    assert_eq!(app.tick(30_000), TickResult::NoRender);
    assert_eq!(app.tick(61_000), TickResult::RenderRequested);
    app.with_screen(|screen| {
        if let Screen::Reader { clock: label, .. } = screen {
            assert_eq!(label, Some("12:35 UTC"));
        }
    });
}

#[test]
fn settings_change_relayouts_with_new_size() {
    let mut app = loaded_app(&[]);
    let small_rows = rendered_rows(&app).len();

    app.apply_settings(
        settings()
            .with_text_size(TextSize::Large)
            .with_text_color(TextColor::Rainbow),
    );
    assert_eq!(small_rows, 20);
    assert_eq!(rendered_rows(&app).len(), 7);
    assert!(!app.document().is_empty());
}

#[test]
fn new_source_url_forces_refetch() {
    let mut app = loaded_app(&[]);
    app.apply_settings(PagerSettings::new("home", "secret", "https://example.org/other.txt"));
    assert!(app.document().is_empty());
    let request = app.take_refresh_request(1).unwrap();
    assert_eq!(request.url.as_str(), "https://example.org/other.txt");
}

#[test]
fn long_status_is_ellipsized() {
    let url = format!("https://example.com/{}", "x".repeat(120));
    let mut app = PagerApp::new(
        MockInput::new(),
        PagerSettings::new("home", "", &url),
        PagerConfig::default(),
    );
    let _ = app.take_refresh_request(0);
    app.complete_refresh(Ok(String::from("body")), 0);

    assert_eq!(app.status_text().chars().count(), 52);
    assert!(app.status_text().ends_with("..."));
}

#[test]
fn wifi_failure_names_the_network() {
    let mut app = PagerApp::new(MockInput::new(), settings(), PagerConfig::default());
    app.set_status(Status::WifiFailed);
    assert_eq!(app.status_text(), "WiFi failed: \"home\" - retrying");
}

#[test]
fn input_errors_are_counted_not_fatal() {
    let mut app = PagerApp::new(FailingInput, settings(), PagerConfig::default());
    let _ = app.tick(0);
    let _ = app.tick(1);
    assert_eq!(app.input_faults(), 2);
    assert_eq!(app.status(), Status::Connecting);
}
