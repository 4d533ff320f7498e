impl<IN> PagerApp<IN>
where
    IN: InputProvider,
{
    pub fn with_screen<F>(&self, f: F)
    where
        F: FnOnce(Screen<'_>),
    {
        let page = (!self.document.is_empty()).then(|| PageView {
            doc: self.document.as_str(),
            layout: self.navigator.page(),
            geometry: self.navigator.format().geometry,
        });

        f(Screen::Reader {
            status: self.status_text.as_str(),
            page,
            hint: self.nav_hint(),
            clock: self.clock_text.as_deref(),
            dirty: self.frame,
        });
    }

    pub fn status_text(&self) -> &str {
        self.status_text.as_str()
    }

    pub fn nav_hint(&self) -> Option<NavHint> {
        if self.document.is_empty() {
            None
        } else if self.navigator.is_last_page() {
            Some(NavHint::LastPage)
        } else {
            Some(NavHint::More)
        }
    }

    fn refresh_status_text(&mut self) {
        let mut wifi_failed: BoundedString<STATUS_TEXT_BYTES> = BoundedString::new();
        let text = match self.status {
            Status::BootWindow => "Hold BOOT to change settings...",
            Status::Connecting => "Connecting to WiFi...",
            Status::WifiFailed => {
                let _ = write!(wifi_failed, "WiFi failed: \"{}\" - retrying", self.settings.ssid);
                wifi_failed.as_str()
            }
            Status::Connected => "WiFi connected",
            Status::Fetching => "Fetching...",
            Status::Showing => self.settings.source_url.as_str(),
            Status::FetchFailed => "Fetch failed - retrying in 60s",
            Status::NoUrl => "No URL set - hold BOOT to configure",
            Status::EmptyDocument => "Fetched document is empty",
        };

        self.status_text = ellipsize(text, STATUS_MAX_CHARS);
        self.pending.status = true;
    }
}
