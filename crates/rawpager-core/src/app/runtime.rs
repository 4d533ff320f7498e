impl<IN> PagerApp<IN>
where
    IN: InputProvider,
{
    pub fn new(input: IN, settings: PagerSettings, config: PagerConfig) -> Self {
        let format = page_format(&config, &settings);
        let mut app = Self {
            input,
            config,
            settings,
            document: TextStore::new(),
            navigator: PageNavigator::new(format),
            scheduler: RefreshScheduler::new(config.refresh),
            clock: WallClock::new(),
            status: Status::Connecting,
            status_text: BoundedString::new(),
            clock_text: None,
            next_clock_ms: 0,
            pending: DirtyRegions::ALL,
            frame: DirtyRegions::NONE,
            input_faults: 0,
        };
        app.refresh_status_text();
        app
    }

    /// Direct access to the input source, for board checks outside `tick`.
    pub fn input_mut(&mut self) -> &mut IN {
        &mut self.input
    }

    pub fn settings(&self) -> &PagerSettings {
        &self.settings
    }

    /// Swaps in new settings, re-laying out the document from its first page.
    pub fn apply_settings(&mut self, settings: PagerSettings) {
        let url_changed = settings.source_url != self.settings.source_url;
        self.settings = settings;
        let format = page_format(&self.config, &self.settings);
        self.navigator.set_format(format, self.document.as_str());
        if url_changed {
            self.force_refetch();
        }
        self.refresh_status_text();
        self.pending = DirtyRegions::ALL;
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.refresh_status_text();
        info!("status: {}", self.status_text.as_str());
    }

    /// Polls input once and reports whether a frame is due.
    pub fn tick(&mut self, now_ms: u64) -> TickResult {
        self.process_input(now_ms);
        self.update_clock(now_ms);
        self.take_render()
    }

    /// Moves pending screen changes into the frame handed to `with_screen`.
    pub fn take_render(&mut self) -> TickResult {
        if !self.pending.any() {
            self.frame = DirtyRegions::NONE;
            return TickResult::NoRender;
        }
        self.frame = self.pending;
        self.pending = DirtyRegions::NONE;
        TickResult::RenderRequested
    }

    /// Returns the fetch to perform when one is due.
    ///
    /// Without a configured URL the fetch is skipped and retried on the
    /// failure cadence, since the settings may change in the meantime.
    pub fn take_refresh_request(&mut self, now_ms: u64) -> Option<RefreshRequest> {
        if !self.scheduler.is_due(now_ms) {
            return None;
        }

        let url = match self.settings.source() {
            Ok(url) => BoundedString::try_from(url).ok()?,
            Err(ConfigurationMissing) => {
                self.scheduler.on_failure(now_ms);
                warn!(
                    "refresh skipped: no source url, retry_at_ms={:?}",
                    self.scheduler.next_due_ms()
                );
                self.set_status(Status::NoUrl);
                return None;
            }
        };

        self.scheduler.begin();
        self.set_status(Status::Fetching);
        Some(RefreshRequest { url })
    }

    /// Applies a fetch result. Input observed while the fetch was pending
    /// is discarded.
    pub fn complete_refresh(&mut self, result: Result<String, FetchError>, now_ms: u64) {
        self.input.discard_pending();
        match result {
            Ok(body) if !body.is_empty() => {
                self.document.replace(body);
                self.navigator.reset(self.document.as_str());
                self.scheduler.on_success(now_ms);
                info!(
                    "document loaded bytes={} first_page_rows={} next_due_ms={:?}",
                    self.document.len(),
                    self.navigator.page().rows_used(),
                    self.scheduler.next_due_ms()
                );
                self.set_status(Status::Showing);
                self.mark_page_dirty();
            }
            Ok(_) => {
                self.scheduler.on_failure(now_ms);
                warn!("fetched document is empty");
                self.set_status(Status::EmptyDocument);
            }
            Err(FetchError) => {
                self.scheduler.on_failure(now_ms);
                warn!(
                    "fetch failed, keeping current page offset={} retry_at_ms={:?}",
                    self.navigator.current_offset(),
                    self.scheduler.next_due_ms()
                );
                self.set_status(Status::FetchFailed);
            }
        }
        self.pending.status = true;
    }

    /// Drops the document and makes a fetch due at the next check.
    pub fn force_refetch(&mut self) {
        self.document.clear();
        self.navigator.clear();
        self.scheduler.force();
        self.mark_page_dirty();
    }

    /// Anchors the wall clock used by the footer.
    pub fn sync_clock(&mut self, unix_secs: u64, now_ms: u64) {
        self.clock.sync(unix_secs, now_ms);
        self.next_clock_ms = now_ms;
        self.update_clock(now_ms);
    }

    pub fn current_offset(&self) -> usize {
        self.navigator.current_offset()
    }

    pub fn history_len(&self) -> usize {
        self.navigator.history_len()
    }

    pub fn document(&self) -> &str {
        self.document.as_str()
    }

    pub fn next_refresh_ms(&self) -> Option<u64> {
        self.scheduler.next_due_ms()
    }

    pub fn input_faults(&self) -> u32 {
        self.input_faults
    }

    fn update_clock(&mut self, now_ms: u64) {
        if now_ms < self.next_clock_ms {
            return;
        }
        let Some(unix_secs) = self.clock.unix_secs(now_ms) else {
            return;
        };

        self.next_clock_ms = now_ms.saturating_add(self.config.clock_interval_ms);
        let label = utc_clock_label(unix_secs);
        if self.clock_text.as_ref() != Some(&label) {
            debug!("clock label={}", label.as_str());
            self.clock_text = Some(label);
            self.pending.footer = true;
        }
    }

    fn mark_page_dirty(&mut self) {
        self.pending.page = true;
        self.pending.footer = true;
    }
}

fn page_format(config: &PagerConfig, settings: &PagerSettings) -> PageFormat {
    PageFormat {
        geometry: PageGeometry::for_surface(
            config.surface_width,
            config.surface_height,
            settings.text_size,
        ),
        color: settings.text_color,
    }
}
