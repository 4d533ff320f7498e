impl<IN> PagerApp<IN>
where
    IN: InputProvider,
{
    fn process_input(&mut self, now_ms: u64) {
        match self.input.poll_event(now_ms) {
            Ok(Some(event)) => self.apply_input_event(event),
            Ok(None) => {}
            Err(_) => {
                self.input_faults = self.input_faults.saturating_add(1);
                // Logged on the 1st, 2nd, 4th, 8th... failure.
                if self.input_faults.is_power_of_two() {
                    warn!("input provider error count={}", self.input_faults);
                }
            }
        }
    }

    fn apply_input_event(&mut self, event: InputEvent) {
        let doc = self.document.as_str();
        let changed = match event {
            InputEvent::NextPage => self.navigator.go_next(doc),
            InputEvent::PrevPage => self.navigator.go_prev(doc),
            InputEvent::ForceRefetch => {
                info!("forced refetch requested");
                self.force_refetch();
                return;
            }
        };

        if changed {
            debug!(
                "page offset={} history={} last={}",
                self.navigator.current_offset(),
                self.navigator.history_len(),
                self.navigator.is_last_page()
            );
            self.mark_page_dirty();
        }
    }
}
