//! Page navigation over the current document.

use heapless::Deque;

use crate::{
    layout::{PageGeometry, PageLayout, layout_page},
    render::TextColor,
};

pub const HISTORY_CAPACITY: usize = 64;

/// Bounded stack of previously shown page offsets.
///
/// Pushing onto a full history evicts the oldest entry, so the most recent
/// `HISTORY_CAPACITY` moves can always be undone.
#[derive(Clone, Debug, Default)]
pub struct PageHistory {
    offsets: Deque<usize, HISTORY_CAPACITY>,
}

impl PageHistory {
    pub const fn new() -> Self {
        Self {
            offsets: Deque::new(),
        }
    }

    /// Returns the evicted offset when the history was full.
    pub fn push(&mut self, offset: usize) -> Option<usize> {
        let evicted = if self.offsets.is_full() {
            self.offsets.pop_front()
        } else {
            None
        };
        let _ = self.offsets.push_back(offset);
        evicted
    }

    pub fn pop(&mut self) -> Option<usize> {
        self.offsets.pop_back()
    }

    pub fn clear(&mut self) {
        self.offsets.clear();
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Geometry and color a page is laid out with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageFormat {
    pub geometry: PageGeometry,
    pub color: TextColor,
}

pub struct PageNavigator {
    format: PageFormat,
    current: usize,
    page: PageLayout,
    history: PageHistory,
}

impl PageNavigator {
    pub fn new(format: PageFormat) -> Self {
        Self {
            format,
            current: 0,
            page: PageLayout::empty(0),
            history: PageHistory::new(),
        }
    }

    pub fn format(&self) -> PageFormat {
        self.format
    }

    pub fn current_offset(&self) -> usize {
        self.current
    }

    pub fn next_offset(&self) -> Option<usize> {
        self.page.next_offset()
    }

    pub fn page(&self) -> &PageLayout {
        &self.page
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn is_last_page(&self) -> bool {
        self.page.is_last()
    }

    /// Shows the first page of a freshly loaded document.
    pub fn reset(&mut self, doc: &str) -> bool {
        self.history.clear();
        self.show(doc, 0);
        true
    }

    /// Advances one page, wrapping to the start after the last one.
    pub fn go_next(&mut self, doc: &str) -> bool {
        if doc.is_empty() {
            return false;
        }

        match self.page.next_offset() {
            Some(next) => {
                if let Some(evicted) = self.history.push(self.current) {
                    log::debug!("page history full, dropped offset={}", evicted);
                }
                self.show(doc, next);
            }
            None => {
                self.history.clear();
                self.show(doc, 0);
            }
        }
        true
    }

    pub fn go_prev(&mut self, doc: &str) -> bool {
        let Some(previous) = self.history.pop() else {
            return false;
        };
        self.show(doc, previous);
        true
    }

    /// Forgets the document; the next page shown starts from scratch.
    pub fn clear(&mut self) {
        self.history.clear();
        self.current = 0;
        self.page = PageLayout::empty(0);
    }

    /// Re-lays out the current page, e.g. after a text size change.
    pub fn set_format(&mut self, format: PageFormat, doc: &str) {
        if self.format == format {
            return;
        }
        self.format = format;
        self.reset(doc);
    }

    fn show(&mut self, doc: &str, offset: usize) {
        self.current = offset;
        self.page = layout_page(doc, offset, &self.format.geometry, self.format.color);
    }
}

#[cfg(test)]
mod tests {
    use alloc::{string::String, vec::Vec};

    use super::*;
    use crate::render::TextSize;

    fn format(columns: usize, rows: usize) -> PageFormat {
        PageFormat {
            geometry: PageGeometry::for_surface(320, 240, TextSize::Small)
                .with_columns(columns)
                .with_max_rows(rows),
            color: TextColor::default(),
        }
    }

    fn numbered_lines(count: usize) -> String {
        let mut doc = String::new();
        for index in 0..count {
            doc.push_str(&alloc::format!("line {index}\n"));
        }
        doc
    }

    #[test]
    fn next_then_prev_returns_to_previous_offset() {
        let doc = numbered_lines(10);
        let mut nav = PageNavigator::new(format(20, 3));
        nav.reset(&doc);

        let mut visited = Vec::new();
        while !nav.is_last_page() {
            visited.push(nav.current_offset());
            assert!(nav.go_next(&doc));
        }
        assert_eq!(nav.history_len(), visited.len());

        while let Some(expected) = visited.pop() {
            assert!(nav.go_prev(&doc));
            assert_eq!(nav.current_offset(), expected);
        }
        assert_eq!(nav.current_offset(), 0);
    }

    #[test]
    fn next_on_last_page_wraps_and_clears_history() {
        let doc = "a\nb\nc";
        let mut nav = PageNavigator::new(format(10, 2));
        nav.reset(doc);

        assert!(nav.go_next(doc));
        assert!(nav.is_last_page());
        assert_eq!(nav.history_len(), 1);

        assert!(nav.go_next(doc));
        assert_eq!(nav.current_offset(), 0);
        assert_eq!(nav.history_len(), 0);
    }

    #[test]
    fn prev_with_empty_history_is_noop() {
        let doc = "only page";
        let mut nav = PageNavigator::new(format(20, 5));
        nav.reset(doc);

        assert!(!nav.go_prev(doc));
        assert_eq!(nav.current_offset(), 0);
    }

    #[test]
    fn next_on_empty_document_is_noop() {
        let mut nav = PageNavigator::new(format(20, 5));
        nav.reset("");
        assert!(!nav.go_next(""));
        assert_eq!(nav.history_len(), 0);
    }

    #[test]
    fn history_evicts_oldest_after_capacity() {
        let doc = numbered_lines(HISTORY_CAPACITY + 10);
        let mut nav = PageNavigator::new(format(20, 1));
        nav.reset(&doc);

        let mut offsets = Vec::new();
        for _ in 0..=HISTORY_CAPACITY {
            offsets.push(nav.current_offset());
            assert!(nav.go_next(&doc));
        }
        assert_eq!(nav.history_len(), HISTORY_CAPACITY);

        for expected in offsets.iter().rev().take(HISTORY_CAPACITY) {
            assert!(nav.go_prev(&doc));
            assert_eq!(nav.current_offset(), *expected);
        }
        // The very first offset was evicted by the 65th move.
        assert!(!nav.go_prev(&doc));
        assert_eq!(nav.current_offset(), offsets[1]);
    }

    #[test]
    fn clear_drops_page_state() {
        let doc = numbered_lines(8);
        let mut nav = PageNavigator::new(format(20, 2));
        nav.reset(&doc);
        nav.go_next(&doc);

        nav.clear();
        assert_eq!(nav.current_offset(), 0);
        assert_eq!(nav.history_len(), 0);
        assert!(nav.page().lines().is_empty());
    }

    #[test]
    fn format_change_restarts_at_first_page() {
        let doc = numbered_lines(8);
        let mut nav = PageNavigator::new(format(20, 2));
        nav.reset(&doc);
        nav.go_next(&doc);

        nav.set_format(format(20, 4), &doc);
        assert_eq!(nav.current_offset(), 0);
        assert_eq!(nav.page().lines().len(), 4);
    }

    #[test]
    fn history_push_reports_eviction() {
        let mut history = PageHistory::new();
        for offset in 0..HISTORY_CAPACITY {
            assert_eq!(history.push(offset), None);
        }
        assert_eq!(history.push(999), Some(0));
        assert_eq!(history.pop(), Some(999));
        assert_eq!(history.len(), HISTORY_CAPACITY - 1);
    }
}
