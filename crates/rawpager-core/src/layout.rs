//! Page layout engine.
//!
//! Slices a document into column-bounded segments, one per screen row,
//! starting at a byte offset, and reports where the following page
//! begins. Offsets are byte offsets on char boundaries; column widths are
//! counted in chars.

use heapless::Vec;

use crate::render::{TextColor, TextSize};

/// Upper bound on rows per page, independent of pixel geometry.
pub const MAX_PAGE_ROWS: usize = 32;

pub const STATUS_BAR_HEIGHT: u16 = 20;
pub const CONTENT_TOP: u16 = 24;
pub const LEFT_MARGIN: u16 = 4;
pub const RIGHT_MARGIN: u16 = 4;
/// Space kept free below the content area for the hint line.
pub const BOTTOM_RESERVE: u16 = 14;

/// Base glyph cell of the 5x7 font, before scaling.
pub const GLYPH_CELL_WIDTH: u16 = 6;
pub const GLYPH_CELL_HEIGHT: u16 = 8;
const ROW_GAP: u16 = 2;

/// Character grid of the content area.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageGeometry {
    pub columns: usize,
    pub max_rows: usize,
    pub row_height: u16,
    pub char_width: u16,
    pub scale: u8,
    pub left: u16,
    pub top: u16,
    /// A row fits while `row_y + row_height <= max_y`.
    pub max_y: u16,
}

impl PageGeometry {
    pub fn for_surface(width: u16, height: u16, size: TextSize) -> Self {
        let scale = size.scale();
        let char_width = GLYPH_CELL_WIDTH * scale as u16;
        let row_height = GLYPH_CELL_HEIGHT * scale as u16 + ROW_GAP;
        let usable_width = width.saturating_sub(LEFT_MARGIN + RIGHT_MARGIN);

        Self {
            columns: usize::from(usable_width / char_width).max(1),
            max_rows: MAX_PAGE_ROWS,
            row_height,
            char_width,
            scale,
            left: LEFT_MARGIN,
            top: CONTENT_TOP,
            max_y: height.saturating_sub(BOTTOM_RESERVE),
        }
    }

    pub const fn with_columns(mut self, columns: usize) -> Self {
        self.columns = if columns == 0 { 1 } else { columns };
        self
    }

    pub const fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = if max_rows > MAX_PAGE_ROWS {
            MAX_PAGE_ROWS
        } else {
            max_rows
        };
        self
    }

    pub fn row_y(&self, row: usize) -> u16 {
        let y = u32::from(self.top) + row as u32 * u32::from(self.row_height);
        y.min(u32::from(u16::MAX)) as u16
    }

    pub fn row_fits(&self, row: usize) -> bool {
        if row >= self.max_rows.min(MAX_PAGE_ROWS) {
            return false;
        }
        let bottom = u32::from(self.top) + (row as u32 + 1) * u32::from(self.row_height);
        bottom <= u32::from(self.max_y)
    }

    /// Number of rows a page can hold.
    pub fn rows(&self) -> usize {
        (0..MAX_PAGE_ROWS)
            .take_while(|row| self.row_fits(*row))
            .count()
    }
}

/// One rendered segment: `doc[start..end]` on screen row `row`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PageLine {
    pub start: usize,
    pub end: usize,
    pub row: u8,
    /// RGB565.
    pub color: u16,
}

/// Result of laying out one page.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PageLayout {
    start: usize,
    lines: Vec<PageLine, MAX_PAGE_ROWS>,
    rows_used: usize,
    next_offset: Option<usize>,
}

impl PageLayout {
    pub fn empty(start: usize) -> Self {
        Self {
            start,
            ..Self::default()
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn lines(&self) -> &[PageLine] {
        &self.lines
    }

    /// Rows consumed, including blank lines that emit no segment.
    pub fn rows_used(&self) -> usize {
        self.rows_used
    }

    /// Offset of the following page; `None` when this page reaches the end.
    pub fn next_offset(&self) -> Option<usize> {
        self.next_offset
    }

    pub fn is_last(&self) -> bool {
        self.next_offset.is_none()
    }

    pub fn segments<'a>(&'a self, doc: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.lines.iter().map(move |line| &doc[line.start..line.end])
    }
}

/// Lays out the page of `doc` beginning at byte offset `start`.
///
/// A page break resumes at the start of the overflowing logical line, or
/// mid-line at its first unrendered segment when part of it already made
/// it onto this page, so no text is repeated or skipped across pages.
pub fn layout_page(
    doc: &str,
    start: usize,
    geometry: &PageGeometry,
    color: TextColor,
) -> PageLayout {
    let mut page = PageLayout::empty(start);
    if start >= doc.len() || !doc.is_char_boundary(start) {
        return page;
    }

    let columns = geometry.columns.max(1);
    let mut row = 0usize;
    let mut line_start = start;

    while line_start < doc.len() {
        let line_end = doc[line_start..]
            .find('\n')
            .map_or(doc.len(), |idx| line_start + idx);
        let content_end = if doc[line_start..line_end].ends_with('\r') {
            line_end - 1
        } else {
            line_end
        };

        if line_start == content_end {
            if !geometry.row_fits(row) {
                page.next_offset = (row > 0).then_some(line_start);
                page.rows_used = row;
                return page;
            }
            row += 1;
        }

        let mut cursor = line_start;
        while cursor < content_end {
            if !geometry.row_fits(row) {
                page.next_offset = (row > 0).then_some(cursor);
                page.rows_used = row;
                return page;
            }

            let (cut, resume) = wrap_point(&doc[cursor..content_end], columns);
            let line = PageLine {
                start: cursor,
                end: cursor + cut,
                row: row as u8,
                color: color.segment_color(page.lines.len()),
            };
            // row_fits() bounds rows by MAX_PAGE_ROWS, so this cannot fail.
            let _ = page.lines.push(line);
            row += 1;
            cursor += resume;
        }

        line_start = line_end + 1;
    }

    page.rows_used = row;
    page
}

/// Greedy wrap of one logical line remainder.
///
/// Returns `(cut, resume)`: the segment is `line[..cut]`, the next
/// segment starts at `line[resume..]` (leading whitespace skipped).
pub fn wrap_point(line: &str, columns: usize) -> (usize, usize) {
    let columns = columns.max(1);
    let mut limit = None;
    let mut last_space = None;

    for (index, (byte, ch)) in line.char_indices().enumerate() {
        if index > columns {
            break;
        }
        if index == columns {
            limit = Some(byte);
        }
        if index > 0 && ch == ' ' {
            last_space = Some(byte);
        }
    }

    let Some(limit) = limit else {
        return (line.len(), line.len());
    };

    let cut = last_space.unwrap_or(limit);
    let rest = &line[cut..];
    (cut, cut + (rest.len() - rest.trim_start().len()))
}
