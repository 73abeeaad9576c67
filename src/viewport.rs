/// Line-wrapping viewport model over one chapter's text.
///
/// The unit of vertical scrolling is the logical line (one paragraph of
/// text between raw newlines, blank ones discarded), not the wrapped
/// visual row. The model is independent of any terminal painting; the
/// board widget asks it for visual rows and draws them.
#[derive(Debug, Clone)]
pub struct Viewport {
    max_width: u16,
    line_spacing: u8,
    lines: Vec<String>,
    /// Starting character offset of each retained logical line within
    /// the original chapter text. Dropped blank lines still advance the
    /// accumulator, so offsets line up with search results.
    line_offsets: Vec<usize>,
    top_line: usize,
    highlight: Option<String>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            max_width: 80,
            line_spacing: 1,
            lines: Vec::new(),
            line_offsets: Vec::new(),
            top_line: 0,
            highlight: None,
        }
    }

    /// Replace the content with a chapter's text and reset scroll.
    pub fn set_content(&mut self, text: &str) {
        self.lines.clear();
        self.line_offsets.clear();
        let mut pos = 0usize;
        for paragraph in text.split('\n') {
            let trimmed = paragraph.trim();
            if !trimmed.is_empty() {
                self.lines.push(trimmed.to_string());
                self.line_offsets.push(pos);
            }
            pos += paragraph.chars().count() + 1; // +1 for the removed \n
        }
        self.top_line = 0;
    }

    pub fn set_format(&mut self, max_width: u16, line_spacing: u8) {
        self.max_width = max_width;
        self.line_spacing = line_spacing.min(2);
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn top_line(&self) -> usize {
        self.top_line
    }

    pub fn top_line_offset(&self) -> usize {
        self.line_offsets.get(self.top_line).copied().unwrap_or(0)
    }

    pub fn set_highlight(&mut self, query: &str) {
        self.highlight = Some(query.to_string());
    }

    pub fn clear_highlight(&mut self) {
        self.highlight = None;
    }

    /// The stored highlight term, applied by the renderer at paint time.
    /// It never alters stored lines or offsets.
    pub fn highlight(&self) -> Option<&str> {
        self.highlight.as_deref()
    }

    /// Effective wrap column: the configured width bounded by what the
    /// screen actually offers.
    pub fn wrap_width(&self, avail_width: usize) -> usize {
        let avail = if avail_width == 0 { 80 } else { avail_width };
        if self.max_width == 0 {
            avail
        } else {
            (self.max_width as usize).min(avail)
        }
    }

    fn wrap_line(line: &str, width: usize) -> Vec<String> {
        let wrapped = textwrap::wrap(line, width.max(1));
        if wrapped.is_empty() {
            vec![String::new()]
        } else {
            wrapped.into_iter().map(|cow| cow.into_owned()).collect()
        }
    }

    /// Visual rows for one full viewport: greedy wrap from the top line,
    /// spacing rows between logical lines, padded blank to `height`.
    pub fn visible_rows(&self, avail_width: usize, height: usize) -> Vec<String> {
        let width = self.wrap_width(avail_width);
        let mut rows: Vec<String> = Vec::with_capacity(height);
        let mut idx = self.top_line;
        while rows.len() < height && idx < self.lines.len() {
            for visual in Self::wrap_line(&self.lines[idx], width) {
                rows.push(visual);
            }
            if idx + 1 < self.lines.len() {
                for _ in 0..self.line_spacing {
                    rows.push(String::new());
                }
            }
            idx += 1;
        }
        rows.truncate(height);
        while rows.len() < height {
            rows.push(String::new());
        }
        rows
    }

    // ── scrolling ──

    pub fn scroll_down(&mut self) {
        if self.top_line + 1 < self.lines.len() {
            self.top_line += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.top_line = self.top_line.saturating_sub(1);
    }

    pub fn scroll_home(&mut self) {
        self.top_line = 0;
    }

    /// Make the logical line containing `char_offset` the top line: the
    /// last line whose starting offset does not exceed the target.
    pub fn scroll_to_char_offset(&mut self, char_offset: usize) {
        let mut target = 0;
        for (i, &offset) in self.line_offsets.iter().enumerate() {
            if offset <= char_offset {
                target = i;
            } else {
                break;
            }
        }
        self.top_line = target;
    }

    /// How many logical lines fully fit in one viewport, simulated by
    /// accumulating wrap and spacing rows forward from the top line.
    pub fn visible_line_count(&self, avail_width: usize, height: usize) -> usize {
        let width = self.wrap_width(avail_width);
        let spacing = self.line_spacing as usize;
        let mut visual = 0usize;
        let mut count = 0usize;
        let mut idx = self.top_line;
        while idx < self.lines.len() {
            let h = Self::wrap_line(&self.lines[idx], width).len();
            let space = if idx + 1 < self.lines.len() { spacing } else { 0 };
            if visual + h + space > height && count > 0 {
                break;
            }
            visual += h + space;
            count += 1;
            idx += 1;
        }
        count.max(1)
    }

    pub fn page_down(&mut self, avail_width: usize, height: usize) {
        if self.lines.is_empty() {
            return;
        }
        let page = self.visible_line_count(avail_width, height);
        self.top_line = (self.top_line + page).min(self.lines.len() - 1);
    }

    /// Walk backward from the current top until one more logical line
    /// would overflow the viewport; that line's successor becomes the
    /// new top.
    pub fn page_up(&mut self, avail_width: usize, height: usize) {
        if self.top_line == 0 {
            return;
        }
        let width = self.wrap_width(avail_width);
        let spacing = self.line_spacing as usize;
        let mut visual = 0usize;
        let mut idx = self.top_line as isize - 1;
        while idx >= 0 {
            let h = Self::wrap_line(&self.lines[idx as usize], width).len();
            if visual + h + spacing > height {
                idx += 1;
                break;
            }
            visual += h + spacing;
            idx -= 1;
        }
        self.top_line = idx.max(0) as usize;
    }

    /// Jump to the last page: the top line from which forward wrapping
    /// exactly fills the viewport ending at the final logical line.
    pub fn scroll_end(&mut self, avail_width: usize, height: usize) {
        if self.lines.is_empty() {
            return;
        }
        let width = self.wrap_width(avail_width);
        let spacing = self.line_spacing as usize;
        let mut visual = 0usize;
        let mut idx = self.lines.len() as isize - 1;
        while idx >= 0 {
            let h = Self::wrap_line(&self.lines[idx as usize], width).len();
            let space = if (idx as usize) + 1 < self.lines.len() { spacing } else { 0 };
            if visual + h + space > height {
                idx += 1;
                break;
            }
            visual += h + space;
            idx -= 1;
        }
        self.top_line = idx.max(0) as usize;
    }
}
