use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::UnicodeWidthStr;

use crate::viewport::Viewport;

/// Left/right padding inside the content area, in columns.
const PAD: u16 = 2;

/// Board widget painting one viewport's worth of chapter text.
///
/// The viewport model decides wrapping and scrolling; the board only
/// turns its visual rows into styled lines, applying the search
/// highlight as a paint-time overlay.
pub struct Board;

impl Board {
    pub fn render(frame: &mut Frame, area: Rect, viewport: &Viewport) {
        let text_area = Rect::new(
            area.x + PAD.min(area.width / 2),
            area.y,
            area.width.saturating_sub(PAD * 2),
            area.height,
        );

        let rows = viewport.visible_rows(text_area.width as usize, text_area.height as usize);
        let lines: Vec<Line> = rows
            .iter()
            .map(|row| highlight_line(row, viewport.highlight()))
            .collect();

        frame.render_widget(Paragraph::new(lines), text_area);
    }
}

/// Split one visual row into spans, styling every occurrence of the
/// highlight term. Matching uses the same ASCII folding as the search
/// engine so hits line up with what the searcher reported.
fn highlight_line<'a>(row: &'a str, term: Option<&str>) -> Line<'a> {
    let Some(term) = term.filter(|t| !t.is_empty()) else {
        return Line::from(row.to_string());
    };

    let row_chars: Vec<char> = row.chars().collect();
    let folded: Vec<char> = row_chars.iter().map(|c| c.to_ascii_lowercase()).collect();
    let term_chars: Vec<char> = term.chars().map(|c| c.to_ascii_lowercase()).collect();

    let highlight_style = Style::default().fg(Color::Black).bg(Color::Yellow);
    let mut spans: Vec<Span> = Vec::new();
    let mut plain_start = 0usize;
    let mut pos = 0usize;
    while pos + term_chars.len() <= folded.len() {
        if folded[pos..pos + term_chars.len()] == term_chars[..] {
            if plain_start < pos {
                let plain: String = row_chars[plain_start..pos].iter().collect();
                spans.push(Span::raw(plain));
            }
            let hit: String = row_chars[pos..pos + term_chars.len()].iter().collect();
            spans.push(Span::styled(hit, highlight_style));
            pos += term_chars.len();
            plain_start = pos;
        } else {
            pos += 1;
        }
    }
    if plain_start < row_chars.len() {
        let plain: String = row_chars[plain_start..].iter().collect();
        spans.push(Span::raw(plain));
    }
    if spans.is_empty() {
        spans.push(Span::raw(String::new()));
    }
    Line::from(spans)
}

/// Truncate a string to at most `max_width` display columns, appending
/// an ellipsis when anything was cut. CJK characters are two columns
/// wide, so this counts widths rather than characters.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let budget = max_width.saturating_sub(1);
    let mut result = String::new();
    let mut used = 0usize;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        result.push(c);
        used += w;
    }
    result.push('…');
    result
}
