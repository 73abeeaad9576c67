use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::models::{Chapter, LEVEL_VOLUME};

/// Chapter sidebar: volume headings flush left, chapters indented.
pub struct TocWindow {
    pub entries: Vec<Chapter>,
    pub selected_index: usize,
}

impl TocWindow {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            selected_index: 0,
        }
    }

    pub fn set_entries(&mut self, entries: Vec<Chapter>, current_idx: usize) {
        self.selected_index = current_idx.min(entries.len().saturating_sub(1));
        self.entries = entries;
    }

    pub fn next_entry(&mut self) {
        if !self.entries.is_empty() {
            self.selected_index = (self.selected_index + 1).min(self.entries.len() - 1);
        }
    }

    pub fn previous_entry(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn selected_entry(&self) -> Option<&Chapter> {
        self.entries.get(self.selected_index)
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let popup_area = super::centered_popup_area(area, 50, 80);

        frame.render_widget(Clear, popup_area);

        if self.entries.is_empty() {
            let empty_text = vec![
                Line::from("没有章节"),
                Line::from(""),
                Line::from(Span::styled(
                    "按任意键关闭",
                    Style::default().add_modifier(Modifier::ITALIC),
                )),
            ];
            let paragraph = Paragraph::new(empty_text)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title("目录").borders(Borders::ALL));
            frame.render_widget(paragraph, popup_area);
            return;
        }

        let items: Vec<ListItem> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, chapter)| {
                let style = if i == self.selected_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else {
                    Style::default()
                };
                let content = if chapter.level == LEVEL_VOLUME {
                    chapter.title.clone()
                } else {
                    format!("  {}", chapter.title)
                };
                ListItem::new(Line::from(content)).style(style)
            })
            .collect();

        let list = List::new(items).block(Block::default().title("目录").borders(Borders::ALL));

        // Keep the selection scrolled into view.
        let mut list_state = ListState::default();
        list_state.select(Some(self.selected_index));
        frame.render_stateful_widget(list, popup_area, &mut list_state);
    }
}

impl Default for TocWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LEVEL_CHAPTER;

    fn chapters(count: usize) -> Vec<Chapter> {
        (0..count)
            .map(|i| Chapter {
                id: None,
                book_id: 0,
                index: i,
                title: format!("第{}章", i + 1),
                level: LEVEL_CHAPTER,
                byte_offset: 0,
                byte_length: 1,
            })
            .collect()
    }

    #[test]
    fn test_selection_moves_and_clamps() {
        let mut toc = TocWindow::new();
        toc.set_entries(chapters(3), 0);
        toc.previous_entry();
        assert_eq!(toc.selected_index, 0);
        toc.next_entry();
        toc.next_entry();
        toc.next_entry();
        assert_eq!(toc.selected_index, 2);
        assert_eq!(toc.selected_entry().unwrap().index, 2);
    }

    #[test]
    fn test_set_entries_preselects_current_chapter() {
        let mut toc = TocWindow::new();
        toc.set_entries(chapters(5), 3);
        assert_eq!(toc.selected_index, 3);
        // Out-of-range current index clamps rather than panics.
        toc.set_entries(chapters(2), 10);
        assert_eq!(toc.selected_index, 1);
    }

    #[test]
    fn test_empty_entries() {
        let mut toc = TocWindow::new();
        toc.set_entries(Vec::new(), 0);
        assert!(toc.selected_entry().is_none());
        toc.next_entry();
        assert_eq!(toc.selected_index, 0);
    }
}
