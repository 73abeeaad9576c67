use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::models::SearchResult;
use crate::ui::board::truncate_to_width;

pub struct SearchWindow;

impl SearchWindow {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        query: &str,
        results: &[SearchResult],
        selected_index: usize,
        searching: bool,
    ) {
        let popup_area = Rect::new(
            area.x + area.width / 8,
            area.y + area.height / 6,
            area.width * 3 / 4,
            area.height * 2 / 3,
        );

        frame.render_widget(Clear, popup_area);

        let title = if searching {
            "搜索（进行中...）".to_string()
        } else {
            format!("搜索（{} 个结果）", results.len())
        };
        let header = Paragraph::new(Line::from(format!("/{}", query)))
            .block(Block::default().title(title).borders(Borders::ALL))
            .style(Style::default().add_modifier(Modifier::BOLD));

        let header_area = Rect::new(popup_area.x, popup_area.y, popup_area.width, 3);
        frame.render_widget(header, header_area);

        let list_area = Rect::new(
            popup_area.x,
            popup_area.y + 3,
            popup_area.width,
            popup_area.height.saturating_sub(3),
        );

        if results.is_empty() {
            let message = if searching { "搜索中..." } else { "没有结果" };
            let empty = Paragraph::new(message)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(empty, list_area);
            return;
        }

        let line_width = list_area.width.saturating_sub(2) as usize;
        let items: Vec<ListItem> = results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                let style = if i == selected_index {
                    Style::default().bg(Color::Blue).fg(Color::White)
                } else {
                    Style::default()
                };
                let entry = format!("[{}] {}", result.chapter_title, result.context);
                ListItem::new(Line::from(truncate_to_width(&entry, line_width))).style(style)
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL));

        let mut list_state = ListState::default();
        list_state.select(Some(selected_index));
        frame.render_stateful_widget(list, list_area, &mut list_state);
    }
}
