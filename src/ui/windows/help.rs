use ratatui::{
    Frame,
    layout::Rect,
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph},
};

pub struct HelpWindow;

const HELP_TEXT: &[&str] = &[
    " Library:",
    "   j / Down          Next Book",
    "   k / Up            Previous Book",
    "   Enter             Open Book",
    "   a                 Add Book (enter path)",
    "   d                 Delete Book",
    "   q                 Quit",
    "",
    " Reading:",
    "   k / Up            Line Up",
    "   j / Down          Line Down",
    "   PageUp / PageDown Page Up / Down",
    "   g / Home          Chapter Start",
    "   G / End           Chapter End",
    "   h / Left          Previous Chapter",
    "   l / Right         Next Chapter",
    "   t                 Table Of Contents",
    "",
    " Search:",
    "   /                 Start Search",
    "   n                 Next Hit",
    "   N                 Previous Hit",
    "",
    " Display:",
    "   + / -             Increase/Decrease Width",
    "   s                 Cycle Line Spacing",
    "",
    "   q / Esc           Back / Close Window",
    "   ?                 Help",
];

impl HelpWindow {
    pub fn render(frame: &mut Frame, area: Rect) {
        let help_content: Vec<Line> = HELP_TEXT.iter().map(|&s| Line::from(s)).collect();

        let max_width = help_content.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
        let width = (max_width + 4).min(area.width);
        let height = (help_content.len() as u16 + 2).min(area.height);

        let x = area.x + (area.width - width) / 2;
        let y = area.y + (area.height - height) / 2;
        let popup_area = Rect::new(x, y, width, height);

        frame.render_widget(Clear, popup_area);

        let help_paragraph =
            Paragraph::new(help_content).block(Block::default().title("Help").borders(Borders::ALL));

        frame.render_widget(help_paragraph, popup_area);
    }
}
