use std::io;
use std::path::Path;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState},
};

use crate::logging;
use crate::models::{Book, Chapter, Screen, SearchResult, Settings, WindowType};
use crate::reader::BookReader;
use crate::state::Library;
use crate::task::{self, ParseEvent};
use crate::ui::board::{Board, truncate_to_width};
use crate::ui::windows::help::HelpWindow;
use crate::ui::windows::search::SearchWindow;
use crate::ui::windows::toc::TocWindow;
use crate::viewport::Viewport;

/// Horizontal padding the board applies on each side of the text.
const BOARD_PAD: usize = 2;

/// Top-level application: owns the library store, the current reading
/// session, and all modal window state. `run` drives the terminal.
pub struct App {
    library: Library,
    books: Vec<Book>,
    book_selected: usize,
    settings: Settings,

    screen: Screen,
    window: WindowType,
    status: String,
    should_quit: bool,

    current_book: Option<Book>,
    chapters: Vec<Chapter>,
    current_chapter_idx: usize,
    book_reader: Option<BookReader>,
    viewport: Viewport,
    toc: TocWindow,

    search_query: String,
    search_input_mode: bool,
    search_results: Vec<SearchResult>,
    search_selected: usize,
    search_rx: Option<Receiver<Vec<SearchResult>>>,

    add_input: String,
    parse_rx: Option<Receiver<ParseEvent>>,

    // Inner text area from the last draw, used for page geometry.
    text_width: usize,
    text_height: usize,
}

impl App {
    pub fn new(library: Library) -> eyre::Result<Self> {
        let books = library.get_all_books()?;
        let settings = library.get_settings()?;
        let mut viewport = Viewport::new();
        viewport.set_format(settings.max_width, settings.line_spacing);

        Ok(Self {
            library,
            books,
            book_selected: 0,
            settings,
            screen: Screen::Library,
            window: WindowType::None,
            status: String::new(),
            should_quit: false,
            current_book: None,
            chapters: Vec::new(),
            current_chapter_idx: 0,
            book_reader: None,
            viewport,
            toc: TocWindow::new(),
            search_query: String::new(),
            search_input_mode: false,
            search_results: Vec::new(),
            search_selected: 0,
            search_rx: None,
            add_input: String::new(),
            parse_rx: None,
            text_width: 80,
            text_height: 24,
        })
    }

    /// Open a file from the command line: reuse the library entry if the
    /// path is already known, otherwise parse it first.
    pub fn open_path(&mut self, path: &str) -> eyre::Result<()> {
        let canonical = match std::fs::canonicalize(path) {
            Ok(p) => p.to_string_lossy().to_string(),
            Err(_) => path.to_string(),
        };
        if let Some(book) = self
            .books
            .iter()
            .find(|b| b.file_path == canonical)
            .cloned()
        {
            self.open_book(book)?;
        } else {
            self.start_parse(canonical);
        }
        Ok(())
    }

    /// Run the main application loop.
    pub fn run(&mut self) -> eyre::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        terminal.hide_cursor()?;

        let result = self.event_loop(&mut terminal);

        terminal.clear()?;
        terminal.show_cursor()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        crossterm::terminal::disable_raw_mode()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> eyre::Result<()> {
        loop {
            self.poll_workers()?;

            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                break;
            }

            // Short timeout while a worker is active so progress shows up;
            // otherwise block for a while to keep the process idle.
            let poll_timeout = if self.parse_rx.is_some() || self.search_rx.is_some() {
                Duration::from_millis(100)
            } else {
                Duration::from_secs(60)
            };

            if !crossterm::event::poll(poll_timeout)? {
                continue;
            }

            if let Ok(event) = crossterm::event::read() {
                match event {
                    Event::Key(key) => {
                        if key.kind == KeyEventKind::Press {
                            self.handle_key_event(key)?;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }

        if self.screen == Screen::Reading {
            self.save_progress()?;
        }
        Ok(())
    }

    // ── workers ──

    fn start_parse(&mut self, path: String) {
        self.status = "读取文件...".to_string();
        self.parse_rx = Some(task::spawn_parse(path));
    }

    fn poll_workers(&mut self) -> eyre::Result<()> {
        if let Some(rx) = self.parse_rx.take() {
            let mut finished = false;
            loop {
                match rx.try_recv() {
                    Ok(ParseEvent::Progress(msg)) => self.status = msg,
                    Ok(ParseEvent::Done(result)) => {
                        finished = true;
                        match result {
                            Ok((book, chapters)) => self.finish_parse(book, chapters)?,
                            Err(msg) => {
                                logging::error(format!("Parse failed: {}", msg));
                                self.status = format!("解析失败: {}", msg);
                            }
                        }
                        break;
                    }
                    Err(TryRecvError::Disconnected) => {
                        finished = true;
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                }
            }
            if !finished {
                self.parse_rx = Some(rx);
            }
        }

        if let Some(rx) = self.search_rx.take() {
            match rx.try_recv() {
                Ok(results) => {
                    self.search_results = results;
                    self.search_selected = 0;
                }
                Err(TryRecvError::Empty) => self.search_rx = Some(rx),
                Err(TryRecvError::Disconnected) => {}
            }
        }
        Ok(())
    }

    fn finish_parse(&mut self, book: Book, chapters: Vec<Chapter>) -> eyre::Result<()> {
        let existing = self
            .books
            .iter()
            .find(|b| b.file_path == book.file_path)
            .and_then(|b| b.id);
        let book_id = match existing {
            // Re-adding a known file refreshes its metadata and chapter
            // table in case the file changed on disk.
            Some(id) => {
                self.library.update_book(id, &book)?;
                self.library.replace_chapters(id, &chapters)?;
                self.status = format!("已更新《{}》，共 {} 章", book.title, chapters.len());
                id
            }
            None => {
                let id = self.library.add_book(&book)?;
                self.library.add_chapters(id, &chapters)?;
                self.status = format!("已添加《{}》，共 {} 章", book.title, chapters.len());
                id
            }
        };
        self.books = self.library.get_all_books()?;

        // A book opened straight from the command line goes into reading
        // mode as soon as parsing finishes.
        if let Some(stored) = self.library.get_book(book_id)? {
            self.open_book(stored)?;
        }
        Ok(())
    }

    // ── reading session ──

    fn open_book(&mut self, book: Book) -> eyre::Result<()> {
        let book_id = match book.id {
            Some(id) => id,
            None => return Ok(()),
        };
        if !Path::new(&book.file_path).exists() {
            self.status = format!("文件不存在: {}", book.file_path);
            return Ok(());
        }
        self.chapters = self.library.get_chapters(book_id)?;
        if self.chapters.is_empty() {
            self.status = format!("《{}》没有章节记录", book.title);
            return Ok(());
        }
        self.book_reader = Some(BookReader::new(&book.file_path, &book.encoding));

        let chapter_idx = book.read_chapter_idx.min(self.chapters.len() - 1);
        let position = book.read_position as usize;
        self.current_book = Some(book);
        self.load_chapter(chapter_idx)?;
        self.viewport.scroll_to_char_offset(position);

        self.screen = Screen::Reading;
        self.window = WindowType::None;
        self.search_results.clear();
        self.search_query.clear();
        self.viewport.clear_highlight();
        Ok(())
    }

    fn load_chapter(&mut self, idx: usize) -> eyre::Result<()> {
        let chapter = match self.chapters.get(idx) {
            Some(c) => c.clone(),
            None => return Ok(()),
        };
        let reader = match &self.book_reader {
            Some(r) => r,
            None => return Ok(()),
        };
        match reader.read_chapter(&chapter) {
            Ok(text) => {
                self.current_chapter_idx = idx;
                self.viewport.set_content(&text);
                self.status = String::new();
            }
            Err(err) => {
                logging::error(format!("Could not read chapter {}: {}", chapter.title, err));
                self.status = "文件不存在，可能已被移动或删除".to_string();
            }
        }
        Ok(())
    }

    fn save_progress(&mut self) -> eyre::Result<()> {
        if let Some(book) = &self.current_book
            && let Some(book_id) = book.id
        {
            self.library.update_read_progress(
                book_id,
                self.current_chapter_idx,
                self.viewport.top_line_offset() as u64,
            )?;
        }
        Ok(())
    }

    fn close_book(&mut self) -> eyre::Result<()> {
        self.save_progress()?;
        self.current_book = None;
        self.chapters.clear();
        self.book_reader = None;
        self.search_results.clear();
        self.viewport.clear_highlight();
        self.books = self.library.get_all_books()?;
        self.book_selected = self.book_selected.min(self.books.len().saturating_sub(1));
        self.screen = Screen::Library;
        self.window = WindowType::None;
        self.status = String::new();
        Ok(())
    }

    fn jump_to_result(&mut self, idx: usize) -> eyre::Result<()> {
        let result = match self.search_results.get(idx) {
            Some(r) => r.clone(),
            None => return Ok(()),
        };
        self.search_selected = idx;
        if result.chapter_idx != self.current_chapter_idx {
            self.load_chapter(result.chapter_idx)?;
        }
        self.viewport.scroll_to_char_offset(result.char_offset);
        self.viewport.set_highlight(&self.search_query);
        Ok(())
    }

    fn apply_format(&mut self) -> eyre::Result<()> {
        self.viewport
            .set_format(self.settings.max_width, self.settings.line_spacing);
        self.library.save_settings(&self.settings)?;
        Ok(())
    }

    // ── key handling ──

    fn handle_key_event(&mut self, key: KeyEvent) -> eyre::Result<()> {
        match self.window {
            WindowType::Help => {
                self.window = WindowType::None;
                Ok(())
            }
            WindowType::Toc => self.handle_toc_key(key),
            WindowType::Search => self.handle_search_key(key),
            WindowType::AddBook => self.handle_add_book_key(key),
            WindowType::ConfirmDelete => self.handle_confirm_delete_key(key),
            WindowType::None => match self.screen {
                Screen::Library => self.handle_library_key(key),
                Screen::Reading => self.handle_reading_key(key),
            },
        }
    }

    fn handle_library_key(&mut self, key: KeyEvent) -> eyre::Result<()> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.books.is_empty() {
                    self.book_selected = (self.book_selected + 1).min(self.books.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.book_selected = self.book_selected.saturating_sub(1);
            }
            KeyCode::Enter => {
                if let Some(book) = self.books.get(self.book_selected).cloned() {
                    self.open_book(book)?;
                }
            }
            KeyCode::Char('a') => {
                self.add_input.clear();
                self.window = WindowType::AddBook;
            }
            KeyCode::Char('d') => {
                if !self.books.is_empty() {
                    self.window = WindowType::ConfirmDelete;
                }
            }
            KeyCode::Char('?') => self.window = WindowType::Help,
            _ => {}
        }
        Ok(())
    }

    fn handle_reading_key(&mut self, key: KeyEvent) -> eyre::Result<()> {
        let (w, h) = (self.text_width, self.text_height);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.close_book()?,
            KeyCode::Char('j') | KeyCode::Down => self.viewport.scroll_down(),
            KeyCode::Char('k') | KeyCode::Up => self.viewport.scroll_up(),
            KeyCode::PageDown | KeyCode::Char(' ') => self.viewport.page_down(w, h),
            KeyCode::PageUp => self.viewport.page_up(w, h),
            KeyCode::Char('g') | KeyCode::Home => self.viewport.scroll_home(),
            KeyCode::Char('G') | KeyCode::End => self.viewport.scroll_end(w, h),
            KeyCode::Char('h') | KeyCode::Left => {
                if self.current_chapter_idx > 0 {
                    self.load_chapter(self.current_chapter_idx - 1)?;
                }
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if self.current_chapter_idx + 1 < self.chapters.len() {
                    self.load_chapter(self.current_chapter_idx + 1)?;
                }
            }
            KeyCode::Char('t') => {
                self.toc
                    .set_entries(self.chapters.clone(), self.current_chapter_idx);
                self.window = WindowType::Toc;
            }
            KeyCode::Char('/') => {
                self.search_query.clear();
                self.search_results.clear();
                self.search_selected = 0;
                self.search_input_mode = true;
                self.window = WindowType::Search;
            }
            KeyCode::Char('n') => {
                if !self.search_results.is_empty() {
                    let next = (self.search_selected + 1) % self.search_results.len();
                    self.jump_to_result(next)?;
                }
            }
            KeyCode::Char('N') => {
                if !self.search_results.is_empty() {
                    let prev = (self.search_selected + self.search_results.len() - 1)
                        % self.search_results.len();
                    self.jump_to_result(prev)?;
                }
            }
            KeyCode::Char('s') => {
                self.settings.line_spacing = (self.settings.line_spacing + 1) % 3;
                self.apply_format()?;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.settings =
                    Settings::clamped(self.settings.line_spacing, self.settings.max_width + 4);
                self.apply_format()?;
            }
            KeyCode::Char('-') => {
                self.settings = Settings::clamped(
                    self.settings.line_spacing,
                    self.settings.max_width.saturating_sub(4),
                );
                self.apply_format()?;
            }
            KeyCode::Char('?') => self.window = WindowType::Help,
            _ => {}
        }
        Ok(())
    }

    fn handle_toc_key(&mut self, key: KeyEvent) -> eyre::Result<()> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.toc.next_entry(),
            KeyCode::Char('k') | KeyCode::Up => self.toc.previous_entry(),
            KeyCode::Enter => {
                if let Some(entry) = self.toc.selected_entry() {
                    let idx = entry.index;
                    self.window = WindowType::None;
                    self.load_chapter(idx)?;
                }
            }
            KeyCode::Esc | KeyCode::Char('t') | KeyCode::Char('q') => {
                self.window = WindowType::None;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> eyre::Result<()> {
        if self.search_input_mode {
            match key.code {
                KeyCode::Esc => {
                    self.search_input_mode = false;
                    self.window = WindowType::None;
                }
                KeyCode::Enter => {
                    self.search_input_mode = false;
                    if !self.search_query.is_empty()
                        && let Some(reader) = &self.book_reader
                    {
                        self.search_rx = Some(task::spawn_search(
                            reader.path().to_string_lossy().to_string(),
                            self.current_book
                                .as_ref()
                                .map(|b| b.encoding.clone())
                                .unwrap_or_else(|| "utf-8".to_string()),
                            self.chapters.clone(),
                            self.search_query.clone(),
                        ));
                    }
                }
                KeyCode::Backspace => {
                    self.search_query.pop();
                }
                KeyCode::Char(c) => self.search_query.push(c),
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.search_results.is_empty() {
                    self.search_selected =
                        (self.search_selected + 1).min(self.search_results.len() - 1);
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.search_selected = self.search_selected.saturating_sub(1);
            }
            KeyCode::Enter => {
                let idx = self.search_selected;
                self.window = WindowType::None;
                self.jump_to_result(idx)?;
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                self.window = WindowType::None;
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_add_book_key(&mut self, key: KeyEvent) -> eyre::Result<()> {
        match key.code {
            KeyCode::Esc => self.window = WindowType::None,
            KeyCode::Enter => {
                let path = self.add_input.trim().to_string();
                self.window = WindowType::None;
                if !path.is_empty() {
                    self.start_parse(path);
                }
            }
            KeyCode::Backspace => {
                self.add_input.pop();
            }
            KeyCode::Char(c) => self.add_input.push(c),
            _ => {}
        }
        Ok(())
    }

    fn handle_confirm_delete_key(&mut self, key: KeyEvent) -> eyre::Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.window = WindowType::None;
                if let Some(book) = self.books.get(self.book_selected)
                    && let Some(book_id) = book.id
                {
                    let title = book.title.clone();
                    self.library.delete_book(book_id)?;
                    self.books = self.library.get_all_books()?;
                    self.book_selected = self.book_selected.min(self.books.len().saturating_sub(1));
                    self.status = format!("已删除《{}》", title);
                }
            }
            _ => self.window = WindowType::None,
        }
        Ok(())
    }

    // ── rendering ──

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        match self.screen {
            Screen::Library => self.draw_library(frame, area),
            Screen::Reading => self.draw_reading(frame, area),
        }

        match self.window {
            WindowType::Toc => self.toc.render(frame, area),
            WindowType::Search => SearchWindow::render(
                frame,
                area,
                &self.search_query,
                &self.search_results,
                self.search_selected,
                self.search_rx.is_some(),
            ),
            WindowType::Help => HelpWindow::render(frame, area),
            WindowType::AddBook => self.draw_add_book(frame, area),
            WindowType::ConfirmDelete => self.draw_confirm_delete(frame, area),
            WindowType::None => {}
        }
    }

    fn draw_library(&mut self, frame: &mut Frame, area: Rect) {
        let table_area = Rect::new(area.x, area.y, area.width, area.height.saturating_sub(1));
        let status_area = Rect::new(
            area.x,
            area.y + area.height.saturating_sub(1),
            area.width,
            1,
        );

        let header = Row::new(vec!["书名", "章节", "字数", "进度", "最后阅读"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows: Vec<Row> = self
            .books
            .iter()
            .map(|book| {
                let progress = if book.chapter_count == 0 {
                    "-".to_string()
                } else {
                    format!("{}/{}", book.read_chapter_idx + 1, book.chapter_count)
                };
                let last_read = book
                    .last_read_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "未读".to_string());
                Row::new(vec![
                    book.title.clone(),
                    book.chapter_count.to_string(),
                    book.word_count.to_string(),
                    progress,
                    last_read,
                ])
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(40),
                Constraint::Length(6),
                Constraint::Length(10),
                Constraint::Length(10),
                Constraint::Length(17),
            ],
        )
        .header(header)
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .block(Block::default().title(" 书架 ").borders(Borders::ALL));

        let mut table_state = TableState::default();
        if !self.books.is_empty() {
            table_state.select(Some(self.book_selected));
        }
        frame.render_stateful_widget(table, table_area, &mut table_state);

        let hint = if self.status.is_empty() {
            " j/k 选择  Enter 打开  a 添加  d 删除  ? 帮助  q 退出".to_string()
        } else {
            format!(" {}", self.status)
        };
        let status = Paragraph::new(Line::from(truncate_to_width(
            &hint,
            status_area.width as usize,
        )))
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(status, status_area);
    }

    fn draw_reading(&mut self, frame: &mut Frame, area: Rect) {
        let content_area = Rect::new(area.x, area.y, area.width, area.height.saturating_sub(1));
        let status_area = Rect::new(
            area.x,
            area.y + area.height.saturating_sub(1),
            area.width,
            1,
        );

        let title = self
            .chapters
            .get(self.current_chapter_idx)
            .map(|c| format!(" {} ", c.title))
            .unwrap_or_default();
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(content_area);
        frame.render_widget(block, content_area);
        Board::render(frame, inner, &self.viewport);

        // Remember the board's text geometry so paging keys match what
        // is on screen.
        self.text_width = (inner.width as usize).saturating_sub(2 * BOARD_PAD);
        self.text_height = inner.height as usize;

        let status = if self.status.is_empty() {
            let book_title = self
                .current_book
                .as_ref()
                .map(|b| b.title.as_str())
                .unwrap_or("");
            format!(
                " {}  第 {}/{} 章  宽度 {}  行距 {}",
                book_title,
                self.current_chapter_idx + 1,
                self.chapters.len(),
                self.settings.max_width,
                self.settings.line_spacing,
            )
        } else {
            format!(" {}", self.status)
        };
        let bar = Paragraph::new(Line::from(truncate_to_width(
            &status,
            status_area.width as usize,
        )))
        .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(bar, status_area);
    }

    fn draw_add_book(&self, frame: &mut Frame, area: Rect) {
        let popup = crate::ui::windows::centered_popup_area(area, 60, 20);
        let popup = Rect::new(popup.x, popup.y, popup.width, 3);
        frame.render_widget(Clear, popup);
        let input = Paragraph::new(Line::from(self.add_input.as_str())).block(
            Block::default()
                .title(" 添加书籍（输入文件路径） ")
                .borders(Borders::ALL),
        );
        frame.render_widget(input, popup);
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect) {
        let title = self
            .books
            .get(self.book_selected)
            .map(|b| b.title.as_str())
            .unwrap_or("");
        let popup = crate::ui::windows::centered_popup_area(area, 50, 20);
        let popup = Rect::new(popup.x, popup.y, popup.width, 3);
        frame.render_widget(Clear, popup);
        let message = Paragraph::new(Line::from(format!("删除《{}》？(y/n)", title)))
            .block(Block::default().title(" 确认 ").borders(Borders::ALL))
            .style(Style::default().fg(Color::Red));
        frame.render_widget(message, popup);
    }
}
