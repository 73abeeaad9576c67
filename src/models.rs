use chrono::{DateTime, Utc};
use serde::Serialize;

/// A volume/part heading (第一卷, 第二部, ...).
pub const LEVEL_VOLUME: u8 = 1;
/// An ordinary chapter heading (第一章, 第三节, ...).
pub const LEVEL_CHAPTER: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Library,
    Reading,
}

impl Default for Screen {
    fn default() -> Self {
        Screen::Library
    }
}

/// Which modal window is on top of the current screen, if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowType {
    None,
    Toc,
    Search,
    Help,
    AddBook,
    ConfirmDelete,
}

impl Default for WindowType {
    fn default() -> Self {
        WindowType::None
    }
}

/// Book metadata, owned by the library store. The core modules only need
/// `file_path` and `encoding` to do their work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: Option<i64>,
    pub title: String,
    pub file_path: String,
    pub file_size: u64,
    pub encoding: String,
    /// Total character count of the decoded text, not bytes.
    pub word_count: u64,
    pub chapter_count: u64,
    pub added_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    /// Character offset within the last-read chapter.
    pub read_position: u64,
    pub read_chapter_idx: usize,
}

impl Book {
    pub fn new(title: &str, file_path: &str) -> Self {
        Self {
            id: None,
            title: title.to_string(),
            file_path: file_path.to_string(),
            file_size: 0,
            encoding: "utf-8".to_string(),
            word_count: 0,
            chapter_count: 0,
            added_at: Utc::now(),
            last_read_at: None,
            read_position: 0,
            read_chapter_idx: 0,
        }
    }
}

/// One contiguous byte span of the source file. Offsets address the raw,
/// undecoded file so a reader can seek without decoding anything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chapter {
    pub id: Option<i64>,
    pub book_id: i64,
    pub index: usize,
    pub title: String,
    pub level: u8,
    pub byte_offset: u64,
    pub byte_length: u64,
}

/// A single search hit. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub chapter_idx: usize,
    pub chapter_title: String,
    /// Character offset of the match within the chapter's decoded text.
    pub char_offset: usize,
    pub context: String,
}

/// Reading preferences, persisted in the settings table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settings {
    /// Blank rows between wrapped logical lines (0, 1 or 2).
    pub line_spacing: u8,
    pub max_width: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            line_spacing: 1,
            max_width: 80,
        }
    }
}

impl Settings {
    pub fn clamped(line_spacing: u8, max_width: u16) -> Self {
        Self {
            line_spacing: line_spacing.min(2),
            max_width: max_width.clamp(40, 200),
        }
    }
}
