use crate::config;
use crate::models::{Book, Chapter, Settings};
use chrono::Utc;
use eyre::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

/// The library store: books, their chapter tables, and reading
/// preferences in one SQLite database. Constructed explicitly and passed
/// to whoever needs it, so tests can point it at a scratch file.
pub struct Library {
    conn: Connection,
}

impl Library {
    pub fn open_default() -> Result<Self> {
        let path = config::library_db_path()?;
        Self::open(path)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::init_db(&conn)?;
        Ok(Self { conn })
    }

    // Tables are created only if missing, so this is safe to run on an
    // existing database.
    fn init_db(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                file_path TEXT NOT NULL UNIQUE,
                file_size INTEGER NOT NULL DEFAULT 0,
                encoding TEXT NOT NULL DEFAULT 'utf-8',
                word_count INTEGER NOT NULL DEFAULT 0,
                chapter_count INTEGER NOT NULL DEFAULT 0,
                added_at TEXT NOT NULL,
                last_read_at TEXT,
                read_position INTEGER NOT NULL DEFAULT 0,
                read_chapter_idx INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS chapters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                book_id INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                idx INTEGER NOT NULL,
                title TEXT NOT NULL,
                level INTEGER NOT NULL DEFAULT 2,
                byte_offset INTEGER NOT NULL,
                byte_length INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_chapters_book ON chapters(book_id, idx);

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ── books ──

    pub fn add_book(&self, book: &Book) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO books (title, file_path, file_size, encoding, word_count,
             chapter_count, added_at, last_read_at, read_position, read_chapter_idx)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                book.title,
                book.file_path,
                book.file_size,
                book.encoding,
                book.word_count,
                book.chapter_count,
                book.added_at,
                book.last_read_at,
                book.read_position,
                book.read_chapter_idx as i64,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_book(&self, book_id: i64) -> Result<Option<Book>> {
        let book = self
            .conn
            .query_row(
                "SELECT id, title, file_path, file_size, encoding, word_count,
                 chapter_count, added_at, last_read_at, read_position, read_chapter_idx
                 FROM books WHERE id = ?",
                params![book_id],
                map_book_row,
            )
            .optional()?;
        Ok(book)
    }

    pub fn get_all_books(&self) -> Result<Vec<Book>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, file_path, file_size, encoding, word_count,
             chapter_count, added_at, last_read_at, read_position, read_chapter_idx
             FROM books ORDER BY last_read_at DESC NULLS LAST, added_at DESC",
        )?;
        let rows = stmt.query_map([], map_book_row)?;
        let mut books = Vec::new();
        for book in rows {
            books.push(book?);
        }
        Ok(books)
    }

    /// Refresh a book's file metadata after a re-parse. Reading progress
    /// is untouched; callers clamp a now out-of-range chapter index when
    /// they open the book.
    pub fn update_book(&self, book_id: i64, book: &Book) -> Result<()> {
        self.conn.execute(
            "UPDATE books SET title = ?, file_size = ?, encoding = ?,
             word_count = ?, chapter_count = ? WHERE id = ?",
            params![
                book.title,
                book.file_size,
                book.encoding,
                book.word_count,
                book.chapter_count,
                book_id,
            ],
        )?;
        Ok(())
    }

    pub fn delete_book(&self, book_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM books WHERE id = ?", params![book_id])?;
        Ok(())
    }

    pub fn update_read_progress(
        &self,
        book_id: i64,
        chapter_idx: usize,
        position: u64,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE books SET read_chapter_idx = ?, read_position = ?, last_read_at = ?
             WHERE id = ?",
            params![chapter_idx as i64, position, Utc::now(), book_id],
        )?;
        Ok(())
    }

    // ── chapters ──

    pub fn add_chapters(&self, book_id: i64, chapters: &[Chapter]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chapters (book_id, idx, title, level, byte_offset, byte_length)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )?;
            for chapter in chapters {
                stmt.execute(params![
                    book_id,
                    chapter.index as i64,
                    chapter.title,
                    chapter.level as i64,
                    chapter.byte_offset,
                    chapter.byte_length,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Chapters are immutable once stored; re-parsing a book discards
    /// and rebuilds its whole table.
    pub fn replace_chapters(&self, book_id: i64, chapters: &[Chapter]) -> Result<()> {
        self.conn
            .execute("DELETE FROM chapters WHERE book_id = ?", params![book_id])?;
        self.add_chapters(book_id, chapters)
    }

    pub fn get_chapters(&self, book_id: i64) -> Result<Vec<Chapter>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, book_id, idx, title, level, byte_offset, byte_length
             FROM chapters WHERE book_id = ? ORDER BY idx",
        )?;
        let rows = stmt.query_map(params![book_id], |row| {
            Ok(Chapter {
                id: Some(row.get(0)?),
                book_id: row.get(1)?,
                index: row.get::<_, i64>(2)? as usize,
                title: row.get(3)?,
                level: row.get::<_, i64>(4)? as u8,
                byte_offset: row.get(5)?,
                byte_length: row.get(6)?,
            })
        })?;
        let mut chapters = Vec::new();
        for chapter in rows {
            chapters.push(chapter?);
        }
        Ok(chapters)
    }

    // ── settings ──

    pub fn get_settings(&self) -> Result<Settings> {
        let defaults = Settings::default();
        let line_spacing = self
            .get_setting("line_spacing")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.line_spacing);
        let max_width = self
            .get_setting("max_width")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_width);
        Ok(Settings::clamped(line_spacing, max_width))
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.set_setting("line_spacing", &settings.line_spacing.to_string())?;
        self.set_setting("max_width", &settings.max_width.to_string())?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn map_book_row(row: &Row) -> rusqlite::Result<Book> {
    Ok(Book {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        file_path: row.get(2)?,
        file_size: row.get(3)?,
        encoding: row.get(4)?,
        word_count: row.get(5)?,
        chapter_count: row.get(6)?,
        added_at: row.get(7)?,
        last_read_at: row.get(8)?,
        read_position: row.get(9)?,
        read_chapter_idx: row.get::<_, i64>(10)? as usize,
    })
}
