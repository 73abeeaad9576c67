use eyre::Result;
use tempfile::TempDir;

use juan::models::{Book, Chapter, LEVEL_CHAPTER, Settings};
use juan::state::Library;

fn scratch_library(dir: &TempDir) -> Result<Library> {
    Library::open(dir.path().join("library.db"))
}

fn sample_book(path: &str) -> Book {
    let mut book = Book::new("测试书", path);
    book.file_size = 1000;
    book.encoding = "utf-8".to_string();
    book.word_count = 300;
    book.chapter_count = 2;
    book
}

fn sample_chapters(book_id: i64) -> Vec<Chapter> {
    vec![
        Chapter {
            id: None,
            book_id,
            index: 0,
            title: "第一章 开端".to_string(),
            level: LEVEL_CHAPTER,
            byte_offset: 0,
            byte_length: 400,
        },
        Chapter {
            id: None,
            book_id,
            index: 1,
            title: "第二章 发展".to_string(),
            level: LEVEL_CHAPTER,
            byte_offset: 400,
            byte_length: 600,
        },
    ]
}

#[test]
fn test_book_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    let book = sample_book("/books/a.txt");
    let id = library.add_book(&book)?;
    let stored = library.get_book(id)?.expect("book should exist");

    assert_eq!(stored.id, Some(id));
    assert_eq!(stored.title, book.title);
    assert_eq!(stored.file_path, book.file_path);
    assert_eq!(stored.encoding, book.encoding);
    assert_eq!(stored.word_count, book.word_count);
    assert!(stored.last_read_at.is_none());
    Ok(())
}

#[test]
fn test_duplicate_path_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    library.add_book(&sample_book("/books/a.txt"))?;
    assert!(library.add_book(&sample_book("/books/a.txt")).is_err());
    Ok(())
}

#[test]
fn test_chapters_round_trip_in_index_order() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    let id = library.add_book(&sample_book("/books/a.txt"))?;
    library.add_chapters(id, &sample_chapters(id))?;

    let chapters = library.get_chapters(id)?;
    assert_eq!(chapters.len(), 2);
    assert_eq!(chapters[0].index, 0);
    assert_eq!(chapters[0].title, "第一章 开端");
    assert_eq!(chapters[1].byte_offset, 400);
    assert_eq!(chapters[1].byte_length, 600);
    Ok(())
}

#[test]
fn test_deleting_a_book_cascades_to_chapters() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    let id = library.add_book(&sample_book("/books/a.txt"))?;
    library.add_chapters(id, &sample_chapters(id))?;
    library.delete_book(id)?;

    assert!(library.get_book(id)?.is_none());
    assert!(library.get_chapters(id)?.is_empty());
    Ok(())
}

#[test]
fn test_replace_chapters_discards_old_table() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    let id = library.add_book(&sample_book("/books/a.txt"))?;
    library.add_chapters(id, &sample_chapters(id))?;

    let replacement = vec![Chapter {
        id: None,
        book_id: id,
        index: 0,
        title: "全文".to_string(),
        level: LEVEL_CHAPTER,
        byte_offset: 0,
        byte_length: 1000,
    }];
    library.replace_chapters(id, &replacement)?;

    let chapters = library.get_chapters(id)?;
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].title, "全文");
    Ok(())
}

#[test]
fn test_update_book_keeps_metadata_in_step_with_chapters() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    let id = library.add_book(&sample_book("/books/a.txt"))?;
    library.add_chapters(id, &sample_chapters(id))?;
    library.update_read_progress(id, 1, 250)?;

    // The file grew a third chapter; the book row must reflect the new
    // counts, not the ones from the first parse.
    let mut grown = sample_book("/books/a.txt");
    grown.file_size = 1500;
    grown.word_count = 450;
    grown.chapter_count = 3;
    let mut chapters = sample_chapters(id);
    chapters.push(Chapter {
        id: None,
        book_id: id,
        index: 2,
        title: "第三章 结尾".to_string(),
        level: LEVEL_CHAPTER,
        byte_offset: 1000,
        byte_length: 500,
    });
    library.update_book(id, &grown)?;
    library.replace_chapters(id, &chapters)?;

    let stored = library.get_book(id)?.expect("book should exist");
    assert_eq!(stored.chapter_count, 3);
    assert_eq!(stored.file_size, 1500);
    assert_eq!(stored.word_count, 450);
    assert_eq!(
        stored.chapter_count as usize,
        library.get_chapters(id)?.len()
    );
    // Reading progress survives the refresh.
    assert_eq!(stored.read_chapter_idx, 1);
    assert_eq!(stored.read_position, 250);
    Ok(())
}

#[test]
fn test_read_progress_updates_ordering() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    let first = library.add_book(&sample_book("/books/a.txt"))?;
    let second = library.add_book(&sample_book("/books/b.txt"))?;

    // Unread books come after read ones; reading the older book moves it
    // to the front.
    library.update_read_progress(first, 1, 250)?;
    let books = library.get_all_books()?;
    assert_eq!(books[0].id, Some(first));
    assert_eq!(books[0].read_chapter_idx, 1);
    assert_eq!(books[0].read_position, 250);
    assert!(books[0].last_read_at.is_some());
    assert_eq!(books[1].id, Some(second));
    Ok(())
}

#[test]
fn test_settings_default_then_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    assert_eq!(library.get_settings()?, Settings::default());

    let settings = Settings {
        line_spacing: 2,
        max_width: 100,
    };
    library.save_settings(&settings)?;
    assert_eq!(library.get_settings()?, settings);
    Ok(())
}

#[test]
fn test_settings_are_clamped_on_load() -> Result<()> {
    let dir = TempDir::new()?;
    let library = scratch_library(&dir)?;

    library.save_settings(&Settings {
        line_spacing: 9,
        max_width: 10_000,
    })?;
    let settings = library.get_settings()?;
    assert_eq!(settings.line_spacing, 2);
    assert_eq!(settings.max_width, 200);
    Ok(())
}

#[test]
fn test_reopening_the_same_database_keeps_data() -> Result<()> {
    let dir = TempDir::new()?;
    let id = {
        let library = scratch_library(&dir)?;
        library.add_book(&sample_book("/books/a.txt"))?
    };
    let library = scratch_library(&dir)?;
    assert!(library.get_book(id)?.is_some());
    Ok(())
}
