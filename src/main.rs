use juan::{
    cli::Cli,
    config, logging,
    parser,
    state::Library,
    ui::app::App,
};

use clap::Parser;
use eyre::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => logging::LogLevel::Warn,
        1 => logging::LogLevel::Info,
        _ => logging::LogLevel::Debug,
    };
    logging::init(log_level, config::log_file_path().ok());

    if cli.dump {
        let file = match &cli.file {
            Some(file) => file,
            None => return Err(eyre::eyre!("--dump requires a file argument")),
        };
        return dump_chapters(file);
    }

    if cli.history {
        return print_history();
    }

    let library = Library::open_default()?;
    let mut app = App::new(library)?;
    if let Some(file) = &cli.file {
        app.open_path(file)?;
    }
    app.run()
}

/// Parse a file and print its chapter table as JSON, without the TUI.
fn dump_chapters(file: &str) -> Result<()> {
    let (book, chapters) = parser::parse_book(file, None)?;
    let dump = serde_json::json!({
        "title": book.title,
        "file_path": book.file_path,
        "file_size": book.file_size,
        "encoding": book.encoding,
        "word_count": book.word_count,
        "chapters": chapters,
    });
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

/// Print the reading history, most recently read first.
fn print_history() -> Result<()> {
    let library = Library::open_default()?;
    let books = library.get_all_books()?;
    if books.is_empty() {
        println!("书架是空的");
        return Ok(());
    }
    for book in books {
        let last_read = book
            .last_read_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "未读".to_string());
        println!(
            "{}  [{} 章, 第 {} 章]  {}",
            book.title,
            book.chapter_count,
            book.read_chapter_idx + 1,
            last_read
        );
    }
    Ok(())
}
