use crate::models::{Book, Chapter, SearchResult};
use crate::parser;
use crate::reader::BookReader;
use crate::search::BookSearcher;
use std::sync::mpsc::{Receiver, channel};
use std::thread;

/// Events from a background parse. Any number of `Progress` messages,
/// then exactly one `Done`.
pub enum ParseEvent {
    Progress(String),
    Done(Result<(Book, Vec<Chapter>), String>),
}

/// Parse a file on a worker thread. The event loop polls the returned
/// receiver; dropping it abandons the parse, whose final send then
/// fails silently. There is no cancellation.
pub fn spawn_parse(file_path: String) -> Receiver<ParseEvent> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let progress_tx = tx.clone();
        let progress = move |msg: &str| {
            let _ = progress_tx.send(ParseEvent::Progress(msg.to_string()));
        };
        let result = parser::parse_book(&file_path, Some(&progress))
            .map_err(|err| err.to_string());
        let _ = tx.send(ParseEvent::Done(result));
    });
    rx
}

/// Run a full-book search on a worker thread. The chapter table is
/// immutable once built, so the worker takes its own copy and reads the
/// file independently of whatever the UI is doing.
pub fn spawn_search(
    file_path: String,
    encoding: String,
    chapters: Vec<Chapter>,
    query: String,
) -> Receiver<Vec<SearchResult>> {
    let (tx, rx) = channel();
    thread::spawn(move || {
        let reader = BookReader::new(&file_path, &encoding);
        let searcher = BookSearcher::new(&reader, &chapters);
        let results = searcher.search(&query, false);
        let _ = tx.send(results);
    });
    rx
}
