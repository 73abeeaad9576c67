use crate::logging;
use crate::models::{Chapter, SearchResult};
use crate::reader::BookReader;

/// Characters of context kept on each side of a match.
const CONTEXT_CHARS: usize = 40;

/// Scans chapter text for substring matches, chapter by chapter through
/// the reader so no more than one chapter is decoded at a time.
pub struct BookSearcher<'a> {
    reader: &'a BookReader,
    chapters: &'a [Chapter],
}

impl<'a> BookSearcher<'a> {
    pub fn new(reader: &'a BookReader, chapters: &'a [Chapter]) -> Self {
        Self { reader, chapters }
    }

    /// Search every chapter in index order. Results are ordered by
    /// (chapter index, position); overlapping occurrences are all
    /// reported because scanning resumes one character past each hit.
    /// Case folding is ASCII-only; CJK text has no case, and full
    /// Unicode folding is not claimed. Chapters whose file cannot be
    /// read are skipped rather than failing the whole search.
    pub fn search(&self, query: &str, case_sensitive: bool) -> Vec<SearchResult> {
        let query_chars = fold_chars(query, case_sensitive);
        if query_chars.is_empty() {
            return Vec::new();
        }

        let mut results = Vec::new();
        for chapter in self.chapters {
            let text = match self.reader.read_chapter(chapter) {
                Ok(text) => text,
                Err(err) => {
                    logging::warn(format!(
                        "skipping unreadable chapter {}: {}",
                        chapter.index, err
                    ));
                    continue;
                }
            };
            self.scan_chapter(chapter, &text, &query_chars, case_sensitive, &mut results);
        }
        results
    }

    fn scan_chapter(
        &self,
        chapter: &Chapter,
        text: &str,
        query_chars: &[char],
        case_sensitive: bool,
        results: &mut Vec<SearchResult>,
    ) {
        let chars: Vec<char> = text.chars().collect();
        let folded = fold_chars(text, case_sensitive);
        if folded.len() < query_chars.len() {
            return;
        }

        let mut pos = 0;
        while pos + query_chars.len() <= folded.len() {
            if folded[pos..pos + query_chars.len()] == *query_chars {
                results.push(SearchResult {
                    chapter_idx: chapter.index,
                    chapter_title: chapter.title.clone(),
                    char_offset: pos,
                    context: snippet(&chars, pos, query_chars.len()),
                });
            }
            pos += 1;
        }
    }
}

fn fold_chars(text: &str, case_sensitive: bool) -> Vec<char> {
    if case_sensitive {
        text.chars().collect()
    } else {
        text.chars().map(|c| c.to_ascii_lowercase()).collect()
    }
}

/// Bounded context around a match: the hit plus up to 40 characters each
/// side, newlines flattened to spaces, ellipsis markers wherever the
/// snippet was cut short of a text boundary.
fn snippet(chars: &[char], pos: usize, query_len: usize) -> String {
    let ctx_start = pos.saturating_sub(CONTEXT_CHARS);
    let ctx_end = (pos + query_len + CONTEXT_CHARS).min(chars.len());
    let mut context: String = chars[ctx_start..ctx_end]
        .iter()
        .map(|&c| if c == '\n' { ' ' } else { c })
        .collect();
    if ctx_start > 0 {
        context = format!("...{}", context);
    }
    if ctx_end < chars.len() {
        context.push_str("...");
    }
    context
}
