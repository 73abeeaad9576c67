use crate::encoding;
use crate::logging;
use crate::models::{Book, Chapter, LEVEL_CHAPTER, LEVEL_VOLUME};
use eyre::Result;
use memchr::memmem;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Chapter titles are short lines; body text that merely mentions
/// "第X章" runs much longer, so the trailing run is capped at 50
/// characters to keep prose sentences from matching.
fn volume_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^第[零一二三四五六七八九十百千\d]+[卷部集].{0,50}$").unwrap()
    })
}

fn chapter_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^第[零一二三四五六七八九十百千万\d]+[章节回].{0,50}$").unwrap()
    })
}

/// Falling back to chunking, how many source lines go into one chapter.
const CHUNK_LINES: usize = 500;

/// Parse a txt file into a `Book` and its chapter table.
///
/// `progress` receives human-readable status strings as the parse moves
/// through its phases. A missing file is the only hard error; bad
/// encodings and unlocatable titles degrade into an imperfect but usable
/// chapter table.
pub fn parse_book(
    file_path: impl AsRef<Path>,
    progress: Option<&dyn Fn(&str)>,
) -> Result<(Book, Vec<Chapter>)> {
    let path = file_path.as_ref();
    if !path.exists() {
        return Err(eyre::eyre!("File not found: {}", path.display()));
    }
    // Store an absolute path so the library entry stays valid no matter
    // where a later session is launched from.
    let path = match path.canonicalize() {
        Ok(resolved) => resolved,
        Err(err) => {
            logging::debug(format!(
                "Could not canonicalize {}: {}",
                path.display(),
                err
            ));
            path.to_path_buf()
        }
    };
    let path = path.as_path();
    let report = |msg: &str| {
        if let Some(cb) = progress {
            cb(msg);
        }
    };

    report("读取文件...");
    let raw_bytes = std::fs::read(path)?;
    let file_size = raw_bytes.len();

    report("检测编码...");
    let enc_name = encoding::detect(&raw_bytes);
    let text = encoding::decode_lossy(enc_name, &raw_bytes);
    let word_count = text.chars().count();
    logging::debug(format!(
        "parsed {}: {} bytes, encoding {}",
        path.display(),
        file_size,
        enc_name
    ));

    report("匹配章节标题...");
    // (offset in decoded text, trimmed title, level), merged and sorted
    // so volumes and chapters interleave in file order.
    let mut matches: Vec<(usize, String, u8)> = Vec::new();
    for m in volume_pattern().find_iter(&text) {
        matches.push((m.start(), m.as_str().trim().to_string(), LEVEL_VOLUME));
    }
    for m in chapter_pattern().find_iter(&text) {
        matches.push((m.start(), m.as_str().trim().to_string(), LEVEL_CHAPTER));
    }
    matches.sort_by_key(|(offset, _, _)| *offset);

    let chapters = if matches.is_empty() {
        report("未检测到章节，按段落切分...");
        chunk_chapters(&text, enc_name, file_size)
    } else {
        report(&format!("计算 {} 个章节的偏移量...", matches.len()));
        matched_chapters(&raw_bytes, &matches, enc_name, file_size)
    };

    report(&format!("解析完成，共 {} 个章节", chapters.len()));

    let title = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mut book = Book::new(&title, &path.to_string_lossy());
    book.file_size = file_size as u64;
    book.encoding = enc_name.to_string();
    book.word_count = word_count as u64;
    book.chapter_count = chapters.len() as u64;

    Ok((book, chapters))
}

/// Map matched titles to byte offsets by searching the raw buffer for
/// each title's encoded bytes, cursor moving forward only. Searching raw
/// bytes directly sidesteps BOM and replacement-character round-trip
/// mismatches that a decode-then-reencode of whole spans would hit.
///
/// The forward-only cursor means a title quoted verbatim earlier in the
/// file resolves to the next occurrence at or after the cursor; an
/// unfindable title falls back to the cursor position so boundaries stay
/// monotonic instead of aborting the parse.
fn matched_chapters(
    raw_bytes: &[u8],
    matches: &[(usize, String, u8)],
    enc_name: &str,
    file_size: usize,
) -> Vec<Chapter> {
    let mut byte_offsets = Vec::with_capacity(matches.len());
    let mut search_from = 0usize;
    for (_, title, _) in matches {
        let title_bytes = encoding::encode(enc_name, title);
        match memmem::find(&raw_bytes[search_from..], &title_bytes) {
            Some(rel) => {
                let pos = search_from + rel;
                byte_offsets.push(pos);
                search_from = pos + title_bytes.len();
            }
            None => {
                logging::warn(format!("title bytes not found, using cursor: {}", title));
                byte_offsets.push(search_from);
            }
        }
    }

    matches
        .iter()
        .enumerate()
        .map(|(i, (_, title, level))| {
            let byte_offset = byte_offsets[i];
            let byte_length = if i + 1 < byte_offsets.len() {
                byte_offsets[i + 1] - byte_offset
            } else {
                file_size - byte_offset
            };
            Chapter {
                id: None,
                book_id: 0,
                index: i,
                title: title.clone(),
                level: *level,
                byte_offset: byte_offset as u64,
                byte_length: byte_length as u64,
            }
        })
        .collect()
}

/// No titles anywhere: one chapter for short files, otherwise fixed-size
/// line chunks titled by their first non-blank line.
fn chunk_chapters(text: &str, enc_name: &str, file_size: usize) -> Vec<Chapter> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= CHUNK_LINES {
        return vec![Chapter {
            id: None,
            book_id: 0,
            index: 0,
            title: "全文".to_string(),
            level: LEVEL_CHAPTER,
            byte_offset: 0,
            byte_length: file_size as u64,
        }];
    }

    let newline_len = encoding::encode(enc_name, "\n").len();
    let mut chapters = Vec::new();
    let mut byte_pos = 0usize;
    let mut seg_idx = 0usize;
    let mut start = 0usize;
    while start < lines.len() {
        let end = (start + CHUNK_LINES).min(lines.len());
        let segment = lines[start..end].join("\n");
        let byte_length = if end < lines.len() {
            encoding::encode(enc_name, &segment).len() + newline_len
        } else {
            // The final chunk runs to end of file, absorbing any drift a
            // lossy decode introduced into the re-encoded lengths.
            file_size.saturating_sub(byte_pos)
        };

        let first_line = lines[start].trim();
        let title = if first_line.is_empty() {
            format!("第 {} 段", seg_idx + 1)
        } else {
            first_line.chars().take(30).collect()
        };

        chapters.push(Chapter {
            id: None,
            book_id: 0,
            index: seg_idx,
            title,
            level: LEVEL_CHAPTER,
            byte_offset: byte_pos as u64,
            byte_length: byte_length as u64,
        });
        byte_pos += byte_length;
        seg_idx += 1;
        start = end;
    }
    chapters
}
