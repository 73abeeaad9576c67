use crate::encoding;
use crate::models::Chapter;
use eyre::Result;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Random-access reader over one book file. Opens the file fresh on
/// every call and decodes exactly the requested span, so any number of
/// readers can work on the same book concurrently.
pub struct BookReader {
    file_path: PathBuf,
    encoding: String,
}

impl BookReader {
    pub fn new(file_path: impl AsRef<Path>, encoding: &str) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            encoding: encoding.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Read an arbitrary byte range and decode it with replacement of
    /// invalid sequences. A span that runs past end of file yields the
    /// bytes that exist. The only error is the file being gone, which
    /// callers surface as a recoverable notice, since the chapter table
    /// may outlive the file it points at.
    pub fn read_range(&self, byte_offset: u64, byte_length: u64) -> Result<String> {
        let mut file = File::open(&self.file_path)?;
        file.seek(SeekFrom::Start(byte_offset))?;
        let mut raw = Vec::with_capacity(byte_length as usize);
        file.take(byte_length).read_to_end(&mut raw)?;
        Ok(encoding::decode_lossy(&self.encoding, &raw))
    }

    /// Read one chapter's exact span.
    pub fn read_chapter(&self, chapter: &Chapter) -> Result<String> {
        self.read_range(chapter.byte_offset, chapter.byte_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LEVEL_CHAPTER;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn test_read_range_exact_span() {
        let file = write_temp("abcdef".as_bytes());
        let reader = BookReader::new(file.path(), "utf-8");
        assert_eq!(reader.read_range(2, 3).unwrap(), "cde");
    }

    #[test]
    fn test_read_range_multibyte() {
        // 你=3 bytes, 好=3 bytes in UTF-8.
        let file = write_temp("你好世界".as_bytes());
        let reader = BookReader::new(file.path(), "utf-8");
        assert_eq!(reader.read_range(3, 6).unwrap(), "好世");
    }

    #[test]
    fn test_read_range_gbk() {
        let raw = crate::encoding::encode("gbk", "第一章 开端");
        let file = write_temp(&raw);
        let reader = BookReader::new(file.path(), "gbk");
        let text = reader.read_range(0, raw.len() as u64).unwrap();
        assert_eq!(text, "第一章 开端");
    }

    #[test]
    fn test_read_range_past_eof() {
        let file = write_temp("short".as_bytes());
        let reader = BookReader::new(file.path(), "utf-8");
        assert_eq!(reader.read_range(2, 100).unwrap(), "ort");
    }

    #[test]
    fn test_read_range_torn_span_never_errors() {
        // A span cut mid-character decodes with replacement, not error.
        let file = write_temp("你好".as_bytes());
        let reader = BookReader::new(file.path(), "utf-8");
        let text = reader.read_range(0, 4).unwrap();
        assert!(text.starts_with('你'));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_read_chapter() {
        let file = write_temp("第一章 开端\n正文内容。\n".as_bytes());
        let reader = BookReader::new(file.path(), "utf-8");
        let chapter = Chapter {
            id: None,
            book_id: 0,
            index: 0,
            title: "第一章 开端".to_string(),
            level: LEVEL_CHAPTER,
            byte_offset: 0,
            byte_length: "第一章 开端".len() as u64,
        };
        assert_eq!(reader.read_chapter(&chapter).unwrap(), "第一章 开端");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let reader = BookReader::new("/no/such/file.txt", "utf-8");
        let err = reader.read_range(0, 10).unwrap_err();
        let io_err = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io_err.kind(), std::io::ErrorKind::NotFound);
    }
}
