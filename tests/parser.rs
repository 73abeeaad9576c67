use std::fs;
use std::io::Write;

use eyre::Result;
use tempfile::TempDir;

use juan::models::{LEVEL_CHAPTER, LEVEL_VOLUME};
use juan::parser::parse_book;
use juan::reader::BookReader;

fn write_novel(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_three_chapter_headings() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_novel(
        &dir,
        "novel.txt",
        "第一章 开端\n正文第一段。\n\n第二章 发展\n正文第二段。\n\n第三章 结尾\n正文第三段。\n",
    );

    let (book, chapters) = parse_book(&path, None)?;

    assert_eq!(book.encoding, "utf-8");
    assert_eq!(chapters.len(), 3);
    assert_eq!(chapters[0].title, "第一章 开端");
    assert_eq!(chapters[1].title, "第二章 发展");
    assert_eq!(chapters[2].title, "第三章 结尾");
    for chapter in &chapters {
        assert_eq!(chapter.level, LEVEL_CHAPTER);
    }
    Ok(())
}

#[test]
fn test_volumes_and_chapters_interleaved() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_novel(
        &dir,
        "novel.txt",
        "第一卷 风起\n第一章 少年\n内容甲。\n第二章 出门\n内容乙。\n第二卷 云涌\n第三章 江湖\n内容丙。\n",
    );

    let (_, chapters) = parse_book(&path, None)?;

    assert_eq!(chapters.len(), 5);
    assert_eq!(chapters[0].title, "第一卷 风起");
    assert_eq!(chapters[0].level, LEVEL_VOLUME);
    assert_eq!(chapters[1].level, LEVEL_CHAPTER);
    assert_eq!(chapters[3].title, "第二卷 云涌");
    assert_eq!(chapters[3].level, LEVEL_VOLUME);
    // Indices follow document order regardless of level.
    for (i, chapter) in chapters.iter().enumerate() {
        assert_eq!(chapter.index, i);
    }
    Ok(())
}

#[test]
fn test_headingless_text_falls_back_to_chunks() -> Result<()> {
    let dir = TempDir::new()?;
    let mut content = String::new();
    for i in 0..1200 {
        content.push_str(&format!("平淡的第 {} 行，没有任何标题。\n", i));
    }
    let path = write_novel(&dir, "plain.txt", &content);

    let (_, chapters) = parse_book(&path, None)?;

    assert_eq!(chapters.len(), 3);
    // Chunk titles come from the first line of each 500-line block.
    assert!(chapters[0].title.starts_with("平淡的第 0 行"));
    assert!(chapters[1].title.starts_with("平淡的第 500 行"));
    assert!(chapters[2].title.starts_with("平淡的第 1000 行"));
    Ok(())
}

#[test]
fn test_short_headingless_text_is_one_chapter() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_novel(&dir, "short.txt", "只有一点点内容。\n再来一行。\n");

    let (book, chapters) = parse_book(&path, None)?;

    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].title, "全文");
    assert_eq!(chapters[0].byte_offset, 0);
    assert_eq!(chapters[0].byte_length, book.file_size);
    Ok(())
}

#[test]
fn test_chapters_are_contiguous_and_cover_the_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_novel(
        &dir,
        "novel.txt",
        "前言部分，不属于任何标题之前的章节判定。\n第一章 开端\n一些内容。\n第二章 发展\n更多内容。\n",
    );

    let (book, chapters) = parse_book(&path, None)?;

    for pair in chapters.windows(2) {
        assert_eq!(
            pair[0].byte_offset + pair[0].byte_length,
            pair[1].byte_offset
        );
    }
    let last = chapters.last().unwrap();
    assert_eq!(last.byte_offset + last.byte_length, book.file_size);
    Ok(())
}

#[test]
fn test_gbk_file_offsets_are_byte_accurate() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("gbk.txt");
    let text = "第一章 开端\n你好世界。\n第二章 发展\n再见世界。\n";
    let (encoded, _, _) = encoding_rs::GBK.encode(text);
    let mut file = fs::File::create(&path)?;
    file.write_all(&encoded)?;
    drop(file);
    let path = path.to_string_lossy().to_string();

    let (book, chapters) = parse_book(&path, None)?;

    assert_eq!(book.encoding, "gb18030");
    assert_eq!(chapters.len(), 2);

    // Reading each chapter back through its byte span must reproduce the
    // title on the first line.
    let reader = BookReader::new(&path, &book.encoding);
    for chapter in &chapters {
        let content = reader.read_chapter(chapter)?;
        assert!(
            content.starts_with(&chapter.title),
            "chapter {:?} did not round-trip: {:?}",
            chapter.title,
            &content[..content.len().min(60)]
        );
    }
    Ok(())
}

#[test]
fn test_progress_messages_arrive_in_order() -> Result<()> {
    let dir = TempDir::new()?;
    let path = write_novel(&dir, "novel.txt", "第一章 开端\n内容。\n");

    let messages = std::cell::RefCell::new(Vec::new());
    let progress = |msg: &str| messages.borrow_mut().push(msg.to_string());
    parse_book(&path, Some(&progress))?;

    let messages = messages.into_inner();
    assert_eq!(messages[0], "读取文件...");
    assert_eq!(messages[1], "检测编码...");
    assert!(messages.contains(&"匹配章节标题...".to_string()));
    assert!(messages.last().unwrap().starts_with("解析完成"));
    Ok(())
}

#[test]
fn test_stored_path_is_resolved_to_absolute() -> Result<()> {
    let dir = TempDir::new()?;
    fs::create_dir(dir.path().join("sub"))?;
    write_novel(&dir, "novel.txt", "第一章 开端\n内容。\n");

    // A path that wanders through ".." still persists in resolved form,
    // so the same file can never enter the library under two spellings.
    let crooked = dir.path().join("sub").join("..").join("novel.txt");
    let (book, _) = parse_book(&crooked, None)?;

    let stored = std::path::Path::new(&book.file_path);
    assert!(stored.is_absolute());
    assert_eq!(stored, fs::canonicalize(&crooked)?);
    Ok(())
}

#[test]
fn test_missing_file_is_an_error() {
    let result = parse_book("/no/such/file.txt", None);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("File not found"));
}
