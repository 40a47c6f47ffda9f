//! Plain-text novel ingestion.
//!
//! Splits a .txt file into chapters on common heading patterns (第X章,
//! 第X回, Chapter N, numbered lists); a text without recognizable headings
//! becomes a single chapter. Title and author are sniffed from the first
//! lines when present.

use std::path::Path;

use regex::Regex;

use crate::models::{Chapter, Novel};
use crate::AnalysisError;

/// Parse a UTF-8 text file into a `Novel`.
pub fn parse_file(path: &Path, id: Option<String>) -> Result<Novel, AnalysisError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AnalysisError::InvalidInput(format!("cannot read {}: {}", path.display(), e))
    })?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "novel".to_string());
    let id = id.unwrap_or_else(|| stem.clone());
    parse_text(&id, &stem, &content)
}

/// Parse raw text into a `Novel` with the given id and fallback title.
pub fn parse_text(id: &str, default_title: &str, content: &str) -> Result<Novel, AnalysisError> {
    if content.trim().is_empty() {
        return Err(AnalysisError::InvalidInput("novel text is empty".into()));
    }

    let heading_patterns = [
        Regex::new(r"^第[零一二三四五六七八九十百千万\d]+[章回]").expect("heading regex"),
        Regex::new(r"^Chapter\s+\d+").expect("heading regex"),
        Regex::new(r"^\d+[.、]").expect("heading regex"),
    ];
    let is_heading = |line: &str| heading_patterns.iter().any(|re| re.is_match(line));

    let (title, author) = sniff_metadata(content, default_title);

    let mut chapters: Vec<Chapter> = Vec::new();
    let mut current_title: Option<String> = None;
    let mut current_lines: Vec<&str> = Vec::new();

    let flush =
        |chapters: &mut Vec<Chapter>, title: Option<String>, lines: &mut Vec<&str>| {
            if let Some(title) = title {
                let text = lines.join("\n");
                if !text.trim().is_empty() {
                    chapters.push(Chapter {
                        index: chapters.len() as u32 + 1,
                        title,
                        text,
                    });
                }
            }
            lines.clear();
        };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_heading(line) {
            flush(&mut chapters, current_title.take(), &mut current_lines);
            current_title = Some(line.to_string());
        } else if current_title.is_some() {
            current_lines.push(line);
        }
    }
    flush(&mut chapters, current_title.take(), &mut current_lines);

    // No recognizable headings: the whole text is one chapter.
    if chapters.is_empty() {
        chapters.push(Chapter {
            index: 1,
            title: "全文".to_string(),
            text: content.trim().to_string(),
        });
    }

    let novel = Novel {
        id: id.to_string(),
        title,
        author,
        chapters,
    };
    novel.validate()?;
    Ok(novel)
}

/// Look for 书名/作者 header lines within the first ten lines.
fn sniff_metadata(content: &str, default_title: &str) -> (String, Option<String>) {
    let mut title = default_title.to_string();
    let mut author = None;
    for line in content.lines().take(10) {
        let line = line.trim();
        if let Some(rest) = line
            .strip_prefix("书名：")
            .or_else(|| line.strip_prefix("书名:"))
        {
            if !rest.trim().is_empty() {
                title = rest.trim().to_string();
            }
        } else if let Some(rest) = line
            .strip_prefix("作者：")
            .or_else(|| line.strip_prefix("作者:"))
        {
            if !rest.trim().is_empty() {
                author = Some(rest.trim().to_string());
            }
        }
    }
    (title, author)
}
