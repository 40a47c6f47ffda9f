use serde::{Deserialize, Serialize};

use crate::AnalysisError;

/// The input root: one novel, read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Novel {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub chapters: Vec<Chapter>,
}

/// One chapter of raw text. Indices are 1-based and contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub index: u32,
    pub title: String,
    pub text: String,
}

impl Chapter {
    /// Word count by the CJK convention: Unicode scalar values of the text.
    pub fn word_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// The per-chapter summary carried in the bundle and projected as a
/// Chapter node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub index: u32,
    pub title: String,
    pub word_count: usize,
}

impl Novel {
    /// Validate the input contract: a non-empty id, at least one chapter,
    /// 1-based contiguous indices, and no chapter with blank text.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.id.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("novel id is empty".into()));
        }
        if self.chapters.is_empty() {
            return Err(AnalysisError::InvalidInput("novel has no chapters".into()));
        }
        for (i, chapter) in self.chapters.iter().enumerate() {
            let expected = (i + 1) as u32;
            if chapter.index != expected {
                return Err(AnalysisError::InvalidInput(format!(
                    "chapter indices must be 1-based and contiguous: found {} at position {}",
                    chapter.index, expected
                )));
            }
            if chapter.text.trim().is_empty() {
                return Err(AnalysisError::InvalidInput(format!(
                    "chapter {} has no text",
                    chapter.index
                )));
            }
        }
        Ok(())
    }

    pub fn total_words(&self) -> usize {
        self.chapters.iter().map(Chapter::word_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn novel(chapters: Vec<Chapter>) -> Novel {
        Novel {
            id: "n1".into(),
            title: "test".into(),
            author: None,
            chapters,
        }
    }

    fn chapter(index: u32, text: &str) -> Chapter {
        Chapter {
            index,
            title: format!("第{}章", index),
            text: text.into(),
        }
    }

    #[test]
    fn test_validate_accepts_contiguous() {
        let n = novel(vec![chapter(1, "甲"), chapter(2, "乙")]);
        assert!(n.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_gap() {
        let n = novel(vec![chapter(1, "甲"), chapter(3, "乙")]);
        assert!(matches!(n.validate(), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_empty_text() {
        let n = novel(vec![chapter(1, "   ")]);
        assert!(matches!(n.validate(), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_no_chapters() {
        let n = novel(vec![]);
        assert!(matches!(n.validate(), Err(AnalysisError::InvalidInput(_))));
    }

    #[test]
    fn test_word_count_is_char_count() {
        let ch = chapter(1, "张三来了。");
        assert_eq!(ch.word_count(), 5);
    }
}
