//! Chinese text processing primitives.
//!
//! Wraps the segmenter and exposes the sentence, dialogue, and window
//! helpers the analysis stages build on. All operations are pure: no state
//! accumulates between calls beyond the loaded dictionary.

use jieba_rs::Jieba;
use regex::Regex;

use crate::models::Novel;
use crate::text::lexicon::Lexicons;
use crate::AnalysisError;

/// A quoted utterance with its attributed speaker, when one was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialogue {
    pub speaker: Option<String>,
    pub content: String,
    /// Character offset of the opening quote in the source text.
    pub position: usize,
}

/// A chapter after sentence segmentation, the unit the stages consume.
#[derive(Debug, Clone)]
pub struct ProcessedChapter {
    pub index: u32,
    pub title: String,
    pub text: String,
    pub sentences: Vec<String>,
    pub word_count: usize,
}

/// Text processor holding the loaded dictionary and compiled patterns.
pub struct TextProcessor {
    jieba: Jieba,
    re_speaker: Regex,
    re_noise: Regex,
    re_spaces: Regex,
}

const SENTENCE_TERMINATORS: [char; 5] = ['。', '！', '？', '!', '?'];

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProcessor {
    pub fn new() -> Self {
        Self {
            jieba: Jieba::new(),
            re_speaker: Regex::new(r"([^，。！？；：\s]{1,4})(说|道|问|答|笑|叹|喊)[：:，]?$")
                .expect("speaker regex"),
            re_noise: Regex::new(
                r#"[^\x{4e00}-\x{9fa5}a-zA-Z0-9，。！？；：、“”‘’（）《》"'\s]"#,
            )
            .expect("noise regex"),
            re_spaces: Regex::new(r"\s+").expect("spaces regex"),
        }
    }

    fn require_nonempty(text: &str) -> Result<(), AnalysisError> {
        if text.trim().is_empty() {
            return Err(AnalysisError::InvalidInput("empty text".into()));
        }
        Ok(())
    }

    /// Word segmentation.
    pub fn segment(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        Self::require_nonempty(text)?;
        Ok(self
            .jieba
            .cut(text, false)
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// Word segmentation with stop words removed.
    pub fn segment_filtered(
        &self,
        text: &str,
        lexicons: &Lexicons,
    ) -> Result<Vec<String>, AnalysisError> {
        let words = self.segment(text)?;
        Ok(words
            .into_iter()
            .filter(|w| !w.trim().is_empty() && !lexicons.stopwords.contains(w))
            .collect())
    }

    /// Segmentation with part-of-speech tags.
    pub fn tag(&self, text: &str) -> Result<Vec<(String, String)>, AnalysisError> {
        Self::require_nonempty(text)?;
        Ok(self
            .jieba
            .tag(text, false)
            .into_iter()
            .map(|t| (t.word.to_string(), t.tag.to_string()))
            .collect())
    }

    /// Split into sentences on 。！？!? and newlines.
    pub fn split_sentences(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        Self::require_nonempty(text)?;
        let mut sentences = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            if SENTENCE_TERMINATORS.contains(&ch) || ch == '\n' {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    sentences.push(trimmed.to_string());
                }
                current.clear();
            } else {
                current.push(ch);
            }
        }
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            sentences.push(trimmed.to_string());
        }
        Ok(sentences)
    }

    /// Sliding sentence windows of `size` with stride 1. A slice shorter
    /// than `size` yields itself as the single window.
    pub fn sentence_windows<'a>(&self, sentences: &'a [String], size: usize) -> Vec<&'a [String]> {
        let size = size.max(1);
        if sentences.is_empty() {
            return Vec::new();
        }
        if sentences.len() <= size {
            return vec![sentences];
        }
        sentences.windows(size).collect()
    }

    /// Extract quoted dialogue with tolerant quote matching.
    ///
    /// Matched pairs of Chinese double/single quotes and straight quotes are
    /// recognized; an unclosed quote is recovered by scanning to the next
    /// sentence terminator or end of text.
    pub fn extract_dialogues(&self, text: &str) -> Vec<Dialogue> {
        let chars: Vec<char> = text.chars().collect();
        let mut dialogues = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            let closer = match chars[i] {
                '“' => Some('”'),
                '‘' => Some('’'),
                '"' => Some('"'),
                _ => None,
            };
            let Some(closer) = closer else {
                i += 1;
                continue;
            };
            let start = i + 1;
            let mut end = start;
            let mut closed = false;
            while end < chars.len() {
                if chars[end] == closer {
                    closed = true;
                    break;
                }
                // Tolerant recovery: a fresh opener of the same kind means
                // the previous quote was never closed.
                if chars[end] == chars[i] && chars[i] != '"' {
                    break;
                }
                end += 1;
            }
            let content_end = if closed {
                end
            } else {
                // Unclosed: stop at the next sentence terminator.
                let mut stop = start;
                while stop < chars.len()
                    && !SENTENCE_TERMINATORS.contains(&chars[stop])
                    && chars[stop] != '\n'
                {
                    stop += 1;
                }
                stop
            };
            let content: String = chars[start..content_end].iter().collect();
            if !content.trim().is_empty() {
                dialogues.push(Dialogue {
                    speaker: self.attribute_speaker(&chars, i),
                    content: content.trim().to_string(),
                    position: i,
                });
            }
            i = content_end.saturating_add(1).max(i + 1);
        }
        dialogues
    }

    /// Look for "X说/道/问…" immediately before an opening quote.
    fn attribute_speaker(&self, chars: &[char], quote_pos: usize) -> Option<String> {
        let start = quote_pos.saturating_sub(20);
        let context: String = chars[start..quote_pos].iter().collect();
        self.re_speaker
            .captures(context.trim_end())
            .map(|caps| caps[1].to_string())
    }

    /// Collapse whitespace and strip characters outside the narrative set.
    pub fn clean_text(&self, text: &str) -> String {
        let stripped = self.re_noise.replace_all(text, "");
        self.re_spaces.replace_all(&stripped, " ").trim().to_string()
    }

    /// Top-N content words by frequency (stop words and single chars out).
    pub fn word_frequency(
        &self,
        text: &str,
        top_n: usize,
        lexicons: &Lexicons,
    ) -> Result<Vec<(String, usize)>, AnalysisError> {
        let words = self.segment_filtered(text, lexicons)?;
        let mut counts: std::collections::BTreeMap<String, usize> = std::collections::BTreeMap::new();
        for word in words {
            if word.chars().count() > 1 {
                *counts.entry(word).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top_n);
        Ok(ranked)
    }

    /// Stage entry point: sentence-segment every chapter of a novel.
    pub fn process(&self, novel: &Novel) -> Result<Vec<ProcessedChapter>, AnalysisError> {
        novel.validate()?;
        let mut chapters = Vec::with_capacity(novel.chapters.len());
        for chapter in &novel.chapters {
            chapters.push(ProcessedChapter {
                index: chapter.index,
                title: chapter.title.clone(),
                text: chapter.text.clone(),
                sentences: self.split_sentences(&chapter.text)?,
                word_count: chapter.word_count(),
            });
        }
        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor() -> TextProcessor {
        TextProcessor::new()
    }

    #[test]
    fn test_segment_rejects_empty() {
        let p = processor();
        assert!(matches!(
            p.segment("   "),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_split_sentences_terminators_and_newlines() {
        let p = processor();
        let sentences = p
            .split_sentences("张三来了。李四走了！\n王五在想什么？没有标点的结尾")
            .unwrap();
        assert_eq!(
            sentences,
            vec!["张三来了", "李四走了", "王五在想什么", "没有标点的结尾"]
        );
    }

    #[test]
    fn test_split_sentences_skips_blank_runs() {
        let p = processor();
        let sentences = p.split_sentences("甲。。。乙。").unwrap();
        assert_eq!(sentences, vec!["甲", "乙"]);
    }

    #[test]
    fn test_sentence_windows_stride_one() {
        let p = processor();
        let s: Vec<String> = ["一", "二", "三", "四"].iter().map(|x| x.to_string()).collect();
        let windows = p.sentence_windows(&s, 3);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].len(), 3);
        assert_eq!(windows[1][0], "二");
    }

    #[test]
    fn test_sentence_windows_short_input_is_one_window() {
        let p = processor();
        let s: Vec<String> = vec!["一".to_string()];
        let windows = p.sentence_windows(&s, 3);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].len(), 1);
    }

    #[test]
    fn test_extract_dialogues_chinese_quotes() {
        let p = processor();
        let dialogues = p.extract_dialogues("刘备说：“今日必胜。”众人称是。");
        assert_eq!(dialogues.len(), 1);
        assert_eq!(dialogues[0].content, "今日必胜。");
        assert_eq!(dialogues[0].speaker.as_deref(), Some("刘备"));
    }

    #[test]
    fn test_extract_dialogues_unclosed_quote_recovers() {
        let p = processor();
        let dialogues = p.extract_dialogues("他道：“此事休要再提。众人散去。");
        assert_eq!(dialogues.len(), 1);
        assert_eq!(dialogues[0].content, "此事休要再提");
    }

    #[test]
    fn test_extract_dialogues_without_speaker() {
        let p = processor();
        let dialogues = p.extract_dialogues("“谁在那里。”");
        assert_eq!(dialogues.len(), 1);
        assert!(dialogues[0].speaker.is_none());
    }

    #[test]
    fn test_clean_text_strips_noise() {
        let p = processor();
        let cleaned = p.clean_text("张三◆来了★，  很好。");
        assert_eq!(cleaned, "张三来了， 很好。");
    }

    #[test]
    fn test_tag_finds_person_names() {
        let p = processor();
        let tags = p.tag("刘备和曹操在洛阳相见。").unwrap();
        let person_tagged: Vec<&str> = tags
            .iter()
            .filter(|(_, t)| t.starts_with("nr"))
            .map(|(w, _)| w.as_str())
            .collect();
        assert!(person_tagged.contains(&"刘备"));
        assert!(person_tagged.contains(&"曹操"));
    }

    #[test]
    fn test_word_frequency_filters_single_chars() {
        let p = processor();
        let lex = Lexicons::builtin();
        let freq = p
            .word_frequency("宝剑出鞘，宝剑饮血，宝剑归鞘。", 5, &lex)
            .unwrap();
        assert_eq!(freq[0].0, "宝剑");
        assert_eq!(freq[0].1, 3);
        assert!(freq.iter().all(|(w, _)| w.chars().count() > 1));
    }
}
