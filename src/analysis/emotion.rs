//! Chapter sentiment, six-way emotion distributions, directed character
//! emotions, and the emotional curve with its peaks and troughs.

use std::sync::Arc;

use tracing::info;

use crate::analysis::names::NameIndex;
use crate::config::AnalysisConfig;
use crate::models::{
    Character, CharacterEmotion, ChapterEmotion, CurvePoint, EmotionCategory, EmotionDistribution,
    EmotionalPeak, PeakKind,
};
use crate::text::{Lexicons, ProcessedChapter};

/// Sentence-level sentiment scoring, injected into the pipeline.
pub trait SentimentScorer: Send + Sync {
    /// Score one sentence in [-1, 1]; 0 for neutral text.
    fn score(&self, sentence: &str) -> f64;
}

/// Default scorer: lexicon polarity counting.
pub struct LexiconSentimentScorer {
    lexicons: Arc<Lexicons>,
}

impl LexiconSentimentScorer {
    pub fn new(lexicons: Arc<Lexicons>) -> Self {
        Self { lexicons }
    }
}

impl SentimentScorer for LexiconSentimentScorer {
    fn score(&self, sentence: &str) -> f64 {
        let mut positive = 0usize;
        let mut negative = 0usize;
        let mut matched = 0usize;
        for (word, category) in &self.lexicons.emotion_words {
            let hits = sentence.matches(word.as_str()).count();
            if hits == 0 {
                continue;
            }
            matched += hits;
            if category.polarity() > 0.0 {
                positive += hits;
            } else if category.polarity() < 0.0 {
                negative += hits;
            }
        }
        if matched == 0 {
            return 0.0;
        }
        ((positive as f64 - negative as f64) / matched as f64).clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct EmotionAnalysis {
    pub chapter_emotions: Vec<ChapterEmotion>,
    pub character_emotions: Vec<CharacterEmotion>,
    pub curve: Vec<CurvePoint>,
    pub peaks: Vec<EmotionalPeak>,
}

pub struct EmotionAnalyzer<'a> {
    lexicons: &'a Lexicons,
    config: &'a AnalysisConfig,
    scorer: &'a dyn SentimentScorer,
}

impl<'a> EmotionAnalyzer<'a> {
    pub fn new(
        lexicons: &'a Lexicons,
        config: &'a AnalysisConfig,
        scorer: &'a dyn SentimentScorer,
    ) -> Self {
        Self {
            lexicons,
            config,
            scorer,
        }
    }

    pub fn analyze(
        &self,
        chapters: &[ProcessedChapter],
        characters: &[Character],
    ) -> EmotionAnalysis {
        let index = NameIndex::build(characters);

        let mut chapter_emotions = Vec::with_capacity(chapters.len());
        let mut character_emotions = Vec::new();
        for chapter in chapters {
            chapter_emotions.push(self.chapter_emotion(chapter));
            character_emotions.extend(self.directed_emotions(chapter, &index));
        }

        let curve: Vec<CurvePoint> = chapter_emotions
            .iter()
            .map(|e| CurvePoint {
                chapter: e.chapter,
                sentiment: e.sentiment,
            })
            .collect();
        let peaks = detect_peaks(&curve, self.config.peak_ma_window);

        info!(
            chapters = chapter_emotions.len(),
            peaks = peaks.len(),
            "emotion analysis complete"
        );
        EmotionAnalysis {
            chapter_emotions,
            character_emotions,
            curve,
            peaks,
        }
    }

    fn chapter_emotion(&self, chapter: &ProcessedChapter) -> ChapterEmotion {
        let sentiment = if chapter.sentences.is_empty() {
            0.0
        } else {
            let sum: f64 = chapter
                .sentences
                .iter()
                .map(|s| self.scorer.score(s))
                .sum();
            (sum / chapter.sentences.len() as f64).clamp(-1.0, 1.0)
        };

        let counts: Vec<(EmotionCategory, usize)> = EmotionCategory::ALL
            .iter()
            .map(|cat| {
                let hits = self
                    .lexicons
                    .emotion_words
                    .iter()
                    .filter(|(_, c)| c == cat)
                    .map(|(w, _)| chapter.text.matches(w.as_str()).count())
                    .sum();
                (*cat, hits)
            })
            .collect();

        ChapterEmotion {
            chapter: chapter.index,
            sentiment,
            distribution: EmotionDistribution::from_counts(&counts),
        }
    }

    /// Directed emotions from sentences mentioning both endpoints; the
    /// earlier-mentioned character is taken as the source.
    fn directed_emotions(
        &self,
        chapter: &ProcessedChapter,
        index: &NameIndex,
    ) -> Vec<CharacterEmotion> {
        use std::collections::BTreeMap;

        struct PairData {
            count: usize,
            sentiment_sum: f64,
            category_counts: BTreeMap<EmotionCategory, usize>,
        }

        let mut pairs: BTreeMap<(String, String), PairData> = BTreeMap::new();
        for sentence in &chapter.sentences {
            let present = index.find(sentence);
            if present.len() < 2 {
                continue;
            }
            // Order by first occurrence of any alias in the sentence.
            let mut positioned: Vec<(usize, &String)> = present
                .iter()
                .map(|name| {
                    (
                        index.first_position(sentence, name).unwrap_or(usize::MAX),
                        name,
                    )
                })
                .collect();
            positioned.sort();

            let sentiment = self.scorer.score(sentence);
            let mut category_hits: Vec<(EmotionCategory, usize)> = Vec::new();
            for cat in EmotionCategory::ALL {
                let hits: usize = self
                    .lexicons
                    .emotion_words
                    .iter()
                    .filter(|(_, c)| *c == cat)
                    .map(|(w, _)| sentence.matches(w.as_str()).count())
                    .sum();
                if hits > 0 {
                    category_hits.push((cat, hits));
                }
            }
            if category_hits.is_empty() {
                continue;
            }

            for (i, (_, source)) in positioned.iter().enumerate() {
                for (_, target) in positioned.iter().skip(i + 1) {
                    let entry = pairs
                        .entry(((*source).clone(), (*target).clone()))
                        .or_insert(PairData {
                            count: 0,
                            sentiment_sum: 0.0,
                            category_counts: BTreeMap::new(),
                        });
                    entry.count += 1;
                    entry.sentiment_sum += sentiment;
                    for (cat, hits) in &category_hits {
                        *entry.category_counts.entry(*cat).or_insert(0) += hits;
                    }
                }
            }
        }

        pairs
            .into_iter()
            .map(|((source, target), data)| {
                let mean = data.sentiment_sum / data.count as f64;
                let dominant = data
                    .category_counts
                    .iter()
                    .max_by(|a, b| a.1.cmp(b.1))
                    .map(|(cat, _)| *cat)
                    .unwrap_or(EmotionCategory::Joy);
                // Intensity: |sentiment| scaled up with co-occurrence count.
                let intensity =
                    (mean.abs() * (1.0 + 0.2 * (data.count as f64 - 1.0))).clamp(0.0, 1.0);
                CharacterEmotion {
                    source,
                    target,
                    chapter: chapter.index,
                    kind: dominant,
                    intensity,
                }
            })
            .collect()
    }
}

/// Peaks and troughs: plateau-collapsed local extrema whose deviation from
/// the moving-average baseline exceeds one standard deviation of the curve.
/// The earliest chapter of a plateau is chosen.
pub fn detect_peaks(curve: &[CurvePoint], ma_window: usize) -> Vec<EmotionalPeak> {
    if curve.len() < 3 {
        return Vec::new();
    }
    let values: Vec<f64> = curve.iter().map(|p| p.sentiment).collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let sigma = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64)
        .sqrt();
    if sigma < 1e-12 {
        return Vec::new();
    }

    let half = ma_window.max(1) / 2;

    // Collapse plateaus into runs of equal value.
    let mut runs: Vec<(usize, usize, f64)> = Vec::new(); // (start, end inclusive, value)
    let mut start = 0;
    for i in 1..=values.len() {
        if i == values.len() || (values[i] - values[start]).abs() > 1e-12 {
            runs.push((start, i - 1, values[start]));
            start = i;
        }
    }

    // Baseline around a run: the moving average of its window neighbors,
    // excluding the run itself so the extremum cannot absorb its own
    // baseline.
    let run_baseline = |run_start: usize, run_end: usize| -> f64 {
        let lo = run_start.saturating_sub(half);
        let hi = (run_end + half + 1).min(values.len());
        let neighbors: Vec<f64> = (lo..hi)
            .filter(|i| *i < run_start || *i > run_end)
            .map(|i| values[i])
            .collect();
        if neighbors.is_empty() {
            mean
        } else {
            neighbors.iter().sum::<f64>() / neighbors.len() as f64
        }
    };

    let mut peaks = Vec::new();
    for w in 1..runs.len().saturating_sub(1) {
        let (first, last, value) = runs[w];
        let prev = runs[w - 1].2;
        let next = runs[w + 1].2;
        let deviation = value - run_baseline(first, last);
        if value > prev && value > next && deviation > sigma {
            peaks.push(EmotionalPeak {
                chapter: curve[first].chapter,
                sentiment: value,
                kind: PeakKind::High,
            });
        } else if value < prev && value < next && -deviation > sigma {
            peaks.push(EmotionalPeak {
                chapter: curve[first].chapter,
                sentiment: value,
                kind: PeakKind::Low,
            });
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Classification;
    use crate::text::TextProcessor;
    use std::collections::BTreeSet;

    fn character(name: &str) -> Character {
        Character {
            name: name.into(),
            aliases: BTreeSet::from([name.to_string()]),
            mention_count: 5,
            first_appearance: 1,
            chapters_present: BTreeSet::from([1]),
            importance: 0.5,
            degree_centrality: 0.0,
            classification: Classification::Main,
        }
    }

    fn chapter(index: u32, text: &str) -> ProcessedChapter {
        let processor = TextProcessor::new();
        ProcessedChapter {
            index,
            title: format!("第{}章", index),
            text: text.into(),
            sentences: processor.split_sentences(text).unwrap(),
            word_count: text.chars().count(),
        }
    }

    fn point(chapter: u32, sentiment: f64) -> CurvePoint {
        CurvePoint { chapter, sentiment }
    }

    #[test]
    fn test_lexicon_scorer_polarity() {
        let scorer = LexiconSentimentScorer::new(Arc::new(Lexicons::builtin()));
        assert!(scorer.score("众人十分高兴，笑了") > 0.0);
        assert!(scorer.score("他很悲伤，痛苦不已") < 0.0);
        assert_eq!(scorer.score("他走了过去"), 0.0);
    }

    #[test]
    fn test_chapter_sentiment_and_distribution() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let scorer = LexiconSentimentScorer::new(Arc::new(Lexicons::builtin()));
        let analyzer = EmotionAnalyzer::new(&lexicons, &config, &scorer);
        let chapters = vec![chapter(1, "甲很高兴。乙在笑。")];
        let result = analyzer.analyze(&chapters, &[]);
        let e = &result.chapter_emotions[0];
        assert!(e.sentiment > 0.0);
        assert!((e.distribution.sum() - 1.0).abs() < 1e-6);
        assert_eq!(e.distribution.dominant(), EmotionCategory::Joy);
    }

    #[test]
    fn test_neutral_chapter_gets_uniform_distribution() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let scorer = LexiconSentimentScorer::new(Arc::new(Lexicons::builtin()));
        let analyzer = EmotionAnalyzer::new(&lexicons, &config, &scorer);
        let chapters = vec![chapter(1, "甲走了过去。乙跟在后面。")];
        let result = analyzer.analyze(&chapters, &[]);
        let e = &result.chapter_emotions[0];
        assert_eq!(e.sentiment, 0.0);
        assert_eq!(e.distribution, EmotionDistribution::uniform());
    }

    #[test]
    fn test_directed_emotion_earlier_mention_is_source() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let scorer = LexiconSentimentScorer::new(Arc::new(Lexicons::builtin()));
        let analyzer = EmotionAnalyzer::new(&lexicons, &config, &scorer);
        let chapters = vec![chapter(1, "刘备恨曹操。")];
        let result = analyzer.analyze(&chapters, &[character("刘备"), character("曹操")]);
        assert_eq!(result.character_emotions.len(), 1);
        let ce = &result.character_emotions[0];
        assert_eq!(ce.source, "刘备");
        assert_eq!(ce.target, "曹操");
        assert_eq!(ce.kind, EmotionCategory::Anger);
        assert!(ce.intensity > 0.0 && ce.intensity <= 1.0);
    }

    #[test]
    fn test_detect_peaks_finds_trough() {
        let curve = vec![
            point(1, 0.0),
            point(2, 0.5),
            point(3, 0.0),
            point(4, -0.8),
            point(5, 0.0),
        ];
        let peaks = detect_peaks(&curve, 3);
        let trough = peaks.iter().find(|p| p.kind == PeakKind::Low).unwrap();
        assert_eq!(trough.chapter, 4);
    }

    #[test]
    fn test_detect_peaks_plateau_takes_earliest_chapter() {
        let curve = vec![
            point(1, 0.0),
            point(2, 0.9),
            point(3, 0.9),
            point(4, 0.0),
            point(5, -0.9),
            point(6, 0.0),
        ];
        let peaks = detect_peaks(&curve, 3);
        let high = peaks.iter().find(|p| p.kind == PeakKind::High).unwrap();
        assert_eq!(high.chapter, 2);
    }

    #[test]
    fn test_detect_peaks_flat_curve_has_none() {
        let curve = vec![point(1, 0.2), point(2, 0.2), point(3, 0.2)];
        assert!(detect_peaks(&curve, 3).is_empty());
    }

    #[test]
    fn test_detect_peaks_needs_three_points() {
        let curve = vec![point(1, 0.0), point(2, 1.0)];
        assert!(detect_peaks(&curve, 3).is_empty());
    }
}
