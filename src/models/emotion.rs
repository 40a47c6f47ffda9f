use serde::{Deserialize, Serialize};

/// The six emotion categories of the chapter distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionCategory {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
}

impl EmotionCategory {
    pub const ALL: [EmotionCategory; 6] = [
        EmotionCategory::Joy,
        EmotionCategory::Sadness,
        EmotionCategory::Anger,
        EmotionCategory::Fear,
        EmotionCategory::Surprise,
        EmotionCategory::Disgust,
    ];

    /// Sentiment polarity contributed by one hit of this category.
    pub fn polarity(&self) -> f64 {
        match self {
            EmotionCategory::Joy => 1.0,
            EmotionCategory::Surprise => 0.0,
            EmotionCategory::Sadness
            | EmotionCategory::Anger
            | EmotionCategory::Fear
            | EmotionCategory::Disgust => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionCategory::Joy => "joy",
            EmotionCategory::Sadness => "sadness",
            EmotionCategory::Anger => "anger",
            EmotionCategory::Fear => "fear",
            EmotionCategory::Surprise => "surprise",
            EmotionCategory::Disgust => "disgust",
        }
    }
}

/// A distribution over the six emotion categories, summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionDistribution {
    pub joy: f64,
    pub sadness: f64,
    pub anger: f64,
    pub fear: f64,
    pub surprise: f64,
    pub disgust: f64,
}

impl EmotionDistribution {
    /// The uniform distribution, used for fully neutral text.
    pub fn uniform() -> Self {
        let p = 1.0 / 6.0;
        Self {
            joy: p,
            sadness: p,
            anger: p,
            fear: p,
            surprise: p,
            disgust: p,
        }
    }

    /// Build from raw category counts; falls back to uniform when all zero.
    pub fn from_counts(counts: &[(EmotionCategory, usize)]) -> Self {
        let total: usize = counts.iter().map(|(_, c)| c).sum();
        if total == 0 {
            return Self::uniform();
        }
        let mut dist = Self {
            joy: 0.0,
            sadness: 0.0,
            anger: 0.0,
            fear: 0.0,
            surprise: 0.0,
            disgust: 0.0,
        };
        for (cat, count) in counts {
            let p = *count as f64 / total as f64;
            match cat {
                EmotionCategory::Joy => dist.joy += p,
                EmotionCategory::Sadness => dist.sadness += p,
                EmotionCategory::Anger => dist.anger += p,
                EmotionCategory::Fear => dist.fear += p,
                EmotionCategory::Surprise => dist.surprise += p,
                EmotionCategory::Disgust => dist.disgust += p,
            }
        }
        dist
    }

    pub fn get(&self, cat: EmotionCategory) -> f64 {
        match cat {
            EmotionCategory::Joy => self.joy,
            EmotionCategory::Sadness => self.sadness,
            EmotionCategory::Anger => self.anger,
            EmotionCategory::Fear => self.fear,
            EmotionCategory::Surprise => self.surprise,
            EmotionCategory::Disgust => self.disgust,
        }
    }

    pub fn sum(&self) -> f64 {
        self.joy + self.sadness + self.anger + self.fear + self.surprise + self.disgust
    }

    /// The category with the highest mass; ties go to the earlier category.
    pub fn dominant(&self) -> EmotionCategory {
        let mut best = EmotionCategory::Joy;
        for cat in EmotionCategory::ALL {
            if self.get(cat) > self.get(best) {
                best = cat;
            }
        }
        best
    }
}

/// Per-chapter sentiment and emotion distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterEmotion {
    pub chapter: u32,
    /// Mean sentence sentiment, clipped to [-1, 1].
    pub sentiment: f64,
    pub distribution: EmotionDistribution,
}

/// A directed emotion one character holds toward another in one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterEmotion {
    pub source: String,
    pub target: String,
    pub chapter: u32,
    pub kind: EmotionCategory,
    pub intensity: f64,
}

/// One point of the emotional curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub chapter: u32,
    pub sentiment: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeakKind {
    High,
    Low,
}

/// A local extremum of the emotional curve exceeding the σ baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalPeak {
    pub chapter: u32,
    pub sentiment: f64,
    pub kind: PeakKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sums_to_one() {
        assert!((EmotionDistribution::uniform().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_counts_normalizes() {
        let dist = EmotionDistribution::from_counts(&[
            (EmotionCategory::Joy, 3),
            (EmotionCategory::Sadness, 1),
        ]);
        assert!((dist.sum() - 1.0).abs() < 1e-9);
        assert!((dist.joy - 0.75).abs() < 1e-9);
        assert_eq!(dist.dominant(), EmotionCategory::Joy);
    }

    #[test]
    fn test_from_counts_empty_is_uniform() {
        let dist = EmotionDistribution::from_counts(&[]);
        assert_eq!(dist, EmotionDistribution::uniform());
    }

    #[test]
    fn test_dominant_tie_goes_to_earlier_category() {
        let dist = EmotionDistribution::from_counts(&[
            (EmotionCategory::Sadness, 2),
            (EmotionCategory::Anger, 2),
        ]);
        assert_eq!(dist.dominant(), EmotionCategory::Sadness);
    }

    #[test]
    fn test_polarity() {
        assert_eq!(EmotionCategory::Joy.polarity(), 1.0);
        assert_eq!(EmotionCategory::Surprise.polarity(), 0.0);
        assert_eq!(EmotionCategory::Disgust.polarity(), -1.0);
    }
}
