//! Read-only word lists driving the heuristic stages.
//!
//! Lexicons are constructed once at startup and passed explicitly to the
//! stages that need them, so tests can inject fixtures. The built-in tables
//! cover the common vocabulary of vernacular and wuxia-flavored narrative
//! prose; `from_dir` lets deployments override the stop-word list.

use std::collections::HashSet;
use std::path::Path;

use crate::models::{EmotionCategory, EventType, LocationType, RelationType, StateAxis};
use crate::AnalysisError;

/// An event-gating verb with its type class and class weight.
#[derive(Debug, Clone)]
pub struct EventVerb {
    pub word: String,
    pub kind: EventType,
    pub weight: f64,
}

/// A keyword that shifts one state axis by a signed delta.
#[derive(Debug, Clone)]
pub struct StateDelta {
    pub word: String,
    pub axis: StateAxis,
    pub delta: f64,
}

/// A kinship/honorific address term and the relation type it indicates.
#[derive(Debug, Clone)]
pub struct AddressTerm {
    pub word: String,
    pub relation: RelationType,
}

/// All lexical resources used by the pipeline.
#[derive(Debug, Clone)]
pub struct Lexicons {
    pub stopwords: HashSet<String>,
    pub event_verbs: Vec<EventVerb>,
    pub turning_cues: Vec<String>,
    pub consequence_cues: Vec<String>,
    pub emotion_words: Vec<(String, EmotionCategory)>,
    pub state_deltas: Vec<StateDelta>,
    pub address_terms: Vec<AddressTerm>,
    pub location_suffixes: Vec<(String, LocationType)>,
}

fn verbs(kind: EventType, weight: f64, words: &[&str]) -> Vec<EventVerb> {
    words
        .iter()
        .map(|w| EventVerb {
            word: (*w).to_string(),
            kind,
            weight,
        })
        .collect()
}

fn deltas(axis: StateAxis, entries: &[(&str, f64)]) -> Vec<StateDelta> {
    entries
        .iter()
        .map(|(w, d)| StateDelta {
            word: (*w).to_string(),
            axis,
            delta: *d,
        })
        .collect()
}

fn emotions(cat: EmotionCategory, words: &[&str]) -> Vec<(String, EmotionCategory)> {
    words.iter().map(|w| ((*w).to_string(), cat)).collect()
}

impl Lexicons {
    /// The built-in tables. Never fails.
    pub fn builtin() -> Self {
        let stopwords: HashSet<String> = [
            "的", "了", "在", "是", "我", "有", "和", "就", "不", "人", "都", "一", "一个",
            "上", "也", "很", "到", "说", "要", "去", "你", "会", "着", "没有", "看", "好",
            "自己", "这", "那", "他", "她", "它", "们", "与", "而", "之", "其", "此", "但",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let mut event_verbs = Vec::new();
        event_verbs.extend(verbs(
            EventType::Conflict,
            0.9,
            &["战", "大战", "斗", "打斗", "杀", "厮杀", "攻", "攻击", "击败", "对抗", "交手"],
        ));
        event_verbs.extend(verbs(
            EventType::Cooperation,
            0.7,
            &["救", "相救", "帮", "帮助", "联手", "合作", "护", "保护", "助"],
        ));
        event_verbs.extend(verbs(
            EventType::Discovery,
            0.6,
            &["发现", "找到", "得知", "获得", "得到", "识破", "悟出"],
        ));
        event_verbs.extend(verbs(
            EventType::Meeting,
            0.5,
            &["见", "遇", "遇到", "相见", "见到", "拜见", "重逢", "相逢"],
        ));
        event_verbs.extend(verbs(
            EventType::Parting,
            0.5,
            &["别", "告别", "离开", "分别", "逃", "逃走", "归", "送别", "辞行"],
        ));
        // Ceremonies and resolutions carry plot weight without a class of
        // their own.
        event_verbs.extend(verbs(EventType::Other, 0.8, &["成亲", "拜师", "定", "立誓"]));
        event_verbs.extend(verbs(EventType::Other, 0.5, &["受伤", "负伤", "病倒", "突破"]));

        let turning_cues = ["突然", "忽然", "自此", "从此", "此时"]
            .into_iter()
            .map(String::from)
            .collect();

        let consequence_cues = ["于是", "因此", "导致", "结果", "因而", "只得"]
            .into_iter()
            .map(String::from)
            .collect();

        let mut emotion_words = Vec::new();
        emotion_words.extend(emotions(
            EmotionCategory::Joy,
            &[
                "高兴", "开心", "快乐", "喜悦", "欢喜", "兴奋", "激动", "满意", "欣慰",
                "愉快", "笑", "微笑", "大笑", "爱", "喜欢",
            ],
        ));
        emotion_words.extend(emotions(
            EmotionCategory::Sadness,
            &[
                "悲伤", "难过", "痛苦", "伤心", "哭", "流泪", "哀伤", "失望", "沮丧",
                "绝望", "忧愁", "悲痛",
            ],
        ));
        emotion_words.extend(emotions(
            EmotionCategory::Anger,
            &["愤怒", "生气", "恼怒", "暴怒", "怒", "恨", "仇恨", "憎恨", "怨恨", "不满"],
        ));
        emotion_words.extend(emotions(
            EmotionCategory::Fear,
            &["害怕", "恐惧", "惊恐", "恐慌", "畏惧", "胆怯", "担心", "担忧", "紧张", "不安"],
        ));
        emotion_words.extend(emotions(
            EmotionCategory::Surprise,
            &["惊讶", "惊奇", "吃惊", "震惊", "诧异", "意外", "愕然", "惊呆"],
        ));
        emotion_words.extend(emotions(
            EmotionCategory::Disgust,
            &["厌恶", "恶心", "嫌弃", "鄙视", "讨厌", "唾弃", "反感"],
        ));

        let mut state_deltas = Vec::new();
        state_deltas.extend(deltas(
            StateAxis::Health,
            &[
                ("重伤", -0.35),
                ("受伤", -0.2),
                ("负伤", -0.2),
                ("轻伤", -0.1),
                ("中毒", -0.25),
                ("生病", -0.15),
                ("病倒", -0.2),
                ("身亡", -0.9),
                ("痊愈", 0.2),
                ("康复", 0.2),
                ("恢复", 0.15),
            ],
        ));
        state_deltas.extend(deltas(
            StateAxis::Mood,
            &[
                ("大喜", 0.2),
                ("开心", 0.15),
                ("高兴", 0.15),
                ("喜悦", 0.15),
                ("欣慰", 0.1),
                ("悲伤", -0.15),
                ("痛苦", -0.2),
                ("大怒", -0.15),
                ("愤怒", -0.15),
                ("绝望", -0.3),
            ],
        ));
        state_deltas.extend(deltas(
            StateAxis::Ability,
            &[
                ("突破", 0.25),
                ("大成", 0.3),
                ("精进", 0.15),
                ("学会", 0.1),
                ("悟出", 0.15),
                ("走火入魔", -0.3),
                ("功力尽失", -0.4),
            ],
        ));
        state_deltas.extend(deltas(
            StateAxis::SocialStanding,
            &[
                ("称帝", 0.4),
                ("称王", 0.3),
                ("拜相", 0.3),
                ("封赏", 0.15),
                ("升任", 0.1),
                ("执掌", 0.25),
                ("被贬", -0.2),
                ("流放", -0.3),
                ("入狱", -0.25),
                ("沦为", -0.2),
            ],
        ));

        let address_terms = [
            ("父亲", RelationType::Kin),
            ("爹", RelationType::Kin),
            ("母亲", RelationType::Kin),
            ("娘亲", RelationType::Kin),
            ("兄长", RelationType::Kin),
            ("哥哥", RelationType::Kin),
            ("妹妹", RelationType::Kin),
            ("师父", RelationType::MasterDisciple),
            ("师傅", RelationType::MasterDisciple),
            ("师尊", RelationType::MasterDisciple),
            ("徒儿", RelationType::MasterDisciple),
            ("夫君", RelationType::Lover),
            ("娘子", RelationType::Lover),
            ("相公", RelationType::Lover),
            ("贤弟", RelationType::Friend),
            ("仁兄", RelationType::Friend),
            ("师兄", RelationType::Colleague),
            ("师妹", RelationType::Colleague),
            ("道友", RelationType::Acquaintance),
        ]
        .into_iter()
        .map(|(w, r)| AddressTerm {
            word: w.to_string(),
            relation: r,
        })
        .collect();

        let location_suffixes = [
            ("省", LocationType::Region),
            ("州", LocationType::Region),
            ("域", LocationType::Region),
            ("国", LocationType::Region),
            ("市", LocationType::City),
            ("城", LocationType::City),
            ("县", LocationType::City),
            ("镇", LocationType::City),
            ("村", LocationType::City),
            ("山", LocationType::Mountain),
            ("峰", LocationType::Mountain),
            ("岭", LocationType::Mountain),
            ("谷", LocationType::Mountain),
            ("府", LocationType::Building),
            ("宫", LocationType::Building),
            ("殿", LocationType::Building),
            ("寺", LocationType::Building),
            ("庙", LocationType::Building),
            ("楼", LocationType::Building),
            ("阁", LocationType::Building),
            ("塔", LocationType::Building),
            ("堂", LocationType::Room),
            ("房", LocationType::Room),
            ("室", LocationType::Room),
        ]
        .into_iter()
        .map(|(s, k)| (s.to_string(), k))
        .collect();

        Self {
            stopwords,
            event_verbs,
            turning_cues,
            consequence_cues,
            emotion_words,
            state_deltas,
            address_terms,
            location_suffixes,
        }
    }

    /// Built-in tables with the stop-word list replaced by `stopwords.txt`
    /// from `dir` (one word per line).
    pub fn from_dir(dir: &Path) -> Result<Self, AnalysisError> {
        let path = dir.join("stopwords.txt");
        let contents = std::fs::read_to_string(&path).map_err(|_| {
            AnalysisError::LexiconMissing(format!("stopword list not found at {}", path.display()))
        })?;
        let mut lexicons = Self::builtin();
        lexicons.stopwords = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        Ok(lexicons)
    }

    /// Classify a location name by its suffix character.
    pub fn location_type(&self, name: &str) -> LocationType {
        for (suffix, kind) in &self.location_suffixes {
            if name.ends_with(suffix.as_str()) {
                return *kind;
            }
        }
        LocationType::Other
    }

    /// Whether a name carries a known location suffix.
    pub fn has_location_suffix(&self, name: &str) -> bool {
        self.location_suffixes
            .iter()
            .any(|(suffix, _)| name.ends_with(suffix.as_str()))
    }

    /// The best (highest-weight) event verb contained in the token list.
    pub fn match_event_verb(&self, tokens: &[String]) -> Option<&EventVerb> {
        let mut best: Option<&EventVerb> = None;
        for token in tokens {
            for verb in &self.event_verbs {
                if verb.word == *token && best.map_or(true, |b| verb.weight > b.weight) {
                    best = Some(verb);
                }
            }
        }
        best
    }

    /// The first turning cue contained in the sentence, if any.
    pub fn match_turning_cue(&self, sentence: &str) -> Option<&str> {
        self.turning_cues
            .iter()
            .find(|cue| sentence.contains(cue.as_str()))
            .map(String::as_str)
    }

    pub fn has_consequence_cue(&self, sentence: &str) -> bool {
        self.consequence_cues
            .iter()
            .any(|cue| sentence.contains(cue.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_are_populated() {
        let lex = Lexicons::builtin();
        assert!(!lex.stopwords.is_empty());
        assert!(!lex.event_verbs.is_empty());
        assert!(!lex.emotion_words.is_empty());
        assert!(!lex.state_deltas.is_empty());
    }

    #[test]
    fn test_location_type_by_suffix() {
        let lex = Lexicons::builtin();
        assert_eq!(lex.location_type("华山"), LocationType::Mountain);
        assert_eq!(lex.location_type("洛阳城"), LocationType::City);
        assert_eq!(lex.location_type("藏经阁"), LocationType::Building);
        assert_eq!(lex.location_type("洛阳"), LocationType::Other);
    }

    #[test]
    fn test_match_event_verb_prefers_heavier_class() {
        let lex = Lexicons::builtin();
        let tokens = vec!["见".to_string(), "大战".to_string()];
        let verb = lex.match_event_verb(&tokens).unwrap();
        assert_eq!(verb.kind, EventType::Conflict);
    }

    #[test]
    fn test_turning_and_consequence_cues() {
        let lex = Lexicons::builtin();
        assert!(lex.match_turning_cue("突然风起").is_some());
        assert!(lex.match_turning_cue("风起").is_none());
        assert!(lex.has_consequence_cue("于是他走了"));
    }

    #[test]
    fn test_from_dir_missing_is_lexicon_missing() {
        let err = Lexicons::from_dir(Path::new("/nonexistent-lexicon-dir")).unwrap_err();
        assert_eq!(err.kind(), "lexicon_missing");
    }
}
