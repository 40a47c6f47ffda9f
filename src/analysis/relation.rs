//! Pairwise character relation inference.
//!
//! Three evidence channels accumulate per unordered pair: windowed
//! co-occurrence, a catalogue of relation-indicative patterns, and dialogue
//! address terms. Pattern weights dominate co-occurrence weights 3:1.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use tracing::info;

use crate::analysis::names::NameIndex;
use crate::config::AnalysisConfig;
use crate::models::{Character, EvidenceChannel, Relation, RelationEvidence, RelationType};
use crate::text::{Lexicons, ProcessedChapter, TextProcessor};

struct RelationPattern {
    kind: RelationType,
    regex: Regex,
    /// Whether the pattern implies an orientation from group 1 to group 2.
    directed: bool,
}

#[derive(Default)]
struct PairAccum {
    /// Type-agnostic co-occurrence weight; contributes to strength only.
    untyped_weight: f64,
    /// Accumulated weight per relation type from typed channels.
    weights: BTreeMap<RelationType, f64>,
    /// Directed weight for orientation (lo, hi) per type.
    forward: BTreeMap<RelationType, f64>,
    /// Directed weight for orientation (hi, lo) per type.
    backward: BTreeMap<RelationType, f64>,
    evidence: BTreeSet<RelationEvidence>,
}

impl PairAccum {
    fn add_untyped(&mut self, weight: f64, chapter: u32) {
        self.untyped_weight += weight;
        self.evidence.insert(RelationEvidence {
            chapter,
            channel: EvidenceChannel::Cooccurrence,
        });
    }

    fn add_typed(
        &mut self,
        kind: RelationType,
        weight: f64,
        orientation: Option<bool>,
        chapter: u32,
        channel: EvidenceChannel,
    ) {
        *self.weights.entry(kind).or_insert(0.0) += weight;
        match orientation {
            Some(true) => *self.forward.entry(kind).or_insert(0.0) += weight,
            Some(false) => *self.backward.entry(kind).or_insert(0.0) += weight,
            None => {}
        }
        self.evidence.insert(RelationEvidence { chapter, channel });
    }

    fn total_weight(&self) -> f64 {
        self.untyped_weight + self.weights.values().sum::<f64>()
    }

    /// Maximum-weight type across the typed channels; ties break by the
    /// documented priority order. Pure co-occurrence stays `Acquaintance`.
    fn dominant_type(&self) -> RelationType {
        let mut best = RelationType::Acquaintance;
        let mut best_weight = 0.0;
        for (kind, weight) in &self.weights {
            // BTreeMap iterates in priority order, so strict > keeps ties
            // on the higher-priority type.
            if *weight > best_weight {
                best = *kind;
                best_weight = *weight;
            }
        }
        best
    }
}

pub struct RelationExtractor<'a> {
    processor: &'a TextProcessor,
    lexicons: &'a Lexicons,
    config: &'a AnalysisConfig,
}

impl<'a> RelationExtractor<'a> {
    pub fn new(
        processor: &'a TextProcessor,
        lexicons: &'a Lexicons,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            processor,
            lexicons,
            config,
        }
    }

    pub fn extract(
        &self,
        chapters: &[ProcessedChapter],
        characters: &[Character],
    ) -> Vec<Relation> {
        let index = NameIndex::build(characters);
        let patterns = build_patterns(characters);
        let mut pairs: BTreeMap<(String, String), PairAccum> = BTreeMap::new();

        for chapter in chapters {
            self.scan_cooccurrence(chapter, &index, &mut pairs);
            self.scan_patterns(chapter, &patterns, &index, &mut pairs);
            self.scan_dialogue(chapter, &index, &mut pairs);
        }

        let mut relations: Vec<Relation> = pairs
            .into_iter()
            .filter(|(_, accum)| accum.total_weight() > 0.0)
            .map(|((lo, hi), accum)| {
                let kind = accum.dominant_type();
                let strength = (accum.total_weight() / self.config.strength_scale).tanh();
                let fwd = accum.forward.get(&kind).copied().unwrap_or(0.0);
                let bwd = accum.backward.get(&kind).copied().unwrap_or(0.0);
                let directed = fwd > 0.0 || bwd > 0.0;
                let (source, target) = if directed && bwd > fwd {
                    (hi, lo)
                } else {
                    (lo, hi)
                };
                Relation {
                    source,
                    target,
                    kind,
                    strength,
                    directed,
                    evidence: accum.evidence.into_iter().collect(),
                }
            })
            .collect();
        relations.sort_by(|a, b| a.pair_key().cmp(&b.pair_key()));

        info!(relations = relations.len(), "relation extraction complete");
        relations
    }

    /// Channel 1: co-occurrence within a sliding sentence window; each
    /// co-occurrence adds 1/(distance+1) toward `Acquaintance`.
    fn scan_cooccurrence(
        &self,
        chapter: &ProcessedChapter,
        index: &NameIndex,
        pairs: &mut BTreeMap<(String, String), PairAccum>,
    ) {
        let per_sentence: Vec<BTreeSet<String>> = chapter
            .sentences
            .iter()
            .map(|s| index.find(s))
            .collect();

        for i in 0..per_sentence.len() {
            for d in 0..self.config.cooccur_window {
                let j = i + d;
                if j >= per_sentence.len() {
                    break;
                }
                let weight = 1.0 / (d as f64 + 1.0);
                let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
                if d == 0 {
                    let members: Vec<&String> = per_sentence[i].iter().collect();
                    for (a_idx, a) in members.iter().enumerate() {
                        for b in members.iter().skip(a_idx + 1) {
                            seen.insert(ordered(a, b));
                        }
                    }
                } else {
                    for a in &per_sentence[i] {
                        for b in &per_sentence[j] {
                            if a != b {
                                seen.insert(ordered(a, b));
                            }
                        }
                    }
                }
                for pair in seen {
                    pairs
                        .entry(pair)
                        .or_default()
                        .add_untyped(weight, chapter.index);
                }
            }
        }
    }

    /// Channel 2: relation-indicative patterns over the chapter text.
    fn scan_patterns(
        &self,
        chapter: &ProcessedChapter,
        patterns: &[RelationPattern],
        index: &NameIndex,
        pairs: &mut BTreeMap<(String, String), PairAccum>,
    ) {
        for pattern in patterns {
            for caps in pattern.regex.captures_iter(&chapter.text) {
                let Some(a) = index.resolve(&caps[1]) else {
                    continue;
                };
                let Some(b) = index.resolve(&caps[2]) else {
                    continue;
                };
                if a == b {
                    continue;
                }
                let key = ordered(a, b);
                let orientation = if pattern.directed {
                    // true = orientation (lo, hi)
                    Some(a == key.0)
                } else {
                    None
                };
                pairs.entry(key).or_default().add_typed(
                    pattern.kind,
                    self.config.pattern_weight,
                    orientation,
                    chapter.index,
                    EvidenceChannel::Pattern,
                );
            }
        }
    }

    /// Channel 3: address terms inside attributed dialogue.
    fn scan_dialogue(
        &self,
        chapter: &ProcessedChapter,
        index: &NameIndex,
        pairs: &mut BTreeMap<(String, String), PairAccum>,
    ) {
        let chars: Vec<char> = chapter.text.chars().collect();
        for dialogue in self.processor.extract_dialogues(&chapter.text) {
            let Some(raw_speaker) = dialogue.speaker else {
                continue;
            };
            let Some(speaker) = index
                .resolve(&raw_speaker)
                .map(String::from)
                .or_else(|| index.find(&raw_speaker).into_iter().next())
            else {
                continue;
            };
            let Some(term) = self
                .lexicons
                .address_terms
                .iter()
                .find(|t| dialogue.content.contains(t.word.as_str()))
            else {
                continue;
            };

            // The addressee is another character near the quote: inside the
            // content itself, or in a +/-30 char context window.
            let target = index
                .find(&dialogue.content)
                .into_iter()
                .find(|c| *c != speaker)
                .or_else(|| {
                    let start = dialogue.position.saturating_sub(30);
                    let end = (dialogue.position + dialogue.content.chars().count() + 30)
                        .min(chars.len());
                    let context: String = chars[start..end].iter().collect();
                    index.find(&context).into_iter().find(|c| *c != speaker)
                });
            let Some(target) = target else {
                continue;
            };

            let key = ordered(&speaker, &target);
            let orientation = Some(speaker == key.0);
            pairs.entry(key).or_default().add_typed(
                term.relation,
                self.config.dialogue_weight,
                orientation,
                chapter.index,
                EvidenceChannel::Dialogue,
            );
        }
    }
}

fn ordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Build the pattern catalogue against the known character name forms.
fn build_patterns(characters: &[Character]) -> Vec<RelationPattern> {
    let mut forms: Vec<String> = characters
        .iter()
        .flat_map(|c| c.aliases.iter().cloned())
        .collect();
    forms.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    let n = forms
        .iter()
        .map(|f| regex::escape(f))
        .collect::<Vec<_>>()
        .join("|");
    if n.is_empty() {
        return Vec::new();
    }

    let make = |kind, directed, body: String| RelationPattern {
        kind,
        directed,
        regex: Regex::new(&body).expect("relation pattern"),
    };

    vec![
        make(
            RelationType::Kin,
            true,
            format!("({n})的(?:父亲|母亲|爹|娘)(?:是|正是|乃)({n})"),
        ),
        make(
            RelationType::Kin,
            true,
            format!("({n})是({n})的(?:父亲|母亲|儿子|女儿|哥哥|弟弟|姐姐|妹妹)"),
        ),
        make(
            RelationType::MasterDisciple,
            true,
            format!("({n})拜({n})为师"),
        ),
        make(
            RelationType::MasterDisciple,
            true,
            format!("({n})是({n})的(?:师父|师傅|徒弟|弟子)"),
        ),
        make(
            RelationType::Lover,
            false,
            format!("({n})[与和]({n})(?:相爱|定情|相恋|成亲)"),
        ),
        make(RelationType::Lover, true, format!("({n})爱上了?({n})")),
        make(
            RelationType::Friend,
            false,
            format!("({n})[与和]({n})(?:是|成为|结为)(?:朋友|好友|挚友|兄弟)"),
        ),
        make(RelationType::Friend, false, format!("({n})与({n})交好")),
        make(
            RelationType::Enemy,
            false,
            format!("({n})[与和]({n})(?:为敌|结仇|敌对)"),
        ),
        make(
            RelationType::Enemy,
            true,
            format!("({n})是({n})的(?:敌人|仇人|对手)"),
        ),
        make(
            RelationType::Colleague,
            false,
            format!("({n})[与和]({n})(?:是|同为)(?:同门|师兄弟|师姐妹|同僚)"),
        ),
    ]
}
