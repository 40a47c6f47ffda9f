use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A character with its merged surface forms and derived scores.
///
/// Invariants: the canonical `name` is a member of `aliases`; alias sets of
/// distinct characters are disjoint; all scores lie in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub aliases: BTreeSet<String>,
    pub mention_count: usize,
    /// Smallest chapter index with a mention.
    pub first_appearance: u32,
    pub chapters_present: BTreeSet<u32>,
    pub importance: f64,
    pub degree_centrality: f64,
    pub classification: Classification,
}

impl Character {
    /// Fraction of the novel's chapters in which this character appears.
    pub fn presence_fraction(&self, total_chapters: u32) -> f64 {
        if total_chapters == 0 {
            return 0.0;
        }
        self.chapters_present.len() as f64 / total_chapters as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Main,
    Supporting,
}

/// The closed set of relation types, ordered by tie-break priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Kin,
    MasterDisciple,
    Lover,
    Friend,
    Enemy,
    Colleague,
    Acquaintance,
    Unknown,
}

impl RelationType {
    /// Tie-break priority: smaller wins (kin > master-disciple > lover > …).
    pub fn priority(&self) -> u8 {
        match self {
            RelationType::Kin => 0,
            RelationType::MasterDisciple => 1,
            RelationType::Lover => 2,
            RelationType::Friend => 3,
            RelationType::Enemy => 4,
            RelationType::Colleague => 5,
            RelationType::Acquaintance => 6,
            RelationType::Unknown => 7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Kin => "kin",
            RelationType::MasterDisciple => "master_disciple",
            RelationType::Lover => "lover",
            RelationType::Friend => "friend",
            RelationType::Enemy => "enemy",
            RelationType::Colleague => "colleague",
            RelationType::Acquaintance => "acquaintance",
            RelationType::Unknown => "unknown",
        }
    }
}

/// Which evidence channel produced a relation observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceChannel {
    Cooccurrence,
    Pattern,
    Dialogue,
}

/// One piece of relation evidence: where it was seen and through which channel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationEvidence {
    pub chapter: u32,
    pub channel: EvidenceChannel,
}

impl PartialOrd for EvidenceChannel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EvidenceChannel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let rank = |c: &EvidenceChannel| match c {
            EvidenceChannel::Cooccurrence => 0u8,
            EvidenceChannel::Pattern => 1,
            EvidenceChannel::Dialogue => 2,
        };
        rank(self).cmp(&rank(other))
    }
}

/// A link between two characters.
///
/// For symmetric relations `source` and `target` are in lexicographic order;
/// for directed relations they follow the dominant evidence orientation.
/// At most one relation exists per unordered pair per type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub kind: RelationType,
    pub strength: f64,
    pub directed: bool,
    pub evidence: Vec<RelationEvidence>,
}

impl Relation {
    /// The unordered pair key used for dedup and normalization.
    pub fn pair_key(&self) -> (String, String) {
        if self.source <= self.target {
            (self.source.clone(), self.target.clone())
        } else {
            (self.target.clone(), self.source.clone())
        }
    }
}
