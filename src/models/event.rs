use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A discrete occurrence within one chapter.
///
/// Events are totally ordered by `(chapter, sequence)`; `sequence` is the
/// 1-based sentence position inside the chapter, which also gives the
/// sentence distance used by the hierarchy builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub description: String,
    pub chapter: u32,
    pub sequence: u32,
    pub kind: EventType,
    pub participants: BTreeSet<String>,
    pub location: Option<String>,
    pub importance_score: f64,
    pub contribution_score: f64,
    pub time_marker: Option<TimeMarker>,
}

impl Event {
    pub fn order_key(&self) -> (u32, u32) {
        (self.chapter, self.sequence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Meeting,
    Conflict,
    Cooperation,
    Parting,
    TurningPoint,
    Discovery,
    Other,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Meeting => "meeting",
            EventType::Conflict => "conflict",
            EventType::Cooperation => "cooperation",
            EventType::Parting => "parting",
            EventType::TurningPoint => "turning_point",
            EventType::Discovery => "discovery",
            EventType::Other => "other",
        }
    }
}

/// A time expression attached to an event, display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeMarker {
    pub kind: TimeMarkerKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMarkerKind {
    Absolute,
    Relative,
}

/// Parent links forming a forest; sub-events are intra-chapter only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventHierarchy {
    /// child event id -> parent event id
    pub parents: BTreeMap<String, String>,
}

impl EventHierarchy {
    pub fn parent_of(&self, child: &str) -> Option<&str> {
        self.parents.get(child).map(String::as_str)
    }

    pub fn children_of<'a>(&'a self, parent: &str) -> Vec<&'a str> {
        self.parents
            .iter()
            .filter(|(_, p)| p.as_str() == parent)
            .map(|(c, _)| c.as_str())
            .collect()
    }
}

/// A directed causal edge between two events. Cause precedes effect in the
/// total order by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalLink {
    pub cause: String,
    pub effect: String,
    pub strength: f64,
}
