use serde::{Deserialize, Serialize};

/// One of the four tracked state axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateAxis {
    Health,
    Mood,
    Ability,
    SocialStanding,
}

impl StateAxis {
    pub const ALL: [StateAxis; 4] = [
        StateAxis::Health,
        StateAxis::Mood,
        StateAxis::Ability,
        StateAxis::SocialStanding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateAxis::Health => "health",
            StateAxis::Mood => "mood",
            StateAxis::Ability => "ability",
            StateAxis::SocialStanding => "social_standing",
        }
    }
}

/// A dense per-chapter state snapshot. Values carry forward unchanged in
/// chapters where the character does not appear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    pub character: String,
    pub chapter: u32,
    pub axis: StateAxis,
    pub value: f64,
    /// Event that triggered the change in this chapter, when one exists.
    pub trigger_event: Option<String>,
}

/// A significant state change between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub character: String,
    pub axis: StateAxis,
    pub from_chapter: u32,
    pub to_chapter: u32,
    pub delta: f64,
    /// Highest-importance event sharing the character within the span.
    pub cause_event: Option<String>,
}
