use serde::{Deserialize, Serialize};

/// A named place with derived importance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub kind: LocationType,
    pub importance: f64,
    pub event_count: usize,
    pub mention_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    City,
    Mountain,
    Building,
    Room,
    Region,
    Other,
}

impl LocationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationType::City => "city",
            LocationType::Mountain => "mountain",
            LocationType::Building => "building",
            LocationType::Room => "room",
            LocationType::Region => "region",
            LocationType::Other => "other",
        }
    }
}

/// A change of location between temporally adjacent events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneTransition {
    pub from: String,
    pub to: String,
    pub chapter: u32,
    /// The event whose location differs from its predecessor's.
    pub event_id: String,
}

/// How often a character is placed at a location within one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationVisit {
    pub character: String,
    pub location: String,
    pub chapter: u32,
    pub visit_count: usize,
}
