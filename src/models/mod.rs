pub mod bundle;
pub mod character;
pub mod emotion;
pub mod event;
pub mod location;
pub mod novel;
pub mod state;

pub use bundle::{AnalysisBundle, Statistics};
pub use character::{
    Character, Classification, EvidenceChannel, Relation, RelationEvidence, RelationType,
};
pub use emotion::{
    CharacterEmotion, ChapterEmotion, CurvePoint, EmotionCategory, EmotionDistribution,
    EmotionalPeak, PeakKind,
};
pub use event::{CausalLink, Event, EventHierarchy, EventType, TimeMarker, TimeMarkerKind};
pub use location::{Location, LocationType, LocationVisit, SceneTransition};
pub use novel::{Chapter, ChapterSummary, Novel};
pub use state::{CharacterState, StateAxis, StateTransition};
