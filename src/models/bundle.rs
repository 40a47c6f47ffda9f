use serde::{Deserialize, Serialize};

use super::character::{Character, Relation};
use super::emotion::{CharacterEmotion, ChapterEmotion, CurvePoint, EmotionalPeak};
use super::event::{CausalLink, Event, EventHierarchy};
use super::location::{Location, LocationVisit, SceneTransition};
use super::novel::ChapterSummary;
use super::state::{CharacterState, StateTransition};

/// Run-level statistics of one analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub chapters: usize,
    pub words: usize,
    pub characters: usize,
    pub relations: usize,
    pub events: usize,
    pub locations: usize,
    pub main_plot_events: usize,
}

/// The root output of one pipeline run. Constructed once, never mutated
/// after the pipeline completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBundle {
    pub novel_id: String,
    pub title: String,
    pub author: Option<String>,
    pub chapters: Vec<ChapterSummary>,
    pub characters: Vec<Character>,
    pub relations: Vec<Relation>,
    pub events: Vec<Event>,
    pub hierarchy: EventHierarchy,
    pub causal_links: Vec<CausalLink>,
    pub main_plot_events: Vec<String>,
    pub locations: Vec<Location>,
    pub visits: Vec<LocationVisit>,
    pub scene_transitions: Vec<SceneTransition>,
    pub chapter_emotions: Vec<ChapterEmotion>,
    pub character_emotions: Vec<CharacterEmotion>,
    pub emotion_curve: Vec<CurvePoint>,
    pub emotional_peaks: Vec<EmotionalPeak>,
    pub states: Vec<CharacterState>,
    pub state_transitions: Vec<StateTransition>,
    /// Detected relation-graph communities, reported only.
    pub communities: Vec<Vec<String>>,
    pub statistics: Statistics,
    /// False when the in-memory pipeline succeeded but the store write failed.
    pub persisted: bool,
}

impl AnalysisBundle {
    /// A clearly marked empty bundle for degenerate inputs: statistics
    /// present, all lists empty.
    pub fn empty(novel_id: &str, title: &str, author: Option<String>, stats: Statistics) -> Self {
        Self {
            novel_id: novel_id.to_string(),
            title: title.to_string(),
            author,
            chapters: Vec::new(),
            characters: Vec::new(),
            relations: Vec::new(),
            events: Vec::new(),
            hierarchy: EventHierarchy::default(),
            causal_links: Vec::new(),
            main_plot_events: Vec::new(),
            locations: Vec::new(),
            visits: Vec::new(),
            scene_transitions: Vec::new(),
            chapter_emotions: Vec::new(),
            character_emotions: Vec::new(),
            emotion_curve: Vec::new(),
            emotional_peaks: Vec::new(),
            states: Vec::new(),
            state_transitions: Vec::new(),
            communities: Vec::new(),
            statistics: stats,
            persisted: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.events.is_empty()
    }

    /// Sort every list under its documented ordering so that two runs over
    /// the same input compare equal and store round-trips are exact.
    pub fn normalize(&mut self) {
        self.chapters.sort_by_key(|c| c.index);
        self.characters
            .sort_by(|a, b| a.name.cmp(&b.name));
        self.relations.sort_by(|a, b| {
            a.pair_key()
                .cmp(&b.pair_key())
                .then_with(|| a.kind.priority().cmp(&b.kind.priority()))
        });
        self.events
            .sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        self.causal_links
            .sort_by(|a, b| (&a.cause, &a.effect).cmp(&(&b.cause, &b.effect)));
        self.main_plot_events.sort();
        self.locations.sort_by(|a, b| a.name.cmp(&b.name));
        self.visits.sort_by(|a, b| {
            (&a.character, &a.location, a.chapter).cmp(&(&b.character, &b.location, b.chapter))
        });
        self.scene_transitions
            .sort_by(|a, b| a.event_id.cmp(&b.event_id));
        self.chapter_emotions.sort_by_key(|e| e.chapter);
        self.character_emotions.sort_by(|a, b| {
            (&a.source, &a.target, a.chapter).cmp(&(&b.source, &b.target, b.chapter))
        });
        self.emotion_curve.sort_by_key(|p| p.chapter);
        self.emotional_peaks.sort_by_key(|p| p.chapter);
        self.states.sort_by(|a, b| {
            (&a.character, a.chapter, a.axis).cmp(&(&b.character, b.chapter, b.axis))
        });
        self.state_transitions.sort_by(|a, b| {
            (&a.character, a.axis, a.to_chapter).cmp(&(&b.character, b.axis, b.to_chapter))
        });
        for community in &mut self.communities {
            community.sort();
        }
        self.communities
            .sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    }
}
