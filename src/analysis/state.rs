//! Character state tracking across the four axes.
//!
//! Each main character carries a value in [0, 1] per axis, starting at 0.5.
//! A state-change lexicon maps keywords in character-bearing sentences to
//! signed deltas; significant per-chapter deltas emit transitions tied to
//! the highest-importance event sharing the character within the span.

use std::collections::BTreeMap;

use tracing::info;

use crate::analysis::names::NameIndex;
use crate::config::AnalysisConfig;
use crate::models::{
    Character, CharacterState, Classification, Event, StateAxis, StateTransition,
};
use crate::text::{Lexicons, ProcessedChapter};

/// Per-chapter axis deltas are clamped to this magnitude before applying.
const MAX_CHAPTER_DELTA: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct StateAnalysis {
    pub states: Vec<CharacterState>,
    pub transitions: Vec<StateTransition>,
}

pub struct StateTracker<'a> {
    lexicons: &'a Lexicons,
    config: &'a AnalysisConfig,
}

impl<'a> StateTracker<'a> {
    pub fn new(lexicons: &'a Lexicons, config: &'a AnalysisConfig) -> Self {
        Self { lexicons, config }
    }

    pub fn analyze(
        &self,
        chapters: &[ProcessedChapter],
        characters: &[Character],
        events: &[Event],
    ) -> StateAnalysis {
        let index = NameIndex::build(characters);
        let mut states = Vec::new();
        let mut transitions = Vec::new();

        for character in characters {
            if character.classification != Classification::Main {
                continue;
            }
            self.track_character(
                character,
                chapters,
                events,
                &index,
                &mut states,
                &mut transitions,
            );
        }

        info!(
            snapshots = states.len(),
            transitions = transitions.len(),
            "state tracking complete"
        );
        StateAnalysis {
            states,
            transitions,
        }
    }

    fn track_character(
        &self,
        character: &Character,
        chapters: &[ProcessedChapter],
        events: &[Event],
        index: &NameIndex,
        states: &mut Vec<CharacterState>,
        transitions: &mut Vec<StateTransition>,
    ) {
        let mut values: BTreeMap<StateAxis, f64> =
            StateAxis::ALL.iter().map(|a| (*a, 0.5)).collect();
        let mut last_seen: Option<u32> = None;

        for chapter in chapters {
            if chapter.index < character.first_appearance {
                continue;
            }

            let appears = character.chapters_present.contains(&chapter.index);
            let deltas = if appears {
                self.chapter_deltas(character, chapter, index)
            } else {
                BTreeMap::new()
            };

            for axis in StateAxis::ALL {
                let old = values[&axis];
                let delta = deltas
                    .get(&axis)
                    .copied()
                    .unwrap_or(0.0)
                    .clamp(-MAX_CHAPTER_DELTA, MAX_CHAPTER_DELTA);
                let new = (old + delta).clamp(0.0, 1.0);
                values.insert(axis, new);

                let applied = new - old;
                let mut trigger = None;
                if applied.abs() > self.config.state_transition_threshold {
                    let from_chapter = last_seen.unwrap_or(chapter.index);
                    let cause_event =
                        span_cause_event(events, character, from_chapter, chapter.index);
                    transitions.push(StateTransition {
                        character: character.name.clone(),
                        axis,
                        from_chapter,
                        to_chapter: chapter.index,
                        delta: applied,
                        cause_event: cause_event.clone(),
                    });
                    trigger = cause_event;
                }

                states.push(CharacterState {
                    character: character.name.clone(),
                    chapter: chapter.index,
                    axis,
                    value: new,
                    trigger_event: trigger,
                });
            }

            if appears {
                last_seen = Some(chapter.index);
            }
        }
    }

    /// Sum of keyword deltas per axis over sentences mentioning the character.
    fn chapter_deltas(
        &self,
        character: &Character,
        chapter: &ProcessedChapter,
        index: &NameIndex,
    ) -> BTreeMap<StateAxis, f64> {
        let mut deltas: BTreeMap<StateAxis, f64> = BTreeMap::new();
        for sentence in &chapter.sentences {
            if !index.mentions(sentence, &character.name) {
                continue;
            }
            for entry in &self.lexicons.state_deltas {
                if sentence.contains(entry.word.as_str()) {
                    *deltas.entry(entry.axis).or_insert(0.0) += entry.delta;
                }
            }
        }
        deltas
    }
}

/// The highest-importance event sharing the character within the chapter
/// span of a transition (earliest on ties).
fn span_cause_event(
    events: &[Event],
    character: &Character,
    from_chapter: u32,
    to_chapter: u32,
) -> Option<String> {
    events
        .iter()
        .filter(|e| {
            e.chapter >= from_chapter
                && e.chapter <= to_chapter
                && e.participants.contains(&character.name)
        })
        .max_by(|a, b| {
            a.importance_score
                .partial_cmp(&b.importance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.order_key().cmp(&a.order_key()))
        })
        .map(|e| e.id.clone())
}
