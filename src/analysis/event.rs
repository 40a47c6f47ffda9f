//! Per-chapter event detection and importance scoring.
//!
//! A sentence becomes an event candidate when it mentions at least one
//! character and contains an event verb or a turning-point cue. Turning
//! points are detected here only; downstream stages consume the type.

use tracing::info;

use crate::analysis::names::NameIndex;
use crate::config::AnalysisConfig;
use crate::models::{Character, Event, EventType, Location};
use crate::text::{Lexicons, ProcessedChapter, TextProcessor};
use crate::AnalysisError;

pub struct EventAnalyzer<'a> {
    processor: &'a TextProcessor,
    lexicons: &'a Lexicons,
    config: &'a AnalysisConfig,
}

impl<'a> EventAnalyzer<'a> {
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
        locations: &[Location],
    ) -> Result<Vec<Event>, AnalysisError> {
        let index = NameIndex::build(characters);
        let importance_of = |name: &str| {
            characters
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.importance)
                .unwrap_or(0.0)
        };
        let location_names: Vec<&str> = locations.iter().map(|l| l.name.as_str()).collect();

        let mut events = Vec::new();
        for chapter in chapters {
            let n = chapter.sentences.len();
            for (i, sentence) in chapter.sentences.iter().enumerate() {
                let participants = index.find(sentence);
                if participants.is_empty() {
                    continue;
                }
                let tokens = self.processor.segment(sentence)?;
                let verb = self.lexicons.match_event_verb(&tokens);
                let cue = self.lexicons.match_turning_cue(sentence);
                if verb.is_none() && cue.is_none() {
                    continue;
                }

                let kind = verb.map(|v| v.kind).unwrap_or(EventType::TurningPoint);
                let verb_weight = verb.map(|v| v.weight).unwrap_or(0.8);
                let turning_bonus = if cue.is_some() { 1.0 } else { 0.0 };
                let participant_max = participants
                    .iter()
                    .map(|p| importance_of(p))
                    .fold(0.0_f64, f64::max);
                let importance = 0.4 * participant_max
                    + 0.3 * verb_weight
                    + 0.2 * turning_bonus
                    + 0.1 * boundary_bonus(i, n);

                let location = self.nearest_location(&chapter.sentences, i, &location_names);

                events.push(Event {
                    id: String::new(),
                    description: truncate_chars(sentence, 200),
                    chapter: chapter.index,
                    sequence: (i + 1) as u32,
                    kind,
                    participants,
                    location,
                    importance_score: importance.clamp(0.0, 1.0),
                    contribution_score: 0.0,
                    time_marker: None,
                });
            }
        }

        events.sort_by_key(|e| e.order_key());
        for (idx, event) in events.iter_mut().enumerate() {
            event.id = format!("ev_{:04}", idx + 1);
        }

        info!(events = events.len(), "event extraction complete");
        Ok(events)
    }

    /// The most recently mentioned location within the back-window, nearest
    /// sentence first; within a sentence the last mention wins.
    fn nearest_location(
        &self,
        sentences: &[String],
        at: usize,
        location_names: &[&str],
    ) -> Option<String> {
        let back = self.config.location_back_window;
        let start = at.saturating_sub(back);
        for i in (start..=at).rev() {
            let sentence = &sentences[i];
            let mut latest: Option<(usize, &str)> = None;
            for name in location_names {
                if let Some(pos) = sentence.rfind(name) {
                    if latest.map_or(true, |(p, _)| pos > p) {
                        latest = Some((pos, name));
                    }
                }
            }
            if let Some((_, name)) = latest {
                return Some(name.to_string());
            }
        }
        None
    }
}

/// Events near chapter boundaries are slightly weighted up.
fn boundary_bonus(index: usize, total: usize) -> f64 {
    if total <= 1 {
        return 1.0;
    }
    let position = index as f64 / (total - 1) as f64;
    if position <= 0.1 || position >= 0.9 {
        1.0
    } else {
        0.0
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
