//! Location importance, scene transitions, and character visit tables.

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::analysis::names::NameIndex;
use crate::models::{Character, Event, Location, LocationVisit, SceneTransition};
use crate::text::ProcessedChapter;

#[derive(Debug, Clone)]
pub struct LocationAnalysis {
    pub locations: Vec<Location>,
    pub transitions: Vec<SceneTransition>,
    pub visits: Vec<LocationVisit>,
}

pub struct LocationAnalyzer;

impl LocationAnalyzer {
    pub fn analyze(
        chapters: &[ProcessedChapter],
        events: &[Event],
        mut locations: Vec<Location>,
        characters: &[Character],
    ) -> LocationAnalysis {
        let index = NameIndex::build(characters);
        let visits = build_visits(chapters, events, &locations, &index);

        // Distinct visiting characters per location.
        let mut visitors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for visit in &visits {
            visitors
                .entry(visit.location.as_str())
                .or_default()
                .insert(visit.character.as_str());
        }

        // Importance: min-max over summed contained-event importance, plus a
        // capped bonus for distinct visitors.
        let mut raw: BTreeMap<&str, f64> = BTreeMap::new();
        let mut event_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for event in events {
            if let Some(loc) = &event.location {
                *raw.entry(loc.as_str()).or_insert(0.0) += event.importance_score;
                *event_counts.entry(loc.as_str()).or_insert(0) += 1;
            }
        }
        let min = raw.values().cloned().fold(f64::INFINITY, f64::min);
        let max = raw.values().cloned().fold(f64::NEG_INFINITY, f64::max);
        for location in &mut locations {
            location.event_count = event_counts.get(location.name.as_str()).copied().unwrap_or(0);
            let score = raw.get(location.name.as_str()).copied().unwrap_or(0.0);
            let normalized = if raw.is_empty() || (max - min).abs() < 1e-15 {
                if score > 0.0 {
                    1.0
                } else {
                    0.0
                }
            } else {
                (score - min) / (max - min)
            };
            let visitor_bonus = 0.05
                * visitors
                    .get(location.name.as_str())
                    .map(BTreeSet::len)
                    .unwrap_or(0) as f64;
            location.importance = (normalized + visitor_bonus.min(0.3)).clamp(0.0, 1.0);
        }

        let transitions = track_transitions(events);

        info!(
            locations = locations.len(),
            transitions = transitions.len(),
            visits = visits.len(),
            "location analysis complete"
        );
        LocationAnalysis {
            locations,
            transitions,
            visits,
        }
    }
}

/// Visit counts from event participation and sentence co-mentions.
fn build_visits(
    chapters: &[ProcessedChapter],
    events: &[Event],
    locations: &[Location],
    index: &NameIndex,
) -> Vec<LocationVisit> {
    let mut counts: BTreeMap<(String, String, u32), usize> = BTreeMap::new();

    for event in events {
        if let Some(location) = &event.location {
            for participant in &event.participants {
                *counts
                    .entry((participant.clone(), location.clone(), event.chapter))
                    .or_insert(0) += 1;
            }
        }
    }

    for chapter in chapters {
        for sentence in &chapter.sentences {
            let chars_here = index.find(sentence);
            if chars_here.is_empty() {
                continue;
            }
            for location in locations {
                if !sentence.contains(location.name.as_str()) {
                    continue;
                }
                for character in &chars_here {
                    *counts
                        .entry((character.clone(), location.name.clone(), chapter.index))
                        .or_insert(0) += 1;
                }
            }
        }
    }

    counts
        .into_iter()
        .map(|((character, location, chapter), visit_count)| LocationVisit {
            character,
            location,
            chapter,
            visit_count,
        })
        .collect()
}

/// A transition is emitted whenever two consecutive located events disagree;
/// events without a location do not break a scene.
fn track_transitions(events: &[Event]) -> Vec<SceneTransition> {
    let mut transitions = Vec::new();
    let mut current: Option<&str> = None;
    for event in events {
        let Some(location) = event.location.as_deref() else {
            continue;
        };
        if let Some(previous) = current {
            if previous != location {
                transitions.push(SceneTransition {
                    from: previous.to_string(),
                    to: location.to_string(),
                    chapter: event.chapter,
                    event_id: event.id.clone(),
                });
            }
        }
        current = Some(location);
    }
    transitions
}
