//! Event ordering, hierarchy, causality, and main-plot contribution.
//!
//! Events are totally ordered by (chapter, sequence). Contribution comes
//! from a random walk with restart over the event-character participation
//! graph plus the causal edges, restarted at events involving main
//! characters; the steady-state event probabilities are min-max normalized.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::models::{
    CausalLink, Character, Classification, Event, EventHierarchy, TimeMarker, TimeMarkerKind,
};
use crate::text::Lexicons;

#[derive(Debug, Clone)]
pub struct TimelineAnalysis {
    pub events: Vec<Event>,
    pub hierarchy: EventHierarchy,
    pub causal_links: Vec<CausalLink>,
    pub main_plot_events: Vec<String>,
}

pub struct TimelineAnalyzer<'a> {
    lexicons: &'a Lexicons,
    config: &'a AnalysisConfig,
    re_absolute: Vec<Regex>,
    re_relative: Vec<Regex>,
}

impl<'a> TimelineAnalyzer<'a> {
    pub fn new(lexicons: &'a Lexicons, config: &'a AnalysisConfig) -> Self {
        let compile = |patterns: &[&str]| {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("time marker regex"))
                .collect()
        };
        Self {
            lexicons,
            config,
            re_absolute: compile(&[
                r"[某〇零一二三四五六七八九十百千\d]+年",
                r"[正腊某〇一二三四五六七八九十\d]+月(?:初[一二三四五六七八九十])?",
                r"春天|夏天|秋天|冬天",
                r"清晨|早上|中午|下午|傍晚|夜里|深夜",
            ]),
            re_relative: compile(&[
                r"第二天|次日|翌日|次年",
                r"[一二三四五六七八九十\d]+[日天月年]后",
                r"不久|随后|此后|多年以后",
            ]),
        }
    }

    pub fn analyze(
        &self,
        mut events: Vec<Event>,
        characters: &[Character],
    ) -> TimelineAnalysis {
        events.sort_by_key(|e| e.order_key());

        for event in &mut events {
            event.time_marker = self.extract_time_marker(&event.description);
        }

        let hierarchy = self.build_hierarchy(&events);
        let causal_links = self.infer_causal_links(&events);
        let contributions = self.contribution_walk(&events, characters, &causal_links);
        for (event, contribution) in events.iter_mut().zip(&contributions) {
            event.contribution_score = *contribution;
        }

        let main_plot_events: Vec<String> = events
            .iter()
            .filter(|e| e.contribution_score >= self.config.main_plot_threshold)
            .map(|e| e.id.clone())
            .collect();

        info!(
            events = events.len(),
            causal_links = causal_links.len(),
            main_plot = main_plot_events.len(),
            "timeline analysis complete"
        );
        TimelineAnalysis {
            events,
            hierarchy,
            causal_links,
            main_plot_events,
        }
    }

    /// Absolute markers take precedence over relative ones; markers are
    /// display-only and never override sequence order.
    fn extract_time_marker(&self, description: &str) -> Option<TimeMarker> {
        for re in &self.re_absolute {
            if let Some(m) = re.find(description) {
                return Some(TimeMarker {
                    kind: TimeMarkerKind::Absolute,
                    text: m.as_str().to_string(),
                });
            }
        }
        for re in &self.re_relative {
            if let Some(m) = re.find(description) {
                return Some(TimeMarker {
                    kind: TimeMarkerKind::Relative,
                    text: m.as_str().to_string(),
                });
            }
        }
        None
    }

    /// Intra-chapter sub-event forest: a child attaches to the qualifying
    /// parent with the highest importance (earliest sequence on ties).
    fn build_hierarchy(&self, events: &[Event]) -> EventHierarchy {
        let mut hierarchy = EventHierarchy::default();
        for child in events {
            let mut best: Option<&Event> = None;
            for parent in events {
                if parent.id == child.id
                    || parent.chapter != child.chapter
                    || parent.sequence.abs_diff(child.sequence) > self.config.sub_event_window
                {
                    continue;
                }
                let shared = parent.participants.intersection(&child.participants).count();
                if shared < 2 {
                    continue;
                }
                if parent.importance_score
                    < child.importance_score + self.config.sub_event_importance_gap
                {
                    continue;
                }
                let better = match best {
                    None => true,
                    Some(b) => {
                        parent.importance_score > b.importance_score
                            || (parent.importance_score == b.importance_score
                                && parent.sequence < b.sequence)
                    }
                };
                if better {
                    best = Some(parent);
                }
            }
            if let Some(parent) = best {
                hierarchy
                    .parents
                    .insert(child.id.clone(), parent.id.clone());
            }
        }
        hierarchy
    }

    /// Consequence-cue causal links. Cause precedes effect in the total
    /// order by construction, so the causal graph is acyclic.
    fn infer_causal_links(&self, events: &[Event]) -> Vec<CausalLink> {
        let mut links = Vec::new();
        for (i, cause) in events.iter().enumerate() {
            if cause.importance_score < self.config.causal_importance_floor {
                continue;
            }
            for effect in events
                .iter()
                .skip(i + 1)
                .take(self.config.causal_horizon)
            {
                if effect.importance_score < self.config.causal_importance_floor {
                    continue;
                }
                let shared = cause
                    .participants
                    .intersection(&effect.participants)
                    .count();
                if shared == 0 {
                    continue;
                }
                if !self.lexicons.has_consequence_cue(&effect.description) {
                    continue;
                }
                links.push(CausalLink {
                    cause: cause.id.clone(),
                    effect: effect.id.clone(),
                    strength: link_strength(shared, true, false),
                });
            }
        }
        links
    }

    /// Random walk with restart over events + characters.
    fn contribution_walk(
        &self,
        events: &[Event],
        characters: &[Character],
        causal_links: &[CausalLink],
    ) -> Vec<f64> {
        if events.is_empty() {
            return Vec::new();
        }
        let event_count = events.len();
        let mut node_index: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, event) in events.iter().enumerate() {
            node_index.insert(event.id.as_str(), i);
        }
        let mut names: Vec<&str> = Vec::new();
        for character in characters {
            node_index.insert(character.name.as_str(), event_count + names.len());
            names.push(character.name.as_str());
        }
        let n = event_count + names.len();

        // Out-edges with weights; participation is bidirectional, causality
        // directed.
        let mut out: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (i, event) in events.iter().enumerate() {
            for participant in &event.participants {
                if let Some(&c) = node_index.get(participant.as_str()) {
                    out[i].push((c, 1.0));
                    out[c].push((i, 1.0));
                }
            }
        }
        for link in causal_links {
            if let (Some(&a), Some(&b)) = (
                node_index.get(link.cause.as_str()),
                node_index.get(link.effect.as_str()),
            ) {
                out[a].push((b, link.strength));
            }
        }

        // Restart mass: uniform over events involving a main character.
        let main_names: BTreeSet<&str> = characters
            .iter()
            .filter(|c| c.classification == Classification::Main)
            .map(|c| c.name.as_str())
            .collect();
        let mut restart = vec![0.0_f64; n];
        let mut seeds: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.participants.iter().any(|p| main_names.contains(p.as_str())))
            .map(|(i, _)| i)
            .collect();
        if seeds.is_empty() {
            seeds = (0..event_count).collect();
        }
        for &s in &seeds {
            restart[s] = 1.0 / seeds.len() as f64;
        }

        let out_totals: Vec<f64> = out
            .iter()
            .map(|edges| edges.iter().map(|(_, w)| w).sum())
            .collect();

        let damping = self.config.rwr_damping;
        let mut p = restart.clone();
        for _ in 0..self.config.rwr_max_iterations {
            let mut next = vec![0.0_f64; n];
            let mut dangling = 0.0;
            for (u, edges) in out.iter().enumerate() {
                if out_totals[u] == 0.0 {
                    dangling += p[u];
                    continue;
                }
                for (v, w) in edges {
                    next[*v] += p[u] * w / out_totals[u];
                }
            }
            let mut diff = 0.0;
            for v in 0..n {
                let value = (1.0 - damping) * restart[v]
                    + damping * (next[v] + dangling * restart[v]);
                diff += (value - p[v]).abs();
                next[v] = value;
            }
            p = next;
            if diff < 1e-9 {
                break;
            }
        }

        // Min-max normalize the event probabilities.
        let event_p = &p[..event_count];
        let min = event_p.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = event_p.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if (max - min).abs() < 1e-15 {
            return vec![1.0; event_count];
        }
        event_p.iter().map(|v| (v - min) / (max - min)).collect()
    }
}

/// Strength of a causal link from shared participants plus cue/state signals.
pub fn link_strength(shared: usize, cue: bool, state: bool) -> f64 {
    let base = (0.2 * shared as f64).min(0.6);
    let cue_bonus = if cue { 0.3 } else { 0.0 };
    let state_bonus = if state { 0.2 } else { 0.0 };
    (base + cue_bonus + state_bonus).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventType;
    use std::collections::BTreeSet;

    fn event(
        id: &str,
        chapter: u32,
        sequence: u32,
        importance: f64,
        participants: &[&str],
        description: &str,
    ) -> Event {
        Event {
            id: id.into(),
            description: description.into(),
            chapter,
            sequence,
            kind: EventType::Other,
            participants: participants.iter().map(|p| p.to_string()).collect(),
            location: None,
            importance_score: importance,
            contribution_score: 0.0,
            time_marker: None,
        }
    }

    fn character(name: &str, importance: f64, main: bool) -> Character {
        Character {
            name: name.into(),
            aliases: BTreeSet::from([name.to_string()]),
            mention_count: 5,
            first_appearance: 1,
            chapters_present: BTreeSet::from([1]),
            importance,
            degree_centrality: 0.0,
            classification: if main {
                Classification::Main
            } else {
                Classification::Supporting
            },
        }
    }

    fn analyzer<'a>(lexicons: &'a Lexicons, config: &'a AnalysisConfig) -> TimelineAnalyzer<'a> {
        TimelineAnalyzer::new(lexicons, config)
    }

    #[test]
    fn test_time_markers() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let t = analyzer(&lexicons, &config);
        let absolute = t.extract_time_marker("三月初三，甲到了").unwrap();
        assert_eq!(absolute.kind, TimeMarkerKind::Absolute);
        let relative = t.extract_time_marker("三日后甲归来").unwrap();
        assert_eq!(relative.kind, TimeMarkerKind::Relative);
        assert_eq!(relative.text, "三日后");
        assert!(t.extract_time_marker("甲看着乙").is_none());
    }

    #[test]
    fn test_hierarchy_requires_gap_and_shared_participants() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let t = analyzer(&lexicons, &config);
        let events = vec![
            event("ev_0001", 1, 1, 0.9, &["甲", "乙"], "大战"),
            event("ev_0002", 1, 3, 0.4, &["甲", "乙"], "交手"),
            event("ev_0003", 1, 5, 0.4, &["丙"], "旁观"),
        ];
        let h = t.build_hierarchy(&events);
        assert_eq!(h.parent_of("ev_0002"), Some("ev_0001"));
        // Only one shared participant path for ev_0003: no parent.
        assert_eq!(h.parent_of("ev_0003"), None);
        // The parent itself has no parent: forest, not a cycle.
        assert_eq!(h.parent_of("ev_0001"), None);
    }

    #[test]
    fn test_hierarchy_is_intra_chapter() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let t = analyzer(&lexicons, &config);
        let events = vec![
            event("ev_0001", 1, 1, 0.9, &["甲", "乙"], "大战"),
            event("ev_0002", 2, 1, 0.4, &["甲", "乙"], "再战"),
        ];
        let h = t.build_hierarchy(&events);
        assert!(h.parents.is_empty());
    }

    #[test]
    fn test_causal_links_respect_order_and_cue() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let t = analyzer(&lexicons, &config);
        let events = vec![
            event("ev_0001", 3, 1, 0.8, &["甲", "乙"], "甲与乙大战"),
            event("ev_0002", 4, 1, 0.5, &["甲"], "于是甲受伤"),
        ];
        let links = t.infer_causal_links(&events);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].cause, "ev_0001");
        assert_eq!(links[0].effect, "ev_0002");
        assert!(links[0].strength >= 0.4);
    }

    #[test]
    fn test_causal_links_need_shared_participant() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let t = analyzer(&lexicons, &config);
        let events = vec![
            event("ev_0001", 1, 1, 0.8, &["甲"], "甲出发"),
            event("ev_0002", 2, 1, 0.5, &["乙"], "于是乙受伤"),
        ];
        assert!(t.infer_causal_links(&events).is_empty());
    }

    #[test]
    fn test_link_strength_formula() {
        assert!((link_strength(1, true, false) - 0.5).abs() < 1e-9);
        assert!((link_strength(3, true, true) - 1.0).abs() < 1e-9);
        assert!(link_strength(5, true, true) <= 1.0);
    }

    #[test]
    fn test_contribution_in_range_and_main_plot_subset() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let t = analyzer(&lexicons, &config);
        let events = vec![
            event("ev_0001", 1, 1, 0.9, &["甲", "乙"], "甲与乙大战"),
            event("ev_0002", 1, 3, 0.5, &["甲"], "于是甲受伤"),
            event("ev_0003", 2, 1, 0.4, &["丙"], "丙路过"),
        ];
        let characters = vec![
            character("甲", 0.9, true),
            character("乙", 0.5, false),
            character("丙", 0.2, false),
        ];
        let result = t.analyze(events, &characters);
        for e in &result.events {
            assert!((0.0..=1.0).contains(&e.contribution_score));
        }
        let ids: BTreeSet<&str> = result.events.iter().map(|e| e.id.as_str()).collect();
        for id in &result.main_plot_events {
            assert!(ids.contains(id.as_str()));
        }
        assert!(result.main_plot_events.len() <= result.events.len());
        // Main-character events must outrank the isolated bystander event.
        let by_id = |id: &str| {
            result
                .events
                .iter()
                .find(|e| e.id == id)
                .unwrap()
                .contribution_score
        };
        assert!(by_id("ev_0001") > by_id("ev_0003"));
    }

    #[test]
    fn test_single_event_degenerate_contribution() {
        let lexicons = Lexicons::builtin();
        let config = AnalysisConfig::default();
        let t = analyzer(&lexicons, &config);
        let events = vec![event("ev_0001", 1, 1, 0.9, &["甲"], "甲出发")];
        let result = t.analyze(events, &[character("甲", 0.9, true)]);
        assert_eq!(result.events[0].contribution_score, 1.0);
    }
}
