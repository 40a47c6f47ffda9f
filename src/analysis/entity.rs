//! Character and location candidate extraction with alias merging.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use tracing::info;

use crate::config::AnalysisConfig;
use crate::models::{Character, Classification, Location};
use crate::text::{Lexicons, ProcessedChapter, TextProcessor};
use crate::AnalysisError;

/// Output of the entity stage.
#[derive(Debug, Clone)]
pub struct EntityExtraction {
    pub characters: Vec<Character>,
    pub locations: Vec<Location>,
}

struct MentionStats {
    count: usize,
    chapters: BTreeSet<u32>,
}

pub struct EntityExtractor<'a> {
    processor: &'a TextProcessor,
    lexicons: &'a Lexicons,
    config: &'a AnalysisConfig,
}

impl<'a> EntityExtractor<'a> {
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

    /// Scan every chapter, filter candidates by `min_mentions`, merge
    /// aliases, and classify location types.
    ///
    /// Fails with `NoEntitiesFound` when fewer than two characters survive:
    /// the downstream analyzers are undefined on degenerate inputs.
    pub fn extract(
        &self,
        chapters: &[ProcessedChapter],
    ) -> Result<EntityExtraction, AnalysisError> {
        let mut name_stats: BTreeMap<String, MentionStats> = BTreeMap::new();
        let mut loc_stats: BTreeMap<String, MentionStats> = BTreeMap::new();

        for chapter in chapters {
            for (word, tag) in self.processor.tag(&chapter.text)? {
                if word.chars().count() < 2 || self.lexicons.stopwords.contains(&word) {
                    continue;
                }
                if tag.starts_with("nr") {
                    record(&mut name_stats, &word, chapter.index);
                } else if tag.starts_with("ns")
                    || (tag.starts_with('n') && self.lexicons.has_location_suffix(&word))
                {
                    record(&mut loc_stats, &word, chapter.index);
                }
            }
        }

        let candidates: Vec<String> = name_stats
            .iter()
            .filter(|(_, s)| s.count >= self.config.min_mentions)
            .map(|(n, _)| n.clone())
            .collect();

        let merge_pairs = self.collect_alias_evidence(chapters, &candidates);
        let classes = merge_classes(&candidates, &merge_pairs);

        let mut characters: Vec<Character> = classes
            .into_iter()
            .map(|class| {
                let canonical = canonical_name(&class);
                let mut chapters_present = BTreeSet::new();
                let mut mention_count = 0;
                for member in &class {
                    if let Some(stats) = name_stats.get(member) {
                        mention_count += stats.count;
                        chapters_present.extend(stats.chapters.iter().copied());
                    }
                }
                let first_appearance = chapters_present.iter().next().copied().unwrap_or(1);
                Character {
                    name: canonical,
                    aliases: class,
                    mention_count,
                    first_appearance,
                    chapters_present,
                    importance: 0.0,
                    degree_centrality: 0.0,
                    classification: Classification::Supporting,
                }
            })
            .collect();
        characters.sort_by(|a, b| {
            b.mention_count
                .cmp(&a.mention_count)
                .then_with(|| a.name.cmp(&b.name))
        });

        if characters.len() < 2 {
            return Err(AnalysisError::NoEntitiesFound(format!(
                "only {} character(s) passed the {}-mention filter",
                characters.len(),
                self.config.min_mentions
            )));
        }

        let known_aliases: BTreeSet<&String> =
            characters.iter().flat_map(|c| c.aliases.iter()).collect();
        let mut locations: Vec<Location> = loc_stats
            .iter()
            .filter(|(name, s)| {
                s.count >= self.config.min_mentions && !known_aliases.contains(name)
            })
            .map(|(name, s)| Location {
                name: name.clone(),
                kind: self.lexicons.location_type(name),
                importance: 0.0,
                event_count: 0,
                mention_count: s.count,
            })
            .collect();
        locations.sort_by(|a, b| {
            b.mention_count
                .cmp(&a.mention_count)
                .then_with(|| a.name.cmp(&b.name))
        });

        info!(
            characters = characters.len(),
            locations = locations.len(),
            "entity extraction complete"
        );
        Ok(EntityExtraction {
            characters,
            locations,
        })
    }

    /// Gather alias merge evidence from all three channels. Evidence is a
    /// set of unordered pairs; the later union-find makes the equivalence
    /// classes independent of the order evidence was found in.
    fn collect_alias_evidence(
        &self,
        chapters: &[ProcessedChapter],
        candidates: &[String],
    ) -> BTreeSet<(String, String)> {
        let mut pairs = BTreeSet::new();
        let suffix_pairs: Vec<(String, String)> = candidate_suffix_pairs(candidates);
        if candidates.is_empty() {
            return pairs;
        }

        // Channel a: suffix forms co-occurring in the same sentence.
        let mut cooccur: BTreeMap<(String, String), usize> = BTreeMap::new();
        for chapter in chapters {
            for sentence in &chapter.sentences {
                for (short, long) in &suffix_pairs {
                    if sentence.contains(short.as_str()) && sentence.contains(long.as_str()) {
                        *cooccur
                            .entry(ordered_pair(short, long))
                            .or_insert(0) += 1;
                    }
                }
            }
        }
        for (pair, count) in cooccur {
            if count >= self.config.alias_cooccur_min {
                pairs.insert(pair);
            }
        }

        // Channel b: appositive patterns.
        let alternation = name_alternation(candidates);
        let re_appositive = Regex::new(&format!(
            "({alternation})[，,]\\s*(?:也就是|即|又名|人称)({alternation})"
        ))
        .expect("appositive regex");
        for chapter in chapters {
            for caps in re_appositive.captures_iter(&chapter.text) {
                let a = caps[1].to_string();
                let b = caps[2].to_string();
                if a != b {
                    pairs.insert(ordered_pair(&a, &b));
                }
            }
        }

        // Channel c: speaker form vs. addressed suffix form inside dialogue.
        let candidate_set: BTreeSet<&String> = candidates.iter().collect();
        let mut dialogue_bind: BTreeMap<(String, String), usize> = BTreeMap::new();
        for chapter in chapters {
            for dialogue in self.processor.extract_dialogues(&chapter.text) {
                let Some(speaker) = dialogue.speaker else {
                    continue;
                };
                if !candidate_set.contains(&speaker) {
                    continue;
                }
                for other in candidates {
                    if *other != speaker
                        && is_suffix_pair(other, &speaker)
                        && dialogue.content.contains(other.as_str())
                    {
                        *dialogue_bind
                            .entry(ordered_pair(other, &speaker))
                            .or_insert(0) += 1;
                    }
                }
            }
        }
        for (pair, count) in dialogue_bind {
            if count >= self.config.alias_cooccur_min {
                pairs.insert(pair);
            }
        }

        pairs
    }
}

fn record(stats: &mut BTreeMap<String, MentionStats>, word: &str, chapter: u32) {
    let entry = stats.entry(word.to_string()).or_insert(MentionStats {
        count: 0,
        chapters: BTreeSet::new(),
    });
    entry.count += 1;
    entry.chapters.insert(chapter);
}

fn ordered_pair(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// True when one name is a proper suffix of the other (e.g. 惊羽 / 林惊羽).
fn is_suffix_pair(a: &str, b: &str) -> bool {
    a != b && (a.ends_with(b) || b.ends_with(a))
}

fn candidate_suffix_pairs(candidates: &[String]) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (i, a) in candidates.iter().enumerate() {
        for b in candidates.iter().skip(i + 1) {
            if is_suffix_pair(a, b) {
                // (short, long)
                if a.chars().count() < b.chars().count() {
                    out.push((a.clone(), b.clone()));
                } else {
                    out.push((b.clone(), a.clone()));
                }
            }
        }
    }
    out
}

fn name_alternation(candidates: &[String]) -> String {
    let mut sorted: Vec<&String> = candidates.iter().collect();
    sorted.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.cmp(b))
    });
    sorted
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|")
}

/// Union-find over the evidence pairs. Idempotent and order-independent:
/// the classes depend only on the evidence set, not on iteration order.
fn merge_classes(
    candidates: &[String],
    pairs: &BTreeSet<(String, String)>,
) -> Vec<BTreeSet<String>> {
    let index: BTreeMap<&String, usize> = candidates.iter().zip(0usize..).collect();
    let mut parent: Vec<usize> = (0..candidates.len()).collect();

    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        if parent[i] != i {
            let root = find(parent, parent[i]);
            parent[i] = root;
        }
        parent[i]
    }

    for (a, b) in pairs {
        if let (Some(&ia), Some(&ib)) = (index.get(a), index.get(b)) {
            let (ra, rb) = (find(&mut parent, ia), find(&mut parent, ib));
            if ra != rb {
                // Attach the larger index under the smaller for determinism.
                let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
                parent[hi] = lo;
            }
        }
    }

    let mut classes: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
    for (i, name) in candidates.iter().enumerate() {
        let root = find(&mut parent, i);
        classes.entry(root).or_default().insert(name.clone());
    }
    classes.into_values().collect()
}

/// Longest form wins; ties break lexicographically.
fn canonical_name(class: &BTreeSet<String>) -> String {
    class
        .iter()
        .max_by(|a, b| {
            a.chars()
                .count()
                .cmp(&b.chars().count())
                .then_with(|| b.cmp(a))
        })
        .cloned()
        .unwrap_or_default()
}
