//! Character-level scoring on the relation graph.
//!
//! importance = 0.5·normalized(mentions) + 0.3·degree_centrality +
//! 0.2·chapter-presence fraction. Communities come from a greedy modularity
//! agglomeration over the strength-weighted graph and are reported only.

use std::collections::BTreeMap;

use graphrs::{Edge, Graph, GraphSpecs, Node};
use tracing::info;

use crate::config::AnalysisConfig;
use crate::models::{Character, Classification, Relation};
use crate::AnalysisError;

#[derive(Debug, Clone)]
pub struct CharacterAnalysis {
    pub characters: Vec<Character>,
    pub communities: Vec<Vec<String>>,
}

pub struct CharacterAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> CharacterAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(
        &self,
        mut characters: Vec<Character>,
        relations: &[Relation],
        total_chapters: u32,
    ) -> Result<CharacterAnalysis, AnalysisError> {
        let graph = build_graph(&characters, relations)?;
        let degrees = weighted_degrees(&graph);

        let max_degree = degrees.values().cloned().fold(0.0_f64, f64::max);
        let max_mentions = characters
            .iter()
            .map(|c| c.mention_count)
            .max()
            .unwrap_or(0);

        for character in &mut characters {
            let degree = degrees.get(&character.name).copied().unwrap_or(0.0);
            character.degree_centrality = if max_degree > 0.0 {
                degree / max_degree
            } else {
                0.0
            };
            let mention_score = if max_mentions > 0 {
                character.mention_count as f64 / max_mentions as f64
            } else {
                0.0
            };
            let presence = character.presence_fraction(total_chapters);
            character.importance =
                0.5 * mention_score + 0.3 * character.degree_centrality + 0.2 * presence;
            character.classification = if character.importance >= self.config.main_threshold
                || presence >= self.config.main_presence_fraction
            {
                Classification::Main
            } else {
                Classification::Supporting
            };
        }

        let communities = detect_communities(&characters, relations);

        info!(
            main = characters
                .iter()
                .filter(|c| c.classification == Classification::Main)
                .count(),
            communities = communities.len(),
            "character analysis complete"
        );
        Ok(CharacterAnalysis {
            characters,
            communities,
        })
    }
}

fn build_graph(
    characters: &[Character],
    relations: &[Relation],
) -> Result<Graph<String, ()>, AnalysisError> {
    let mut graph = Graph::<String, ()>::new(GraphSpecs::undirected());
    for character in characters {
        graph.add_node(Node::from_name(character.name.clone()));
    }
    for relation in relations {
        graph
            .add_edge(Edge::with_weight(
                relation.source.clone(),
                relation.target.clone(),
                relation.strength,
            ))
            .map_err(|e| AnalysisError::StageFailure {
                stage: "characters",
                cause: format!("failed to add relation edge: {:?}", e),
            })?;
    }
    Ok(graph)
}

/// Weighted degree per node in one pass over the edge list.
fn weighted_degrees(graph: &Graph<String, ()>) -> BTreeMap<String, f64> {
    let mut degrees: BTreeMap<String, f64> = BTreeMap::new();
    for edge in graph.get_all_edges() {
        *degrees.entry(edge.u.clone()).or_insert(0.0) += edge.weight;
        *degrees.entry(edge.v.clone()).or_insert(0.0) += edge.weight;
    }
    degrees
}

/// Greedy modularity agglomeration (CNM style) over the weighted relation
/// graph. Deterministic: merge candidates are examined in sorted order and
/// ties go to the lexicographically smaller pair. Singleton communities are
/// not reported.
fn detect_communities(characters: &[Character], relations: &[Relation]) -> Vec<Vec<String>> {
    let names: Vec<String> = characters.iter().map(|c| c.name.clone()).collect();
    let index: BTreeMap<&String, usize> = names.iter().zip(0usize..).collect();

    let mut edge_weight: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    let mut degree = vec![0.0_f64; names.len()];
    let mut total = 0.0_f64;
    for relation in relations {
        let (Some(&a), Some(&b)) = (index.get(&relation.source), index.get(&relation.target))
        else {
            continue;
        };
        if a == b {
            continue;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        *edge_weight.entry(key).or_insert(0.0) += relation.strength;
        degree[a] += relation.strength;
        degree[b] += relation.strength;
        total += relation.strength;
    }
    if total == 0.0 {
        return Vec::new();
    }
    let two_m = 2.0 * total;

    // community id per node; communities start as singletons.
    let mut community: Vec<usize> = (0..names.len()).collect();

    loop {
        // Aggregate inter-community weights and community degrees.
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut comm_degree: BTreeMap<usize, f64> = BTreeMap::new();
        for (i, deg) in degree.iter().enumerate() {
            *comm_degree.entry(community[i]).or_insert(0.0) += deg;
        }
        for (&(a, b), &w) in &edge_weight {
            let (ca, cb) = (community[a], community[b]);
            if ca != cb {
                let key = if ca < cb { (ca, cb) } else { (cb, ca) };
                *between.entry(key).or_insert(0.0) += w;
            }
        }

        // Pick the connected pair with the best modularity gain.
        let mut best: Option<((usize, usize), f64)> = None;
        for (&(ca, cb), &w_ab) in &between {
            let a_a = comm_degree.get(&ca).copied().unwrap_or(0.0) / two_m;
            let a_b = comm_degree.get(&cb).copied().unwrap_or(0.0) / two_m;
            let gain = 2.0 * (w_ab / two_m - a_a * a_b);
            let better = match best {
                None => gain > 1e-12,
                Some((_, best_gain)) => gain > best_gain + 1e-12,
            };
            if better {
                best = Some(((ca, cb), gain));
            }
        }

        let Some(((ca, cb), _)) = best else {
            break;
        };
        for c in community.iter_mut() {
            if *c == cb {
                *c = ca;
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (i, name) in names.iter().enumerate() {
        groups.entry(community[i]).or_default().push(name.clone());
    }
    let mut communities: Vec<Vec<String>> = groups
        .into_values()
        .filter(|members| members.len() > 1)
        .map(|mut members| {
            members.sort();
            members
        })
        .collect();
    communities.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    communities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationType;

    fn character(name: &str, mentions: usize, chapters: &[u32]) -> Character {
        Character {
            name: name.into(),
            aliases: BTreeSet::from([name.to_string()]),
            mention_count: mentions,
            first_appearance: *chapters.first().unwrap_or(&1),
            chapters_present: chapters.iter().copied().collect(),
            importance: 0.0,
            degree_centrality: 0.0,
            classification: Classification::Supporting,
        }
    }

    fn relation(a: &str, b: &str, strength: f64) -> Relation {
        Relation {
            source: a.into(),
            target: b.into(),
            kind: RelationType::Friend,
            strength,
            directed: false,
            evidence: vec![],
        }
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let config = AnalysisConfig::default();
        let analyzer = CharacterAnalyzer::new(&config);
        let result = analyzer
            .analyze(
                vec![
                    character("甲", 30, &[1, 2, 3, 4, 5]),
                    character("乙", 10, &[1, 2]),
                    character("丙", 3, &[5]),
                ],
                &[relation("甲", "乙", 0.8), relation("甲", "丙", 0.3)],
                5,
            )
            .unwrap();
        for c in &result.characters {
            assert!((0.0..=1.0).contains(&c.importance), "{}", c.importance);
            assert!((0.0..=1.0).contains(&c.degree_centrality));
        }
    }

    #[test]
    fn test_most_mentioned_connected_character_is_main() {
        let config = AnalysisConfig::default();
        let analyzer = CharacterAnalyzer::new(&config);
        let result = analyzer
            .analyze(
                vec![
                    character("甲", 50, &[1, 2, 3, 4, 5]),
                    character("乙", 5, &[2]),
                ],
                &[relation("甲", "乙", 0.9)],
                5,
            )
            .unwrap();
        let a = result.characters.iter().find(|c| c.name == "甲").unwrap();
        let b = result.characters.iter().find(|c| c.name == "乙").unwrap();
        assert_eq!(a.classification, Classification::Main);
        assert_eq!(b.classification, Classification::Supporting);
        assert!(a.importance > b.importance);
    }

    #[test]
    fn test_presence_alone_classifies_main() {
        // Low mentions but present in 4 of 5 chapters (>= 60%).
        let config = AnalysisConfig::default();
        let analyzer = CharacterAnalyzer::new(&config);
        let result = analyzer
            .analyze(
                vec![
                    character("甲", 100, &[1]),
                    character("乙", 4, &[1, 2, 3, 4]),
                ],
                &[],
                5,
            )
            .unwrap();
        let b = result.characters.iter().find(|c| c.name == "乙").unwrap();
        assert_eq!(b.classification, Classification::Main);
    }

    #[test]
    fn test_degree_centrality_max_is_one() {
        let config = AnalysisConfig::default();
        let analyzer = CharacterAnalyzer::new(&config);
        let result = analyzer
            .analyze(
                vec![
                    character("甲", 10, &[1]),
                    character("乙", 10, &[1]),
                    character("丙", 10, &[1]),
                ],
                &[relation("甲", "乙", 0.5), relation("甲", "丙", 0.5)],
                1,
            )
            .unwrap();
        let a = result.characters.iter().find(|c| c.name == "甲").unwrap();
        assert!((a.degree_centrality - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_clusters_form_two_communities() {
        let characters = vec![
            character("甲", 10, &[1]),
            character("乙", 10, &[1]),
            character("丙", 10, &[1]),
            character("丁", 10, &[1]),
        ];
        let relations = vec![relation("甲", "乙", 0.9), relation("丙", "丁", 0.9)];
        let communities = detect_communities(&characters, &relations);
        assert_eq!(communities.len(), 2);
        for community in &communities {
            assert_eq!(community.len(), 2);
        }
    }

    #[test]
    fn test_no_relations_no_communities() {
        let characters = vec![character("甲", 10, &[1]), character("乙", 10, &[1])];
        assert!(detect_communities(&characters, &[]).is_empty());
    }

    #[test]
    fn test_communities_are_deterministic() {
        let characters = vec![
            character("甲", 10, &[1]),
            character("乙", 10, &[1]),
            character("丙", 10, &[1]),
        ];
        let relations = vec![
            relation("甲", "乙", 0.5),
            relation("乙", "丙", 0.5),
            relation("甲", "丙", 0.5),
        ];
        let first = detect_communities(&characters, &relations);
        let second = detect_communities(&characters, &relations);
        assert_eq!(first, second);
    }
}
