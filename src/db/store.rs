//! Graph store client: bundle persistence and read-back.
//!
//! The property-graph projection serves queries; the normalized bundle is
//! also archived on the novel node so read-back is exact. The write is one
//! transaction scoped to the novel id: prior nodes and edges under that key
//! are deleted before insertion, so re-running an analysis is idempotent.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::db::connection::GraphDb;
use crate::models::AnalysisBundle;
use crate::AnalysisError;

/// Storage seam consumed by the pipeline. Injected, not discovered.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Replace everything stored under `novel_id` with this bundle.
    async fn upsert_bundle(
        &self,
        novel_id: &str,
        bundle: &AnalysisBundle,
    ) -> Result<(), AnalysisError>;

    /// Read a previously stored bundle back.
    async fn fetch_bundle(&self, novel_id: &str) -> Result<Option<AnalysisBundle>, AnalysisError>;

    /// Ids of all stored novels.
    async fn list_novels(&self) -> Result<Vec<String>, AnalysisError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (tests, dry runs)
// ---------------------------------------------------------------------------

/// Keeps bundles in a map; upsert semantics match the real store.
#[derive(Default)]
pub struct MemoryGraphStore {
    bundles: Mutex<BTreeMap<String, AnalysisBundle>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn upsert_bundle(
        &self,
        novel_id: &str,
        bundle: &AnalysisBundle,
    ) -> Result<(), AnalysisError> {
        self.bundles
            .lock()
            .map_err(|_| AnalysisError::GraphStore("memory store poisoned".into()))?
            .insert(novel_id.to_string(), bundle.clone());
        Ok(())
    }

    async fn fetch_bundle(&self, novel_id: &str) -> Result<Option<AnalysisBundle>, AnalysisError> {
        Ok(self
            .bundles
            .lock()
            .map_err(|_| AnalysisError::GraphStore("memory store poisoned".into()))?
            .get(novel_id)
            .cloned())
    }

    async fn list_novels(&self) -> Result<Vec<String>, AnalysisError> {
        Ok(self
            .bundles
            .lock()
            .map_err(|_| AnalysisError::GraphStore("memory store poisoned".into()))?
            .keys()
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// SurrealDB implementation
// ---------------------------------------------------------------------------

pub struct SurrealGraphStore {
    db: GraphDb,
}

impl SurrealGraphStore {
    pub fn new(db: GraphDb) -> Self {
        Self { db }
    }
}

const UPSERT_QUERY: &str = r#"
BEGIN TRANSACTION;

DELETE type::thing('novel', $novel_id);
DELETE chapter WHERE novel_id = $novel_id;
DELETE character WHERE novel_id = $novel_id;
DELETE event WHERE novel_id = $novel_id;
DELETE location WHERE novel_id = $novel_id;
DELETE emotion WHERE novel_id = $novel_id;
DELETE state WHERE novel_id = $novel_id;
DELETE has_chapter WHERE novel_id = $novel_id;
DELETE appears_in WHERE novel_id = $novel_id;
DELETE knows WHERE novel_id = $novel_id;
DELETE participates_in WHERE novel_id = $novel_id;
DELETE happens_at WHERE novel_id = $novel_id;
DELETE next WHERE novel_id = $novel_id;
DELETE causes WHERE novel_id = $novel_id;
DELETE sub_event_of WHERE novel_id = $novel_id;
DELETE emotion_towards WHERE novel_id = $novel_id;
DELETE visits WHERE novel_id = $novel_id;

CREATE type::thing('novel', $novel_id) CONTENT {
    novel_id: $novel_id,
    title: $title,
    author: $author,
    statistics: $statistics,
    bundle: $bundle
};

FOR $row IN $chapters {
    CREATE type::thing('chapter', [$novel_id, $row.index]) CONTENT {
        novel_id: $novel_id,
        index: $row.index,
        title: $row.title,
        word_count: $row.word_count
    };
    RELATE (type::thing('novel', $novel_id))->has_chapter->(type::thing('chapter', [$novel_id, $row.index]))
        SET novel_id = $novel_id;
};

FOR $row IN $characters {
    CREATE type::thing('character', [$novel_id, $row.name]) CONTENT {
        novel_id: $novel_id,
        name: $row.name,
        aliases: $row.aliases,
        importance: $row.importance,
        degree_centrality: $row.degree_centrality,
        mention_count: $row.mention_count,
        first_appearance: $row.first_appearance,
        classification: $row.classification
    };
};

FOR $row IN $appearances {
    RELATE (type::thing('character', [$novel_id, $row.character]))->appears_in->(type::thing('chapter', [$novel_id, $row.chapter]))
        SET novel_id = $novel_id;
};

FOR $row IN $knows {
    RELATE (type::thing('character', [$novel_id, $row.source]))->knows->(type::thing('character', [$novel_id, $row.target]))
        SET novel_id = $novel_id, type = $row.kind, strength = $row.strength;
};

FOR $row IN $events {
    CREATE type::thing('event', [$novel_id, $row.id]) CONTENT {
        novel_id: $novel_id,
        event_id: $row.id,
        description: $row.description,
        chapter: $row.chapter,
        sequence: $row.sequence,
        event_type: $row.kind,
        importance_score: $row.importance_score,
        contribution_score: $row.contribution_score
    };
};

FOR $row IN $participations {
    RELATE (type::thing('character', [$novel_id, $row.character]))->participates_in->(type::thing('event', [$novel_id, $row.event]))
        SET novel_id = $novel_id;
};

FOR $row IN $locations {
    CREATE type::thing('location', [$novel_id, $row.name]) CONTENT {
        novel_id: $novel_id,
        name: $row.name,
        type: $row.kind,
        importance: $row.importance,
        event_count: $row.event_count
    };
};

FOR $row IN $happens {
    RELATE (type::thing('event', [$novel_id, $row.event]))->happens_at->(type::thing('location', [$novel_id, $row.location]))
        SET novel_id = $novel_id;
};

FOR $row IN $next_pairs {
    RELATE (type::thing('event', [$novel_id, $row.from]))->next->(type::thing('event', [$novel_id, $row.to]))
        SET novel_id = $novel_id;
};

FOR $row IN $causal {
    RELATE (type::thing('event', [$novel_id, $row.cause]))->causes->(type::thing('event', [$novel_id, $row.effect]))
        SET novel_id = $novel_id, strength = $row.strength;
};

FOR $row IN $sub_events {
    RELATE (type::thing('event', [$novel_id, $row.child]))->sub_event_of->(type::thing('event', [$novel_id, $row.parent]))
        SET novel_id = $novel_id;
};

FOR $row IN $emotions {
    CREATE type::thing('emotion', [$novel_id, $row.chapter]) CONTENT {
        novel_id: $novel_id,
        chapter: $row.chapter,
        sentiment: $row.sentiment,
        distribution: $row.distribution
    };
};

FOR $row IN $emotion_edges {
    RELATE (type::thing('character', [$novel_id, $row.source]))->emotion_towards->(type::thing('character', [$novel_id, $row.target]))
        SET novel_id = $novel_id, type = $row.kind, intensity = $row.intensity, chapter = $row.chapter;
};

FOR $row IN $states {
    CREATE type::thing('state', [$novel_id, $row.character, $row.chapter, $row.axis]) CONTENT {
        novel_id: $novel_id,
        character: $row.character,
        chapter: $row.chapter,
        axis: $row.axis,
        value: $row.value
    };
};

FOR $row IN $visit_edges {
    RELATE (type::thing('character', [$novel_id, $row.character]))->visits->(type::thing('location', [$novel_id, $row.location]))
        SET novel_id = $novel_id, visit_count = $row.visit_count;
};

COMMIT TRANSACTION;
"#;

#[async_trait]
impl GraphStore for SurrealGraphStore {
    async fn upsert_bundle(
        &self,
        novel_id: &str,
        bundle: &AnalysisBundle,
    ) -> Result<(), AnalysisError> {
        let appearances: Vec<serde_json::Value> = bundle
            .characters
            .iter()
            .flat_map(|c| {
                c.chapters_present
                    .iter()
                    .map(move |ch| json!({ "character": c.name, "chapter": ch }))
            })
            .collect();

        let participations: Vec<serde_json::Value> = bundle
            .events
            .iter()
            .flat_map(|e| {
                e.participants
                    .iter()
                    .map(move |p| json!({ "character": p, "event": e.id }))
            })
            .collect();

        let happens: Vec<serde_json::Value> = bundle
            .events
            .iter()
            .filter_map(|e| {
                e.location
                    .as_ref()
                    .map(|l| json!({ "event": e.id, "location": l }))
            })
            .collect();

        let next_pairs: Vec<serde_json::Value> = bundle
            .events
            .windows(2)
            .map(|w| json!({ "from": w[0].id, "to": w[1].id }))
            .collect();

        let sub_events: Vec<serde_json::Value> = bundle
            .hierarchy
            .parents
            .iter()
            .map(|(child, parent)| json!({ "child": child, "parent": parent }))
            .collect();

        // VISITS edges aggregate per (character, location) across chapters.
        let mut visit_totals: BTreeMap<(String, String), usize> = BTreeMap::new();
        for visit in &bundle.visits {
            *visit_totals
                .entry((visit.character.clone(), visit.location.clone()))
                .or_insert(0) += visit.visit_count;
        }
        let visit_edges: Vec<serde_json::Value> = visit_totals
            .into_iter()
            .map(|((character, location), count)| {
                json!({ "character": character, "location": location, "visit_count": count })
            })
            .collect();

        self.db
            .query(UPSERT_QUERY)
            .bind(("novel_id", novel_id.to_string()))
            .bind(("title", bundle.title.clone()))
            .bind(("author", bundle.author.clone()))
            .bind(("statistics", serde_json::to_value(&bundle.statistics)?))
            .bind(("bundle", serde_json::to_value(bundle)?))
            .bind(("chapters", serde_json::to_value(&bundle.chapters)?))
            .bind(("characters", serde_json::to_value(&bundle.characters)?))
            .bind(("appearances", appearances))
            .bind(("knows", serde_json::to_value(&bundle.relations)?))
            .bind(("events", serde_json::to_value(&bundle.events)?))
            .bind(("participations", participations))
            .bind(("locations", serde_json::to_value(&bundle.locations)?))
            .bind(("happens", happens))
            .bind(("next_pairs", next_pairs))
            .bind(("causal", serde_json::to_value(&bundle.causal_links)?))
            .bind(("sub_events", sub_events))
            .bind(("emotions", serde_json::to_value(&bundle.chapter_emotions)?))
            .bind(("emotion_edges", serde_json::to_value(&bundle.character_emotions)?))
            .bind(("states", serde_json::to_value(&bundle.states)?))
            .bind(("visit_edges", visit_edges))
            .await?
            .check()?;

        info!(novel = novel_id, "bundle persisted");
        Ok(())
    }

    async fn fetch_bundle(&self, novel_id: &str) -> Result<Option<AnalysisBundle>, AnalysisError> {
        #[derive(serde::Deserialize)]
        struct Archived {
            bundle: serde_json::Value,
        }

        let mut response = self
            .db
            .query("SELECT bundle FROM type::thing('novel', $novel_id)")
            .bind(("novel_id", novel_id.to_string()))
            .await?;
        let rows: Vec<Archived> = response.take(0)?;
        match rows.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row.bundle)?)),
            None => Ok(None),
        }
    }

    async fn list_novels(&self) -> Result<Vec<String>, AnalysisError> {
        #[derive(serde::Deserialize)]
        struct Row {
            novel_id: String,
        }

        let mut response = self.db.query("SELECT novel_id FROM novel").await?;
        let rows: Vec<Row> = response.take(0)?;
        let mut ids: Vec<String> = rows.into_iter().map(|r| r.novel_id).collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Statistics;

    fn bundle(novel_id: &str) -> AnalysisBundle {
        AnalysisBundle::empty(
            novel_id,
            "测试",
            None,
            Statistics {
                chapters: 1,
                words: 10,
                ..Statistics::default()
            },
        )
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryGraphStore::new();
        let b = bundle("n1");
        store.upsert_bundle("n1", &b).await.unwrap();
        let fetched = store.fetch_bundle("n1").await.unwrap().unwrap();
        assert_eq!(fetched, b);
    }

    #[tokio::test]
    async fn test_memory_store_upsert_is_idempotent() {
        let store = MemoryGraphStore::new();
        let b = bundle("n1");
        store.upsert_bundle("n1", &b).await.unwrap();
        store.upsert_bundle("n1", &b).await.unwrap();
        assert_eq!(store.list_novels().await.unwrap(), vec!["n1".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_store_missing_is_none() {
        let store = MemoryGraphStore::new();
        assert!(store.fetch_bundle("missing").await.unwrap().is_none());
    }
}
