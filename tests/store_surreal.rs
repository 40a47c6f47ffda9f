//! Graph store round-trip against the in-memory SurrealDB engine.

mod common;

use mailuo::analysis::{CancelToken, NoopProgressReporter};
use mailuo::db::{apply_schema, init_db, DbConfig, GraphStore, SurrealGraphStore};

async fn surreal_store() -> SurrealGraphStore {
    let db = init_db(&DbConfig::Memory, std::path::Path::new("unused"))
        .await
        .expect("memory engine");
    apply_schema(&db).await.expect("schema");
    SurrealGraphStore::new(db)
}

#[tokio::test]
async fn surreal_roundtrip_preserves_normalized_bundle() {
    let store = surreal_store().await;
    let novel = common::planted_novel("rt");
    let bundle = common::pipeline()
        .analyze(
            &novel,
            Some(&store as &dyn GraphStore),
            &NoopProgressReporter,
            &CancelToken::new(),
        )
        .await
        .expect("analysis");
    assert!(bundle.persisted, "surreal write should succeed");

    let fetched = store
        .fetch_bundle("rt")
        .await
        .expect("fetch")
        .expect("bundle stored");
    assert_eq!(fetched, bundle);
}

#[tokio::test]
async fn surreal_rerun_keeps_single_novel_node() {
    let store = surreal_store().await;
    let novel = common::planted_novel("idem");
    for _ in 0..2 {
        common::pipeline()
            .analyze(
                &novel,
                Some(&store as &dyn GraphStore),
                &NoopProgressReporter,
                &CancelToken::new(),
            )
            .await
            .expect("analysis");
    }
    assert_eq!(store.list_novels().await.unwrap(), vec!["idem".to_string()]);
}

#[tokio::test]
async fn surreal_missing_novel_is_none() {
    let store = surreal_store().await;
    assert!(store.fetch_bundle("nothing").await.unwrap().is_none());
}
