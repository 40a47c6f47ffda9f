//! End-to-end scenarios over the planted synthetic novel.

mod common;

use mailuo::analysis::{CancelToken, NoopProgressReporter};
use mailuo::db::{GraphStore, MemoryGraphStore};
use mailuo::models::{
    AnalysisBundle, Classification, EventType, PeakKind, RelationType, StateAxis,
};

async fn analyze(id: &str, store: &MemoryGraphStore) -> AnalysisBundle {
    let pipeline = common::pipeline();
    let novel = common::planted_novel(id);
    pipeline
        .analyze(
            &novel,
            Some(store as &dyn GraphStore),
            &NoopProgressReporter,
            &CancelToken::new(),
        )
        .await
        .expect("analysis should succeed")
}

#[tokio::test]
async fn scenario_1_planted_relation_patterns() {
    let store = MemoryGraphStore::new();
    let bundle = analyze("s1", &store).await;

    let kin = bundle
        .relations
        .iter()
        .find(|r| {
            let key = r.pair_key();
            key.0 == "刘备" && key.1 == "曹操"
        })
        .expect("relation 刘备-曹操");
    assert_eq!(kin.kind, RelationType::Kin);
    assert!(kin.strength >= 0.7, "kin strength {}", kin.strength);

    let friend = bundle
        .relations
        .iter()
        .find(|r| {
            let key = r.pair_key();
            key.0 == "关羽" && key.1 == "刘备"
        })
        .expect("relation 刘备-关羽");
    assert_eq!(friend.kind, RelationType::Friend);
    assert!(friend.strength >= 0.5, "friend strength {}", friend.strength);
}

#[tokio::test]
async fn scenario_2_conflict_event_in_chapter_3() {
    let store = MemoryGraphStore::new();
    let bundle = analyze("s2", &store).await;

    let conflict = bundle
        .events
        .iter()
        .find(|e| e.chapter == 3 && e.kind == EventType::Conflict)
        .expect("chapter-3 conflict event");
    assert!(conflict.participants.contains("刘备"));
    assert!(conflict.participants.contains("曹操"));
    assert!(
        conflict.importance_score >= 0.6,
        "conflict importance {}",
        conflict.importance_score
    );
}

#[tokio::test]
async fn scenario_3_causal_link_and_state_transition() {
    let store = MemoryGraphStore::new();
    let bundle = analyze("s3", &store).await;

    let conflict = bundle
        .events
        .iter()
        .find(|e| e.chapter == 3 && e.kind == EventType::Conflict)
        .expect("chapter-3 conflict event");
    let injury = bundle
        .events
        .iter()
        .find(|e| e.chapter == 4 && e.description.contains("受伤"))
        .expect("chapter-4 injury event");

    let link = bundle
        .causal_links
        .iter()
        .find(|l| l.cause == conflict.id && l.effect == injury.id)
        .expect("causal link from conflict to injury");
    assert!(link.strength >= 0.4, "link strength {}", link.strength);

    let transition = bundle
        .state_transitions
        .iter()
        .find(|t| t.character == "刘备" && t.axis == StateAxis::Health && t.to_chapter == 4)
        .expect("health transition for 刘备 in chapter 4");
    assert!(transition.delta < 0.0);
    assert_eq!(
        transition.cause_event.as_deref(),
        Some(conflict.id.as_str()),
        "transition should tie back to the chapter-3 conflict"
    );
}

#[tokio::test]
async fn scenario_4_classification_and_first_appearance() {
    let store = MemoryGraphStore::new();
    let bundle = analyze("s4", &store).await;

    let liubei = bundle
        .characters
        .iter()
        .find(|c| c.name == "刘备")
        .expect("刘备");
    let guanyu = bundle
        .characters
        .iter()
        .find(|c| c.name == "关羽")
        .expect("关羽");

    assert_eq!(liubei.classification, Classification::Main);
    assert_eq!(guanyu.classification, Classification::Supporting);
    assert_eq!(guanyu.first_appearance, 1);
    assert_eq!(
        guanyu.chapters_present.iter().copied().collect::<Vec<_>>(),
        vec![1, 5]
    );
}

#[tokio::test]
async fn scenario_5_emotional_trough_at_chapter_4() {
    let store = MemoryGraphStore::new();
    let bundle = analyze("s5", &store).await;

    let ch2 = bundle
        .chapter_emotions
        .iter()
        .find(|e| e.chapter == 2)
        .unwrap();
    let ch4 = bundle
        .chapter_emotions
        .iter()
        .find(|e| e.chapter == 4)
        .unwrap();
    assert!(ch2.sentiment > 0.0, "chapter 2 sentiment {}", ch2.sentiment);
    assert!(ch4.sentiment < 0.0, "chapter 4 sentiment {}", ch4.sentiment);

    let trough = bundle
        .emotional_peaks
        .iter()
        .find(|p| p.kind == PeakKind::Low)
        .expect("a low peak");
    assert_eq!(trough.chapter, 4);
}

#[tokio::test]
async fn scenario_6_rerun_is_identical_and_store_has_one_novel() {
    let store = MemoryGraphStore::new();
    let first = analyze("s6", &store).await;
    let second = analyze("s6", &store).await;

    assert_eq!(first, second, "re-running must produce an identical bundle");

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);

    assert_eq!(store.list_novels().await.unwrap(), vec!["s6".to_string()]);
    let stored = store.fetch_bundle("s6").await.unwrap().unwrap();
    assert_eq!(stored, second);
}
