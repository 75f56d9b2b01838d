//! Reorg handling: revert to a block, re-apply, and compare.

use proptest::prelude::*;

use metaboard_core::{Board, Meta};
use metaboard_indexer::{Indexer, IndexerConfig, MetaV1Event};
use metaboard_store::{IdScheme, MemoryStore, SqliteStore, Store, StoreConfig, StoreExt};
use metaboard_testkit::fixtures::{multi_origin_fixtures, object, text, uint};
use metaboard_testkit::generators::event_stream;

/// Every board with its metas, in a comparable form.
async fn snapshot<S: Store>(indexer: &Indexer<S>) -> Vec<(Board, Vec<Meta>)> {
    let mut state = Vec::new();
    for board in indexer.boards().await.unwrap() {
        let metas = indexer.metas(&board.id).await.unwrap();
        state.push((board, metas));
    }
    state
}

fn sample_events() -> Vec<MetaV1Event> {
    let fixtures = multi_origin_fixtures(2);
    let doc = object(vec![(0, text("h'aa'")), (1, uint(42))]);
    vec![
        fixtures[0].value_event(&doc, Some(100)),
        fixtures[1].event(b"raw".to_vec(), Some(100)),
        fixtures[0].event(b"second".to_vec(), Some(101)),
        fixtures[1].value_event(&uint(1), Some(102)),
        fixtures[0].value_event(&doc, Some(103)),
    ]
}

async fn revert_and_reapply<S: Store>(indexer: Indexer<S>) {
    let events = sample_events();
    indexer.handle_events(events.clone()).await.unwrap();
    let before = snapshot(&indexer).await;

    let report = indexer.revert_to(100).await.unwrap();
    assert_eq!(report.metas_removed, 3);
    assert_eq!(report.boards_removed, 0);

    let later: Vec<_> = events
        .into_iter()
        .filter(|e| e.block_number > Some(100))
        .collect();
    indexer.handle_events(later).await.unwrap();

    assert_eq!(snapshot(&indexer).await, before);
}

#[tokio::test]
async fn test_revert_and_reapply_memory() {
    let indexer = Indexer::new(MemoryStore::default(), IndexerConfig::default()).unwrap();
    revert_and_reapply(indexer).await;
}

#[tokio::test]
async fn test_revert_and_reapply_sqlite() {
    revert_and_reapply(Indexer::open(IndexerConfig::default()).unwrap()).await;
}

#[tokio::test]
async fn test_revert_before_first_event_empties_store() {
    let indexer = Indexer::open(IndexerConfig::default()).unwrap();
    indexer.handle_events(sample_events()).await.unwrap();

    let report = indexer.revert_to(99).await.unwrap();
    assert_eq!(report.boards_removed, 2);
    assert!(snapshot(&indexer).await.is_empty());
}

#[tokio::test]
async fn test_content_hash_scheme_replay_is_idempotent() {
    let store = MemoryStore::new(StoreConfig {
        id_scheme: IdScheme::ContentHash,
    });
    let indexer = Indexer::new(store, IndexerConfig::default()).unwrap();
    let events = sample_events();

    indexer.handle_events(events.clone()).await.unwrap();
    let before = snapshot(&indexer).await;
    let metas_before: usize = before.iter().map(|(_, m)| m.len()).sum();

    // The same document twice on board 0 collapses onto one meta.
    assert_eq!(metas_before, 4);

    indexer.revert_to(101).await.unwrap();
    indexer
        .handle_events(events.into_iter().filter(|e| e.block_number > Some(101)))
        .await
        .unwrap();
    assert_eq!(snapshot(&indexer).await, before);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_revert_then_reapply_restores_state(
        events in event_stream(
            multi_origin_fixtures(3).into_iter().map(|f| f.origin).collect(),
            1..24,
        ),
        cut_offset in 0u64..8,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let store = SqliteStore::open_memory(StoreConfig::default()).unwrap();
            let indexer = Indexer::new(store, IndexerConfig::default()).unwrap();
            indexer.handle_events(events.clone()).await.unwrap();
            let before = snapshot(&indexer).await;

            let cut = events[0].block_number.unwrap_or(0) + cut_offset;
            indexer.revert_to(cut).await.unwrap();
            for (board, _) in &before {
                prop_assert!(indexer.store().board_is_consistent(&board.id).await.unwrap());
            }

            indexer
                .handle_events(events.into_iter().filter(|e| e.block_number > Some(cut)))
                .await
                .unwrap();
            prop_assert_eq!(snapshot(&indexer).await, before);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
