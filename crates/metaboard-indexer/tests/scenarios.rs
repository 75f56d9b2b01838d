//! End-to-end event handling against both store backends.

use std::sync::Arc;

use bytes::Bytes;

use metaboard_core::{HashSource, MetaId, MetaOutcome};
use metaboard_indexer::{Indexer, IndexerConfig, IndexerError};
use metaboard_store::{
    IdScheme, MemoryStore, SqliteStore, Store, StoreConfig, StoreError, StoreExt,
};
use metaboard_testkit::fixtures::{object, text, uint, RevertingHasher, StaticHasher, TestFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn sqlite_indexer() -> Indexer<SqliteStore> {
    Indexer::open(IndexerConfig::default()).unwrap()
}

fn memory_indexer() -> Indexer<MemoryStore> {
    Indexer::new(MemoryStore::default(), IndexerConfig::default()).unwrap()
}

/// First event `{0: "h'aa'", 1: 42}`, then a payload without the prefix.
async fn two_event_scenario<S: Store>(indexer: &Indexer<S>) {
    let fixture = TestFixture::new();

    let first = fixture.value_event(&object(vec![(0, text("h'aa'")), (1, uint(42))]), Some(10));
    let report = indexer.handle_event(&first).await.unwrap();
    assert_eq!(report.outcome, MetaOutcome::ContentMaterialized);
    assert_eq!(report.sequence_counter, 1);
    assert_eq!(
        report.meta_id,
        Some(MetaId::Sequence {
            board: fixture.origin,
            seq: 0
        })
    );

    let meta = indexer.meta(&report.meta_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(meta.payload().unwrap().as_ref(), &[0xaa]);
    assert_eq!(meta.magic_number().unwrap().to_u64(), Some(42));
    assert_eq!(meta.content_type(), None);
    assert_eq!(meta.content_encoding(), None);
    assert_eq!(meta.content_language(), None);
    assert_eq!(meta.sender, fixture.sender);
    assert_eq!(meta.subject, fixture.subject);
    assert_eq!(meta.raw_payload, first.meta);

    let second = fixture.event(Bytes::from_static(b"\x01\x02 not a document"), Some(11));
    let report = indexer.handle_event(&second).await.unwrap();
    assert_eq!(report.outcome, MetaOutcome::NoContent);
    assert_eq!(report.sequence_counter, 2);

    let meta = indexer.meta(&report.meta_id.unwrap()).await.unwrap().unwrap();
    assert!(meta.content.is_none());
    assert_eq!(meta.raw_payload, second.meta);
    assert_eq!(meta.board, fixture.origin);

    let board = indexer.board(&fixture.origin).await.unwrap().unwrap();
    assert_eq!(board.sequence_counter, 2);
    assert!(indexer.store().board_is_consistent(&fixture.origin).await.unwrap());
}

#[tokio::test]
async fn test_two_events_memory() {
    init_tracing();
    two_event_scenario(&memory_indexer()).await;
}

#[tokio::test]
async fn test_two_events_sqlite() {
    init_tracing();
    two_event_scenario(&sqlite_indexer()).await;
}

#[tokio::test]
async fn test_missing_magic_number_is_recorded_bare() {
    init_tracing();
    let indexer = sqlite_indexer();
    let fixture = TestFixture::new();

    let event = fixture.value_event(&object(vec![(0, text("h'aa'"))]), Some(1));
    let report = indexer.handle_event(&event).await.unwrap();
    assert_eq!(report.outcome, MetaOutcome::InvalidContent);
    assert_eq!(report.sequence_counter, 1);

    let meta = indexer.meta(&report.meta_id.unwrap()).await.unwrap().unwrap();
    assert!(meta.content.is_none());
    assert_eq!(meta.outcome, MetaOutcome::InvalidContent);
}

#[tokio::test]
async fn test_every_outcome_advances_counter() {
    init_tracing();
    let indexer = memory_indexer();
    let fixture = TestFixture::new();

    let events = vec![
        fixture.event(Bytes::from_static(b"plain"), Some(1)),
        fixture.event(Bytes::from(metaboard_core::wrap_envelope(&[0xff])), Some(1)),
        fixture.value_event(&uint(7), Some(2)),
        fixture.value_event(&object(vec![(0, uint(1)), (1, uint(1))]), Some(2)),
        fixture.value_event(&object(vec![(0, text("ff00")), (1, uint(1))]), Some(3)),
    ];
    let reports = indexer.handle_events(events).await.unwrap();

    let outcomes: Vec<_> = reports.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            MetaOutcome::NoContent,
            MetaOutcome::DecodeError,
            MetaOutcome::UnsupportedShape,
            MetaOutcome::InvalidContent,
            MetaOutcome::ContentMaterialized,
        ]
    );
    assert_eq!(reports.last().unwrap().sequence_counter, 5);
    assert_eq!(indexer.metas(&fixture.origin).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_optional_fields_are_kept() {
    let indexer = sqlite_indexer();
    let fixture = TestFixture::new();

    let event = fixture.value_event(
        &object(vec![
            (0, text("h'FF00'")),
            (1, uint(1)),
            (2, text("application/json")),
            (4, text("en")),
        ]),
        Some(1),
    );
    let report = indexer.handle_event(&event).await.unwrap();
    let meta = indexer.meta(&report.meta_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(meta.payload().unwrap().as_ref(), &[0xff, 0x00]);
    assert_eq!(meta.content_type(), Some("application/json"));
    assert_eq!(meta.content_encoding(), None);
    assert_eq!(meta.content_language(), Some("en"));
    assert_eq!(meta.content.unwrap().payload_hex_wrapped(), "h'ff00'");
}

#[tokio::test]
async fn test_boards_are_independent() {
    let indexer = memory_indexer();
    let a = TestFixture::with_seed(1);
    let b = TestFixture::with_seed(2);

    indexer.handle_event(&a.event(Bytes::from_static(b"x"), Some(1))).await.unwrap();
    indexer.handle_event(&b.event(Bytes::from_static(b"y"), Some(1))).await.unwrap();
    let report = indexer.handle_event(&a.event(Bytes::from_static(b"z"), Some(2))).await.unwrap();

    assert_eq!(report.sequence_counter, 2);
    assert_eq!(
        indexer.board(&b.origin).await.unwrap().unwrap().sequence_counter,
        1
    );
    assert_eq!(indexer.boards().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_metas_by_hash() {
    let indexer = sqlite_indexer();
    let a = TestFixture::with_seed(1);
    let b = TestFixture::with_seed(2);

    let shared = Bytes::from_static(b"same bytes");
    let r1 = indexer.handle_event(&a.event(shared.clone(), Some(1))).await.unwrap();
    indexer.handle_event(&a.event(Bytes::from_static(b"other"), Some(1))).await.unwrap();
    let r2 = indexer.handle_event(&b.event(shared, Some(2))).await.unwrap();
    assert_eq!(r1.content_hash, r2.content_hash);

    let found = indexer.metas_by_hash(&r1.content_hash).await.unwrap();
    let boards: Vec<_> = found.iter().map(|m| m.board).collect();
    assert_eq!(boards, vec![a.origin, b.origin]);
}

#[tokio::test]
async fn test_origin_hasher_preferred() {
    let indexer = memory_indexer().with_hasher(Arc::new(StaticHasher([9; 32])));
    let fixture = TestFixture::new();

    let report = indexer
        .handle_event(&fixture.event(Bytes::from_static(b"x"), Some(1)))
        .await
        .unwrap();
    assert_eq!(report.hash_source, HashSource::Origin);
    assert_eq!(report.content_hash.as_bytes(), &[9; 32]);
}

#[tokio::test]
async fn test_hash_fallback_is_recorded() {
    init_tracing();
    let indexer = sqlite_indexer().with_hasher(Arc::new(RevertingHasher("execution reverted")));
    let fixture = TestFixture::new();

    let event = fixture.event(Bytes::from_static(b"x"), Some(1));
    let report = indexer.handle_event(&event).await.unwrap();
    assert_eq!(report.content_hash, metaboard_core::Hash32::digest(b"x"));

    let meta = indexer.meta(&report.meta_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(
        meta.hash_source,
        HashSource::LocalFallback {
            reason: "call reverted: execution reverted".into()
        }
    );
}

#[tokio::test]
async fn test_fallback_hash_matches_origin_hash() {
    // What an origin's on-chain `hash(bytes)` returns for b"same bytes".
    let on_chain: [u8; 32] = hex::decode("ba2ae1ab392e191f30d2569c3fa5aa87892a1e2eb584ce73a79433d4e1b8bdf1")
        .unwrap()
        .try_into()
        .unwrap();
    let fixture = TestFixture::new();
    let event = fixture.event(Bytes::from_static(b"same bytes"), Some(1));

    let answered = memory_indexer().with_hasher(Arc::new(StaticHasher(on_chain)));
    let reverted = memory_indexer().with_hasher(Arc::new(RevertingHasher("execution reverted")));
    let origin = answered.handle_event(&event).await.unwrap();
    let fallback = reverted.handle_event(&event).await.unwrap();

    assert_eq!(origin.hash_source, HashSource::Origin);
    assert!(matches!(fallback.hash_source, HashSource::LocalFallback { .. }));
    assert_eq!(origin.content_hash, fallback.content_hash);
}

#[tokio::test]
async fn test_hash_ids_follow_origin_supplied_hash() {
    for scheme in [IdScheme::RawPayloadHash, IdScheme::ContentHash] {
        let store = SqliteStore::open_memory(StoreConfig { id_scheme: scheme }).unwrap();
        let indexer = Indexer::new(store, IndexerConfig::default())
            .unwrap()
            .with_hasher(Arc::new(StaticHasher([9; 32])));
        let fixture = TestFixture::new();

        let report = indexer
            .handle_event(&fixture.event(Bytes::from_static(b"plain"), Some(1)))
            .await
            .unwrap();
        let id = MetaId::Hash(report.content_hash);
        assert_eq!(report.meta_id, Some(id));

        let meta = indexer.meta(&id).await.unwrap().unwrap();
        assert_eq!(meta.content_hash.as_bytes(), &[9; 32]);
        assert_eq!(meta.raw_payload.as_ref(), b"plain");
    }
}

#[tokio::test]
async fn test_duplicate_sequence_id_is_fatal() {
    init_tracing();
    let indexer = sqlite_indexer();
    let fixture = TestFixture::new();
    indexer.handle_event(&fixture.event(Bytes::from_static(b"a"), Some(1))).await.unwrap();

    // Roll the counter back behind the indexer's back so the next id collides.
    indexer.store().revert_to(0).await.unwrap();
    indexer
        .store()
        .get_or_create_board(&fixture.origin, 1)
        .await
        .unwrap();
    let stray = metaboard_core::Meta::from_draft(
        MetaId::Sequence {
            board: fixture.origin,
            seq: 0,
        },
        metaboard_core::MetaDraft {
            board: fixture.origin,
            sender: fixture.sender,
            subject: fixture.subject,
            raw_payload: Bytes::from_static(b"stray"),
            content_hash: metaboard_core::Hash32::digest(b"stray"),
            hash_source: HashSource::Local,
            content: None,
            outcome: MetaOutcome::NoContent,
            block_number: Some(1),
        },
    );
    indexer.store().create_meta(&stray, 1).await.unwrap();

    let err = indexer
        .handle_event(&fixture.event(Bytes::from_static(b"b"), Some(2)))
        .await
        .unwrap_err();
    assert!(err.is_integrity_violation());
    assert!(matches!(
        err,
        IndexerError::Store(StoreError::DuplicateMeta(MetaId::Sequence { seq: 0, .. }))
    ));
    assert_eq!(
        indexer.board(&fixture.origin).await.unwrap().unwrap().sequence_counter,
        0
    );
}

#[tokio::test]
async fn test_event_without_block_number() {
    let indexer = sqlite_indexer();
    let fixture = TestFixture::new();

    let report = indexer
        .handle_event(&fixture.event(Bytes::from_static(b"x"), None))
        .await
        .unwrap();
    let meta = indexer.meta(&report.meta_id.unwrap()).await.unwrap().unwrap();
    assert_eq!(meta.block_number, None);

    // Journaled at block 0, so it survives any rollback.
    indexer.revert_to(0).await.unwrap();
    assert_eq!(indexer.metas(&fixture.origin).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_on_disk_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = IndexerConfig {
        database_path: Some(dir.path().join("metaboard.db")),
        store: StoreConfig::default(),
        ..IndexerConfig::default()
    };
    let fixture = TestFixture::new();

    {
        let indexer = Indexer::open(config.clone()).unwrap();
        indexer
            .handle_event(&fixture.event(Bytes::from_static(b"x"), Some(1)))
            .await
            .unwrap();
    }

    let indexer = Indexer::open(config).unwrap();
    let report = indexer
        .handle_event(&fixture.event(Bytes::from_static(b"y"), Some(2)))
        .await
        .unwrap();
    assert_eq!(report.sequence_counter, 2);
}
