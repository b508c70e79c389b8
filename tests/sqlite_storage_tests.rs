//! Storage backend tests
//!
//! Tests for SeaOrmStorage using temporary SQLite databases.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{StreamExt, TryStreamExt};
use sea_orm::TransactionTrait;
use seqlink::cache::{BloomExistenceFilterPlugin, ExistenceFilter};
use seqlink::config::{DatabaseConfig, StaticConfig};
use seqlink::dedup::Fingerprint;
use seqlink::errors::SeqlinkError;
use seqlink::runtime::warm_guard;
use seqlink::sequence::{Sequence, SequenceAllocator};
use seqlink::storage::{
    CounterStore, InsertOutcome, Mapping, MappingStore, SeaOrmStorage, UniqueField,
};
use tempfile::TempDir;

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", db_path.display()),
        ..Default::default()
    };

    let storage = SeaOrmStorage::connect(&config)
        .await
        .expect("Failed to create storage");

    (Arc::new(storage), temp_dir)
}

// =============================================================================
// 映射读写
// =============================================================================

#[tokio::test]
async fn test_insert_and_lookup() {
    let (storage, _dir) = create_temp_storage().await;
    assert_eq!(storage.backend_name(), "sqlite");

    let mapping = Mapping::new(6347, "https://example.com/a", "1En");
    assert_eq!(
        storage.insert_mapping(&mapping).await.unwrap(),
        InsertOutcome::Inserted
    );

    let by_token = storage.get_mapping_by_token("1En").await.unwrap().unwrap();
    assert_eq!(by_token.id, 6347);
    assert_eq!(by_token.long_url, "https://example.com/a");
    assert_eq!(by_token.fingerprint, mapping.fingerprint);

    let by_fp = storage
        .get_mapping_by_fingerprint(&Fingerprint::of("https://example.com/a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_fp.token, "1En");

    assert!(storage.get_mapping_by_token("1Eo").await.unwrap().is_none());
    assert!(
        storage
            .get_mapping_by_fingerprint(&Fingerprint::of("https://example.com/b"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_unique_violations_are_reported_by_field() {
    let (storage, _dir) = create_temp_storage().await;
    storage
        .insert_mapping(&Mapping::new(1, "https://example.com/a", "1"))
        .await
        .unwrap();

    // 同一个 token，不同 URL
    assert_eq!(
        storage
            .insert_mapping(&Mapping::new(2, "https://example.com/b", "1"))
            .await
            .unwrap(),
        InsertOutcome::UniqueViolation(UniqueField::Token)
    );

    // 同一个 URL，不同 token
    assert_eq!(
        storage
            .insert_mapping(&Mapping::new(3, "https://example.com/a", "3"))
            .await
            .unwrap(),
        InsertOutcome::UniqueViolation(UniqueField::Fingerprint)
    );

    assert_eq!(storage.count_mappings().await.unwrap(), 1);
}

#[tokio::test]
async fn test_stream_tokens_pages_in_id_order() {
    let (storage, _dir) = create_temp_storage().await;
    for id in [5u64, 1, 4, 2, 3] {
        storage
            .insert_mapping(&Mapping::new(
                id,
                format!("https://example.com/{}", id),
                id.to_string(),
            ))
            .await
            .unwrap();
    }

    let batches: Vec<Vec<String>> = storage.stream_tokens(2).try_collect().await.unwrap();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0], vec!["1", "2"]);
    assert_eq!(batches[2], vec!["5"]);
    assert_eq!(storage.count_mappings().await.unwrap(), 5);
}

#[tokio::test]
async fn test_stream_tokens_on_empty_table() {
    let (storage, _dir) = create_temp_storage().await;
    let batches: Vec<Vec<String>> = storage.stream_tokens(100).try_collect().await.unwrap();
    assert!(batches.is_empty());
}

#[tokio::test]
async fn test_scans_time_out_when_pool_is_exhausted() {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        database_url: format!(
            "sqlite://{}?mode=rwc",
            temp_dir.path().join("stalled.db").display()
        ),
        operation_timeout_ms: 200,
        ..Default::default()
    };
    let storage = SeaOrmStorage::connect(&config).await.unwrap();
    storage
        .insert_mapping(&Mapping::new(1, "https://example.com/1", "1"))
        .await
        .unwrap();

    // 占满 SQLite 连接池的 8 个连接，后续查询只能等待
    let mut held = Vec::new();
    for _ in 0..8 {
        held.push(storage.get_db().begin().await.unwrap());
    }

    assert!(matches!(
        storage.count_mappings().await,
        Err(SeqlinkError::StoreTimeout(_))
    ));

    let items: Vec<_> = storage.stream_tokens(100).collect().await;
    assert_eq!(items.len(), 1, "stream ends after the first failure");
    assert!(matches!(items[0], Err(SeqlinkError::StoreTimeout(_))));

    let guard = BloomExistenceFilterPlugin::new(10, 0.01).unwrap();
    assert!(
        warm_guard(&storage, &guard, &StaticConfig::default())
            .await
            .is_err()
    );

    for txn in held {
        txn.rollback().await.unwrap();
    }
    assert_eq!(storage.count_mappings().await.unwrap(), 1);
}

// =============================================================================
// 计数器
// =============================================================================

#[tokio::test]
async fn test_counter_starts_at_one_per_key() {
    let (storage, _dir) = create_temp_storage().await;

    assert_eq!(storage.upsert_and_return_counter("short_url").await.unwrap(), 1);
    assert_eq!(storage.upsert_and_return_counter("short_url").await.unwrap(), 2);
    assert_eq!(storage.upsert_and_return_counter("other").await.unwrap(), 1);
    assert_eq!(storage.upsert_and_return_counter("short_url").await.unwrap(), 3);
}

#[tokio::test]
async fn test_counter_survives_reconnect() {
    let temp_dir = TempDir::new().unwrap();
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}?mode=rwc", temp_dir.path().join("c.db").display()),
        ..Default::default()
    };

    {
        let storage = SeaOrmStorage::connect(&config).await.unwrap();
        storage.upsert_and_return_counter("short_url").await.unwrap();
        storage.upsert_and_return_counter("short_url").await.unwrap();
    }

    let storage = SeaOrmStorage::connect(&config).await.unwrap();
    assert_eq!(storage.upsert_and_return_counter("short_url").await.unwrap(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_allocations_are_distinct() {
    let (storage, _dir) = create_temp_storage().await;
    let allocator = Arc::new(SequenceAllocator::new(storage.clone(), "short_url"));

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            tokio::spawn(async move { allocator.next().await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap().unwrap()));
    }
    assert_eq!(ids, (1..=32).collect::<HashSet<u64>>());
}

// =============================================================================
// Guard 预热
// =============================================================================

#[tokio::test]
async fn test_warm_guard_loads_every_stored_token() {
    let (storage, _dir) = create_temp_storage().await;
    let tokens: Vec<String> = (1..=1200u64).map(|id| format!("t{}", id)).collect();
    for (i, token) in tokens.iter().enumerate() {
        storage
            .insert_mapping(&Mapping::new(
                i as u64 + 1,
                format!("https://example.com/{}", token),
                token.clone(),
            ))
            .await
            .unwrap();
    }

    let guard = BloomExistenceFilterPlugin::new(10, 0.01).unwrap();
    let mut config = StaticConfig::default();
    config.guard.capacity = 1000;

    let loaded = warm_guard(&storage, &guard, &config).await.unwrap();
    assert_eq!(loaded, 1200);
    for token in &tokens {
        assert!(guard.might_exist(token).await, "{token} missing after warm-up");
    }
}
