//! Live Postgres tests for the `news_items` store.
//!
//! Run with `--features live-db` and a reachable `DATABASE_URL`; each test
//! gets a fresh database with migrations applied.
#![cfg(feature = "live-db")]

use std::time::Duration;

use nelson_core::{NewsItem, Provider};
use nelson_db::{DbError, NewsStore, PgNewsStore};
use sqlx::PgPool;

fn item(fingerprint: &str, title: &str) -> NewsItem {
    NewsItem {
        provider: Provider::StopGame,
        fingerprint: fingerprint.to_string(),
        title: title.to_string(),
        body: "body".to_string(),
        url: format!("https://stopgame.ru/newsdata/{fingerprint}"),
        tags: vec!["games".to_string()],
        images: vec!["https://images.stopgame.ru/a.jpg".to_string()],
        published_at: None,
    }
}

fn store(pool: PgPool) -> PgNewsStore {
    PgNewsStore::new(pool, Duration::from_secs(5))
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_inserts_then_updates_single_row(pool: PgPool) {
    let store = store(pool.clone());

    let first = store.upsert(&item("1", "old title")).await.unwrap();
    let second = store.upsert(&item("1", "new title")).await.unwrap();

    assert!(first.inserted);
    assert!(!second.inserted);
    assert_eq!(first.id, second.id);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let recent = store.recent_items(0, 10).await.unwrap();
    assert_eq!(recent[0].item.title, "new title");
}

#[sqlx::test(migrations = "../../migrations")]
async fn upsert_keeps_created_at_and_external_refs(pool: PgPool) {
    let store = store(pool);
    let original = item("1", "title");
    store.upsert(&original).await.unwrap();
    store
        .record_external_ref(&original.key(), "discord", "thread-1")
        .await
        .unwrap();
    let before = store.recent_items(0, 1).await.unwrap().remove(0);

    store.upsert(&item("1", "retitled")).await.unwrap();
    let after = store.recent_items(0, 1).await.unwrap().remove(0);

    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
    assert_eq!(
        after.external_refs.get("discord").map(String::as_str),
        Some("thread-1")
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_upserts_of_same_key_leave_one_row(pool: PgPool) {
    let store = store(pool.clone());
    let a = item("race", "a");
    let b = item("race", "b");

    let (ra, rb) = tokio::join!(store.upsert(&a), store.upsert(&b));
    let ids = [ra.unwrap(), rb.unwrap()];

    assert_eq!(ids[0].id, ids[1].id);
    assert_eq!(ids.iter().filter(|o| o.inserted).count(), 1);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news_items")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn existing_fingerprints_is_scoped_to_provider(pool: PgPool) {
    let store = store(pool);
    store.upsert(&item("1", "one")).await.unwrap();
    store.upsert(&item("2", "two")).await.unwrap();

    let candidates = vec!["1".to_string(), "2".to_string(), "3".to_string()];
    let found = store
        .existing_fingerprints(Provider::StopGame, &candidates)
        .await
        .unwrap();
    let other = store
        .existing_fingerprints(Provider::Dtf, &candidates)
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert!(found.contains("1") && found.contains("2"));
    assert!(other.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn record_external_ref_on_missing_row_is_not_found(pool: PgPool) {
    let store = store(pool);
    let result = store
        .record_external_ref(&item("ghost", "").key(), "telegram", "5")
        .await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn unique_constraint_rejects_plain_duplicate_insert(pool: PgPool) {
    let insert = "INSERT INTO news_items (provider, fingerprint, title, url) \
                  VALUES ('dtf', 'dup', 't', 'https://dtf.ru/x')";
    sqlx::query(insert).execute(&pool).await.unwrap();
    let second = sqlx::query(insert).execute(&pool).await;
    assert!(second.is_err());
}
