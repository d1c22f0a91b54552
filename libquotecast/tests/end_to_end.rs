//! End-to-end tests for a single run
//!
//! Each test builds a real SQLite store and quota file in a temp directory
//! and swaps the network client for the mock API.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use libquotecast::config::StoreConfig;
use libquotecast::platforms::mock::MockApi;
use libquotecast::{
    run_once, ApiError, Clock, ManualClock, PostFormatter, PublishError, Publisher, QuotaTracker,
    QuoteStore, RetryPolicy, RunOutcome,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::sqlite::SqlitePool;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

async fn create_store(dir: &Path, rows: &[(&str, &str)]) -> Result<QuoteStore> {
    let db_path = dir.join("quotes.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());

    let pool = SqlitePool::connect(&db_url).await?;
    sqlx::query("CREATE TABLE quotes (text TEXT NOT NULL, author TEXT NOT NULL)")
        .execute(&pool)
        .await?;
    for (text, author) in rows {
        sqlx::query("INSERT INTO quotes (text, author) VALUES (?, ?)")
            .bind(*text)
            .bind(*author)
            .execute(&pool)
            .await?;
    }
    pool.close().await;

    let config = StoreConfig {
        path: db_path.to_string_lossy().to_string(),
        ..Default::default()
    };
    Ok(QuoteStore::open(&config).await?)
}

fn publisher(api: &MockApi, tracker: QuotaTracker, clock: &ManualClock) -> Publisher {
    Publisher::new(
        Box::new(api.clone()),
        tracker,
        Arc::new(clock.clone()),
        RetryPolicy::default(),
    )
}

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn test_publishes_formatted_quotation_and_records_quota() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = create_store(
        temp_dir.path(),
        &[("Stay hungry, stay foolish.", "Steve Jobs")],
    )
    .await?;
    let quota_path = temp_dir.path().join("quota.txt");
    let clock = clock();
    let api = MockApi::success();
    let publisher = publisher(&api, QuotaTracker::new(&quota_path, 15), &clock);

    let outcome = run_once(
        &store,
        &PostFormatter::default(),
        &publisher,
        &mut StdRng::seed_from_u64(7),
    )
    .await?;

    match outcome {
        RunOutcome::Published { id, quota, limit } => {
            assert_eq!(id, "mock-post-1");
            assert_eq!(quota.count, 1);
            assert_eq!(limit, 15);
        }
        other => panic!("Expected Published, got {:?}", other),
    }
    assert_eq!(
        api.posted_content(),
        vec!["Stay hungry, stay foolish.\n\n- Steve Jobs"]
    );

    let today = clock.today().format("%Y-%m-%d").to_string();
    assert_eq!(fs::read_to_string(&quota_path)?, format!("1,{}", today));

    Ok(())
}

#[tokio::test]
async fn test_empty_store_makes_no_api_call() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = create_store(temp_dir.path(), &[]).await?;
    let quota_path = temp_dir.path().join("quota.txt");
    let clock = clock();
    let api = MockApi::success();
    let publisher = publisher(&api, QuotaTracker::new(&quota_path, 15), &clock);

    let outcome = run_once(
        &store,
        &PostFormatter::default(),
        &publisher,
        &mut StdRng::seed_from_u64(1),
    )
    .await?;

    assert_eq!(outcome, RunOutcome::EmptyStore);
    assert_eq!(api.call_count(), 0);
    assert!(!quota_path.exists());

    Ok(())
}

#[tokio::test]
async fn test_too_long_quotation_is_skipped() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let long_text = "a".repeat(300);
    let store = create_store(temp_dir.path(), &[(long_text.as_str(), "Someone")]).await?;
    let quota_path = temp_dir.path().join("quota.txt");
    let clock = clock();
    let api = MockApi::success();
    let publisher = publisher(&api, QuotaTracker::new(&quota_path, 15), &clock);

    let outcome = run_once(
        &store,
        &PostFormatter::default(),
        &publisher,
        &mut StdRng::seed_from_u64(1),
    )
    .await?;

    // 300 + "\n\n- " + 7
    assert_eq!(
        outcome,
        RunOutcome::TooLong {
            length: 311,
            max: 280
        }
    );
    assert_eq!(api.call_count(), 0);
    assert!(!quota_path.exists());

    Ok(())
}

#[tokio::test]
async fn test_full_quota_blocks_posting() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = create_store(temp_dir.path(), &[("Less is more.", "Mies")]).await?;
    let quota_path = temp_dir.path().join("quota.txt");
    let clock = clock();
    let today = clock.today().format("%Y-%m-%d").to_string();
    fs::write(&quota_path, format!("15,{}", today))?;

    let api = MockApi::success();
    let publisher = publisher(&api, QuotaTracker::new(&quota_path, 15), &clock);

    let outcome = run_once(
        &store,
        &PostFormatter::default(),
        &publisher,
        &mut StdRng::seed_from_u64(1),
    )
    .await?;

    assert!(matches!(
        outcome,
        RunOutcome::QuotaExceeded { quota, limit: 15 } if quota.count == 15
    ));
    assert_eq!(api.call_count(), 0);
    assert_eq!(fs::read_to_string(&quota_path)?, format!("15,{}", today));

    Ok(())
}

#[tokio::test]
async fn test_api_failure_is_a_handled_outcome() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = create_store(temp_dir.path(), &[("Less is more.", "Mies")]).await?;
    let quota_path = temp_dir.path().join("quota.txt");
    let clock = clock();
    let api = MockApi::failing(ApiError::Authentication("bad token".to_string()));
    let publisher = publisher(&api, QuotaTracker::new(&quota_path, 15), &clock);

    let outcome = run_once(
        &store,
        &PostFormatter::default(),
        &publisher,
        &mut StdRng::seed_from_u64(1),
    )
    .await?;

    assert_eq!(
        outcome,
        RunOutcome::PublishFailed(PublishError::Api(ApiError::Authentication(
            "bad token".to_string()
        )))
    );
    assert_eq!(api.call_count(), 1);
    assert!(!quota_path.exists());

    Ok(())
}

#[tokio::test]
async fn test_rate_limit_with_passed_reset_retries_immediately() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = create_store(temp_dir.path(), &[("Less is more.", "Mies")]).await?;
    let quota_path = temp_dir.path().join("quota.txt");
    let clock = clock();
    let reset_at = clock.now() - chrono::Duration::seconds(3);
    let api = MockApi::new(vec![Err(ApiError::RateLimited {
        reset_at: Some(reset_at),
    })]);
    let publisher = publisher(&api, QuotaTracker::new(&quota_path, 15), &clock);

    let outcome = run_once(
        &store,
        &PostFormatter::default(),
        &publisher,
        &mut StdRng::seed_from_u64(1),
    )
    .await?;

    assert!(matches!(outcome, RunOutcome::Published { ref quota, .. } if quota.count == 1));
    assert_eq!(api.call_count(), 2);

    Ok(())
}
