mod common;

use anyhow::Result;
use common::test_store;
use dicemint::application::AppError;
use dicemint::domain::Points;

#[tokio::test]
async fn test_unknown_user_reads_zero() -> Result<()> {
    let (store, _temp) = test_store().await?;

    assert_eq!(store.get_balance("100200300").await?, 0);
    assert!(!store.is_registered("100200300").await?);

    Ok(())
}

#[tokio::test]
async fn test_reading_does_not_create_a_record() -> Result<()> {
    let (store, _temp) = test_store().await?;

    store.get_balance("ghost").await?;
    assert!(
        !store.is_registered("ghost").await?,
        "A read must not register the user"
    );

    Ok(())
}

#[tokio::test]
async fn test_set_then_get() -> Result<()> {
    let (store, _temp) = test_store().await?;

    store.set_balance("alice", 1200).await?;
    assert_eq!(store.get_balance("alice").await?, 1200);
    assert!(store.is_registered("alice").await?);

    // Setting overwrites rather than adds
    store.set_balance("alice", 300).await?;
    assert_eq!(store.get_balance("alice").await?, 300);

    Ok(())
}

#[tokio::test]
async fn test_set_accepts_negative_and_zero() -> Result<()> {
    let (store, _temp) = test_store().await?;

    store.set_balance("debtor", -750).await?;
    assert_eq!(store.get_balance("debtor").await?, -750);

    store.set_balance("empty", 0).await?;
    assert!(store.is_registered("empty").await?);
    assert_eq!(store.get_balance("empty").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_balances_are_per_user() -> Result<()> {
    let (store, _temp) = test_store().await?;

    store.set_balance("alice", 10).await?;
    store.set_balance("bob", 20).await?;

    assert_eq!(store.get_balance("alice").await?, 10);
    assert_eq!(store.get_balance("bob").await?, 20);

    Ok(())
}

#[tokio::test]
async fn test_increment_creates_and_accumulates() -> Result<()> {
    let (store, _temp) = test_store().await?;

    assert_eq!(store.increment_balance("carol", 500).await?, 500);
    assert_eq!(store.increment_balance("carol", 250).await?, 750);
    assert_eq!(store.increment_balance("carol", -1000).await?, -250);
    assert_eq!(store.get_balance("carol").await?, -250);

    Ok(())
}

#[tokio::test]
async fn test_increment_overflow_leaves_balance_untouched() -> Result<()> {
    let (store, _temp) = test_store().await?;

    store.set_balance("whale", Points::MAX - 10).await?;
    let err = store.increment_balance("whale", 11).await.unwrap_err();
    assert!(matches!(err, AppError::BalanceOverflow { .. }));
    assert_eq!(store.get_balance("whale").await?, Points::MAX - 10);

    Ok(())
}

#[tokio::test]
async fn test_decrement_below_min_is_rejected() -> Result<()> {
    let (store, _temp) = test_store().await?;

    store.set_balance("floor", Points::MIN).await?;
    assert!(store.increment_balance("floor", -1).await.is_err());
    assert_eq!(store.get_balance("floor").await?, Points::MIN);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_increments_do_not_lose_updates() -> Result<()> {
    let (store, _temp) = test_store().await?;
    store.set_balance("hot", 0).await?;

    let mut handles = Vec::new();
    for _ in 0..25 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.increment_balance("hot", 10).await
        }));
    }

    for handle in handles {
        handle.await??;
    }

    assert_eq!(store.get_balance("hot").await?, 250);

    Ok(())
}
