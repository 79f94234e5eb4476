mod common;

use common::{seed_synced, setup};
use std::time::Duration;
use tasksync::sync::{ReconcileOutcome, ReconcileReport, SyncError};
use tasksync::SyncStatus;

#[tokio::test]
async fn test_reconcile_offline_fails_fast_and_changes_nothing() {
    let (service, gateway, _connectivity) = setup(false).await;
    let task = service.create_task("Buy milk", "").await.unwrap();

    let result = service.reconcile().await;

    assert!(matches!(result, Err(SyncError::Offline)));
    let stored = service.get_task_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_status, SyncStatus::PendingCreate);
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_reconcile_with_nothing_pending_reports_zero() {
    let (service, _gateway, _connectivity) = setup(true).await;
    let outcome = service.reconcile().await.unwrap();
    assert_eq!(outcome, ReconcileOutcome::Completed(ReconcileReport::default()));
}

#[tokio::test]
async fn test_reconcile_replaces_pending_create_with_server_record() {
    let (service, gateway, connectivity) = setup(false).await;
    let task = service.create_task("Buy milk", "").await.unwrap();
    gateway.set_next_id(42);
    connectivity.set_online(true);

    let outcome = service.reconcile().await.unwrap();

    assert_eq!(outcome.synced(), 1);
    assert!(service.get_task_by_id(&task.id).await.unwrap().is_none());
    let synced = service.get_task_by_id("42").await.unwrap().unwrap();
    assert_eq!(synced.sync_status, SyncStatus::Synced);
    assert_eq!(synced.title, "Buy milk");
    assert_eq!(service.store().pending_count(), 0);
}

#[tokio::test]
async fn test_reconcile_pushes_pending_update_and_retags_synced() {
    let (service, gateway, connectivity) = setup(false).await;
    let task = seed_synced(&service, &gateway, "Old").await;
    service
        .update_task(&tasksync::task::Model {
            title: "New".to_string(),
            ..task.clone()
        })
        .await
        .unwrap();
    connectivity.set_online(true);

    let outcome = service.reconcile().await.unwrap();

    assert_eq!(outcome.synced(), 1);
    let stored = service.get_task_by_id(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.sync_status, SyncStatus::Synced);
    assert_eq!(gateway.server_task(task.id.parse().unwrap()).unwrap().title, "New");
}

#[tokio::test]
async fn test_reconcile_treats_missing_remote_as_deleted() {
    let (service, gateway, connectivity) = setup(false).await;
    let task = seed_synced(&service, &gateway, "Already gone").await;
    service.delete_task(&task.id).await.unwrap();
    gateway.remove(task.id.parse().unwrap());
    connectivity.set_online(true);

    let outcome = service.reconcile().await.unwrap();

    assert_eq!(outcome.synced(), 1);
    assert!(service.get_task_by_id(&task.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_reconcile_isolates_per_record_failures() {
    let (service, gateway, connectivity) = setup(false).await;
    let ok = service.create_task("Works", "").await.unwrap();
    let bad = service.create_task("Fails", "").await.unwrap();
    let doomed = seed_synced(&service, &gateway, "Doomed").await;
    service.delete_task(&doomed.id).await.unwrap();
    gateway.fail_title("Fails");
    connectivity.set_online(true);

    let outcome = service.reconcile().await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Completed(ReconcileReport { synced: 2, failed: 1 }));
    assert!(service.get_task_by_id(&ok.id).await.unwrap().is_none());
    let still_pending = service.get_task_by_id(&bad.id).await.unwrap().unwrap();
    assert_eq!(still_pending.sync_status, SyncStatus::PendingCreate);
    assert!(service.get_task_by_id(&doomed.id).await.unwrap().is_none());
    assert_eq!(service.store().pending_count(), 1);
}

#[tokio::test]
async fn test_reconcile_swallows_total_remote_failure() {
    let (service, gateway, connectivity) = setup(false).await;
    service.create_task("One", "").await.unwrap();
    service.create_task("Two", "").await.unwrap();
    gateway.set_failing(true);
    connectivity.set_online(true);

    let outcome = service.reconcile().await.unwrap();

    assert_eq!(outcome, ReconcileOutcome::Completed(ReconcileReport { synced: 0, failed: 2 }));
    assert_eq!(service.store().pending_count(), 2);
}

#[tokio::test]
async fn test_second_reconcile_observes_nothing_new() {
    let (service, _gateway, connectivity) = setup(false).await;
    service.create_task("One", "").await.unwrap();
    service.create_task("Two", "").await.unwrap();
    connectivity.set_online(true);

    let first = service.reconcile().await.unwrap();
    let second = service.reconcile().await.unwrap();

    assert_eq!(first.synced(), 2);
    assert_eq!(second.synced(), 0);
}

#[tokio::test]
async fn test_concurrent_reconcile_is_a_no_op() {
    let (service, gateway, connectivity) = setup(false).await;
    service.create_task("Slow", "").await.unwrap();
    gateway.set_delay(Duration::from_millis(200));
    connectivity.set_online(true);

    let running = {
        let service = service.clone();
        tokio::spawn(async move { service.reconcile().await })
    };
    tokio::time::timeout(Duration::from_secs(2), async {
        while !service.is_syncing() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let second = service.reconcile().await.unwrap();
    assert_eq!(second, ReconcileOutcome::AlreadyRunning);

    let first = running.await.unwrap().unwrap();
    assert_eq!(first.synced(), 1);
    assert_eq!(gateway.count_calls("create"), 1);
    assert!(!service.is_syncing());
}

#[tokio::test]
async fn test_cancelled_reconcile_releases_guard() {
    let (service, gateway, connectivity) = setup(false).await;
    service.create_task("Hung", "").await.unwrap();
    gateway.set_delay(Duration::from_secs(30));
    connectivity.set_online(true);

    let result = tokio::time::timeout(Duration::from_millis(100), service.reconcile()).await;

    assert!(result.is_err(), "the pass should still be waiting on the server");
    assert!(!service.is_syncing());
}

#[tokio::test]
async fn test_edit_during_in_flight_create_is_not_lost() {
    let (service, gateway, connectivity) = setup(false).await;
    let task = service.create_task("Draft", "").await.unwrap();
    gateway.set_delay(Duration::from_millis(200));
    gateway.set_next_id(7);
    connectivity.set_online(true);

    let running = {
        let service = service.clone();
        tokio::spawn(async move { service.reconcile().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Still PENDING_CREATE locally, so this stays local.
    service
        .update_task(&tasksync::task::Model {
            title: "Final".to_string(),
            updated_at: task.updated_at + 1,
            ..task.clone()
        })
        .await
        .unwrap();

    let outcome = running.await.unwrap().unwrap();

    assert_eq!(outcome.synced(), 0);
    let promoted = service.get_task_by_id("7").await.unwrap().unwrap();
    assert_eq!(promoted.title, "Final");
    assert_eq!(promoted.sync_status, SyncStatus::PendingUpdate);

    gateway.set_delay(Duration::from_millis(0));
    assert_eq!(service.reconcile().await.unwrap().synced(), 1);
    assert_eq!(gateway.server_task(7).unwrap().title, "Final");
}

#[tokio::test]
async fn test_cancel_during_in_flight_create_deletes_orphan() {
    let (service, gateway, connectivity) = setup(false).await;
    let task = service.create_task("Mistake", "").await.unwrap();
    gateway.set_delay(Duration::from_millis(200));
    gateway.set_next_id(9);
    connectivity.set_online(true);

    let running = {
        let service = service.clone();
        tokio::spawn(async move { service.reconcile().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    service.delete_task(&task.id).await.unwrap();
    running.await.unwrap().unwrap();

    let orphan = service.get_task_by_id("9").await.unwrap().unwrap();
    assert_eq!(orphan.sync_status, SyncStatus::PendingDelete);

    gateway.set_delay(Duration::from_millis(0));
    service.reconcile().await.unwrap();
    assert!(service.get_task_by_id("9").await.unwrap().is_none());
    assert_eq!(gateway.server_len(), 0);
}

#[tokio::test]
async fn test_title_edit_during_in_flight_create_keeps_timestamp_and_survives() {
    let (service, gateway, connectivity) = setup(false).await;
    let task = service.create_task("Draft", "").await.unwrap();
    gateway.set_delay(Duration::from_millis(200));
    gateway.set_next_id(11);
    connectivity.set_online(true);

    let running = {
        let service = service.clone();
        tokio::spawn(async move { service.reconcile().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    service
        .update_task(&tasksync::task::Model {
            title: "Final".to_string(),
            ..task.clone()
        })
        .await
        .unwrap();
    running.await.unwrap().unwrap();

    let promoted = service.get_task_by_id("11").await.unwrap().unwrap();
    assert_eq!(promoted.title, "Final");
    assert_eq!(promoted.sync_status, SyncStatus::PendingUpdate);

    gateway.set_delay(Duration::from_millis(0));
    service.reconcile().await.unwrap();
    assert_eq!(gateway.server_task(11).unwrap().title, "Final");
}
