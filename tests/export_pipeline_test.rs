//! End-to-end export runs against fake catalog data
//!
//! Tasks are queued on a recording dispatcher and run one at a time, so every
//! test walks the full job tree: start, social graph, fan-out, books, archive.

mod common;

use common::{read_archive, seed_images, FakeCatalog, Harness};
use object_store::memory::InMemory;
use serde_json::json;
use shelfpack::adapters::dispatch::{Task, TaskHandler};
use shelfpack::adapters::storage::{LocalStorage, RemoteStorage, StorageAdapter};
use shelfpack::core::archive::archive_key;
use shelfpack::core::export::{ChildOutcome, StartOutcome};
use shelfpack::domain::{
    ArchiveLocation, ChildKind, ExportStatus, JobStatus, StopReason, UserId,
};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

fn local_harness(catalog: FakeCatalog) -> (TempDir, Harness) {
    let dir = TempDir::new().unwrap();
    let storage: Arc<dyn StorageAdapter> = Arc::new(LocalStorage::with_root(dir.path()).unwrap());
    (dir, Harness::new(catalog, storage))
}

async fn archive_bytes(harness: &Harness, location: &ArchiveLocation) -> Vec<u8> {
    match location {
        ArchiveLocation::LocalPath(path) => std::fs::read(path).unwrap(),
        ArchiveLocation::RemoteKey(key) => harness.storage.read(key).await.unwrap().to_vec(),
    }
}

#[tokio::test]
async fn test_export_with_books_completes() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 3));
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    harness.run_all().await;

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Complete);
    assert_eq!(report.books, 3);
    // 4 social + fan-out + 3 books + archive
    assert_eq!(report.counts.total, 9);
    assert_eq!(report.counts.complete, 9);

    let export = harness.coordinator.jobs().export(job_id).await.unwrap();
    assert!(export.json_completed);
    let books = export.document["books"].as_array().unwrap();
    let editions: HashSet<_> = books
        .iter()
        .map(|b| b["edition"]["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(editions.len(), 3);
    assert_eq!(books[0]["edition"]["cover"]["url"], "images/covers/ed-0.jpg");
    assert_eq!(export.document["icon"]["url"], "images/avatars/reader.png");
    assert_eq!(export.document["follows"].as_array().unwrap().len(), 1);
    assert_eq!(export.document["goals"][0]["goal"], 24);

    let location = report.archive_location.expect("complete export has an archive");
    let handle = export.job.task_handle.unwrap();
    assert!(location
        .as_str()
        .ends_with(&archive_key(handle.as_str())));

    let entries = read_archive(&archive_bytes(&harness, &location).await);
    let names: Vec<_> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "archive.json",
            "images/avatars/reader.png",
            "images/covers/ed-0.jpg",
            "images/covers/ed-1.jpg",
            "images/covers/ed-2.jpg",
        ]
    );
    let archived: serde_json::Value = serde_json::from_slice(&entries[0].1).unwrap();
    assert_eq!(archived, export.document);
}

#[tokio::test]
async fn test_export_with_remote_storage() {
    let storage: Arc<dyn StorageAdapter> = Arc::new(RemoteStorage::new(Arc::new(InMemory::new())));
    let harness = Harness::new(FakeCatalog::new("reader", 2), storage);
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    harness.run_all().await;

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Complete);
    let location = report.archive_location.unwrap();
    assert!(matches!(location, ArchiveLocation::RemoteKey(_)));

    let entries = read_archive(&archive_bytes(&harness, &location).await);
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].0, "archive.json");
}

#[tokio::test]
async fn test_zero_books_still_completes() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 0));
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    harness.run_all().await;

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Complete);
    assert_eq!(report.books, 0);
    assert_eq!(report.counts.total, 6);

    let entries = read_archive(&archive_bytes(&harness, &report.archive_location.unwrap()).await);
    let names: Vec<_> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["archive.json", "images/avatars/reader.png"]);
}

#[tokio::test]
async fn test_failing_book_is_isolated() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 4).failing_edition(1));
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    harness.run_all().await;

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Complete);
    assert_eq!(report.books, 3);
    assert_eq!(report.counts.failed, 1);
    assert!(report.archive_location.is_some());

    let children = harness.coordinator.jobs().children(job_id).await.unwrap();
    let failed: Vec<_> = children
        .iter()
        .filter(|c| c.job.status == JobStatus::Stopped(StopReason::Failed))
        .collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(
        &failed[0].kind,
        ChildKind::AddBook { edition_id } if edition_id.as_str() == "ed-1"
    ));
}

#[tokio::test]
async fn test_failing_social_child_fails_export() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 2).failing_follows());
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    harness.run_all().await;

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Failed);
    assert!(report.archive_location.is_none());

    let export = harness.coordinator.jobs().export(job_id).await.unwrap();
    assert!(!export.json_completed);
    assert!(export.archive_location.is_none());

    let children = harness.coordinator.jobs().children(job_id).await.unwrap();
    assert!(!children
        .iter()
        .any(|c| matches!(c.kind, ChildKind::BuildArchive)));
}

#[tokio::test]
async fn test_unknown_user_fails_export() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 1));

    let job_id = harness
        .coordinator
        .submit_export(UserId::new("stranger").unwrap())
        .await
        .unwrap();
    harness.run_all().await;

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Failed);
    assert_eq!(report.counts.total, 0);
}

#[tokio::test]
async fn test_cancel_before_start() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 2));

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    assert!(harness.coordinator.cancel(job_id).await.unwrap());
    assert!(!harness.coordinator.cancel(job_id).await.unwrap());

    assert_eq!(harness.run_all().await, 1);
    assert_eq!(harness.catalog.user_calls(), 0);

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Cancelled);
    assert_eq!(report.counts.total, 0);
    assert!(report.archive_location.is_none());
}

#[tokio::test]
async fn test_cancel_mid_export_skips_remaining_children() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 2));
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    let (task, _) = harness.dispatcher.pop().unwrap();
    assert_eq!(task, Task::StartExport { job_id });
    assert_eq!(
        harness.coordinator.start(job_id).await.unwrap(),
        StartOutcome::Started { children: 5 }
    );

    harness.coordinator.cancel(job_id).await.unwrap();
    harness.run_all().await;

    let export = harness.coordinator.jobs().export(job_id).await.unwrap();
    assert_eq!(export.job.status, JobStatus::Stopped(StopReason::Cancelled));
    assert!(!export.json_completed);
    assert!(export.archive_location.is_none());
    assert_eq!(export.document["books"].as_array().unwrap().len(), 0);

    let children = harness.coordinator.jobs().children(job_id).await.unwrap();
    assert_eq!(children.len(), 5);
    assert!(children.iter().all(|c| c.job.status == JobStatus::Pending));
}

#[tokio::test]
async fn test_redelivered_tasks_are_noops() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 2));
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    harness.run_all().await;

    let before = harness.coordinator.jobs().export(job_id).await.unwrap();
    assert_eq!(before.job.status, JobStatus::Complete);

    assert_eq!(
        harness.coordinator.start(job_id).await.unwrap(),
        StartOutcome::Skipped
    );
    for child in harness.coordinator.jobs().children(job_id).await.unwrap() {
        assert_eq!(
            harness.coordinator.run_child(child.id()).await.unwrap(),
            ChildOutcome::Skipped
        );
    }

    let after = harness.coordinator.jobs().export(job_id).await.unwrap();
    assert_eq!(after.document, before.document);
    assert_eq!(after.job.updated_at, before.job.updated_at);
    assert_eq!(harness.dispatcher.pending(), Vec::new());
}

#[tokio::test]
async fn test_book_redelivered_after_append_is_not_duplicated() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 2));
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();

    // Run until the first book task is at the head of the queue
    let book = loop {
        let (task, handle) = harness.dispatcher.pop().expect("no book task queued");
        if let Task::RunChild { child_id } = task {
            let child = harness.coordinator.jobs().child(child_id).await.unwrap();
            if matches!(child.kind, ChildKind::AddBook { .. }) {
                break child;
            }
        }
        harness.coordinator.handle(task, handle).await.unwrap();
    };

    // First delivery appended its entry and died before completing
    harness
        .coordinator
        .jobs()
        .mark_active(book.id(), Some(&book.kind))
        .await
        .unwrap();
    assert!(harness
        .coordinator
        .jobs()
        .store()
        .append_book(job_id, book.id(), &json!({"first_delivery": true}))
        .await
        .unwrap());

    assert_eq!(
        harness.coordinator.run_child(book.id()).await.unwrap(),
        ChildOutcome::Completed
    );
    harness.run_all().await;

    let export = harness.coordinator.jobs().export(job_id).await.unwrap();
    assert_eq!(export.job.status, JobStatus::Complete);
    let books = export.document["books"].as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(
        books.iter().filter(|b| b["first_delivery"] == json!(true)).count(),
        1
    );
}

#[tokio::test]
async fn test_duplicate_editions_are_exported_once() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 2).with_duplicate(0));
    seed_images(harness.storage.as_ref(), &harness.catalog.image_keys()).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    harness.run_all().await;

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Complete);
    assert_eq!(report.books, 2);
}

#[tokio::test]
async fn test_missing_cover_fails_export() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 2));
    // Only the avatar exists
    let keys = harness.catalog.image_keys();
    seed_images(harness.storage.as_ref(), &keys[..1]).await;

    let job_id = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await
        .unwrap();
    harness.run_all().await;

    let report = harness.coordinator.get_status(job_id).await.unwrap();
    assert_eq!(report.status, ExportStatus::Failed);
    assert!(report.archive_location.is_none());

    let handle = harness
        .coordinator
        .jobs()
        .export(job_id)
        .await
        .unwrap()
        .job
        .task_handle
        .unwrap();
    assert!(!harness
        .storage
        .exists(&archive_key(handle.as_str()))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_submit_fails_when_queue_is_gone() {
    let (_dir, harness) = local_harness(FakeCatalog::new("reader", 1));
    harness.dispatcher.close();

    let result = harness
        .coordinator
        .submit_export(harness.catalog.user_id())
        .await;
    assert!(result.is_err());

    let exports = harness
        .coordinator
        .jobs()
        .exports_for_user(&harness.catalog.user_id())
        .await
        .unwrap();
    assert_eq!(exports.len(), 1);
    assert_eq!(
        exports[0].job.status,
        JobStatus::Stopped(StopReason::Failed)
    );
}
