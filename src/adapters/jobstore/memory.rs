//! In-process job store
//!
//! All jobs live in one map behind a `tokio::sync::RwLock`. Every conditional
//! update takes the write lock once, checks, and writes, which makes the
//! compare-and-set operations atomic for every task in the process.

use super::traits::JobStore;
use crate::domain::document::BOOKS_KEY;
use crate::domain::{
    ArchiveLocation, ChildJob, ExportJob, Job, JobId, JobStatus, Result, ShelfpackError,
    TaskHandle, UserId,
};
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
enum StoredJob {
    Export(ExportJob),
    Child(ChildJob),
}

impl StoredJob {
    fn job(&self) -> &Job {
        match self {
            StoredJob::Export(e) => &e.job,
            StoredJob::Child(c) => &c.job,
        }
    }

    fn job_mut(&mut self) -> &mut Job {
        match self {
            StoredJob::Export(e) => &mut e.job,
            StoredJob::Child(c) => &mut c.job,
        }
    }
}

#[derive(Debug, Default)]
struct Arena {
    next_seq: u64,
    jobs: HashMap<JobId, (u64, StoredJob)>,
    /// (export, child) pairs whose book entry has been appended
    book_writers: HashSet<(JobId, JobId)>,
}

impl Arena {
    fn insert(&mut self, id: JobId, job: StoredJob) {
        self.next_seq += 1;
        self.jobs.insert(id, (self.next_seq, job));
    }

    /// Mutable access to a root job that is still live
    fn live_export(&mut self, id: JobId) -> Option<&mut ExportJob> {
        match self.jobs.get_mut(&id) {
            Some((_, StoredJob::Export(export))) if !export.job.is_terminal() => Some(export),
            _ => None,
        }
    }
}

/// Job store for single-process deployments and tests
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    arena: RwLock<Arena>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs, roots and children alike
    pub async fn len(&self) -> usize {
        self.arena.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    fn as_any(&self) -> &dyn Any {
        self
    }

    async fn create_export(&self, export: &ExportJob) -> Result<()> {
        let mut arena = self.arena.write().await;
        if arena.jobs.contains_key(&export.id()) {
            return Err(ShelfpackError::Database(format!(
                "Job {} already exists",
                export.id()
            )));
        }
        arena.insert(export.id(), StoredJob::Export(export.clone()));
        Ok(())
    }

    async fn create_child(&self, child: &ChildJob) -> Result<bool> {
        let mut arena = self.arena.write().await;
        if arena.live_export(child.parent_id).is_none() {
            return Ok(false);
        }
        if arena.jobs.contains_key(&child.id()) {
            return Err(ShelfpackError::Database(format!(
                "Job {} already exists",
                child.id()
            )));
        }
        arena.insert(child.id(), StoredJob::Child(child.clone()));
        Ok(true)
    }

    async fn export(&self, id: JobId) -> Result<Option<ExportJob>> {
        let arena = self.arena.read().await;
        Ok(match arena.jobs.get(&id) {
            Some((_, StoredJob::Export(export))) => Some(export.clone()),
            _ => None,
        })
    }

    async fn child(&self, id: JobId) -> Result<Option<ChildJob>> {
        let arena = self.arena.read().await;
        Ok(match arena.jobs.get(&id) {
            Some((_, StoredJob::Child(child))) => Some(child.clone()),
            _ => None,
        })
    }

    async fn children_of(&self, parent: JobId) -> Result<Vec<ChildJob>> {
        let arena = self.arena.read().await;
        let mut children: Vec<(u64, ChildJob)> = arena
            .jobs
            .values()
            .filter_map(|(seq, stored)| match stored {
                StoredJob::Child(child) if child.parent_id == parent => Some((*seq, child.clone())),
                _ => None,
            })
            .collect();
        children.sort_by_key(|(seq, _)| *seq);
        Ok(children.into_iter().map(|(_, child)| child).collect())
    }

    async fn exports_for_user(&self, user: &UserId) -> Result<Vec<ExportJob>> {
        let arena = self.arena.read().await;
        let mut exports: Vec<(u64, ExportJob)> = arena
            .jobs
            .values()
            .filter_map(|(seq, stored)| match stored {
                StoredJob::Export(export) if &export.user_id == user => {
                    Some((*seq, export.clone()))
                }
                _ => None,
            })
            .collect();
        exports.sort_by_key(|(seq, _)| std::cmp::Reverse(*seq));
        Ok(exports.into_iter().map(|(_, export)| export).collect())
    }

    async fn transition(&self, id: JobId, status: JobStatus) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(match arena.jobs.get_mut(&id) {
            Some((_, stored)) => stored.job_mut().set_status(status),
            None => false,
        })
    }

    async fn touch(&self, id: JobId) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(match arena.jobs.get_mut(&id) {
            Some((_, stored)) => stored.job_mut().touch(),
            None => false,
        })
    }

    async fn set_task_handle(&self, id: JobId, handle: &TaskHandle) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(match arena.jobs.get_mut(&id) {
            Some((_, stored)) if !stored.job().is_terminal() => {
                let job = stored.job_mut();
                job.task_handle = Some(handle.clone());
                job.touch()
            }
            _ => false,
        })
    }

    async fn set_document(&self, id: JobId, document: &Value) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(match arena.live_export(id) {
            Some(export) => {
                export.document = document.clone();
                export.job.touch()
            }
            None => false,
        })
    }

    async fn set_document_key(&self, id: JobId, key: &str, value: &Value) -> Result<bool> {
        let mut arena = self.arena.write().await;
        let Some(export) = arena.live_export(id) else {
            return Ok(false);
        };
        match export.document.as_object_mut() {
            Some(map) => {
                map.insert(key.to_string(), value.clone());
                Ok(export.job.touch())
            }
            None => Err(ShelfpackError::Serialization(format!(
                "Export document of {id} is not an object"
            ))),
        }
    }

    async fn append_book(&self, id: JobId, writer: JobId, entry: &Value) -> Result<bool> {
        let mut arena = self.arena.write().await;
        if arena.book_writers.contains(&(id, writer)) {
            return Ok(false);
        }
        let Some(export) = arena.live_export(id) else {
            return Ok(false);
        };
        let Some(map) = export.document.as_object_mut() else {
            return Err(ShelfpackError::Serialization(format!(
                "Export document of {id} is not an object"
            )));
        };
        let books = map
            .entry(BOOKS_KEY)
            .or_insert_with(|| Value::Array(Vec::new()));
        match books.as_array_mut() {
            Some(list) => {
                list.push(entry.clone());
                let touched = export.job.touch();
                arena.book_writers.insert((id, writer));
                Ok(touched)
            }
            None => Err(ShelfpackError::Serialization(format!(
                "'{BOOKS_KEY}' of {id} is not a list"
            ))),
        }
    }

    async fn mark_json_completed(&self, id: JobId) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(match arena.live_export(id) {
            Some(export) if !export.json_completed => {
                export.json_completed = true;
                export.job.touch();
                true
            }
            _ => false,
        })
    }

    async fn set_archive_location(&self, id: JobId, location: &ArchiveLocation) -> Result<bool> {
        let mut arena = self.arena.write().await;
        Ok(match arena.live_export(id) {
            Some(export) if export.archive_location.is_none() => {
                export.archive_location = Some(location.clone());
                export.job.touch();
                true
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChildKind, EditionId, StopReason};
    use serde_json::json;
    use std::sync::Arc;

    async fn store_with_export() -> (InMemoryJobStore, ExportJob) {
        let store = InMemoryJobStore::new();
        let mut export = ExportJob::new(UserId::new("reader").unwrap());
        export.document = json!({"books": []});
        store.create_export(&export).await.unwrap();
        (store, export)
    }

    #[tokio::test]
    async fn test_children_are_ordered_and_scoped() {
        let (store, export) = store_with_export().await;
        let other = ExportJob::new(UserId::new("someone-else").unwrap());
        store.create_export(&other).await.unwrap();

        let a = ChildJob::new(export.id(), ChildKind::BookFanOut);
        let b = ChildJob::new(export.id(), ChildKind::BuildArchive);
        let c = ChildJob::new(other.id(), ChildKind::BookFanOut);
        for child in [&a, &b, &c] {
            assert!(store.create_child(child).await.unwrap());
        }

        let children = store.children_of(export.id()).await.unwrap();
        assert_eq!(
            children.iter().map(|c| c.id()).collect::<Vec<_>>(),
            vec![a.id(), b.id()]
        );
    }

    #[tokio::test]
    async fn test_no_children_on_terminal_parent() {
        let (store, export) = store_with_export().await;
        store
            .transition(export.id(), JobStatus::Stopped(StopReason::Cancelled))
            .await
            .unwrap();

        let child = ChildJob::new(export.id(), ChildKind::BookFanOut);
        assert!(!store.create_child(&child).await.unwrap());
        assert!(store.children_of(export.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transition_is_noop_on_terminal() {
        let (store, export) = store_with_export().await;
        assert!(store.transition(export.id(), JobStatus::Complete).await.unwrap());
        let stamp = store.export(export.id()).await.unwrap().unwrap().job.updated_at;

        assert!(!store
            .transition(export.id(), JobStatus::Stopped(StopReason::Failed))
            .await
            .unwrap());
        assert!(!store.touch(export.id()).await.unwrap());

        let reloaded = store.export(export.id()).await.unwrap().unwrap();
        assert_eq!(reloaded.job.status, JobStatus::Complete);
        assert_eq!(reloaded.job.updated_at, stamp);
    }

    #[tokio::test]
    async fn test_document_writes_require_live_job() {
        let (store, export) = store_with_export().await;
        assert!(store
            .set_document_key(export.id(), "follows", &json!(["a"]))
            .await
            .unwrap());

        store
            .transition(export.id(), JobStatus::Stopped(StopReason::Cancelled))
            .await
            .unwrap();
        assert!(!store
            .set_document_key(export.id(), "blocks", &json!(["b"]))
            .await
            .unwrap());
        assert!(!store
            .append_book(export.id(), JobId::new(), &json!({}))
            .await
            .unwrap());

        let doc = store.export(export.id()).await.unwrap().unwrap().document;
        assert_eq!(doc, json!({"books": [], "follows": ["a"]}));
    }

    #[tokio::test]
    async fn test_append_book_creates_list() {
        let store = InMemoryJobStore::new();
        let export = ExportJob::new(UserId::new("reader").unwrap());
        store.create_export(&export).await.unwrap();

        assert!(store
            .append_book(export.id(), JobId::new(), &json!({"n": 1}))
            .await
            .unwrap());
        let doc = store.export(export.id()).await.unwrap().unwrap().document;
        assert_eq!(doc["books"], json!([{"n": 1}]));
    }

    #[tokio::test]
    async fn test_append_book_once_per_writer() {
        let (store, export) = store_with_export().await;
        let writer = JobId::new();

        assert!(store
            .append_book(export.id(), writer, &json!({"n": 1}))
            .await
            .unwrap());
        assert!(!store
            .append_book(export.id(), writer, &json!({"n": 1}))
            .await
            .unwrap());
        assert!(store
            .append_book(export.id(), JobId::new(), &json!({"n": 2}))
            .await
            .unwrap());

        let doc = store.export(export.id()).await.unwrap().unwrap().document;
        assert_eq!(doc["books"], json!([{"n": 1}, {"n": 2}]));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_are_not_lost() {
        let (store, export) = store_with_export().await;
        let store = Arc::new(store);
        let id = export.id();

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store.append_book(id, JobId::new(), &json!({ "i": i })).await
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        let doc = store.export(id).await.unwrap().unwrap().document;
        assert_eq!(doc["books"].as_array().unwrap().len(), 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mark_json_completed_has_one_winner() {
        let (store, export) = store_with_export().await;
        let store = Arc::new(store);
        let id = export.id();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.mark_json_completed(id).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_archive_location_set_once() {
        let (store, export) = store_with_export().await;
        let first = ArchiveLocation::RemoteKey("exports/a.tar.gz".to_string());
        let second = ArchiveLocation::RemoteKey("exports/b.tar.gz".to_string());
        assert!(store.set_archive_location(export.id(), &first).await.unwrap());
        assert!(!store.set_archive_location(export.id(), &second).await.unwrap());
        assert_eq!(
            store.export(export.id()).await.unwrap().unwrap().archive_location,
            Some(first)
        );
    }

    #[tokio::test]
    async fn test_child_lookup_does_not_return_exports() {
        let (store, export) = store_with_export().await;
        assert!(store.child(export.id()).await.unwrap().is_none());

        let child = ChildJob::new(
            export.id(),
            ChildKind::AddBook {
                edition_id: EditionId::new("ed-1").unwrap(),
            },
        );
        store.create_child(&child).await.unwrap();
        assert!(store.export(child.id()).await.unwrap().is_none());
        assert_eq!(store.child(child.id()).await.unwrap(), Some(child));
    }

    #[tokio::test]
    async fn test_exports_for_user_newest_first() {
        let store = InMemoryJobStore::new();
        let user = UserId::new("reader").unwrap();
        let first = ExportJob::new(user.clone());
        let second = ExportJob::new(user.clone());
        store.create_export(&first).await.unwrap();
        store.create_export(&second).await.unwrap();

        let exports = store.exports_for_user(&user).await.unwrap();
        assert_eq!(
            exports.iter().map(|e| e.id()).collect::<Vec<_>>(),
            vec![second.id(), first.id()]
        );
    }
}
