//! Shared fixtures for the integration tests
//!
//! - [`FakeCatalog`]: one user with generated books, optionally failing
//! - [`ManualDispatcher`]: records queued tasks and runs them on demand

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use flate2::read::GzDecoder;
use serde_json::{json, Value};
use shelfpack::adapters::catalog::{
    BookStatuses, Catalog, CatalogEdition, CatalogUser, Comment, ListMembership, Quotation,
    ReadingGoal, UserSettings,
};
use shelfpack::adapters::dispatch::{Task, TaskDispatcher, TaskHandler};
use shelfpack::adapters::jobstore::InMemoryJobStore;
use shelfpack::adapters::storage::StorageAdapter;
use shelfpack::core::export::ExportCoordinator;
use shelfpack::domain::{
    CatalogError, EditionId, Result, ShelfpackError, TaskHandle, UserId,
};
use std::collections::{HashSet, VecDeque};
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const QUEUE: &str = "imports";
pub const MEDIA_HOST: &str = "https://books.example";

/// Catalog serving a single user
pub struct FakeCatalog {
    user: UserId,
    editions: Vec<EditionId>,
    failing_editions: HashSet<EditionId>,
    failing_follows: bool,
    user_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(user: &str, books: usize) -> Self {
        let editions = (0..books)
            .map(|i| EditionId::new(format!("ed-{i}")).unwrap())
            .collect();
        Self {
            user: UserId::new(user).unwrap(),
            editions,
            failing_editions: HashSet::new(),
            failing_follows: false,
            user_calls: AtomicUsize::new(0),
        }
    }

    /// Requests for this edition fail with a server error
    pub fn failing_edition(mut self, index: usize) -> Self {
        self.failing_editions
            .insert(EditionId::new(format!("ed-{index}")).unwrap());
        self
    }

    /// The follows snapshot fails with a server error
    pub fn failing_follows(mut self) -> Self {
        self.failing_follows = true;
        self
    }

    /// The same edition appears twice in the user's books
    pub fn with_duplicate(mut self, index: usize) -> Self {
        self.editions
            .push(EditionId::new(format!("ed-{index}")).unwrap());
        self
    }

    pub fn user_id(&self) -> UserId {
        self.user.clone()
    }

    pub fn user_calls(&self) -> usize {
        self.user_calls.load(Ordering::SeqCst)
    }

    /// Storage keys of every image this catalog references
    pub fn image_keys(&self) -> Vec<String> {
        let mut keys = vec![avatar_key(&self.user)];
        keys.extend(self.editions.iter().map(cover_key));
        keys
    }

    fn check_user(&self, user: &UserId) -> Result<()> {
        if *user == self.user {
            Ok(())
        } else {
            Err(CatalogError::NotFound(format!("user {user}")).into())
        }
    }

    fn check_edition(&self, edition: &EditionId) -> Result<()> {
        if self.failing_editions.contains(edition) {
            return Err(CatalogError::ServerError {
                status: 503,
                message: format!("edition {edition} unavailable"),
            }
            .into());
        }
        Ok(())
    }
}

pub fn avatar_key(user: &UserId) -> String {
    format!("images/avatars/{user}.png")
}

pub fn cover_key(edition: &EditionId) -> String {
    format!("images/covers/{edition}.jpg")
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn user(&self, user: &UserId) -> Result<CatalogUser> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.check_user(user)?;
        let name: String = Name().fake();
        Ok(CatalogUser {
            id: user.clone(),
            activity: json!({
                "id": format!("{MEDIA_HOST}/user/{user}"),
                "type": "Person",
                "preferredUsername": user.as_str(),
                "name": name,
                "icon": {"type": "Document", "url": format!("{MEDIA_HOST}/{}", avatar_key(user))},
            }),
            settings: UserSettings::default(),
        })
    }

    async fn books_for_user(&self, user: &UserId) -> Result<Vec<EditionId>> {
        self.check_user(user)?;
        Ok(self.editions.clone())
    }

    async fn edition(&self, edition: &EditionId) -> Result<CatalogEdition> {
        self.check_edition(edition)?;
        let title: String = Sentence(2..5).fake();
        let author: String = Name().fake();
        Ok(CatalogEdition {
            id: edition.clone(),
            work: json!({"id": format!("{MEDIA_HOST}/work/{edition}"), "title": title}),
            edition: json!({
                "id": format!("{MEDIA_HOST}/book/{edition}"),
                "title": title,
                "cover": {"type": "Document", "url": format!("{MEDIA_HOST}/{}", cover_key(edition))},
            }),
            authors: vec![json!({"name": author})],
        })
    }

    async fn shelves_for(&self, user: &UserId, edition: &EditionId) -> Result<Vec<Value>> {
        self.check_user(user)?;
        self.check_edition(edition)?;
        Ok(vec![json!({"name": "Read", "identifier": "read"})])
    }

    async fn list_memberships_for(
        &self,
        user: &UserId,
        edition: &EditionId,
    ) -> Result<Vec<ListMembership>> {
        self.check_user(user)?;
        Ok(vec![ListMembership {
            list: json!({"name": "Favourites"}),
            privacy: "public".to_string(),
            list_item: json!({"book": format!("{MEDIA_HOST}/book/{edition}")}),
        }])
    }

    async fn statuses_for(&self, user: &UserId, _edition: &EditionId) -> Result<BookStatuses> {
        self.check_user(user)?;
        let text: String = Sentence(3..8).fake();
        Ok(BookStatuses {
            comments: vec![Comment {
                activity: json!({"type": "Comment", "content": text}),
                progress: Some(42),
                progress_mode: Some("PG".to_string()),
            }],
            quotations: vec![Quotation {
                activity: json!({"type": "Quotation", "quote": text}),
                position: Some(3),
                endposition: None,
                position_mode: Some("PG".to_string()),
            }],
            reviews: vec![json!({"type": "Review", "rating": 4})],
        })
    }

    async fn readthroughs_for(&self, user: &UserId, _edition: &EditionId) -> Result<Vec<Value>> {
        self.check_user(user)?;
        Ok(vec![json!({"start_date": "2024-01-01", "finish_date": null})])
    }

    async fn saved_lists(&self, user: &UserId) -> Result<Vec<String>> {
        self.check_user(user)?;
        Ok(vec![format!("{MEDIA_HOST}/list/7")])
    }

    async fn follows(&self, user: &UserId) -> Result<Vec<String>> {
        self.check_user(user)?;
        if self.failing_follows {
            return Err(CatalogError::ServerError {
                status: 503,
                message: "follows unavailable".to_string(),
            }
            .into());
        }
        Ok(vec![format!("{MEDIA_HOST}/user/friend")])
    }

    async fn blocks(&self, user: &UserId) -> Result<Vec<String>> {
        self.check_user(user)?;
        Ok(Vec::new())
    }

    async fn reading_goals(&self, user: &UserId) -> Result<Vec<ReadingGoal>> {
        self.check_user(user)?;
        Ok(vec![ReadingGoal {
            goal: 24,
            year: 2025,
            privacy: "followers".to_string(),
        }])
    }
}

/// Dispatcher that queues tasks in memory until a test runs them
#[derive(Default)]
pub struct ManualDispatcher {
    queued: Mutex<VecDeque<(Task, TaskHandle)>>,
    dispatched: AtomicUsize,
    closed: std::sync::atomic::AtomicBool,
}

impl ManualDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every later enqueue fails as if the broker were gone
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn pending(&self) -> Vec<Task> {
        self.queued
            .lock()
            .unwrap()
            .iter()
            .map(|(task, _)| *task)
            .collect()
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    pub fn pop(&self) -> Option<(Task, TaskHandle)> {
        self.queued.lock().unwrap().pop_front()
    }

    /// Run queued tasks, including ones they queue, until none are left
    pub async fn run_all(&self, handler: &dyn TaskHandler) -> usize {
        let mut ran = 0;
        while let Some((task, handle)) = self.pop() {
            handler.handle(task, handle).await.unwrap();
            ran += 1;
        }
        ran
    }
}

#[async_trait]
impl TaskDispatcher for ManualDispatcher {
    async fn enqueue(&self, task: Task, queue: &str) -> Result<TaskHandle> {
        assert_eq!(queue, QUEUE, "task routed to an unexpected queue");
        if self.closed.load(Ordering::SeqCst) {
            return Err(ShelfpackError::Dispatch("dispatcher closed".to_string()));
        }
        let handle = TaskHandle::generate();
        self.queued
            .lock()
            .unwrap()
            .push_back((task, handle.clone()));
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }
}

/// Coordinator wired to in-memory fakes
pub struct Harness {
    pub coordinator: ExportCoordinator,
    pub dispatcher: Arc<ManualDispatcher>,
    pub catalog: Arc<FakeCatalog>,
    pub storage: Arc<dyn StorageAdapter>,
}

impl Harness {
    pub fn new(catalog: FakeCatalog, storage: Arc<dyn StorageAdapter>) -> Self {
        let dispatcher = ManualDispatcher::new();
        let catalog = Arc::new(catalog);
        let coordinator = ExportCoordinator::new(
            Arc::new(InMemoryJobStore::new()),
            catalog.clone(),
            storage.clone(),
            dispatcher.clone(),
            QUEUE,
        );
        Self {
            coordinator,
            dispatcher,
            catalog,
            storage,
        }
    }

    pub async fn run_all(&self) -> usize {
        self.dispatcher.run_all(&self.coordinator).await
    }
}

/// Store a small fake image under every key the catalog references
pub async fn seed_images(storage: &dyn StorageAdapter, keys: &[String]) {
    for key in keys {
        let body = format!("image bytes for {key}");
        storage.write(key, Bytes::from(body)).await.unwrap();
    }
}

/// Entry names and contents of a gzip tarball, in archive order
pub fn read_archive(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (name, data)
        })
        .collect()
}
