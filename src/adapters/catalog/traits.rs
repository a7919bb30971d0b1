//! Catalog trait
//!
//! The read-only view of the host application an export needs: the user, the
//! editions they interacted with, and everything they attached to them.

use super::models::{
    BookStatuses, CatalogEdition, CatalogUser, ListMembership, ReadingGoal,
};
use crate::domain::{EditionId, Result, UserId};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn user(&self, user: &UserId) -> Result<CatalogUser>;

    /// Every edition the user shelved, listed, reviewed or read, without
    /// duplicates
    async fn books_for_user(&self, user: &UserId) -> Result<Vec<EditionId>>;

    async fn edition(&self, edition: &EditionId) -> Result<CatalogEdition>;

    /// Serialized shelves of `user` that hold `edition`
    async fn shelves_for(&self, user: &UserId, edition: &EditionId) -> Result<Vec<Value>>;

    async fn list_memberships_for(
        &self,
        user: &UserId,
        edition: &EditionId,
    ) -> Result<Vec<ListMembership>>;

    async fn statuses_for(&self, user: &UserId, edition: &EditionId) -> Result<BookStatuses>;

    /// Raw read-through rows; these have no serialized activity form
    async fn readthroughs_for(&self, user: &UserId, edition: &EditionId) -> Result<Vec<Value>>;

    /// Remote ids of lists the user saved
    async fn saved_lists(&self, user: &UserId) -> Result<Vec<String>>;

    /// Remote ids of followed users
    async fn follows(&self, user: &UserId) -> Result<Vec<String>>;

    /// Remote ids of blocked users
    async fn blocks(&self, user: &UserId) -> Result<Vec<String>>;

    async fn reading_goals(&self, user: &UserId) -> Result<Vec<ReadingGoal>>;
}
