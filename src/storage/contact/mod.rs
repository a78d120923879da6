use anyhow::Result;
use async_trait::async_trait;

use crate::storage::contact::entity::Model as ContactModel;
use crate::web::Pagination;

pub mod entity;
pub mod mapping;
pub mod sqlite;

#[async_trait]
pub trait ContactStorage: Send + Sync + 'static {
    async fn create(&self, model: &ContactModel) -> Result<()>;
    async fn get(&self, contact_id: &str) -> Result<Option<ContactModel>>;
    /// Contacts ordered by name, windowed by `pagination`.
    async fn list(&self, pagination: &Pagination) -> Result<Vec<ContactModel>>;
    async fn count(&self) -> Result<i64>;
    /// Returns false when no row matched `model.id`.
    async fn update(&self, model: &ContactModel) -> Result<bool>;
    async fn delete(&self, contact_id: &str) -> Result<bool>;
}
