use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::billing::types::{InvoiceFilter, InvoiceStatus};
use crate::storage::invoice::entity::Model as InvoiceModel;
use crate::web::Pagination;

pub mod entity;
pub mod mapping;
pub mod sqlite;

#[async_trait]
pub trait InvoiceStorage: Send + Sync + 'static {
    async fn create(&self, model: &InvoiceModel) -> Result<()>;
    async fn get(&self, invoice_id: &str) -> Result<Option<InvoiceModel>>;
    /// Newest issue date first, windowed by `pagination`.
    async fn list(&self, filter: &InvoiceFilter, pagination: &Pagination) -> Result<Vec<InvoiceModel>>;
    async fn count(&self, filter: &InvoiceFilter) -> Result<i64>;
    /// Replaces the editable columns while the stored status is still
    /// `expected`. Returns false when no row matched.
    async fn update(&self, model: &InvoiceModel, expected: InvoiceStatus) -> Result<bool>;
    /// Moves the invoice from `from` to `to`. Returns false when the invoice is
    /// missing or no longer in `from`.
    async fn update_status(
        &self,
        invoice_id: &str,
        from: InvoiceStatus,
        to: InvoiceStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;
    /// Deletes the invoice if it is still in `expected`.
    async fn delete(&self, invoice_id: &str, expected: InvoiceStatus) -> Result<bool>;
    /// Sequence number for the next invoice, one past the highest in use.
    async fn next_seq(&self) -> Result<i64>;
}
