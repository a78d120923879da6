use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use super::InvoiceStorage;
use crate::billing::types::{InvoiceFilter, InvoiceStatus};
use crate::storage::invoice::entity::Model as InvoiceModel;
use crate::storage::{constraint_violation, format_time, parse_time};
use crate::web::Pagination;

pub struct SqliteInvoiceStorage {
    pool: SqlitePool,
}

impl SqliteInvoiceStorage {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        info!("Initializing SQLite invoice storage");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS invoices (
                id TEXT PRIMARY KEY,
                seq INTEGER NOT NULL UNIQUE,
                number TEXT NOT NULL UNIQUE,
                contact_id TEXT NOT NULL REFERENCES contacts (id),
                description TEXT,
                currency TEXT NOT NULL,
                lines TEXT NOT NULL,
                total_cents INTEGER NOT NULL,
                status TEXT NOT NULL,
                issued_at TEXT NOT NULL,
                due_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invoices_contact ON invoices (contact_id)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    fn row_to_model(row: SqliteRow) -> Result<InvoiceModel> {
        Ok(InvoiceModel {
            id: row.try_get("id")?,
            seq: row.try_get("seq")?,
            number: row.try_get("number")?,
            contact_id: row.try_get("contact_id")?,
            description: row.try_get("description")?,
            currency: row.try_get("currency")?,
            lines: row.try_get("lines")?,
            total_cents: row.try_get("total_cents")?,
            status: row.try_get("status")?,
            issued_at: parse_time(row.try_get("issued_at")?)?,
            due_at: parse_time(row.try_get("due_at")?)?,
            created_at: parse_time(row.try_get("created_at")?)?,
            updated_at: parse_time(row.try_get("updated_at")?)?,
        })
    }

    // listing and counting must agree on the filter
    fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &InvoiceFilter) {
        let mut separator = " WHERE ";
        if let Some(status) = filter.status {
            builder.push(separator).push("status = ").push_bind(status.as_str());
            separator = " AND ";
        }
        if let Some(contact_id) = &filter.contact_id {
            builder.push(separator).push("contact_id = ").push_bind(contact_id.clone());
        }
    }
}

#[async_trait]
impl InvoiceStorage for SqliteInvoiceStorage {
    async fn create(&self, model: &InvoiceModel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices
            (id, seq, number, contact_id, description, currency, lines, total_cents, status,
             issued_at, due_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&model.id)
        .bind(model.seq)
        .bind(&model.number)
        .bind(&model.contact_id)
        .bind(&model.description)
        .bind(&model.currency)
        .bind(&model.lines)
        .bind(model.total_cents)
        .bind(&model.status)
        .bind(format_time(&model.issued_at))
        .bind(format_time(&model.due_at))
        .bind(format_time(&model.created_at))
        .bind(format_time(&model.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            constraint_violation(e, || {
                format!("invoice {} conflicts with existing data or its contact is gone", model.number)
            })
        })?;

        Ok(())
    }

    async fn get(&self, invoice_id: &str) -> Result<Option<InvoiceModel>> {
        let row = sqlx::query("SELECT * FROM invoices WHERE id = ?")
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_model).transpose()
    }

    async fn list(&self, filter: &InvoiceFilter, pagination: &Pagination) -> Result<Vec<InvoiceModel>> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM invoices");
        Self::push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY issued_at DESC, seq DESC LIMIT ")
            .push_bind(pagination.limit())
            .push(" OFFSET ")
            .push_bind(pagination.offset());

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_model).collect()
    }

    async fn count(&self, filter: &InvoiceFilter) -> Result<i64> {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM invoices");
        Self::push_filter(&mut builder, filter);

        let count: i64 = builder.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn update(&self, model: &InvoiceModel, expected: InvoiceStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET contact_id = ?, description = ?, currency = ?, lines = ?, total_cents = ?,
                status = ?, issued_at = ?, due_at = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(&model.contact_id)
        .bind(&model.description)
        .bind(&model.currency)
        .bind(&model.lines)
        .bind(model.total_cents)
        .bind(&model.status)
        .bind(format_time(&model.issued_at))
        .bind(format_time(&model.due_at))
        .bind(format_time(&model.updated_at))
        .bind(&model.id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| constraint_violation(e, || format!("contact {} does not exist", model.contact_id)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_status(
        &self,
        invoice_id: &str,
        from: InvoiceStatus,
        to: InvoiceStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE invoices SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
                .bind(to.as_str())
                .bind(format_time(&updated_at))
                .bind(invoice_id)
                .bind(from.as_str())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, invoice_id: &str, expected: InvoiceStatus) -> Result<bool> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ? AND status = ?")
            .bind(invoice_id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn next_seq(&self) -> Result<i64> {
        let seq: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) + 1 FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(seq)
    }
}
