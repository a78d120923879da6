use anyhow::Result;
use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

use super::ContactStorage;
use crate::storage::contact::entity::Model as ContactModel;
use crate::storage::{constraint_violation, format_time, parse_time};
use crate::web::Pagination;

pub struct SqliteContactStorage {
    pool: SqlitePool,
}

impl SqliteContactStorage {
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        info!("Initializing SQLite contact storage");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT,
                address TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_contacts_name ON contacts (name, id)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    fn row_to_model(row: SqliteRow) -> Result<ContactModel> {
        Ok(ContactModel {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            created_at: parse_time(row.try_get("created_at")?)?,
            updated_at: parse_time(row.try_get("updated_at")?)?,
        })
    }
}

#[async_trait]
impl ContactStorage for SqliteContactStorage {
    async fn create(&self, model: &ContactModel) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO contacts (id, name, email, phone, address, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&model.id)
        .bind(&model.name)
        .bind(&model.email)
        .bind(&model.phone)
        .bind(&model.address)
        .bind(format_time(&model.created_at))
        .bind(format_time(&model.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, contact_id: &str) -> Result<Option<ContactModel>> {
        let row = sqlx::query("SELECT * FROM contacts WHERE id = ?")
            .bind(contact_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_model).transpose()
    }

    async fn list(&self, pagination: &Pagination) -> Result<Vec<ContactModel>> {
        let rows = sqlx::query("SELECT * FROM contacts ORDER BY name ASC, id ASC LIMIT ? OFFSET ?")
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_model).collect()
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update(&self, model: &ContactModel) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contacts
            SET name = ?, email = ?, phone = ?, address = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&model.name)
        .bind(&model.email)
        .bind(&model.phone)
        .bind(&model.address)
        .bind(format_time(&model.updated_at))
        .bind(&model.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, contact_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(contact_id)
            .execute(&self.pool)
            .await
            .map_err(|e| constraint_violation(e, || format!("contact {} still has invoices", contact_id)))?;

        Ok(result.rows_affected() > 0)
    }
}
