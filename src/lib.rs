pub mod auth;
pub mod billing;
pub mod email;
pub mod grpc;
pub mod storage;
pub mod utils;
pub mod web;

use std::{env, sync::Arc};

use anyhow::Result;
use once_cell::sync::Lazy;
use sqlx::SqlitePool;

use auth::Auth;
use billing::{ContactManager, InvoiceManager};
use email::{EmailSender, EmailService};
use storage::contact::sqlite::SqliteContactStorage;
use storage::invoice::sqlite::SqliteInvoiceStorage;

pub struct AppContext {
    pub auth: Arc<Auth>,
    pub contacts: Arc<ContactManager>,
    pub invoices: Arc<InvoiceManager>,
}

impl AppContext {
    /// Wires the sqlite storages, the managers and the email service around one pool.
    pub async fn build(
        pool: SqlitePool,
        auth: Auth,
        sender: Arc<dyn EmailSender>,
        email_from: String,
    ) -> Result<Self> {
        let contact_storage = Arc::new(SqliteContactStorage::new(pool.clone()).await?);
        let invoice_storage = Arc::new(SqliteInvoiceStorage::new(pool).await?);
        let email = Arc::new(EmailService::new(sender, email_from));

        let contacts = ContactManager::new(contact_storage.clone(), invoice_storage.clone());
        let invoices = InvoiceManager::new(invoice_storage, contact_storage, email);

        Ok(Self {
            auth: Arc::new(auth),
            contacts: Arc::new(contacts),
            invoices: Arc::new(invoices),
        })
    }
}

const INVOICE_DATABASE_URL: &str = "sqlite://./invoice_data/invoices.db?mode=rwc";
const INVOICE_LISTEN_ADDR: &str = "127.0.0.1:7300";
const INVOICE_GRPC_ADDR: &str = "127.0.0.1:7301";
const INVOICE_LOG_DIR: &str = "./logs";
const INVOICE_EMAIL_FROM: &str = "billing@localhost";

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) => value,
        Err(_) => dotenv::var(key).unwrap_or_else(|_| default.to_string()),
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .or_else(|_| dotenv::var(key))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub static DATABASE_URL: Lazy<String> =
    Lazy::new(|| env_or("INVOICE_DATABASE_URL", INVOICE_DATABASE_URL));

pub static LISTEN_ADDR: Lazy<String> =
    Lazy::new(|| env_or("INVOICE_LISTEN_ADDR", INVOICE_LISTEN_ADDR));

/// Address of the demo gRPC services.
pub static GRPC_ADDR: Lazy<String> = Lazy::new(|| env_or("INVOICE_GRPC_ADDR", INVOICE_GRPC_ADDR));

pub static LOG_DIR: Lazy<String> = Lazy::new(|| env_or("INVOICE_LOG_DIR", INVOICE_LOG_DIR));

pub static EMAIL_FROM: Lazy<String> =
    Lazy::new(|| env_or("INVOICE_EMAIL_FROM", INVOICE_EMAIL_FROM));

/// Webhook that receives outgoing emails. Messages are only logged when unset.
pub static EMAIL_WEBHOOK: Lazy<Option<String>> = Lazy::new(|| env_opt("INVOICE_EMAIL_WEBHOOK"));

/// Key granted admin rights at start-up. A random one is generated when unset.
pub static ADMIN_KEY: Lazy<Option<String>> = Lazy::new(|| env_opt("INVOICE_ADMIN_KEY"));

pub fn init_env() {
    dotenv::dotenv().ok();

    // make sure the database directory exists
    let db_path = DATABASE_URL
        .strip_prefix("sqlite://")
        .map(|path| path.split('?').next().unwrap_or(path));
    if let Some(db_path) = db_path {
        if let Some(dir) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(dir).unwrap_or_else(|e| {
                eprintln!("Failed to create database directory: {}", e);
            });
        }
    }
}
