use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use invoice_api::{
    auth::{Auth, InMemoryApiKeyStorage, Permission, RateLimit},
    email::{EmailSender, HttpEmailSender, LogEmailSender},
    storage,
    utils::logger,
    AppContext, ADMIN_KEY, DATABASE_URL, EMAIL_FROM, EMAIL_WEBHOOK, GRPC_ADDR, LISTEN_ADDR,
    LOG_DIR,
};

#[tokio::main]
async fn main() -> Result<()> {
    invoice_api::init_env();
    let _guard = logger::init(LOG_DIR.to_string())?;

    info!("Starting invoice service...");

    info!("Initializing Storage...");
    let pool = storage::connect(&DATABASE_URL).await?;

    info!("Initializing Auth Manager...");
    let auth = Auth::new(Arc::new(InMemoryApiKeyStorage::new()));
    let admin = auth.create_api_key(
        "admin".to_string(),
        vec![Permission::Admin],
        RateLimit { requests_per_minute: 600 },
        None,
        ADMIN_KEY.clone(),
    )?;
    if ADMIN_KEY.is_none() {
        warn!("INVOICE_ADMIN_KEY not set, generated admin key {}", admin.key);
    }

    let sender: Arc<dyn EmailSender> = match EMAIL_WEBHOOK.as_ref() {
        Some(url) => {
            info!("Delivering email through webhook {}", url);
            Arc::new(HttpEmailSender::new(url.clone()))
        }
        None => {
            warn!("INVOICE_EMAIL_WEBHOOK not set, emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    let ctx = Arc::new(AppContext::build(pool, auth, sender, EMAIL_FROM.to_string()).await?);

    let addr: SocketAddr = LISTEN_ADDR
        .parse()
        .with_context(|| format!("invalid listen address {}", *LISTEN_ADDR))?;

    let grpc_addr: SocketAddr = GRPC_ADDR
        .parse()
        .with_context(|| format!("invalid gRPC address {}", *GRPC_ADDR))?;

    match tokio::try_join!(
        invoice_api::web::start_server(ctx, addr),
        invoice_api::grpc::start_server(grpc_addr),
    ) {
        Ok(_) => info!("Servers stopped gracefully"),
        Err(e) => {
            tracing::error!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
