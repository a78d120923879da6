use std::net::SocketAddr;

use anyhow::Result;
use tonic::transport::server::Router;
use tonic::transport::Server;
use tracing::info;

pub mod chat;
pub mod random;

pub use chat::ChatRoom;
pub use random::RandomNumberService;

pub mod pb {
    // demo.proto has no package, so prost names the output `_.rs`
    include!(concat!(env!("OUT_DIR"), "/_.rs"));
}

use pb::chat_server::ChatServer;
use pb::random_numbers_server::RandomNumbersServer;

/// Both demo services on one router.
pub fn routes() -> Router {
    Server::builder()
        .add_service(RandomNumbersServer::new(RandomNumberService))
        .add_service(ChatServer::new(ChatRoom::new()))
}

pub async fn start_server(addr: SocketAddr) -> Result<()> {
    info!("Starting gRPC server on {}", addr);
    routes()
        .serve_with_shutdown(addr, crate::web::shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests;
