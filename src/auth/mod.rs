pub mod error;
pub mod middleware;
pub mod service;
pub mod storage;
pub mod types;

pub use error::AuthError;
pub use service::Auth;
pub use storage::{ApiKeyStorage, InMemoryApiKeyStorage};
pub use types::{ApiKeyInfo, KeyStatus, Permission, RateLimit};
