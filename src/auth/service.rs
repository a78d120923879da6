use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{Duration, Utc};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::AuthError;
use super::storage::ApiKeyStorage;
use super::types::{ApiKeyInfo, KeyStatus, Permission, RateLimit};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct Auth {
    key_storage: Arc<dyn ApiKeyStorage>,
    rate_limiters: Mutex<HashMap<String, Arc<DirectRateLimiter>>>,
}

impl Auth {
    pub fn new(key_storage: Arc<dyn ApiKeyStorage>) -> Self {
        Self {
            key_storage,
            rate_limiters: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_with_memory_storage() -> Self {
        use super::storage::InMemoryApiKeyStorage;
        Self::new(Arc::new(InMemoryApiKeyStorage::new()))
    }

    /// Accepts the raw header value, either `<key>` or `Bearer <key>`.
    pub async fn verify_api_key(
        &self,
        api_key: Option<&str>,
        required_permission: Permission,
    ) -> Result<ApiKeyInfo, AuthError> {
        let api_key = api_key.ok_or(AuthError::MissingApiKey)?;
        let api_key = api_key.trim_start();
        let api_key = api_key.strip_prefix("Bearer ").unwrap_or(api_key).trim();
        if api_key.is_empty() {
            return Err(AuthError::MissingApiKey);
        }
        debug!("Verifying API key for {:?}", required_permission);

        let key_info = self
            .key_storage
            .get_key_info(api_key)?
            .ok_or(AuthError::InvalidApiKey)?;

        // check key status
        match key_info.status {
            KeyStatus::Suspended => return Err(AuthError::KeySuspended),
            KeyStatus::Expired => return Err(AuthError::KeyExpired),
            KeyStatus::Active => {}
        }

        // check expiration time
        if let Some(expires_at) = key_info.expires_at {
            if expires_at < Utc::now() {
                self.key_storage.update_key_status(api_key, KeyStatus::Expired)?;
                return Err(AuthError::KeyExpired);
            }
        }

        if !key_info.allows(required_permission) {
            return Err(AuthError::InsufficientPermissions);
        }

        // check rate limit
        if let Some(per_minute) = NonZeroU32::new(key_info.rate_limit.requests_per_minute) {
            let limiter = {
                let mut limiters = self.rate_limiters.lock().await;
                limiters
                    .entry(api_key.to_string())
                    .or_insert_with(|| Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))))
                    .clone()
            };

            if limiter.check().is_err() {
                return Err(AuthError::RateLimitExceeded);
            }
        }

        Ok(key_info)
    }

    /// Registers a key. A random `key-<uuid>` is generated unless `key` is given.
    pub fn create_api_key(
        &self,
        name: String,
        permissions: Vec<Permission>,
        rate_limit: RateLimit,
        expires_in_days: Option<i64>,
        key: Option<String>,
    ) -> Result<ApiKeyInfo, AuthError> {
        if name.trim().is_empty() {
            return Err(AuthError::InvalidRequest("key name must not be empty".to_string()));
        }
        if permissions.is_empty() {
            return Err(AuthError::InvalidRequest("at least one permission is required".to_string()));
        }
        if rate_limit.requests_per_minute == 0 {
            return Err(AuthError::InvalidRequest(
                "requests_per_minute must be positive".to_string(),
            ));
        }
        if matches!(expires_in_days, Some(days) if days <= 0) {
            return Err(AuthError::InvalidRequest(
                "expires_in_days must be positive".to_string(),
            ));
        }

        let key = key.unwrap_or_else(|| format!("key-{}", Uuid::new_v4()));
        if key.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidRequest("key must not contain whitespace".to_string()));
        }

        let key_info = ApiKeyInfo {
            key: key.clone(),
            name,
            created_at: Utc::now(),
            expires_at: expires_in_days.map(|days| Utc::now() + Duration::days(days)),
            permissions,
            rate_limit,
            status: KeyStatus::Active,
        };

        self.key_storage.set_key_info(key, key_info.clone())?;
        info!("Created API key {:?} with {:?}", key_info.name, key_info.permissions);
        Ok(key_info)
    }

    pub async fn revoke_api_key(&self, api_key: &str) -> Result<(), AuthError> {
        if !self.key_storage.update_key_status(api_key, KeyStatus::Suspended)? {
            return Err(AuthError::KeyNotFound);
        }
        self.rate_limiters.lock().await.remove(api_key);
        info!("Revoked API key");
        Ok(())
    }

    pub fn list_api_keys(&self) -> Result<Vec<ApiKeyInfo>, AuthError> {
        Ok(self.key_storage.list_keys()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_key(auth: &Auth, permissions: Vec<Permission>, per_minute: u32) -> ApiKeyInfo {
        auth.create_api_key(
            "test".to_string(),
            permissions,
            RateLimit { requests_per_minute: per_minute },
            None,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_verify_accepts_plain_and_bearer_keys() {
        let auth = Auth::new_with_memory_storage();
        let key = create_key(&auth, vec![Permission::Read], 100);

        assert!(auth.verify_api_key(Some(&key.key), Permission::Read).await.is_ok());
        let bearer = format!("Bearer {}", key.key);
        assert!(auth.verify_api_key(Some(&bearer), Permission::Read).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_only_strips_bearer_scheme() {
        let auth = Auth::new_with_memory_storage();
        let key = create_key(&auth, vec![Permission::Read], 100);

        for header in [format!("Foo {}", key.key), format!("bearer{}", key.key), format!("Basic {}", key.key)] {
            assert!(matches!(
                auth.verify_api_key(Some(&header), Permission::Read).await,
                Err(AuthError::InvalidApiKey)
            ));
        }
        assert!(matches!(
            auth.verify_api_key(Some("Bearer "), Permission::Read).await,
            Err(AuthError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_verify_rejects_missing_and_unknown_keys() {
        let auth = Auth::new_with_memory_storage();

        assert!(matches!(
            auth.verify_api_key(None, Permission::Read).await,
            Err(AuthError::MissingApiKey)
        ));
        assert!(matches!(
            auth.verify_api_key(Some("  "), Permission::Read).await,
            Err(AuthError::MissingApiKey)
        ));
        assert!(matches!(
            auth.verify_api_key(Some("key-unknown"), Permission::Read).await,
            Err(AuthError::InvalidApiKey)
        ));
    }

    #[tokio::test]
    async fn test_permissions() {
        let auth = Auth::new_with_memory_storage();
        let reader = create_key(&auth, vec![Permission::Read], 100);
        let admin = create_key(&auth, vec![Permission::Admin], 100);

        assert!(matches!(
            auth.verify_api_key(Some(&reader.key), Permission::Write).await,
            Err(AuthError::InsufficientPermissions)
        ));
        assert!(auth.verify_api_key(Some(&admin.key), Permission::Write).await.is_ok());
        assert!(auth.verify_api_key(Some(&admin.key), Permission::Read).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_key_is_suspended() {
        let auth = Auth::new_with_memory_storage();
        let key = create_key(&auth, vec![Permission::Read], 100);

        auth.revoke_api_key(&key.key).await.unwrap();
        assert!(matches!(
            auth.verify_api_key(Some(&key.key), Permission::Read).await,
            Err(AuthError::KeySuspended)
        ));
        assert!(matches!(
            auth.revoke_api_key("key-unknown").await,
            Err(AuthError::KeyNotFound)
        ));
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let auth = Auth::new_with_memory_storage();
        let key = create_key(&auth, vec![Permission::Read], 2);

        assert!(auth.verify_api_key(Some(&key.key), Permission::Read).await.is_ok());
        assert!(auth.verify_api_key(Some(&key.key), Permission::Read).await.is_ok());
        assert!(matches!(
            auth.verify_api_key(Some(&key.key), Permission::Read).await,
            Err(AuthError::RateLimitExceeded)
        ));
    }

    #[tokio::test]
    async fn test_expired_key() {
        let auth = Auth::new_with_memory_storage();
        let mut key = create_key(&auth, vec![Permission::Read], 100);
        key.expires_at = Some(Utc::now() - Duration::minutes(1));
        auth.key_storage.set_key_info(key.key.clone(), key.clone()).unwrap();

        assert!(matches!(
            auth.verify_api_key(Some(&key.key), Permission::Read).await,
            Err(AuthError::KeyExpired)
        ));
        let stored = auth.key_storage.get_key_info(&key.key).unwrap().unwrap();
        assert_eq!(stored.status, KeyStatus::Expired);
    }

    #[test]
    fn test_create_validates_request() {
        let auth = Auth::new_with_memory_storage();
        let bad_rate = auth.create_api_key(
            "test".to_string(),
            vec![Permission::Read],
            RateLimit { requests_per_minute: 0 },
            None,
            None,
        );
        assert!(matches!(bad_rate, Err(AuthError::InvalidRequest(_))));

        let no_permissions =
            auth.create_api_key("test".to_string(), vec![], RateLimit::default(), None, None);
        assert!(matches!(no_permissions, Err(AuthError::InvalidRequest(_))));

        let fixed = auth
            .create_api_key(
                "fixed".to_string(),
                vec![Permission::Admin],
                RateLimit::default(),
                Some(7),
                Some("admin-secret".to_string()),
            )
            .unwrap();
        assert_eq!(fixed.key, "admin-secret");
        assert!(fixed.expires_at.is_some());
        assert_eq!(auth.list_api_keys().unwrap().len(), 1);
    }
}
