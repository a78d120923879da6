use std::collections::HashMap;
use std::sync::RwLock;

use super::types::{ApiKeyInfo, KeyStatus};

pub trait ApiKeyStorage: Send + Sync + 'static {
    fn get_key_info(&self, api_key: &str) -> Result<Option<ApiKeyInfo>, String>;
    fn set_key_info(&self, api_key: String, info: ApiKeyInfo) -> Result<(), String>;
    fn list_keys(&self) -> Result<Vec<ApiKeyInfo>, String>;
    /// Returns false when the key is unknown.
    fn update_key_status(&self, api_key: &str, status: KeyStatus) -> Result<bool, String>;
}

pub struct InMemoryApiKeyStorage {
    keys: RwLock<HashMap<String, ApiKeyInfo>>,
}

impl InMemoryApiKeyStorage {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryApiKeyStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiKeyStorage for InMemoryApiKeyStorage {
    fn get_key_info(&self, api_key: &str) -> Result<Option<ApiKeyInfo>, String> {
        let keys = self.keys.read().map_err(|e| e.to_string())?;
        Ok(keys.get(api_key).cloned())
    }

    fn set_key_info(&self, api_key: String, info: ApiKeyInfo) -> Result<(), String> {
        let mut keys = self.keys.write().map_err(|e| e.to_string())?;
        keys.insert(api_key, info);
        Ok(())
    }

    fn list_keys(&self) -> Result<Vec<ApiKeyInfo>, String> {
        let keys = self.keys.read().map_err(|e| e.to_string())?;
        Ok(keys.values().cloned().collect())
    }

    fn update_key_status(&self, api_key: &str, status: KeyStatus) -> Result<bool, String> {
        let mut keys = self.keys.write().map_err(|e| e.to_string())?;
        match keys.get_mut(api_key) {
            Some(info) => {
                info.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
