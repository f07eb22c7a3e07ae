use crate::config::AppConfig;
use crate::storage::{MemStorage, Storage};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn Storage>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let storage = Arc::new(MemStorage::new()) as Arc<dyn Storage>;
        Ok(Self::from_parts(config, storage))
    }

    pub fn from_parts(config: Arc<AppConfig>, storage: Arc<dyn Storage>) -> Self {
        Self { config, storage }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            jwt: crate::config::JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
        });
        Self::from_parts(config, Arc::new(MemStorage::new()))
    }
}
