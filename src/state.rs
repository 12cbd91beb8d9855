use std::sync::Arc;

use crate::auth::{
    jwt::TokenService, password::CredentialHasher, repo_types::User, services::IdentityService,
};
use crate::config::AppConfig;
use crate::store::{EntityStore, SqliteStore};

#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let db = crate::db::connect(&config.database_url).await?;
        let users = Arc::new(SqliteStore::<User>::new(db)) as Arc<dyn EntityStore<User>>;
        Self::from_parts(&config, users)
    }

    pub fn from_parts(config: &AppConfig, users: Arc<dyn EntityStore<User>>) -> anyhow::Result<Self> {
        let hasher = CredentialHasher::new(&config.hash)?;
        let tokens = TokenService::from_config(&config.jwt)?;
        Ok(Self {
            identity: Arc::new(IdentityService::new(users, hasher, tokens)),
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{HashConfig, JwtConfig};
        use crate::store::MemoryStore;

        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            jwt: JwtConfig {
                secret: "test".into(),
                ttl_hours: 1,
            },
            hash: HashConfig {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
            host: "127.0.0.1".into(),
            port: 0,
        };
        let users = Arc::new(MemoryStore::<User>::new()) as Arc<dyn EntityStore<User>>;
        Self::from_parts(&config, users).expect("fake state")
    }
}
