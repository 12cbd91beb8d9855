use anyhow::Context;
use serde::Deserialize;

/// Longest token lifetime accepted from the environment: 100 years.
pub const MAX_TTL_HOURS: i64 = 100 * 366 * 24;

#[derive(Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

/// Argon2 work factor for new password hashes.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let secret = get("JWT_SECRET").unwrap_or_default();
        anyhow::ensure!(!secret.is_empty(), "JWT_SECRET must be set");

        let ttl_hours = match get("JWT_TTL_HOURS") {
            Some(v) => v.parse::<i64>().context("JWT_TTL_HOURS must be an integer")?,
            None => 72,
        };
        anyhow::ensure!(ttl_hours > 0, "JWT_TTL_HOURS must be positive");
        anyhow::ensure!(
            ttl_hours.checked_mul(3600).is_some() && ttl_hours <= MAX_TTL_HOURS,
            "JWT_TTL_HOURS must be at most {MAX_TTL_HOURS}"
        );

        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: parse_or(&get, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&get, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&get, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        Ok(Self {
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://food.db?mode=rwc".into()),
            jwt: JwtConfig { secret, ttl_hours },
            hash,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&get, "APP_PORT", 3000)?,
        })
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(v) => v.parse().with_context(|| format!("{key} is not valid")),
        None => Ok(default),
    }
}
