use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::controller::collection::DEFAULT_PAGE_SIZE;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Surreal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurrealConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for SurrealConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000".into(),
            namespace: "movie_reporter".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl SurrealConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("SURREAL_ENDPOINT").unwrap_or(defaults.endpoint),
            namespace: env::var("SURREAL_NAMESPACE").unwrap_or(defaults.namespace),
            database: env::var("SURREAL_DATABASE").unwrap_or(defaults.database),
            username: env::var("SURREAL_USER").unwrap_or(defaults.username),
            password: env::var("SURREAL_PASS").unwrap_or(defaults.password),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeaheadConfig {
    /// Queries shorter than this many characters never reach the store.
    pub min_chars: usize,
    pub limit: usize,
    /// Minimum spacing between two issued queries.
    pub cooldown: Duration,
}

impl Default for TypeaheadConfig {
    fn default() -> Self {
        Self {
            min_chars: 2,
            limit: 5,
            cooldown: Duration::from_millis(250),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub backend: StoreBackend,
    pub surreal: SurrealConfig,
    pub page_size: usize,
    pub typeahead: TypeaheadConfig,
    pub jwt_secret: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            backend: StoreBackend::Memory,
            surreal: SurrealConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
            typeahead: TypeaheadConfig::default(),
            jwt_secret: None,
        }
    }
}

impl AppConfig {
    /// Reads the process environment. Malformed values are logged and replaced by their
    /// defaults rather than aborting startup.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let backend = match env::var("STORE_BACKEND").ok().as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("surreal") => StoreBackend::Surreal,
            Some(other) => {
                warn!(value = other, "unknown STORE_BACKEND, using memory");
                StoreBackend::Memory
            }
        };
        let typeahead = TypeaheadConfig {
            min_chars: parse_or("TYPEAHEAD_MIN_CHARS", defaults.typeahead.min_chars),
            limit: parse_or("TYPEAHEAD_LIMIT", defaults.typeahead.limit),
            cooldown: Duration::from_millis(parse_or(
                "TYPEAHEAD_COOLDOWN_MS",
                defaults.typeahead.cooldown.as_millis() as u64,
            )),
        };
        Self {
            bind_addr: parse_or("BIND_ADDR", defaults.bind_addr),
            backend,
            surreal: SurrealConfig::from_env(),
            page_size: parse_or("PAGE_SIZE", defaults.page_size).max(1),
            typeahead,
            jwt_secret: env::var("JWT_SECRET").ok().filter(|secret| !secret.is_empty()),
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, ?default, "invalid value, using default");
            default
        }),
        Err(_) => default,
    }
}
