//! Typed, validated, immutable application configuration (spec.md §4.1).
//!
//! `AppConfig` holds five sections: `vector_db`, `cache`, `embedding`,
//! `performance`, `security`. Construction takes optional `ConfigOverrides`,
//! recursively merges per-section over defaults, then runs a single
//! `validate()` pass that returns the *first* failing rule as
//! `ConfigError::InvalidConfiguration`.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorDbConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub dimension: usize,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            url: "memory://local".to_string(),
            api_key: None,
            collection: "agentmem".to_string(),
            dimension: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub url: String,
    pub secret: Option<String>,
    pub db: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            secret: None,
            db: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "local-mock-embed".to_string(),
            api_key: None,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceConfig {
    pub max_query_time_ms: u64,
    pub cache_ttl_seconds: u64,
    pub batch_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_query_time_ms: 5000,
            cache_ttl_seconds: 60,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityConfig {
    pub encryption_key: String,
    pub tenant_isolation: bool,
    pub audit_logs: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            // 32 placeholder bytes: satisfies the length rule for local/dev
            // use. Production deployments must override via config or
            // MEMORY_ENCRYPTION_KEY.
            encryption_key: "0".repeat(32),
            tenant_isolation: true,
            audit_logs: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub vector_db: VectorDbConfig,
    pub cache: CacheConfig,
    pub embedding: EmbeddingConfig,
    pub performance: PerformanceConfig,
    pub security: SecurityConfig,
}

/// All-`Option` mirror of [`AppConfig`] used for layered overrides. Every
/// field left `None` falls through to the existing value during merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    pub vector_db_url: Option<String>,
    pub vector_db_api_key: Option<String>,
    pub vector_db_collection: Option<String>,
    pub vector_db_dimension: Option<usize>,
    pub cache_url: Option<String>,
    pub cache_secret: Option<String>,
    pub cache_db: Option<u32>,
    pub embedding_provider: Option<String>,
    pub embedding_model: Option<String>,
    pub embedding_api_key: Option<String>,
    pub embedding_endpoint: Option<String>,
    pub max_query_time_ms: Option<u64>,
    pub cache_ttl_seconds: Option<u64>,
    pub batch_size: Option<usize>,
    pub encryption_key: Option<String>,
    pub tenant_isolation: Option<bool>,
    pub audit_logs: Option<bool>,
}

const ALLOWED_EMBEDDING_PROVIDERS: &[&str] = &["remote", "local", "mock"];
const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https"];
const ALLOWED_CACHE_SCHEMES: &[&str] = &["redis", "rediss", "http", "https"];

impl AppConfig {
    /// Merge `overrides` onto `AppConfig::default()`, then validate. Returns
    /// the first failing rule, per spec.md §4.1.
    pub fn new(overrides: Option<ConfigOverrides>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, o: ConfigOverrides) {
        if let Some(v) = o.vector_db_url {
            self.vector_db.url = v;
        }
        if let Some(v) = o.vector_db_api_key {
            self.vector_db.api_key = Some(v);
        }
        if let Some(v) = o.vector_db_collection {
            self.vector_db.collection = v;
        }
        if let Some(v) = o.vector_db_dimension {
            self.vector_db.dimension = v;
        }
        if let Some(v) = o.cache_url {
            self.cache.url = v;
        }
        if let Some(v) = o.cache_secret {
            self.cache.secret = Some(v);
        }
        if let Some(v) = o.cache_db {
            self.cache.db = v;
        }
        if let Some(v) = o.embedding_provider {
            self.embedding.provider = v;
        }
        if let Some(v) = o.embedding_model {
            self.embedding.model = v;
        }
        if let Some(v) = o.embedding_api_key {
            self.embedding.api_key = Some(v);
        }
        if let Some(v) = o.embedding_endpoint {
            self.embedding.endpoint = Some(v);
        }
        if let Some(v) = o.max_query_time_ms {
            self.performance.max_query_time_ms = v;
        }
        if let Some(v) = o.cache_ttl_seconds {
            self.performance.cache_ttl_seconds = v;
        }
        if let Some(v) = o.batch_size {
            self.performance.batch_size = v;
        }
        if let Some(v) = o.encryption_key {
            self.security.encryption_key = v;
        }
        if let Some(v) = o.tenant_isolation {
            self.security.tenant_isolation = v;
        }
        if let Some(v) = o.audit_logs {
            self.security.audit_logs = v;
        }
    }

    /// Build overrides from the environment variables listed in spec.md §6,
    /// then construct. `MEMORY_ENCRYPTION_KEY` is required by that table but
    /// callers may still satisfy it via `overrides` instead of the process
    /// environment.
    pub fn from_env(overrides: Option<ConfigOverrides>) -> Result<Self, ConfigError> {
        let mut merged = overrides.unwrap_or_default();
        if merged.vector_db_url.is_none() {
            merged.vector_db_url = env::var("VECTOR_DB_URL").ok();
        }
        if merged.vector_db_api_key.is_none() {
            merged.vector_db_api_key = env::var("VECTOR_DB_API_KEY").ok();
        }
        if merged.cache_url.is_none() {
            merged.cache_url = env::var("CACHE_URL").ok();
        }
        if merged.cache_secret.is_none() {
            merged.cache_secret = env::var("CACHE_SECRET").ok();
        }
        if merged.embedding_api_key.is_none() {
            merged.embedding_api_key = env::var("EMBEDDING_API_KEY").ok();
        }
        if merged.embedding_endpoint.is_none() {
            merged.embedding_endpoint = env::var("EMBEDDING_ENDPOINT").ok();
        }
        if merged.encryption_key.is_none() {
            merged.encryption_key = env::var("MEMORY_ENCRYPTION_KEY").ok();
        }
        Self::new(Some(merged))
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidConfiguration(format!("reading config file: {e}")))?;
        let overrides: ConfigOverrides = toml::from_str(&raw)
            .map_err(|e| ConfigError::InvalidConfiguration(format!("parsing config file: {e}")))?;
        Self::new(Some(overrides))
    }

    /// Returns the *first* failing rule, matching spec.md's "single
    /// `InvalidConfiguration(reason)` error enumerating the first failed
    /// rule".
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.encryption_key.len() < 32 {
            return Err(ConfigError::InvalidConfiguration(
                "security.encryption_key must be at least 32 characters".to_string(),
            ));
        }
        if !USE_IN_MEMORY_HEURISTIC.is_match(&self.vector_db.url) {
            validate_url_scheme(&self.vector_db.url, ALLOWED_URL_SCHEMES, "vector_db.url")?;
        }
        validate_url_scheme(&self.cache.url, ALLOWED_CACHE_SCHEMES, "cache.url")?;
        if !ALLOWED_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "embedding.provider must be one of {ALLOWED_EMBEDDING_PROVIDERS:?}, got {:?}",
                self.embedding.provider
            )));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "embedding.model must not be empty".to_string(),
            ));
        }
        if self.performance.max_query_time_ms == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "performance.max_query_time_ms must be > 0".to_string(),
            ));
        }
        if self.performance.batch_size == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "performance.batch_size must be > 0".to_string(),
            ));
        }
        if self.vector_db.dimension == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "vector_db.dimension must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Explicit switch for the in-process vector-store back-end (spec.md §9
    /// Open Question: made explicit rather than inferred from the URL).
    pub fn use_in_memory_vector_store(&self) -> bool {
        USE_IN_MEMORY_HEURISTIC.is_match(&self.vector_db.url)
            || env::var("USE_IN_MEMORY_STORE")
                .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false)
    }
}

struct InMemoryUrlHeuristic;

impl InMemoryUrlHeuristic {
    fn is_match(&self, url: &str) -> bool {
        url.starts_with("memory://")
    }
}

static USE_IN_MEMORY_HEURISTIC: InMemoryUrlHeuristic = InMemoryUrlHeuristic;

fn validate_url_scheme(url: &str, allowed: &[&str], field: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url)
        .map_err(|e| ConfigError::InvalidConfiguration(format!("{field} is not a valid URL: {e}")))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{field} must have a valid hostname"
        )));
    }
    if !allowed.contains(&parsed.scheme()) {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{field} scheme must be one of {allowed:?}, got {:?}",
            parsed.scheme()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_overrides() -> ConfigOverrides {
        ConfigOverrides {
            vector_db_url: Some("https://vectors.example.com".to_string()),
            cache_url: Some("redis://cache.example.com".to_string()),
            encryption_key: Some("a".repeat(32)),
            ..Default::default()
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_short_encryption_key() {
        let overrides = ConfigOverrides {
            encryption_key: Some("short".to_string()),
            ..valid_overrides()
        };
        let err = AppConfig::new(Some(overrides)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration(msg) if msg.contains("encryption_key")));
    }

    #[test]
    fn rejects_invalid_vector_db_scheme() {
        let overrides = ConfigOverrides {
            vector_db_url: Some("ftp://vectors.example.com".to_string()),
            ..valid_overrides()
        };
        let err = AppConfig::new(Some(overrides)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration(msg) if msg.contains("vector_db.url")));
    }

    #[test]
    fn rejects_empty_vector_db_url_rather_than_defaulting_to_in_memory() {
        let overrides = ConfigOverrides {
            vector_db_url: Some(String::new()),
            ..valid_overrides()
        };
        let err = AppConfig::new(Some(overrides)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration(msg) if msg.contains("vector_db.url")));
    }

    #[test]
    fn rejects_unknown_embedding_provider() {
        let overrides = ConfigOverrides {
            embedding_provider: Some("carrier-pigeon".to_string()),
            ..valid_overrides()
        };
        let err = AppConfig::new(Some(overrides)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration(msg) if msg.contains("embedding.provider")));
    }

    #[test]
    fn memory_url_skips_scheme_validation() {
        let overrides = ConfigOverrides {
            vector_db_url: Some("memory://local".to_string()),
            cache_url: Some("redis://cache.example.com".to_string()),
            encryption_key: Some("a".repeat(32)),
            ..Default::default()
        };
        let config = AppConfig::new(Some(overrides)).unwrap();
        assert!(config.use_in_memory_vector_store());
    }

    #[test]
    fn accessors_return_independent_copies() {
        let config = AppConfig::new(Some(valid_overrides())).unwrap();
        let mut copy = config.clone();
        copy.vector_db.url = "https://changed.example.com".to_string();
        assert_ne!(copy.vector_db.url, config.vector_db.url);
    }

    #[test]
    fn load_from_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let overrides = valid_overrides();
        std::fs::write(&path, toml::to_string(&overrides).unwrap()).unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.vector_db.url, "https://vectors.example.com");
    }
}
