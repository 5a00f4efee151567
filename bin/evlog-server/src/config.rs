//! Server configuration, loaded from environment variables at startup.

/// Runtime configuration for evlog-server.
///
/// Every field has a default so the server runs without any environment
/// variables set: port 8080 on all interfaces, `events.db` in the working
/// directory, wildcard CORS.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8080"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://events.db"`). The file is
    /// created if it does not exist; use `"sqlite::memory:"` for tests.
    pub database_url: String,

    /// Upper bound on pooled SQLite connections.
    pub database_max_connections: u32,

    /// Comma-separated list of allowed CORS origins. `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// `tracing` filter string, e.g. `"info"` or `"debug,sqlx=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        Self {
            bind_address: var("EVLOG_BIND", "0.0.0.0:8080"),
            database_url: var("EVLOG_DATABASE_URL", "sqlite://events.db"),
            database_max_connections: lookup("EVLOG_DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(5),
            cors_allowed_origins: lookup("EVLOG_CORS_ORIGINS").filter(|v| !v.trim().is_empty()),
            log_level: var("EVLOG_LOG", "info"),
            log_json: lookup("EVLOG_LOG_JSON")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_match_fixed_deployment() {
        let cfg = Config::default();
        assert_eq!(cfg.bind_address, "0.0.0.0:8080");
        assert_eq!(cfg.database_url, "sqlite://events.db");
        assert_eq!(cfg.database_max_connections, 5);
        assert!(cfg.cors_allowed_origins.is_none());
        assert!(!cfg.log_json);
    }

    #[test]
    fn env_overrides_are_applied() {
        let cfg = from_pairs(&[
            ("EVLOG_BIND", "127.0.0.1:9000"),
            ("EVLOG_DB_MAX_CONNECTIONS", "2"),
            ("EVLOG_CORS_ORIGINS", "http://localhost:3000"),
            ("EVLOG_LOG_JSON", "TRUE"),
        ]);
        assert_eq!(cfg.bind_address, "127.0.0.1:9000");
        assert_eq!(cfg.database_max_connections, 2);
        assert_eq!(cfg.cors_allowed_origins.as_deref(), Some("http://localhost:3000"));
        assert!(cfg.log_json);
    }

    #[test]
    fn invalid_pool_size_falls_back() {
        assert_eq!(from_pairs(&[("EVLOG_DB_MAX_CONNECTIONS", "0")]).database_max_connections, 5);
        assert_eq!(from_pairs(&[("EVLOG_DB_MAX_CONNECTIONS", "lots")]).database_max_connections, 5);
    }

    #[test]
    fn blank_cors_origins_means_any() {
        assert!(from_pairs(&[("EVLOG_CORS_ORIGINS", "  ")]).cors_allowed_origins.is_none());
    }
}
