use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub site: SiteConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub session_cookie: String,
    pub login_url: String,
    pub cors_origins: Vec<String>,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
    pub central_contact_email: String,
    pub wiki_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Device identifier this server presents when opening peer sessions.
    pub device_id: String,
    pub client_version: String,
    pub peer_timeout_secs: u64,
}

/// Partial config read from the optional YAML file. Every section is optional
/// so a file only needs to name what it changes.
#[derive(Debug, Default, Deserialize)]
struct FileOverrides {
    server: Option<ServerConfig>,
    database: Option<DatabaseConfig>,
    security: Option<SecurityConfig>,
    site: Option<SiteConfig>,
    sync: Option<SyncConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let base = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };

        let base = match env::var("CENTRAL_CONFIG") {
            Ok(path) => match base.clone().with_file(Path::new(&path)) {
                Ok(config) => config,
                Err(e) => {
                    // Tracing may not be initialised yet; stderr is the only sure channel.
                    eprintln!("ignoring config file: {e}");
                    base
                }
            },
            Err(_) => base,
        };

        base.with_env_overrides()
    }

    /// Layer a YAML file over the profile defaults.
    pub fn with_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let overrides: FileOverrides =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        if let Some(server) = overrides.server {
            self.server = server;
        }
        if let Some(database) = overrides.database {
            self.database = database;
        }
        if let Some(security) = overrides.security {
            self.security = security;
        }
        if let Some(site) = overrides.site {
            self.site = site;
        }
        if let Some(sync) = overrides.sync {
            self.sync = sync;
        }
        Ok(self)
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("CENTRAL_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(port) = env::var("CENTRAL_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_LOGIN_URL") {
            self.security.login_url = v;
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Site overrides
        if let Ok(v) = env::var("CENTRAL_BASE_URL") {
            self.site.base_url = v;
        }
        if let Ok(v) = env::var("CENTRAL_CONTACT_EMAIL") {
            self.site.central_contact_email = v;
        }
        if let Ok(v) = env::var("CENTRAL_WIKI_URL") {
            self.site.wiki_url = v;
        }

        // Sync overrides
        if let Ok(v) = env::var("SYNC_DEVICE_ID") {
            self.sync.device_id = v;
        }
        if let Ok(v) = env::var("SYNC_PEER_TIMEOUT_SECS") {
            self.sync.peer_timeout_secs = v.parse().unwrap_or(self.sync.peer_timeout_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: "development-only-secret".to_string(),
                jwt_expiry_hours: 24 * 7,
                session_cookie: "central_session".to_string(),
                login_url: "/accounts/login/".to_string(),
                cors_origins: vec!["http://localhost:8000".to_string()],
                secure_cookies: false,
            },
            site: SiteConfig {
                base_url: "http://localhost:8000".to_string(),
                central_contact_email: "info@localhost".to_string(),
                wiki_url: "http://localhost:8000/wiki/".to_string(),
            },
            sync: SyncConfig {
                device_id: "central-development".to_string(),
                client_version: env!("CARGO_PKG_VERSION").to_string(),
                peer_timeout_secs: 10,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.server.bind_address = "0.0.0.0".to_string();
        config.database.max_connections = 10;
        config.database.connection_timeout = 10;
        config.security.jwt_secret = String::new();
        config.security.jwt_expiry_hours = 24;
        config.security.secure_cookies = true;
        config.security.cors_origins = vec![];
        config.site.base_url = "https://staging.example.org".to_string();
        config.sync.device_id = "central-staging".to_string();
        config.sync.peer_timeout_secs = 5;
        config
    }

    fn production() -> Self {
        let mut config = Self::staging();
        config.environment = Environment::Production;
        config.database.max_connections = 25;
        config.database.connection_timeout = 5;
        config.database.run_migrations = false;
        config.security.jwt_expiry_hours = 8;
        config.site.base_url = "https://central.example.org".to_string();
        config.sync.device_id = "central".to_string();
        config
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.security.jwt_secret.is_empty());
        assert!(config.database.run_migrations);
        assert_eq!(config.security.login_url, "/accounts/login/");
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty(), "production must bring its own secret");
        assert!(config.security.secure_cookies);
        assert!(!config.database.run_migrations);
    }

    #[test]
    fn test_yaml_file_replaces_named_sections_only() {
        let path = std::env::temp_dir().join(format!("central-config-{}.yaml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "site:\n  base_url: https://central.test\n  central_contact_email: team@central.test\n  wiki_url: https://wiki.central.test/"
        )
        .unwrap();

        let config = AppConfig::development().with_file(&path).unwrap();
        assert_eq!(config.site.central_contact_email, "team@central.test");
        assert_eq!(config.server.port, 8000);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = AppConfig::development()
            .with_file(Path::new("/nonexistent/central.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
