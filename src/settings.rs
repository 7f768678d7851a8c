//! Server configuration
//!
//! Read once at startup from the environment. A bad value is a configuration
//! error and aborts startup; nothing here is reloaded at runtime.

use std::path::PathBuf;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;
/// JSONL log file name under the app root
pub const LOG_FILE_NAME: &str = "game-log.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid PORT {0:?}")]
    InvalidPort(String),

    #[error("DATABASE_URL must be set in production")]
    MissingDatabaseUrl,
}

/// Where ingested events go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Append to a JSONL file (development)
    Jsonl(PathBuf),
    /// Insert into Postgres (production)
    Postgres(String),
}

/// Log relay / static server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub port: u16,
    pub production: bool,
    pub database_url: Option<String>,
    /// Static files are served from here
    pub root: PathBuf,
    /// JSONL sink in development
    pub log_file: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let root = PathBuf::from(".");
        Self {
            port: DEFAULT_PORT,
            production: false,
            database_url: None,
            log_file: root.join(LOG_FILE_NAME),
            root,
        }
    }
}

impl ServerSettings {
    /// Load settings from environment variables
    ///
    /// - `PORT`: listen port (default 8000)
    /// - `NODE_ENV` / `APP_ENV`: `production` enables production mode
    /// - `DATABASE_URL`: required in production
    /// - `APP_ROOT`: static file root (default `.`)
    /// - `LOG_FILE`: development JSONL sink (default `<root>/game-log.jsonl`)
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| SettingsError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        let production = get("NODE_ENV")
            .or_else(|| get("APP_ENV"))
            .is_some_and(|env| env.trim().eq_ignore_ascii_case("production"));

        let database_url = get("DATABASE_URL");
        if production && database_url.is_none() {
            return Err(SettingsError::MissingDatabaseUrl);
        }

        let root = get("APP_ROOT").map_or_else(|| PathBuf::from("."), PathBuf::from);
        let log_file = get("LOG_FILE").map_or_else(|| root.join(LOG_FILE_NAME), PathBuf::from);

        Ok(Self {
            port,
            production,
            database_url,
            root,
            log_file,
        })
    }

    /// Postgres in production, JSONL otherwise
    pub fn backend(&self) -> StoreBackend {
        match (&self.database_url, self.production) {
            (Some(url), true) => StoreBackend::Postgres(url.clone()),
            _ => StoreBackend::Jsonl(self.log_file.clone()),
        }
    }
}
