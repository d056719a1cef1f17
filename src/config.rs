use anyhow::{bail, Context, Result};

pub const DEFAULT_OWNER: &str = "ESP32_User";

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    /// Owner recorded for devices that register without one.
    pub default_owner: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let db_max_connections: u32 = get("DB_MAX_CONNECTIONS", "10")
            .parse()
            .context("DB_MAX_CONNECTIONS must be a positive integer")?;
        if db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be a positive integer");
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            db_max_connections,
            server_host: get("SERVER_HOST", "0.0.0.0"),
            server_port: get("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            default_owner: get("DEFAULT_OWNER", DEFAULT_OWNER),
        })
    }
}
