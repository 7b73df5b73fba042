//! Runtime settings from the environment (a `.env` file is honoured).

use crate::error::ConfigError;
use crate::schema::is_valid_identifier;
use std::collections::HashMap;
use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    /// PostgreSQL schema holding the tables and enum types.
    pub schema: String,
    pub bind_addr: SocketAddr,
    pub run_migrations: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/photo_orders".into(),
            max_connections: 5,
            schema: "public".into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            run_migrations: true,
        }
    }
}

impl Settings {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut s = Settings::default();
        if let Some(url) = vars.get("DATABASE_URL") {
            s.database_url = url.clone();
        }
        if let Some(n) = vars.get("DATABASE_MAX_CONNECTIONS") {
            s.max_connections = n
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| invalid("DATABASE_MAX_CONNECTIONS", n))?;
        }
        if let Some(schema) = vars.get("PHOTO_ORDERS_SCHEMA") {
            if !is_valid_identifier(schema) {
                return Err(invalid("PHOTO_ORDERS_SCHEMA", schema));
            }
            s.schema = schema.clone();
        }
        if let Some(addr) = vars.get("BIND_ADDR") {
            s.bind_addr = addr.parse().map_err(|_| invalid("BIND_ADDR", addr))?;
        }
        if let Some(flag) = vars.get("RUN_MIGRATIONS") {
            s.run_migrations = match flag.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid("RUN_MIGRATIONS", flag)),
            };
        }
        Ok(s)
    }
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::Validation(format!("invalid {}: '{}'", var, value))
}
