use std::{env, path::PathBuf, time::Duration};

use anyhow::Context;

use crate::{
    error::AppResult,
    mapping::{NamingScheme, SchemaMapping},
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub sql_logging: bool,
    pub mapping_file: Option<PathBuf>,
    pub naming: NamingScheme,
    pub schema: String,
}

impl AppConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(8),
            sql_logging: false,
            mapping_file: None,
            naming: NamingScheme::default(),
            schema: "public".to_string(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let mut config = Self::new(database_url);

        if let Some(max) = parse_env("DB_MAX_CONNECTIONS") {
            config.max_connections = max;
        }
        if let Some(min) = parse_env("DB_MIN_CONNECTIONS") {
            config.min_connections = min;
        }
        if let Some(secs) = parse_env("DB_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(logging) = parse_env("DB_SQL_LOGGING") {
            config.sql_logging = logging;
        }
        config.mapping_file = env::var("STORE_MAPPING_FILE").ok().map(PathBuf::from);
        if let Ok(naming) = env::var("STORE_NAMING") {
            config.naming = naming.parse()?;
        }
        if let Ok(schema) = env::var("STORE_SCHEMA") {
            config.schema = schema;
        }
        Ok(config)
    }

    /// The mapping file when one is configured, otherwise the named preset.
    pub fn mapping(&self) -> AppResult<SchemaMapping> {
        let mapping = match &self.mapping_file {
            Some(path) => SchemaMapping::from_file(path)?,
            None => SchemaMapping::preset(self.naming, self.schema.clone()),
        };
        mapping.validate()?;
        Ok(mapping)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
