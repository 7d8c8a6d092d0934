pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod normalize;
pub mod schema;
pub mod seed;
pub mod store;

pub use crate::config::AppConfig;
pub use error::{AppError, AppResult};
pub use mapping::{NamingScheme, SchemaMapping};
pub use seed::{SeedReport, ensure_schema_and_seed};
pub use store::Store;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber: `RUST_LOG` when set, otherwise info with crate debug.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gadgets_store=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
