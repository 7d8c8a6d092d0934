use std::path::PathBuf;

use clap::Parser;
use gadgets_store::{AppConfig, SchemaMapping, Store, init_tracing, schema};

/// Moves existing tables from an older layout to the configured mapping.
#[derive(Debug, Parser)]
#[command(name = "migrate")]
struct Args {
    /// Mapping file describing the layout currently in the database.
    #[arg(long)]
    from: Option<PathBuf>,

    /// Print the planned steps without touching the database.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = AppConfig::from_env()?;
    let mapping = config.mapping()?;
    let from = args.from.map(SchemaMapping::from_file).transpose()?;

    if args.dry_run {
        if let Some(from) = &from {
            let steps = schema::plan_migration(from, &mapping);
            println!("{}", serde_json::to_string_pretty(&steps)?);
        }
        for sql in schema::schema_statements(&mapping) {
            println!("{sql};");
        }
        return Ok(());
    }

    let store = Store::connect(&config).await?;
    let Some(from) = from else {
        schema::ensure_schema(store.connection(), store.mapping()).await?;
        println!("Schema ensured");
        return Ok(());
    };

    let txn = store.begin().await?;
    let report = schema::migrate_mapping(txn.connection(), &from, txn.mapping()).await?;
    schema::ensure_schema(txn.connection(), txn.mapping()).await?;
    txn.commit().await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
