use gadgets_store::{AppConfig, Store, ensure_schema_and_seed, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let store = Store::connect(&config).await?;
    let report = ensure_schema_and_seed(&store).await?;

    if report.seeded {
        println!(
            "Seeded {} categories and {} products",
            report.categories_inserted, report.products_inserted
        );
    } else {
        println!("Catalog already present, nothing seeded");
    }
    for (kind, next) in &report.next_keys {
        println!("  next {} key: {next}", kind.collection());
    }
    Ok(())
}
