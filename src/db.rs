use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::{config::AppConfig, error::AppResult};

/// Create a SeaORM connection pool.
pub async fn create_orm_conn(config: &AppConfig) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .sqlx_logging(config.sql_logging);

    let conn = Database::connect(options).await?;
    tracing::info!(
        max_connections = config.max_connections,
        "database connection pool ready"
    );
    Ok(conn)
}

/// Double-quotes an identifier for PostgreSQL.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub(crate) fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("Categories"), r#""Categories""#);
        assert_eq!(quote_ident(r#"odd"name"#), r#""odd""name""#);
        assert_eq!(qualified("public", "Orders"), r#""public"."Orders""#);
    }
}
