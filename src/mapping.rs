//! Entity, field and schema names as configuration data.
//!
//! Every statement the store issues resolves its table and column identifiers
//! through a [`SchemaMapping`], so renaming tables or columns between
//! environments is a configuration change.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    entity::EntityKind,
    error::{AppError, AppResult},
};

/// PostgreSQL truncates identifiers longer than this.
const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingScheme {
    /// `categories.category_id`, `order_details.unit_price`
    #[default]
    SnakeCase,
    /// `"Categories"."CategoryId"`, `"OrderDetails"."UnitPrice"`
    PascalCase,
}

impl NamingScheme {
    fn name(self, snake: &str) -> String {
        match self {
            NamingScheme::SnakeCase => snake.to_string(),
            NamingScheme::PascalCase => to_pascal(snake),
        }
    }
}

impl FromStr for NamingScheme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snake" | "snake_case" => Ok(NamingScheme::SnakeCase),
            "pascal" | "pascal_case" => Ok(NamingScheme::PascalCase),
            other => Err(AppError::Mapping(format!("unknown naming scheme `{other}`"))),
        }
    }
}

fn to_pascal(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMapping {
    pub table: String,
    /// field key -> column name
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
}

impl TableMapping {
    /// Column for a field key; unmapped fields use the key itself.
    pub fn column<'a>(&'a self, field: &'a str) -> &'a str {
        self.columns.get(field).map(String::as_str).unwrap_or(field)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaMapping {
    pub schema: String,
    tables: BTreeMap<EntityKind, TableMapping>,
}

impl SchemaMapping {
    pub fn preset(scheme: NamingScheme, schema: impl Into<String>) -> Self {
        let tables = EntityKind::ALL
            .iter()
            .map(|&kind| {
                let columns = kind
                    .field_keys()
                    .into_iter()
                    .map(|key| (key.to_string(), scheme.name(key)))
                    .collect();
                let table = TableMapping {
                    table: scheme.name(kind.collection()),
                    columns,
                };
                (kind, table)
            })
            .collect();
        Self {
            schema: schema.into(),
            tables,
        }
    }

    /// Loads a mapping file (TOML, JSON or YAML, by extension).
    ///
    /// ```toml
    /// naming = "pascal_case"
    /// schema = "bobsusedbookstore_dbo"
    ///
    /// [tables.order_details]
    /// table = "orderdetails"
    /// ```
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let file: MappingFile = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .and_then(|cfg| cfg.try_deserialize())
            .map_err(|e| AppError::Mapping(format!("{}: {e}", path.display())))?;
        let mapping = file.into_mapping()?;
        tracing::debug!(path = %path.display(), schema = %mapping.schema, "loaded schema mapping");
        Ok(mapping)
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn table(&self, kind: EntityKind) -> &TableMapping {
        // `preset` fills every kind and nothing removes entries.
        &self.tables[&kind]
    }

    pub fn set_table(&mut self, kind: EntityKind, table: TableMapping) {
        self.tables.insert(kind, table);
    }

    pub fn column(&self, kind: EntityKind, field: &'static str) -> &str {
        self.table(kind).column(field)
    }

    pub fn validate(&self) -> AppResult<()> {
        check_identifier("schema", &self.schema)?;

        let mut seen_tables = BTreeSet::new();
        for kind in EntityKind::ALL {
            let table = self.table(kind);
            check_identifier(kind.collection(), &table.table)?;
            if !seen_tables.insert(table.table.as_str()) {
                return Err(AppError::Mapping(format!(
                    "table `{}` is mapped by more than one entity",
                    table.table
                )));
            }

            let known = kind.field_keys();
            if let Some(unknown) = table.columns.keys().find(|k| !known.contains(&k.as_str())) {
                return Err(AppError::Mapping(format!(
                    "{} has no field `{unknown}`",
                    kind.collection()
                )));
            }

            let mut seen_columns = BTreeSet::new();
            for key in known {
                let column = table.column(key);
                check_identifier(key, column)?;
                if !seen_columns.insert(column) {
                    return Err(AppError::Mapping(format!(
                        "{}: column `{column}` is mapped by more than one field",
                        kind.collection()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for SchemaMapping {
    fn default() -> Self {
        Self::preset(NamingScheme::SnakeCase, "public")
    }
}

fn check_identifier(what: &str, ident: &str) -> AppResult<()> {
    if ident.trim().is_empty() {
        return Err(AppError::Mapping(format!("{what}: empty identifier")));
    }
    if ident.len() > MAX_IDENTIFIER_LEN {
        return Err(AppError::Mapping(format!(
            "{what}: identifier `{ident}` exceeds {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    naming: NamingScheme,
    schema: Option<String>,
    #[serde(default)]
    tables: TableOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct TableOverrides {
    categories: Option<TableOverride>,
    products: Option<TableOverride>,
    carts: Option<TableOverride>,
    orders: Option<TableOverride>,
    order_details: Option<TableOverride>,
}

#[derive(Debug, Deserialize)]
struct TableOverride {
    table: Option<String>,
    #[serde(default)]
    columns: BTreeMap<String, String>,
}

impl MappingFile {
    fn into_mapping(self) -> AppResult<SchemaMapping> {
        let mut mapping =
            SchemaMapping::preset(self.naming, self.schema.unwrap_or_else(|| "public".into()));
        let overrides = [
            (EntityKind::Category, self.tables.categories),
            (EntityKind::Product, self.tables.products),
            (EntityKind::Cart, self.tables.carts),
            (EntityKind::Order, self.tables.orders),
            (EntityKind::OrderDetail, self.tables.order_details),
        ];
        for (kind, table_override) in overrides {
            let Some(table_override) = table_override else {
                continue;
            };
            let mut table = mapping.table(kind).clone();
            if let Some(name) = table_override.table {
                table.table = name;
            }
            table.columns.extend(table_override.columns);
            mapping.set_table(kind, table);
        }
        mapping.validate()?;
        Ok(mapping)
    }
}
