use sea_orm::{FromQueryResult, Value};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ColumnKind, ColumnSpec, EntityKind, FieldName, Record, required};

#[derive(Clone, Debug, PartialEq, FromQueryResult, Serialize, Deserialize, Validate)]
pub struct Category {
    pub category_id: i32,
    #[validate(custom = "required")]
    pub name: String,
    pub description: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            category_id: 0,
            name: name.into(),
            description,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    CategoryId,
    Name,
    Description,
}

impl FieldName for Field {
    const ALL: &'static [Self] = &[Field::CategoryId, Field::Name, Field::Description];

    fn key(self) -> &'static str {
        match self {
            Field::CategoryId => "category_id",
            Field::Name => "name",
            Field::Description => "description",
        }
    }

    fn spec(self) -> ColumnSpec {
        match self {
            Field::CategoryId => ColumnSpec::key(),
            Field::Name => ColumnSpec::required(ColumnKind::Text),
            Field::Description => ColumnSpec::optional(ColumnKind::Text),
        }
    }
}

impl Record for Category {
    type Field = Field;

    const KIND: EntityKind = EntityKind::Category;
    const KEY: Field = Field::CategoryId;

    fn key(&self) -> i32 {
        self.category_id
    }

    fn set_key(&mut self, key: i32) {
        self.category_id = key;
    }

    fn values(&self) -> Vec<(Field, Value)> {
        vec![
            (Field::Name, self.name.clone().into()),
            (Field::Description, self.description.clone().into()),
        ]
    }
}
