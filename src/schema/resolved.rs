//! Resolved model: schema validated and flattened for runtime use.

use crate::schema::ValidationRule;
use std::collections::{HashMap, HashSet};

/// Direction of a related-include: to_one (we hold the FK, or they hold a unique FK to us) or to_many.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IncludeDirection {
    ToOne,
    ToMany,
}

/// A relation reachable from an entity, usable in `include` and in relation filters.
#[derive(Clone, Debug)]
pub struct IncludeSpec {
    pub name: String,
    pub direction: IncludeDirection,
    /// Model name of the related entity.
    pub related_model: String,
    /// Our column used in the join (our FK for forward relations; our key for reverse ones).
    pub our_key_column: String,
    /// Their column used in the join.
    pub their_key_column: String,
}

/// Value class of a column, used for request validation and bind casts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Bool,
    Int,
    BigInt,
    Decimal,
    Float,
    Timestamp,
    Date,
    Uuid,
    Json,
    Enum,
}

impl ColumnKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Int | ColumnKind::BigInt | ColumnKind::Decimal | ColumnKind::Float)
    }

    /// Columns read back as text so the row decoder keeps their exact representation.
    pub fn select_as_text(self) -> bool {
        matches!(self, ColumnKind::Decimal | ColumnKind::Enum)
    }
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    /// PostgreSQL type used in `$n::type` casts; enums are schema-qualified and quoted.
    pub pg_type: String,
    pub nullable: bool,
    /// Whether the column has a DB default (e.g. gen_random_uuid(), NOW()).
    pub has_default: bool,
    pub is_pk: bool,
    /// Touched with NOW() on every update.
    pub auto_updated: bool,
    /// Allowed literals for enum columns.
    pub enum_values: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub model: String,
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: Option<String>,
    pub pk_columns: Vec<String>,
    pub columns: Vec<ColumnInfo>,
    /// Every column set that identifies one row: the primary key first, then each unique constraint.
    pub unique_keys: Vec<Vec<String>>,
    pub operations: Vec<String>,
    /// Column names to strip from all API responses (sensitive data).
    pub sensitive_columns: HashSet<String>,
    pub includes: Vec<IncludeSpec>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn include(&self, name: &str) -> Option<&IncludeSpec> {
        self.includes.iter().find(|i| i.name == name)
    }

    pub fn pk(&self) -> &str {
        &self.pk_columns[0]
    }

    pub fn allows(&self, operation: &str) -> bool {
        self.operations.iter().any(|o| o == operation)
    }

    /// The declared unique key whose columns are exactly `columns` (order-insensitive).
    pub fn unique_key_for(&self, columns: &[&str]) -> Option<&[String]> {
        let wanted: HashSet<&str> = columns.iter().copied().collect();
        self.unique_keys
            .iter()
            .find(|key| key.len() == wanted.len() && key.iter().all(|c| wanted.contains(c.as_str())))
            .map(Vec::as_slice)
    }

    pub fn qualified_table(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema_name), quote_ident(&self.table_name))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    by_model: HashMap<String, usize>,
    by_path: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn new(entities: Vec<ResolvedEntity>) -> Self {
        let mut by_model = HashMap::new();
        let mut by_path = HashMap::new();
        for (i, e) in entities.iter().enumerate() {
            by_model.insert(e.model.clone(), i);
            if let Some(p) = &e.path_segment {
                by_path.insert(p.clone(), i);
            }
        }
        Self {
            entities,
            by_model,
            by_path,
        }
    }

    pub fn entity(&self, model: &str) -> Option<&ResolvedEntity> {
        self.by_model.get(model).map(|&i| &self.entities[i])
    }

    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.by_path.get(path).map(|&i| &self.entities[i])
    }

    /// Name of the PostgreSQL schema the model lives in.
    pub fn schema_name(&self) -> Option<&str> {
        self.entities.first().map(|e| e.schema_name.as_str())
    }
}

/// Quote an identifier for PostgreSQL (identifiers come from the schema only).
pub fn quote_ident(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
