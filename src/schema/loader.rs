//! Load the schema document and resolve it into the runtime model.

use crate::error::ConfigError;
use crate::schema::resolved::{quote_ident, ColumnInfo, ColumnKind, IncludeDirection, IncludeSpec, ResolvedEntity, ResolvedModel};
use crate::schema::types::*;
use crate::schema::validator::{is_valid_identifier, validate};
use std::collections::{HashMap, HashSet};

const EMBEDDED_SCHEMA: &str = include_str!("photo_orders.json");

impl FullConfig {
    /// The photo-order schema shipped with the crate.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json(EMBEDDED_SCHEMA)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
    }
}

/// Build resolved model from the schema document (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    resolve_in_schema(config, &config.schema)
}

/// Resolve with tables and enum types placed in `schema_name` instead of the document's schema.
pub fn resolve_in_schema(config: &FullConfig, schema_name: &str) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;
    if !is_valid_identifier(schema_name) {
        return Err(ConfigError::Validation(format!("invalid schema name '{}'", schema_name)));
    }

    let enums: HashMap<&str, &EnumConfig> = config.enums.iter().map(|e| (e.name.as_str(), e)).collect();
    let api_by_table: HashMap<&str, &ApiEntityConfig> = config
        .api_entities
        .iter()
        .map(|api| (api.entity_id.as_str(), api))
        .collect();

    let mut entities = Vec::with_capacity(config.tables.len());
    for table in &config.tables {
        let pk_names: Vec<String> = table.primary_key.columns().into_iter().map(String::from).collect();
        let columns: Vec<ColumnInfo> = table
            .columns
            .iter()
            .map(|c| {
                let enum_def = enums.get(c.type_.base_name());
                let (kind, pg_type) = match enum_def {
                    Some(e) => (
                        ColumnKind::Enum,
                        format!("{}.{}", quote_ident(schema_name), quote_ident(&e.name)),
                    ),
                    None => column_kind(&c.type_),
                };
                ColumnInfo {
                    name: c.name.clone(),
                    kind,
                    pg_type,
                    nullable: c.nullable,
                    has_default: c.default.is_some(),
                    is_pk: pk_names.contains(&c.name),
                    auto_updated: c.updated_at,
                    enum_values: enum_def.map(|e| e.values.clone()),
                }
            })
            .collect();

        let mut unique_keys = vec![pk_names.clone()];
        unique_keys.extend(table.unique.iter().cloned());

        let api = api_by_table.get(table.id.as_str());
        let entity = ResolvedEntity {
            model: table.id.clone(),
            schema_name: schema_name.to_string(),
            table_name: table.name.clone(),
            path_segment: api.map(|a| a.path_segment.clone()),
            pk_columns: pk_names,
            columns,
            unique_keys,
            operations: api.map(|a| a.operations.clone()).unwrap_or_default(),
            sensitive_columns: api
                .map(|a| a.sensitive_columns.iter().cloned().collect())
                .unwrap_or_default(),
            includes: build_includes_for_table(table, config),
            validation: api.map(|a| a.validation.clone()).unwrap_or_default(),
        };
        entities.push(entity);
    }

    Ok(ResolvedModel::new(entities))
}

/// Forward relations are to-one; reverse relations are to-many unless the FK column alone is unique.
fn build_includes_for_table(table: &TableConfig, config: &FullConfig) -> Vec<IncludeSpec> {
    let mut includes = Vec::new();
    for rel in &config.relationships {
        if rel.from_table == table.id {
            includes.push(IncludeSpec {
                name: rel.name_on_from.clone(),
                direction: IncludeDirection::ToOne,
                related_model: rel.to_table.clone(),
                our_key_column: rel.from_column.clone(),
                their_key_column: rel.to_column.clone(),
            });
        }
        if rel.to_table == table.id {
            let fk_unique = config
                .table(&rel.from_table)
                .map(|from| column_is_unique(from, &rel.from_column))
                .unwrap_or(false);
            includes.push(IncludeSpec {
                name: rel.name_on_to.clone(),
                direction: if fk_unique {
                    IncludeDirection::ToOne
                } else {
                    IncludeDirection::ToMany
                },
                related_model: rel.from_table.clone(),
                our_key_column: rel.to_column.clone(),
                their_key_column: rel.from_column.clone(),
            });
        }
    }
    includes
}

fn column_is_unique(table: &TableConfig, column: &str) -> bool {
    let single: HashSet<&str> = table
        .unique
        .iter()
        .filter(|set| set.len() == 1)
        .map(|set| set[0].as_str())
        .collect();
    single.contains(column) || table.primary_key.columns() == vec![column]
}

fn column_kind(ty: &ColumnTypeConfig) -> (ColumnKind, String) {
    let lower = ty.base_name().to_lowercase();
    let kind = match lower.as_str() {
        "boolean" | "bool" => ColumnKind::Bool,
        "smallint" | "integer" | "int" => ColumnKind::Int,
        "bigint" => ColumnKind::BigInt,
        "numeric" | "decimal" => ColumnKind::Decimal,
        "real" | "double precision" => ColumnKind::Float,
        "timestamptz" | "timestamp" => ColumnKind::Timestamp,
        "date" => ColumnKind::Date,
        "uuid" => ColumnKind::Uuid,
        "json" | "jsonb" => ColumnKind::Json,
        _ => ColumnKind::Text,
    };
    let pg_type = match lower.as_str() {
        "bool" => "boolean".to_string(),
        "int" => "integer".to_string(),
        "decimal" => "numeric".to_string(),
        other => other.to_string(),
    };
    (kind, pg_type)
}
