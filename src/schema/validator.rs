//! Schema validation: referential integrity and API consistency.

use crate::error::ConfigError;
use crate::schema::{FullConfig, TableConfig};
use std::collections::HashSet;

/// SQL types a column may use besides declared enums.
const SQL_TYPES: &[&str] = &[
    "text",
    "varchar",
    "boolean",
    "bool",
    "smallint",
    "integer",
    "int",
    "bigint",
    "numeric",
    "decimal",
    "real",
    "double precision",
    "timestamptz",
    "timestamp",
    "date",
    "uuid",
    "jsonb",
    "json",
];

pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    s.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if !is_valid_identifier(&config.schema) {
        return Err(ConfigError::Validation(format!("invalid schema name '{}'", config.schema)));
    }

    let mut enum_names = HashSet::new();
    for e in &config.enums {
        if !enum_names.insert(e.name.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate enum '{}'", e.name)));
        }
        if e.values.is_empty() {
            return Err(ConfigError::Validation(format!("enum '{}' has no values", e.name)));
        }
        let distinct: HashSet<&str> = e.values.iter().map(String::as_str).collect();
        if distinct.len() != e.values.len() {
            return Err(ConfigError::Validation(format!("enum '{}' repeats a value", e.name)));
        }
    }

    let mut table_ids = HashSet::new();
    for t in &config.tables {
        if !table_ids.insert(t.id.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate model '{}'", t.id)));
        }
        validate_table(t, &enum_names)?;
    }

    for idx in &config.indexes {
        let table = config.table(&idx.table).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: idx.table.clone(),
        })?;
        for col in &idx.columns {
            require_column(table, col)?;
        }
    }

    for r in &config.relationships {
        let from = config.table(&r.from_table).ok_or_else(|| ConfigError::MissingReference {
            kind: "relationship table",
            id: format!("{} ({})", r.from_table, r.id),
        })?;
        let to = config.table(&r.to_table).ok_or_else(|| ConfigError::MissingReference {
            kind: "relationship table",
            id: format!("{} ({})", r.to_table, r.id),
        })?;
        require_column(from, &r.from_column)?;
        require_column(to, &r.to_column)?;
    }

    let mut path_segments = HashSet::new();
    for api in &config.api_entities {
        let table = config.table(&api.entity_id).ok_or_else(|| ConfigError::MissingReference {
            kind: "table",
            id: api.entity_id.clone(),
        })?;
        if !path_segments.insert(api.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(api.path_segment.clone()));
        }
        for col in api.sensitive_columns.iter().chain(api.validation.keys()) {
            require_column(table, col)?;
        }
    }

    Ok(())
}

fn validate_table(t: &TableConfig, enum_names: &HashSet<&str>) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for c in &t.columns {
        if !names.insert(c.name.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate column {}.{}", t.id, c.name)));
        }
        let ty = c.type_.base_name();
        if !enum_names.contains(ty) && !SQL_TYPES.contains(&ty.to_lowercase().as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "column type",
                id: format!("{} ({}.{})", ty, t.id, c.name),
            });
        }
    }
    let pk = t.primary_key.columns();
    if pk.is_empty() {
        return Err(ConfigError::InvalidPrimaryKey {
            table: t.id.clone(),
            column: String::new(),
        });
    }
    for col in pk {
        if !names.contains(col) {
            return Err(ConfigError::InvalidPrimaryKey {
                table: t.id.clone(),
                column: col.to_string(),
            });
        }
    }
    for set in &t.unique {
        if set.is_empty() {
            return Err(ConfigError::Validation(format!("empty unique set on {}", t.id)));
        }
        for col in set {
            require_column(t, col)?;
        }
    }
    Ok(())
}

fn require_column(t: &TableConfig, column: &str) -> Result<(), ConfigError> {
    if t.columns.iter().any(|c| c.name == column) {
        Ok(())
    } else {
        Err(ConfigError::MissingReference {
            kind: "column",
            id: format!("{}.{}", t.id, column),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn embedded() -> FullConfig {
        FullConfig::embedded().expect("embedded schema parses")
    }

    #[test]
    fn embedded_schema_is_valid() {
        validate(&embedded()).expect("valid");
    }

    #[rstest]
    #[case("public", true)]
    #[case("photo_orders_2", true)]
    #[case("_private", true)]
    #[case("2fast", false)]
    #[case("drop table", false)]
    #[case("", false)]
    fn identifiers(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(is_valid_identifier(input), ok);
    }

    #[test]
    fn unknown_column_type_is_rejected() {
        let mut config = embedded();
        config.tables[0].columns[1].type_ = crate::schema::ColumnTypeConfig::Simple("Mood".into());
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { kind: "column type", .. }));
    }

    #[test]
    fn relationship_to_missing_column_is_rejected() {
        let mut config = embedded();
        config.relationships[0].from_column = "owner_id".into();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "column", .. })
        ));
    }

    #[test]
    fn duplicate_path_segment_is_rejected() {
        let mut config = embedded();
        let dup = config.api_entities[0].path_segment.clone();
        config.api_entities[1].path_segment = dup;
        assert!(matches!(validate(&config), Err(ConfigError::DuplicatePathSegment(_))));
    }

    #[test]
    fn primary_key_must_exist() {
        let mut config = embedded();
        config.tables[0].primary_key = crate::schema::PrimaryKeyConfig::Single("uid".into());
        assert!(matches!(validate(&config), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn enum_values_must_be_distinct() {
        let mut config = embedded();
        config.enums[0].values.push("USER".into());
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }
}
