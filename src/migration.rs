//! Apply the schema document to the database: schema, enum types, tables, indexes, foreign keys.
//! Statements run in dependency order and every step is idempotent.

use crate::error::{AppError, ConfigError};
use crate::schema::types::*;
use crate::schema::{quote_ident as quote, validate};
use sqlx::PgPool;

fn lit(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Build the DDL for `config` placed in `schema_name`.
pub fn migration_statements(config: &FullConfig, schema_name: &str) -> Result<Vec<String>, AppError> {
    validate(config)?;
    let schema = quote(schema_name);
    let mut out = vec![format!("CREATE SCHEMA IF NOT EXISTS {}", schema)];

    for e in &config.enums {
        let values: Vec<String> = e.values.iter().map(|v| lit(v)).collect();
        // CREATE TYPE has no IF NOT EXISTS
        out.push(format!(
            "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_type t JOIN pg_namespace n ON n.oid = t.typnamespace WHERE n.nspname = {} AND t.typname = {}) THEN CREATE TYPE {}.{} AS ENUM ({}); END IF; END $$",
            lit(schema_name),
            lit(&e.name),
            schema,
            quote(&e.name),
            values.join(", ")
        ));
    }

    for t in &config.tables {
        let mut defs: Vec<String> = Vec::new();
        for c in &t.columns {
            let typ = match config.enum_by_name(c.type_.base_name()) {
                Some(e) => format!("{}.{}", schema, quote(&e.name)),
                None => c.type_.ddl(),
            };
            let mut def = format!("{} {}", quote(&c.name), typ);
            if !c.nullable {
                def.push_str(" NOT NULL");
            }
            if let Some(d) = &c.default {
                def.push_str(" DEFAULT ");
                def.push_str(d.sql());
            }
            defs.push(def);
        }
        let pk: Vec<String> = t.primary_key.columns().into_iter().map(quote).collect();
        defs.push(format!("CONSTRAINT {} PRIMARY KEY ({})", quote(&format!("{}_pkey", t.name)), pk.join(", ")));
        for u in &t.unique {
            let cols: Vec<String> = u.iter().map(|s| quote(s)).collect();
            defs.push(format!(
                "CONSTRAINT {} UNIQUE ({})",
                quote(&format!("{}_{}_key", t.name, u.join("_"))),
                cols.join(", ")
            ));
        }
        out.push(format!(
            "CREATE TABLE IF NOT EXISTS {}.{} (\n  {}\n)",
            schema,
            quote(&t.name),
            defs.join(",\n  ")
        ));
        if let Some(comment) = &t.comment {
            out.push(format!("COMMENT ON TABLE {}.{} IS {}", schema, quote(&t.name), lit(comment)));
        }
    }

    for idx in &config.indexes {
        let table = table_of(config, &idx.table)?;
        let cols: Vec<String> = idx.columns.iter().map(|c| quote(c)).collect();
        out.push(format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {}.{} USING {} ({})",
            if idx.unique { "UNIQUE " } else { "" },
            quote(&idx.name),
            schema,
            quote(&table.name),
            idx.method.as_deref().unwrap_or("btree"),
            cols.join(", ")
        ));
    }

    for rel in &config.relationships {
        let from = table_of(config, &rel.from_table)?;
        let to = table_of(config, &rel.to_table)?;
        // ADD CONSTRAINT has no IF NOT EXISTS either; constraint names are unique per schema here
        out.push(format!(
            "DO $$ BEGIN IF NOT EXISTS (SELECT 1 FROM pg_constraint c JOIN pg_namespace n ON n.oid = c.connamespace WHERE n.nspname = {} AND c.conname = {}) THEN ALTER TABLE {}.{} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}.{} ({}) ON UPDATE {} ON DELETE {}; END IF; END $$",
            lit(schema_name),
            lit(&rel.id),
            schema,
            quote(&from.name),
            quote(&rel.id),
            quote(&rel.from_column),
            schema,
            quote(&to.name),
            quote(&rel.to_column),
            rel.on_update.as_deref().unwrap_or("CASCADE"),
            rel.on_delete.as_deref().unwrap_or("RESTRICT")
        ));
    }

    Ok(out)
}

fn table_of<'c>(config: &'c FullConfig, id: &str) -> Result<&'c TableConfig, AppError> {
    config.table(id).ok_or_else(|| {
        AppError::Config(ConfigError::MissingReference {
            kind: "table",
            id: id.to_string(),
        })
    })
}

/// Run every migration statement in one transaction.
pub async fn apply_migrations(pool: &PgPool, config: &FullConfig, schema_name: &str) -> Result<(), AppError> {
    let statements = migration_statements(config, schema_name)?;
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "migration");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(
        schema = %schema_name,
        tables = config.tables.len(),
        statements = statements.len(),
        "migrations applied"
    );
    Ok(())
}
