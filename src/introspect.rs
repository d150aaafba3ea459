//! Schema introspection: regenerates DSL source text from a live database.
//!
//! Queries the catalog for every column in the configured schema and emits
//! one full-schema migration in DSL form. Type inference is the exact
//! inverse of the compiler's type map wherever a round trip exists: the
//! primary key is recognized by its key flag rather than its type, and
//! booleans by the single-width integer convention.

use chrono::Utc;
use tracing::debug;

use crate::connection::Database;
use crate::context::MigrationContext;
use crate::driver::Row;
use crate::error::{MigrateError, Result};
use crate::migration::{DbSequence, MigrationId, SeqValue};
use crate::registry::LOG_TABLE;
use crate::schema::ColumnType;
use crate::sequence::{Control, Sequence};
use crate::value::SqlValue;

/// Reverse-engineers the live schema into DSL source text.
pub struct Introspector {
    db: Database,
    schema: String,
}

impl Introspector {
    /// Creates an introspector for the context's configured schema.
    #[must_use]
    pub fn new(ctx: &MigrationContext) -> Self {
        Self {
            db: ctx.database().clone(),
            schema: ctx.database().config().database.clone(),
        }
    }

    /// Generates DSL source text reproducing the live schema as one
    /// full-schema migration.
    pub async fn recreate(&self) -> Result<String> {
        let sql = format!(
            "SELECT * FROM INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = {} ORDER BY `TABLE_NAME`, `ORDINAL_POSITION`;",
            SqlValue::from(self.schema.as_str()).serialize()
        );

        let query_db = self.db.clone();
        let seq: DbSequence = Sequence::new()
            .then(move |_| {
                let db = query_db.clone();
                let sql = sql.clone();
                async move {
                    let outcome = db.query(&sql).await?;
                    Ok(Control::Advance(SeqValue::Query(outcome)))
                }
            })
            .then(move |value| async move {
                let rows = match value {
                    SeqValue::Query(outcome) => outcome.into_rows(),
                    _ => Vec::new(),
                };
                let code = generate_code(&rows)?;
                Ok(Control::Finish(SeqValue::Text(code)))
            });

        match seq.run().await? {
            SeqValue::Text(code) => {
                debug!(bytes = code.len(), "schema recreated");
                Ok(code)
            }
            _ => Ok(String::new()),
        }
    }
}

fn generate_code(rows: &[Row]) -> Result<String> {
    let tables = group_by_table(rows)?;

    let id = MigrationId::from_parts(Utc::now(), "schema")?;
    let mut code = format!("ctx.declare(\"{id}\", |m| {{\n");

    for (table, mut columns) in tables {
        let timestamps = strip_timestamp_pair(&mut columns);

        code.push_str(&format!("    m.create_table(\"{table}\", |t| {{\n"));
        for column in &columns {
            let name = column
                .get("COLUMN_NAME")
                .ok_or(MigrateError::Catalog("COLUMN_NAME"))?;
            let column_type = detect_column_type(column)?;
            code.push_str(&format!(
                "        t.{}(\"{}\");\n",
                column_type.dsl_name(),
                name
            ));
        }
        if timestamps {
            code.push_str("        t.timestamps();\n");
        }
        code.push_str("    });\n");
    }

    code.push_str("}, |_m| {})?;\n");
    Ok(code)
}

// Groups catalog rows by table, preserving first-seen order and skipping
// the log table.
fn group_by_table(rows: &[Row]) -> Result<Vec<(String, Vec<Row>)>> {
    let mut tables: Vec<(String, Vec<Row>)> = Vec::new();

    for row in rows {
        let table = row
            .get("TABLE_NAME")
            .ok_or(MigrateError::Catalog("TABLE_NAME"))?;
        if table == LOG_TABLE {
            continue;
        }
        match tables.iter_mut().find(|(name, _)| name == table) {
            Some((_, columns)) => columns.push(row.clone()),
            None => tables.push((table.to_string(), vec![row.clone()])),
        }
    }

    Ok(tables)
}

// If the table carries the createdAt/updatedAt datetime pair, removes both
// and reports that a single timestamps() call should be emitted instead.
fn strip_timestamp_pair(columns: &mut Vec<Row>) -> bool {
    let is_stamp = |row: &Row, name: &str| {
        row.get("COLUMN_NAME") == Some(name) && row.get("DATA_TYPE") == Some("datetime")
    };

    let has_created = columns.iter().any(|row| is_stamp(row, "createdAt"));
    let has_updated = columns.iter().any(|row| is_stamp(row, "updatedAt"));
    if !(has_created && has_updated) {
        return false;
    }

    columns.retain(|row| !is_stamp(row, "createdAt") && !is_stamp(row, "updatedAt"));
    true
}

// The inverse of the compiler's type map, driven by catalog metadata.
pub(crate) fn detect_column_type(row: &Row) -> Result<ColumnType> {
    if row.get("COLUMN_KEY") == Some("PRI") {
        return Ok(ColumnType::PrimaryKey);
    }

    let data_type = row
        .get("DATA_TYPE")
        .ok_or(MigrateError::Catalog("DATA_TYPE"))?;

    match data_type.to_lowercase().as_str() {
        "varchar" => Ok(ColumnType::String),
        "int" | "tinyint" => {
            if row.get("COLUMN_TYPE") == Some("tinyint(1)") {
                Ok(ColumnType::Boolean)
            } else {
                Ok(ColumnType::Integer)
            }
        }
        "text" | "mediumtext" => Ok(ColumnType::Text),
        "float" => Ok(ColumnType::Float),
        "decimal" => Ok(ColumnType::Decimal),
        "datetime" => Ok(ColumnType::DateTime),
        "timestamp" => Ok(ColumnType::Timestamp),
        "time" => Ok(ColumnType::Time),
        "date" => Ok(ColumnType::Date),
        "binary" => Ok(ColumnType::Binary),
        "boolean" => Ok(ColumnType::Boolean),
        other => Err(MigrateError::UnsupportedType(other.to_string())),
    }
}
