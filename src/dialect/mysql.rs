//! MySQL DDL generation.
//!
//! Statements end with `;`, identifiers are back-quoted, and every
//! `CREATE TABLE` carries an explicit storage-engine clause.

use crate::driver::Row;
use crate::error::{MigrateError, Result};
use crate::operations::TableOperation;
use crate::schema::{ColumnDescriptor, ColumnType};
use crate::value::SqlValue;

use super::{DdlStep, Dialect};

/// The MySQL migration dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Creates the dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    // A table cannot be created with zero columns, so the first column rides
    // inside CREATE TABLE and every later one is its own ALTER TABLE ADD.
    fn create_table_steps(&self, name: &str, columns: &[ColumnDescriptor]) -> Result<Vec<DdlStep>> {
        if columns.is_empty() {
            return Err(MigrateError::NoColumns(name.to_string()));
        }

        let primary_keys = columns
            .iter()
            .filter(|c| c.column_type == ColumnType::PrimaryKey)
            .count();
        if primary_keys > 1 {
            return Err(MigrateError::MultiplePrimaryKeys(name.to_string()));
        }

        let mut steps = vec![DdlStep::Statement(format!(
            "CREATE TABLE {} ( {} ) ENGINE=INNODB;",
            self.quote(name),
            self.column_sql(&columns[0])
        ))];

        for column in &columns[1..] {
            steps.push(DdlStep::Statement(format!(
                "ALTER TABLE {} ADD {};",
                self.quote(name),
                self.column_sql(column)
            )));
        }

        Ok(steps)
    }

    fn default_clause(default: &str) -> String {
        if default == "CURRENT_TIMESTAMP" || default.parse::<f64>().is_ok() {
            default.to_string()
        } else {
            SqlValue::from(default).serialize()
        }
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn type_sql(&self, column_type: ColumnType) -> &'static str {
        match column_type {
            ColumnType::PrimaryKey => "INTEGER AUTO_INCREMENT",
            ColumnType::String => "VARCHAR(255)",
            ColumnType::Text => "MEDIUMTEXT CHARACTER SET UTF8",
            ColumnType::Integer => "INT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::DateTime => "DATETIME",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Float => "FLOAT",
            ColumnType::Decimal => "DECIMAL",
            ColumnType::Time => "TIME",
            ColumnType::Date => "DATE",
            ColumnType::Binary => "BINARY",
        }
    }

    fn compile(&self, operation: &TableOperation) -> Result<Vec<DdlStep>> {
        match operation {
            TableOperation::CreateTable { name, columns } => {
                self.create_table_steps(name, columns)
            }

            TableOperation::AddColumn { table, column } => Ok(vec![DdlStep::Statement(format!(
                "ALTER TABLE {} ADD {};",
                self.quote(table),
                self.column_sql(column)
            ))]),

            TableOperation::ChangeColumn { table, column } => {
                Ok(vec![DdlStep::Statement(format!(
                    "ALTER TABLE {} MODIFY {};",
                    self.quote(table),
                    self.column_sql(column)
                ))])
            }

            TableOperation::RemoveColumn { table, column } => {
                Ok(vec![DdlStep::Statement(format!(
                    "ALTER TABLE {} DROP COLUMN {};",
                    self.quote(table),
                    self.quote(column)
                ))])
            }

            TableOperation::RenameColumn { table, old, new } => Ok(vec![DdlStep::RenameColumn {
                table: table.clone(),
                old: old.clone(),
                new: new.clone(),
            }]),

            TableOperation::DropTable { name } => Ok(vec![DdlStep::Statement(format!(
                "DROP TABLE {};",
                self.quote(name)
            ))]),

            TableOperation::RenameTable { old, new } => Ok(vec![DdlStep::Statement(format!(
                "RENAME TABLE {} TO {};",
                self.quote(old),
                self.quote(new)
            ))]),
        }
    }

    fn show_columns_sql(&self, table: &str) -> String {
        format!("SHOW COLUMNS FROM {};", self.quote(table))
    }

    fn change_column_sql(&self, table: &str, old: &str, new: &str, live: &Row) -> Result<String> {
        let ty = live.get("Type").ok_or(MigrateError::Catalog("Type"))?;

        let mut definition = ty.to_string();
        if live.get("Null") == Some("NO") {
            definition.push_str(" NOT NULL");
        }
        if let Some(default) = live.get("Default") {
            definition.push_str(" DEFAULT ");
            definition.push_str(&Self::default_clause(default));
        }
        if let Some(extra) = live.get("Extra") {
            if !extra.is_empty() {
                definition.push(' ');
                definition.push_str(&extra.to_uppercase());
            }
        }

        Ok(format!(
            "ALTER TABLE {} CHANGE {} {} {};",
            self.quote(table),
            self.quote(old),
            self.quote(new),
            definition
        ))
    }
}
