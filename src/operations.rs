//! Table operations and the builders that produce them.
//!
//! A migration's `up`/`down` callback receives a [`SchemaEditor`] and calls
//! `create_table`, `alter_table`, `drop_table` or `rename_table`; each call
//! appends one or more [`TableOperation`]s. Operations are consumed exactly
//! once by the DDL compiler and never mutated after creation.

use serde::{Deserialize, Serialize};

use crate::schema::{
    standard_column_methods, ColumnDescriptor, ColumnNames, ColumnOptions, ColumnType,
    TableDefinition,
};

/// A single declared schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableOperation {
    /// Create a table with the given columns, in order.
    CreateTable {
        /// Table name.
        name: String,
        /// Column definitions, in declaration order.
        columns: Vec<ColumnDescriptor>,
    },

    /// Add a column to an existing table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: ColumnDescriptor,
    },

    /// Redefine an existing column in place.
    ChangeColumn {
        /// Table name.
        table: String,
        /// The column's new definition, under its existing name.
        column: ColumnDescriptor,
    },

    /// Remove a column from an existing table.
    RemoveColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Rename a column, preserving its live definition.
    RenameColumn {
        /// Table name.
        table: String,
        /// Current column name.
        old: String,
        /// New column name.
        new: String,
    },

    /// Drop a table.
    DropTable {
        /// Table name.
        name: String,
    },

    /// Rename a table.
    RenameTable {
        /// Current table name.
        old: String,
        /// New table name.
        new: String,
    },
}

/// Collects column additions and alterations for one `alter_table` call.
#[derive(Debug)]
pub struct AlterTableDefinition {
    table: String,
    operations: Vec<TableOperation>,
}

impl AlterTableDefinition {
    fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            operations: Vec::new(),
        }
    }

    /// Adds a single column.
    pub fn column(&mut self, name: impl Into<String>, column_type: ColumnType, options: ColumnOptions) {
        self.operations.push(TableOperation::AddColumn {
            table: self.table.clone(),
            column: ColumnDescriptor::new(name, column_type, options),
        });
    }

    /// Adds several same-typed columns sharing one options value.
    pub fn columns<N: ColumnNames>(&mut self, names: N, column_type: ColumnType, options: ColumnOptions) {
        for name in names.into_names() {
            self.column(name, column_type, options.clone());
        }
    }

    standard_column_methods!();

    /// Redefines an existing column under its current name.
    pub fn change_column(
        &mut self,
        name: impl Into<String>,
        column_type: ColumnType,
        options: ColumnOptions,
    ) {
        self.operations.push(TableOperation::ChangeColumn {
            table: self.table.clone(),
            column: ColumnDescriptor::new(name, column_type, options),
        });
    }

    /// Removes a column.
    pub fn remove_column(&mut self, name: impl Into<String>) {
        self.operations.push(TableOperation::RemoveColumn {
            table: self.table.clone(),
            column: name.into(),
        });
    }

    /// Renames a column. The live definition is looked up at execution time
    /// and reissued under the new name.
    pub fn rename_column(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.operations.push(TableOperation::RenameColumn {
            table: self.table.clone(),
            old: old.into(),
            new: new.into(),
        });
    }

    fn into_operations(self) -> Vec<TableOperation> {
        self.operations
    }
}

/// Collects the table operations declared by one migration callback.
#[derive(Debug, Default)]
pub struct SchemaEditor {
    operations: Vec<TableOperation>,
}

impl SchemaEditor {
    /// Creates an empty editor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new table. The definer callback appends its columns.
    pub fn create_table<F>(&mut self, name: impl Into<String>, definer: F)
    where
        F: FnOnce(&mut TableDefinition),
    {
        let mut table = TableDefinition::new();
        definer(&mut table);
        self.operations.push(TableOperation::CreateTable {
            name: name.into(),
            columns: table.into_columns(),
        });
    }

    /// Alters an existing table. The definer callback declares additions,
    /// changes, removals and renames.
    pub fn alter_table<F>(&mut self, name: impl Into<String>, definer: F)
    where
        F: FnOnce(&mut AlterTableDefinition),
    {
        let mut alter = AlterTableDefinition::new(name);
        definer(&mut alter);
        self.operations.extend(alter.into_operations());
    }

    /// Drops a table.
    pub fn drop_table(&mut self, name: impl Into<String>) {
        self.operations.push(TableOperation::DropTable { name: name.into() });
    }

    /// Renames a table.
    pub fn rename_table(&mut self, old: impl Into<String>, new: impl Into<String>) {
        self.operations.push(TableOperation::RenameTable {
            old: old.into(),
            new: new.into(),
        });
    }

    /// The collected operations, in declaration order.
    #[must_use]
    pub fn into_operations(self) -> Vec<TableOperation> {
        self.operations
    }
}
