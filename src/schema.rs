//! The declarative column and table definition DSL.
//!
//! A definer callback receives a [`TableDefinition`] and appends columns
//! through one method per friendly type, a generic [`TableDefinition::column`]
//! call, or [`TableDefinition::timestamps`]. The DSL performs no I/O; it only
//! collects [`ColumnDescriptor`]s for the DDL compiler.

use serde::{Deserialize, Serialize};

use crate::value::SqlValue;

/// Friendly column types understood by the DSL and the DDL compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Auto-incrementing integer primary key. At most one per table.
    PrimaryKey,
    /// Bounded character data.
    String,
    /// Unbounded UTF-8 character data.
    Text,
    /// Integer data.
    Integer,
    /// Boolean data.
    Boolean,
    /// Date and time.
    DateTime,
    /// Timestamp.
    Timestamp,
    /// Floating-point data.
    Float,
    /// Fixed-point decimal data.
    Decimal,
    /// Time of day.
    Time,
    /// Calendar date.
    Date,
    /// Binary data.
    Binary,
}

impl ColumnType {
    /// The name of the DSL method that declares a column of this type.
    #[must_use]
    pub fn dsl_name(self) -> &'static str {
        match self {
            Self::PrimaryKey => "primary_key",
            Self::String => "string",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Timestamp => "timestamp",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::Time => "time",
            Self::Date => "date",
            Self::Binary => "binary",
        }
    }
}

/// Options shared by one or more column declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnOptions {
    /// Whether NULL values are accepted. Columns are NOT NULL by default.
    pub allow_null: bool,
    /// Default value emitted as a `DEFAULT` clause.
    pub default: Option<SqlValue>,
    /// Raw SQL fragment appended after the type keyword.
    pub additional: Option<String>,
}

impl ColumnOptions {
    /// Creates the default options: NOT NULL, no default, no extra SQL.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_null: false,
            default: None,
            additional: None,
        }
    }

    /// Allows NULL values for the column.
    #[must_use]
    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Appends a raw SQL fragment to the column definition.
    #[must_use]
    pub fn additional(mut self, sql: impl Into<String>) -> Self {
        self.additional = Some(sql.into());
        self
    }
}

/// A fully described column, ready for the DDL compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Friendly type.
    pub column_type: ColumnType,
    /// Whether NULL values are accepted.
    pub allow_null: bool,
    /// Default value, if any.
    pub default: Option<SqlValue>,
    /// Raw SQL fragment appended after the type, if any.
    pub additional: Option<String>,
}

impl ColumnDescriptor {
    /// Creates a descriptor from a name, type and options.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType, options: ColumnOptions) -> Self {
        Self {
            name: name.into(),
            column_type,
            allow_null: options.allow_null,
            default: options.default,
            additional: options.additional,
        }
    }
}

/// One or several column names passed to a single DSL call.
///
/// Lets `t.string("name")` and `t.string(["street", "city"])` both work; the
/// multi-name form declares several same-typed columns sharing one options
/// value.
pub trait ColumnNames {
    /// The declared names, in order.
    fn into_names(self) -> Vec<String>;
}

impl ColumnNames for &str {
    fn into_names(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl ColumnNames for String {
    fn into_names(self) -> Vec<String> {
        vec![self]
    }
}

impl<const N: usize> ColumnNames for [&str; N] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl ColumnNames for &[&str] {
    fn into_names(self) -> Vec<String> {
        self.iter().map(ToString::to_string).collect()
    }
}

impl ColumnNames for Vec<String> {
    fn into_names(self) -> Vec<String> {
        self
    }
}

// Generates the one-method-per-friendly-type surface shared by the create
// and alter builders.
macro_rules! typed_column_methods {
    ($($(#[$doc:meta])* $method:ident => $variant:ident),+ $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $method<N: ColumnNames>(&mut self, names: N) {
                self.columns(names, ColumnType::$variant, ColumnOptions::new());
            }
        )+
    };
}

pub(crate) use typed_column_methods;

macro_rules! standard_column_methods {
    () => {
        crate::schema::typed_column_methods! {
            /// Declares the auto-incrementing integer primary key.
            primary_key => PrimaryKey,
            /// Declares bounded character columns.
            string => String,
            /// Declares unbounded UTF-8 text columns.
            text => Text,
            /// Declares integer columns.
            integer => Integer,
            /// Declares boolean columns.
            boolean => Boolean,
            /// Declares date-and-time columns.
            datetime => DateTime,
            /// Declares timestamp columns.
            timestamp => Timestamp,
            /// Declares floating-point columns.
            float => Float,
            /// Declares fixed-point decimal columns.
            decimal => Decimal,
            /// Declares time-of-day columns.
            time => Time,
            /// Declares calendar-date columns.
            date => Date,
            /// Declares binary columns.
            binary => Binary,
        }

        /// Declares the `createdAt`/`updatedAt` datetime pair.
        pub fn timestamps(&mut self) {
            self.timestamps_with(ColumnOptions::new());
        }

        /// Declares the `createdAt`/`updatedAt` pair with shared options.
        pub fn timestamps_with(&mut self, options: ColumnOptions) {
            self.column("createdAt", ColumnType::DateTime, options.clone());
            self.column("updatedAt", ColumnType::DateTime, options);
        }
    };
}

pub(crate) use standard_column_methods;

/// Collects the columns of a table being created.
#[derive(Debug, Default)]
pub struct TableDefinition {
    columns: Vec<ColumnDescriptor>,
}

impl TableDefinition {
    /// Creates an empty definition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a single column.
    pub fn column(&mut self, name: impl Into<String>, column_type: ColumnType, options: ColumnOptions) {
        self.columns
            .push(ColumnDescriptor::new(name, column_type, options));
    }

    /// Appends several same-typed columns sharing one options value.
    pub fn columns<N: ColumnNames>(&mut self, names: N, column_type: ColumnType, options: ColumnOptions) {
        for name in names.into_names() {
            self.column(name, column_type, options.clone());
        }
    }

    standard_column_methods!();

    /// The collected descriptors, in declaration order.
    #[must_use]
    pub fn into_columns(self) -> Vec<ColumnDescriptor> {
        self.columns
    }
}
