//! Typed SQL scalar values and literal serialization.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};
use crate::schema::ColumnType;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A scalar value that can appear in a statement, e.g. as a column default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Character data.
    Text(String),
    /// Integer data.
    Integer(i64),
    /// Floating-point data. NaN serializes to NULL.
    Float(f64),
    /// Boolean data.
    Bool(bool),
    /// A point in time, serialized at one-second resolution in UTC.
    DateTime(DateTime<Utc>),
}

impl SqlValue {
    /// Serializes the value as a literal acceptable inside a statement.
    #[must_use]
    pub fn serialize(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Text(text) => format!("'{}'", escape(text)),
            Self::Integer(n) => n.to_string(),
            Self::Float(f) if f.is_nan() => "NULL".to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::DateTime(at) => format!("'{}'", at.format(DATE_FORMAT)),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<f64> for SqlValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(at: DateTime<Utc>) -> Self {
        Self::DateTime(at)
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn strip_quotes(literal: &str) -> Option<&str> {
    literal
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
}

/// Parses a serialized literal back into a typed value, given the friendly
/// type of the column it belongs to. The inverse of [`SqlValue::serialize`].
pub fn parse_literal(ty: ColumnType, literal: &str) -> Result<SqlValue> {
    if literal == "NULL" {
        return Ok(SqlValue::Null);
    }

    let fail = || MigrateError::Literal {
        ty: ty.dsl_name(),
        literal: literal.to_string(),
    };

    match ty {
        ColumnType::DateTime | ColumnType::Timestamp => {
            // CURRENT_TIMESTAMP defaults come back as a bare expression.
            if literal == "CURRENT_TIMESTAMP" {
                return Ok(SqlValue::Text(literal.to_string()));
            }
            let text = strip_quotes(literal).unwrap_or(literal);
            if text == "0000-00-00 00:00:00" {
                return Ok(SqlValue::Null);
            }
            let naive =
                NaiveDateTime::parse_from_str(text, DATE_FORMAT).map_err(|_| fail())?;
            Ok(SqlValue::DateTime(Utc.from_utc_datetime(&naive)))
        }
        ColumnType::String | ColumnType::Text => {
            let text = strip_quotes(literal).ok_or_else(fail)?;
            Ok(SqlValue::Text(unescape(text)))
        }
        ColumnType::Integer | ColumnType::PrimaryKey => {
            literal.parse::<i64>().map(SqlValue::Integer).map_err(|_| fail())
        }
        ColumnType::Float => literal.parse::<f64>().map(SqlValue::Float).map_err(|_| fail()),
        ColumnType::Boolean => match literal {
            "TRUE" => Ok(SqlValue::Bool(true)),
            "FALSE" => Ok(SqlValue::Bool(false)),
            _ => Err(fail()),
        },
        ColumnType::Decimal | ColumnType::Time | ColumnType::Date | ColumnType::Binary => {
            Err(fail())
        }
    }
}
