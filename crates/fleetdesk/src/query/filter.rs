use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Record;

/// Scalar projection of a record field that filters and sorts operate on.
///
/// Deserialization is untagged: JSON `null`, booleans and integers map
/// directly, strings become timestamps or dates when they parse as such.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Text(String),
}

impl FieldValue {
    /// Ordering between two values of the same shape; `None` when the shapes differ.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Date(b)) => Some(a.date_naive().cmp(b)),
            (FieldValue::Date(a), FieldValue::Timestamp(b)) => Some(a.cmp(&b.date_naive())),
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

/// Explicit comparison operator for [`Filter::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A single predicate over one record field.
///
/// Every variant names its field explicitly, so a column called `price_from`
/// is just another field and never a range convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    Equals {
        field: String,
        value: FieldValue,
    },
    In {
        field: String,
        values: Vec<FieldValue>,
    },
    /// Case-insensitive substring match.
    Like {
        field: String,
        value: String,
    },
    /// Inclusive bounds; a missing bound is open.
    Range {
        field: String,
        #[serde(default)]
        from: Option<FieldValue>,
        #[serde(default)]
        to: Option<FieldValue>,
    },
    Compare {
        field: String,
        operator: CompareOp,
        value: FieldValue,
    },
    IsNull {
        field: String,
    },
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Filter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn one_of<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn like(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Like {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn range(
        field: impl Into<String>,
        from: Option<FieldValue>,
        to: Option<FieldValue>,
    ) -> Self {
        Filter::Range {
            field: field.into(),
            from,
            to,
        }
    }

    pub fn compare(
        field: impl Into<String>,
        operator: CompareOp,
        value: impl Into<FieldValue>,
    ) -> Self {
        Filter::Compare {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Filter::IsNull {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::Equals { field, .. }
            | Filter::In { field, .. }
            | Filter::Like { field, .. }
            | Filter::Range { field, .. }
            | Filter::Compare { field, .. }
            | Filter::IsNull { field } => field,
        }
    }

    /// Whether a comparison operand is `null`. Null matching goes through
    /// [`Filter::IsNull`] only, so such filters are refused.
    pub(crate) fn has_null_operand(&self) -> bool {
        match self {
            Filter::Equals { value, .. } | Filter::Compare { value, .. } => value.is_null(),
            Filter::In { values, .. } => values.iter().any(FieldValue::is_null),
            Filter::Range { from, to, .. } => from
                .iter()
                .chain(to.iter())
                .any(FieldValue::is_null),
            Filter::Like { .. } | Filter::IsNull { .. } => false,
        }
    }

    pub fn matches<R: Record>(&self, record: &R) -> bool {
        let Some(actual) = record.field(self.field()) else {
            return false;
        };

        match self {
            Filter::Equals { value, .. } => actual.compare(value) == Some(Ordering::Equal),
            Filter::In { values, .. } => values
                .iter()
                .any(|candidate| actual.compare(candidate) == Some(Ordering::Equal)),
            Filter::Like { value, .. } => match &actual {
                FieldValue::Text(text) => text.to_lowercase().contains(&value.to_lowercase()),
                _ => false,
            },
            Filter::Range { from, to, .. } => {
                if actual.is_null() {
                    return false;
                }
                let lower_ok = from.as_ref().map_or(true, |bound| {
                    matches!(
                        actual.compare(bound),
                        Some(Ordering::Greater | Ordering::Equal)
                    )
                });
                let upper_ok = to.as_ref().map_or(true, |bound| {
                    matches!(actual.compare(bound), Some(Ordering::Less | Ordering::Equal))
                });
                lower_ok && upper_ok
            }
            Filter::Compare {
                operator, value, ..
            } => actual
                .compare(value)
                .is_some_and(|ordering| operator.accepts(ordering)),
            Filter::IsNull { .. } => actual.is_null(),
        }
    }
}
