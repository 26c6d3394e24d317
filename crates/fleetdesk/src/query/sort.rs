use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::FieldValue;
use crate::store::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One ordering key; keys apply in sequence, ties fall back to record id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

pub(crate) fn compare_records<R: Record>(left: &R, right: &R, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let a = left.field(&key.field).unwrap_or(FieldValue::Null);
        let b = right.field(&key.field).unwrap_or(FieldValue::Null);
        // Nulls sort first ascending.
        let ordering = match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a.compare(&b).unwrap_or(Ordering::Equal),
        };
        let ordering = match key.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.id().cmp(&right.id())
}
