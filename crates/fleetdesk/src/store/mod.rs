//! Persistence seam shared by every workflow.
//!
//! Workflows talk to [`Repository`] only. Each call is atomic on its own:
//! `modify` is a single read-modify-write of one row and `modify_many` applies
//! to every requested live row or to none of them.

mod memory;

pub use memory::{InMemoryTable, MemoryStore};

use std::fmt::{Debug, Display};
use std::hash::Hash;

use chrono::{DateTime, Utc};

use crate::query::{FieldValue, Filter, Page, Query, QueryError};

/// Declares a `u64` newtype identifier usable as a [`Record::Id`].
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

pub(crate) use entity_id;

/// A persisted row addressable by a typed integer key.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: Copy
        + Eq
        + Ord
        + Hash
        + Debug
        + Display
        + From<u64>
        + Into<u64>
        + Send
        + Sync
        + 'static;

    /// Singular entity name used in messages, e.g. `driver`.
    const ENTITY: &'static str;
    /// Fields accepted by filters and sort keys.
    const FIELDS: &'static [&'static str];

    fn id(&self) -> Self::Id;
    fn assign_id(&mut self, id: Self::Id);

    /// Projection of a declared field; `None` for undeclared names.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Natural unique key (e.g. a role name); inserts colliding on it conflict.
    fn unique_key(&self) -> Option<String> {
        None
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Storage abstraction so services can be exercised against any backend.
pub trait Repository<T: Record>: Send + Sync {
    /// Assign the next id and store the record.
    fn insert(&self, record: T) -> Result<T, RepositoryError>;

    fn fetch(&self, id: T::Id) -> Result<Option<T>, RepositoryError>;

    /// Apply `change` to one row and persist it in the same step.
    fn modify<F>(&self, id: T::Id, change: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut T);

    /// Apply `change` to every row in `ids`, or to none when any id is missing.
    /// Soft-deleted rows count as missing.
    fn modify_many<F>(&self, ids: &[T::Id], change: F) -> Result<Vec<T>, RepositoryError>
    where
        F: FnMut(&mut T);

    fn find(&self, query: &Query) -> Result<Page<T>, RepositoryError>;

    /// Hard delete every row matching all `filters`; returns the count removed.
    fn delete_where(&self, filters: &[Filter]) -> Result<usize, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} '{key}' already exists")]
    Conflict { entity: &'static str, key: String },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("{entity} ids not found: {}", join_ids(.ids))]
    Missing { entity: &'static str, ids: Vec<u64> },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<QueryError> for RepositoryError {
    fn from(value: QueryError) -> Self {
        RepositoryError::InvalidQuery(value.to_string())
    }
}

pub(crate) fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
