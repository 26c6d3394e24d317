//! Transport-agnostic failure taxonomy shared by every workflow.
//!
//! Business-rule failures, field validation failures and system failures are
//! kept apart so adapters can render each the way their client expects.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::store::RepositoryError;

/// Per-field validation messages, ordered by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

const INVALID_DATA: &str = "The given data was invalid.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidArgument,
    InsufficientAuthority,
    Validation,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code carried in API envelopes.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InsufficientAuthority => "insufficient_authority",
            ErrorKind::Validation => "validation_failed",
            ErrorKind::Internal => "internal_error",
        }
    }
}

/// Error raised by the workflow services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    InsufficientAuthority(String),
    #[error("{message}")]
    Validation { message: String, fields: FieldErrors },
    #[error("{0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        DomainError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        DomainError::Conflict(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        DomainError::InvalidArgument(message.into())
    }

    pub fn insufficient_authority(message: impl Into<String>) -> Self {
        DomainError::InsufficientAuthority(message.into())
    }

    /// Validation failure on a single field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        DomainError::Validation {
            message: INVALID_DATA.to_string(),
            fields,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            DomainError::InsufficientAuthority(_) => ErrorKind::InsufficientAuthority,
            DomainError::Validation { .. } => ErrorKind::Validation,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn error_code(&self) -> &'static str {
        self.kind().code()
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            DomainError::Validation { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

impl From<RepositoryError> for DomainError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict { .. } => DomainError::Conflict(value.to_string()),
            RepositoryError::NotFound { .. } | RepositoryError::Missing { .. } => {
                DomainError::NotFound(value.to_string())
            }
            RepositoryError::InvalidQuery(message) => DomainError::InvalidArgument(message),
            RepositoryError::Unavailable(_) => DomainError::Internal(value.to_string()),
        }
    }
}

/// Collects field-level problems before a write and turns them into one
/// [`DomainError::Validation`].
#[derive(Debug, Default)]
pub struct Violations {
    fields: FieldErrors,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn require_text(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{field} is required"));
        }
    }

    pub fn require_email(&mut self, field: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, format!("{field} is required"));
            return;
        }
        let plausible = value
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !plausible {
            self.add(field, format!("{field} must be a valid email address"));
        }
    }

    pub fn check(&mut self, field: &str, condition: bool, message: impl Into<String>) {
        if !condition {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn finish(self) -> Result<(), DomainError> {
        if self.fields.is_empty() {
            return Ok(());
        }
        Err(DomainError::Validation {
            message: INVALID_DATA.to_string(),
            fields: self.fields,
        })
    }
}
