//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures. Storage and
/// transport concerns belong elsewhere and wrap this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid enum value, missing required field, malformed date.
    ///
    /// Raised before any mutation happens.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced reservation, order, line, supplier or item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation would break a physical invariant (stock below zero,
    /// consuming more than committed, releasing more than is held).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// A reservation status change outside the allowed transition set.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The deployment lacks an optional subsystem (e.g. job reservations).
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFeature(msg.into())
    }

    /// Stable machine-readable code (used by the HTTP layer).
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::Integrity(_) => "integrity_error",
            DomainError::InvalidTransition { .. } => "invalid_transition",
            DomainError::UnsupportedFeature(_) => "unsupported_feature",
        }
    }
}
