//! Error types for the Burrow mapping system
//!
//! Errors are structured with fields to aid debugging in production. Each
//! variant carries the identities involved so a conflict can be reconciled
//! manually from the error message alone.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for Burrow mapping operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Two different mappings compete for the same identity.
    ///
    /// The caller must not proceed with the conflicting write; the original
    /// mapping stays intact.
    #[error("mapping conflict for {kind}: existing mapping [{existing}] conflicts with [{rejected}]")]
    Conflict {
        /// Kind the mappings belong to
        kind: String,
        /// The mapping already recorded in the store
        existing: String,
        /// The mapping whose registration was rejected
        rejected: String,
    },

    /// No mapper is registered for a kind.
    ///
    /// A configuration bug: the kind is unknown or its sync feature is
    /// disabled. Fatal for the enclosing reconcile attempt, not retryable.
    #[error("no mapper registered for {gvk}")]
    UnknownKind {
        /// The kind that was looked up
        gvk: String,
    },

    /// A reverse-index lookup matched more than one virtual object.
    #[error("ambiguous reverse lookup for {kind} key {key}: {candidates} candidates")]
    Ambiguous {
        /// Kind being looked up
        kind: String,
        /// Host identity key used for the lookup
        key: String,
        /// Number of virtual objects claiming the key
        candidates: usize,
    },

    /// The reverse-lookup index is in an inconsistent state.
    ///
    /// Distinguished from "no mapping exists": this indicates cache
    /// corruption. The caller decides whether to skip the reconcile or
    /// treat it as fatal; the library never aborts the process.
    #[error("index inconsistency for {kind} key {key}: {message}")]
    IndexInconsistent {
        /// Kind being looked up
        kind: String,
        /// Host identity key used for the lookup
        key: String,
        /// Description of the inconsistency
        message: String,
    },

    /// Invalid configuration or object name
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g. "sync.ingresses")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g. "store", "migration")
        context: String,
    },
}

impl Error {
    /// Create a conflict error naming both mappings involved
    pub fn conflict(
        kind: impl ToString,
        existing: impl ToString,
        rejected: impl ToString,
    ) -> Self {
        Self::Conflict {
            kind: kind.to_string(),
            existing: existing.to_string(),
            rejected: rejected.to_string(),
        }
    }

    /// Create an unknown-kind error for a failed registry lookup
    pub fn unknown_kind(gvk: impl ToString) -> Self {
        Self::UnknownKind {
            gvk: gvk.to_string(),
        }
    }

    /// Create an ambiguous-lookup error
    pub fn ambiguous(kind: impl ToString, key: impl ToString, candidates: usize) -> Self {
        Self::Ambiguous {
            kind: kind.to_string(),
            key: key.to_string(),
            candidates,
        }
    }

    /// Create an index-inconsistency error
    pub fn index_inconsistent(
        kind: impl ToString,
        key: impl ToString,
        msg: impl Into<String>,
    ) -> Self {
        Self::IndexInconsistent {
            kind: kind.to_string(),
            key: key.to_string(),
            message: msg.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with a field path
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Conflicts, unknown kinds, ambiguity and validation errors require a
    /// configuration or state fix; retrying will not resolve them.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => {
                // Retry on transient K8s errors, not on 4xx responses
                !matches!(
                    source,
                    kube::Error::Api(ae) if (400..500).contains(&ae.code)
                )
            }
            Error::Conflict { .. } => false,
            Error::UnknownKind { .. } => false,
            Error::Ambiguous { .. } => false,
            Error::IndexInconsistent { .. } => false,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}
