//! Shared error taxonomy for the Groovy language server engine (`SPEC_FULL.md` §7, §10.2).
//!
//! Individual crates define their own narrow `thiserror` enums for their own failure
//! modes (a parse facade error, a workspace-index I/O error, ...) and convert them into
//! [`EngineError`] at the point where the error crosses into shared engine state (the
//! compilation service, the coordinator). [`EngineError`] is the vocabulary the
//! coordinator and the external boundary actually match on; library crates should
//! otherwise return their own error type, not this one, so call sites keep their
//! specific `match` arms.
//!
//! Cancellation is modelled separately from failure: [`EngineError::Cancelled`] is
//! expected on supersession or shutdown and must never be logged at `error` level (§7).

use thiserror::Error;

/// The coarse error taxonomy from `SPEC_FULL.md` §7, used to decide how an error is
/// surfaced (diagnostic, status notification, silent suppression, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A parse-time failure; surfaced as a diagnostic on the offending URI, never fatal.
    ParseError,
    /// An identifier with no binding or type; degrades the relevant query, not fatal.
    ResolutionError,
    /// A diagnostic provider raised; logged and suppressed, peers unaffected.
    ProviderError,
    /// Expected cancellation from supersession or shutdown; not logged as an error.
    Cancellation,
    /// Classpath/dependency resolution failure; engine stays usable on open documents.
    DependencyError,
    /// Unrecoverable; status becomes `(error, true, ...)`.
    Fatal,
}

/// The shared error type for operations that span the compilation/coordination layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A parse-time failure for a specific document.
    #[error("parse error in {uri}: {message}")]
    Parse {
        /// The document URI that failed to parse.
        uri: String,
        /// Human-readable description of the failure.
        message: String,
    },

    /// A name or type reference could not be resolved.
    #[error("unresolved reference in {uri}: {message}")]
    Resolution {
        /// The document URI containing the unresolved reference.
        uri: String,
        /// Human-readable description of the failure.
        message: String,
    },

    /// A diagnostics provider raised an error while analysing a document.
    #[error("diagnostic provider '{provider_id}' failed for {uri}: {message}")]
    Provider {
        /// The provider's own identifier (`SPEC_FULL.md` §4.9).
        provider_id: String,
        /// The document URI being analysed when the provider failed.
        uri: String,
        /// Human-readable description of the failure.
        message: String,
    },

    /// The operation was cancelled by a superseding write or a shutdown request.
    #[error("operation cancelled")]
    Cancelled,

    /// The classpath resolver failed to resolve dependencies or source roots.
    #[error("dependency resolution failed: {message}")]
    Dependency {
        /// Human-readable description of the failure.
        message: String,
    },

    /// An unrecoverable internal failure (e.g. the worker pool could not be created).
    #[error("fatal engine error: {message}")]
    Fatal {
        /// Human-readable description of the failure.
        message: String,
    },
}

impl EngineError {
    /// The coarse taxonomy kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Parse { .. } => ErrorKind::ParseError,
            EngineError::Resolution { .. } => ErrorKind::ResolutionError,
            EngineError::Provider { .. } => ErrorKind::ProviderError,
            EngineError::Cancelled => ErrorKind::Cancellation,
            EngineError::Dependency { .. } => ErrorKind::DependencyError,
            EngineError::Fatal { .. } => ErrorKind::Fatal,
        }
    }

    /// Whether this error represents expected cancellation rather than a true failure.
    ///
    /// Call sites use this to skip error-level logging per §7's propagation policy.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }

    /// Whether the engine should keep serving open documents after this error.
    ///
    /// Everything except [`EngineError::Fatal`] leaves the engine usable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Fatal { .. })
    }
}

/// Convenience alias for fallible engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
