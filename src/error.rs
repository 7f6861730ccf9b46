//! Relay error types.
//!
//! [`RelayError`] is the central error type for the relay. Handlers catch
//! every variant at the dispatch boundary and convert it into an
//! error-status envelope for the calling session; nothing here is fatal
//! to the process or to the connection.

/// Server-side error enum for the relay core.
///
/// Delivery failures are deliberately not represented here: a failed send
/// to one recipient is reported by the broadcast engine as a per-recipient
/// result list, never as an error crossing the fan-out boundary.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Inbound frame was not parsable as a JSON envelope. Logged and
    /// dropped by the router; no response is sent.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A required field was missing or invalid.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A referenced workspace, channel or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate name on create or rename.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence layer failure, mapped at the store boundary.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the error kind as a static string slice, used in logs and
    /// error envelopes.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_payload",
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Persistence(_) => "persistence_failure",
            Self::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            RelayError::NotFound("workspace acme".to_string()).kind(),
            "not_found"
        );
        assert_eq!(
            RelayError::Conflict("channel general".to_string()).kind(),
            "conflict"
        );
    }

    #[test]
    fn display_includes_detail() {
        let err = RelayError::Validation("missing workspace".to_string());
        assert_eq!(err.to_string(), "invalid request: missing workspace");
    }
}
