//! Error types for Seedbed
//!
//! Errors are structured with fields to aid debugging in production.
//! Each variant carries enough context (namespace, object name, field path)
//! for the reconciler to report which input broke a compile.

use thiserror::Error;

/// Main error type for Seedbed operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A referenced object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Kind of the missing object (e.g., "Secret")
        kind: String,
        /// Namespace that was searched
        namespace: String,
        /// Name of the missing object
        name: String,
    },

    /// A referenced key is absent from a Secret's data
    #[error("key {key:?} not found in Secret {namespace}/{secret}")]
    MissingKey {
        /// Namespace of the Secret
        namespace: String,
        /// Name of the Secret
        secret: String,
        /// The data key that was requested
        key: String,
    },

    /// Declared-base64 inline content could not be decoded
    #[error("failed to decode content for {path}: {message}")]
    Decode {
        /// Target path of the file whose content is malformed
        path: String,
        /// Description of the decoding failure
        message: String,
    },

    /// The operation was cancelled by the caller
    #[error("cancelled while {context}")]
    Cancelled {
        /// What was in flight when cancellation was observed
        context: String,
    },

    /// Invalid input
    #[error("validation error at {field}: {message}")]
    Validation {
        /// Field path of the invalid value (e.g., "spec.files[0].path")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a not-found error for a namespaced object
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create an error for a key missing from a Secret
    pub fn missing_key(
        namespace: impl Into<String>,
        secret: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self::MissingKey {
            namespace: namespace.into(),
            secret: secret.into(),
            key: key.into(),
        }
    }

    /// Create a decode error for the file at `path`
    pub fn decode(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a cancellation error describing the interrupted work
    pub fn cancelled(context: impl Into<String>) -> Self {
        Self::Cancelled {
            context: context.into(),
        }
    }

    /// Create a validation error for the given field path
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Check if this error means a referenced object does not exist
    ///
    /// Covers both our own `NotFound` and a 404 surfaced by the API server.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            _ => false,
        }
    }

    /// Check if this error is retryable
    ///
    /// A missing Secret may appear later and a cancelled compile can simply be
    /// run again. Malformed input needs a spec change first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => ae.code == 404 || !(400..500).contains(&ae.code),
                _ => true,
            },
            Error::NotFound { .. } => true,
            Error::Cancelled { .. } => true,
            Error::MissingKey { .. } => false,
            Error::Decode { .. } => false,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
        }
    }

    /// Get the field path if this is a validation error
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: u16) -> Error {
        Error::from(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "Test".to_string(),
            code,
        }))
    }

    // ==========================================================================
    // Story Tests: Errors a reconciler sees from a compile
    // ==========================================================================

    /// Story: a file references a Secret that has not been created yet
    #[test]
    fn story_missing_secret_names_the_object() {
        let err = Error::not_found("Secret", "shoot--foo", "cloud-config");
        assert_eq!(err.to_string(), "Secret shoot--foo/cloud-config not found");
        assert!(err.is_not_found());
        assert!(err.is_retryable());
    }

    /// Story: the Secret exists but lacks the referenced key
    #[test]
    fn story_missing_key_is_permanent() {
        let err = Error::missing_key("shoot--foo", "cloud-config", "kubelet.conf");
        assert!(err.to_string().contains("\"kubelet.conf\""));
        assert!(err.to_string().contains("shoot--foo/cloud-config"));
        assert!(!err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn decode_and_validation_errors_are_not_retryable() {
        let err = Error::decode("/etc/foo", "invalid padding");
        assert_eq!(
            err.to_string(),
            "failed to decode content for /etc/foo: invalid padding"
        );
        assert!(!err.is_retryable());

        let err = Error::validation("spec.files[1].path", "must be absolute");
        assert_eq!(err.field(), Some("spec.files[1].path"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn cancellation_can_be_retried() {
        let err = Error::cancelled("fetching Secret ns/foo");
        assert_eq!(err.to_string(), "cancelled while fetching Secret ns/foo");
        assert!(err.is_retryable());
        assert_eq!(err.field(), None);
    }

    /// Story: the API server answers 404 instead of the getter mapping it
    #[test]
    fn story_api_404_counts_as_not_found() {
        let err = api_error(404);
        assert!(err.is_not_found());
        assert!(err.is_retryable());
    }

    #[test]
    fn client_errors_other_than_404_are_permanent() {
        assert!(!api_error(403).is_retryable());
        assert!(!api_error(403).is_not_found());
        assert!(api_error(503).is_retryable());
    }

    #[test]
    fn serialization_error_keeps_kind() {
        match Error::serialization_for_kind("Secret", "bad yaml") {
            Error::Serialization { kind, message } => {
                assert_eq!(kind.as_deref(), Some("Secret"));
                assert_eq!(message, "bad yaml");
            }
            other => panic!("expected Serialization, got {other:?}"),
        }
    }
}
