use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accessor::Cardinality;
use crate::overrides::OverrideMode;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_INVALID_SOCKET_NAME: &str = "AF-SOCK-001";
pub const ERR_MALFORMED_MARKER: &str = "AF-SOCK-002";
pub const ERR_INVALID_OVERRIDE_TARGET: &str = "AF-SOCK-003";
pub const ERR_INVALID_OVERRIDE_SHAPE: &str = "AF-SOCK-004";
pub const ERR_UNRECOGNIZED_OVERRIDE: &str = "AF-SOCK-005";
pub const ERR_TOO_MANY_OVERRIDES: &str = "AF-SOCK-006";
pub const ERR_MISSING_REQUIRED_OVERRIDE: &str = "AF-SOCK-007";
pub const ERR_PARSE: &str = "AF-SOCK-008";
pub const ERR_CONFIG: &str = "AF-SOCK-009";

/// Code carried by the non-fatal unused-override diagnostic.
pub const WARN_UNUSED_OVERRIDE: &str = "AF-SOCK-W01";

// ═══════════════════════════════════════════════════════════════════════════════
// FATAL ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Every fatal condition of the socket engine. All of them abort the current
/// compile or render pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    #[error("invalid af-sock=\"{name}\" under \"{namespace}\"")]
    InvalidSocketName { name: String, namespace: String },

    #[error("malformed socket marker \"{marker}\": {reason}")]
    MalformedEncodedMarker { marker: String, reason: String },

    #[error("override target \"{target}\" is not valid in \"{namespace}\" namespace")]
    InvalidOverrideTarget { namespace: String, target: String },

    #[error("override \"{target}\" in \"{namespace}\": {mode} mode {reason}")]
    InvalidOverrideShape {
        namespace: String,
        target: String,
        mode: OverrideMode,
        reason: String,
    },

    #[error("{namespace}: unrecognized override \"{socket}\"")]
    UnrecognizedOverride { namespace: String, socket: String },

    #[error("{namespace}: socket \"{socket}\" ({cardinality}) got {count} overrides")]
    TooManyOverrides {
        namespace: String,
        socket: String,
        cardinality: Cardinality,
        count: usize,
    },

    #[error("{namespace}: missing required override \"{socket}\" ({cardinality})")]
    MissingRequiredOverride {
        namespace: String,
        socket: String,
        cardinality: Cardinality,
    },

    #[error("failed to parse document \"{file}\": {message}")]
    Parse { file: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SocketError {
    pub fn code(&self) -> &'static str {
        match self {
            SocketError::InvalidSocketName { .. } => ERR_INVALID_SOCKET_NAME,
            SocketError::MalformedEncodedMarker { .. } => ERR_MALFORMED_MARKER,
            SocketError::InvalidOverrideTarget { .. } => ERR_INVALID_OVERRIDE_TARGET,
            SocketError::InvalidOverrideShape { .. } => ERR_INVALID_OVERRIDE_SHAPE,
            SocketError::UnrecognizedOverride { .. } => ERR_UNRECOGNIZED_OVERRIDE,
            SocketError::TooManyOverrides { .. } => ERR_TOO_MANY_OVERRIDES,
            SocketError::MissingRequiredOverride { .. } => ERR_MISSING_REQUIRED_OVERRIDE,
            SocketError::Parse { .. } => ERR_PARSE,
            SocketError::Config(_) => ERR_CONFIG,
        }
    }

    /// Namespace the failure was raised in, when the variant has one.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            SocketError::InvalidSocketName { namespace, .. }
            | SocketError::InvalidOverrideTarget { namespace, .. }
            | SocketError::InvalidOverrideShape { namespace, .. }
            | SocketError::UnrecognizedOverride { namespace, .. }
            | SocketError::TooManyOverrides { namespace, .. }
            | SocketError::MissingRequiredOverride { namespace, .. } => Some(namespace),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SocketError {
    fn from(e: serde_json::Error) -> Self {
        SocketError::Config(e.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NON-FATAL DIAGNOSTICS
// ═══════════════════════════════════════════════════════════════════════════════

/// Warning-level report kept apart from `SocketError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub namespace: String,
    pub socket: String,
    pub message: String,
}

impl Diagnostic {
    pub fn unused_override(namespace: &str, socket: &str) -> Self {
        Self {
            code: WARN_UNUSED_OVERRIDE.to_string(),
            namespace: namespace.to_string(),
            socket: socket.to_string(),
            message: format!("{}: unused override \"{}\"", namespace, socket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_name_message_carries_namespace() {
        let err = SocketError::InvalidSocketName {
            name: "9lives".to_string(),
            namespace: "home.hero".to_string(),
        };
        assert_eq!(err.to_string(), "invalid af-sock=\"9lives\" under \"home.hero\"");
        assert_eq!(err.code(), ERR_INVALID_SOCKET_NAME);
        assert_eq!(err.namespace(), Some("home.hero"));
    }

    #[test]
    fn test_config_error_from_json() {
        let err: SocketError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert_eq!(err.code(), ERR_CONFIG);
        assert_eq!(err.namespace(), None);
    }
}
