//! Bridge error taxonomy

use thiserror::Error;

/// Failures a bridge operation reports synchronously to the calling
/// script.
///
/// Absence of an invocation argument is deliberately not represented
/// here: a missing key is a value, never an error. Asynchronous failure
/// after a prompt has been shown is not modeled either; the only
/// asynchronous event is successful completion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// A required alert request field is absent or has the wrong type
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The request shape itself is unusable
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The native prompt cannot be presented (e.g. headless host)
    #[error("native prompt unavailable: {0}")]
    UnavailablePrimitive(String),

    /// Empty or malformed URL passed to the external dispatcher
    #[error("invalid dispatch target: {0}")]
    InvalidTarget(String),

    /// The hand-off to the OS opener itself failed
    #[error("dispatch failed for {target}: {reason}")]
    DispatchFailed { target: String, reason: String },

    /// Bad `--action` binding or action URI
    #[error("malformed action: {0}")]
    MalformedAction(String),
}
