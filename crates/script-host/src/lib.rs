//! Tether Script Host
//!
//! QuickJS sandbox for running user automation scripts with the bridge
//! installed as a single global object.
//!
//! ## Bridge API
//!
//! Scripts see one global (default name `tether`):
//!
//! - `tether.args` - invocation arguments; `args.get(key)` or `args[key]`
//! - `tether.pasteboard` - shared cell, property-style read/write
//! - `tether.alert({title, message, action}, onComplete)` - native prompt
//!   with a one-time completion callback
//! - `tether.routeTo(url)` - hand a URL to the OS opener, fire-and-forget
//! - `console.log(...)` - print to script output

mod bindings;
mod runtime;

pub use bindings::*;
pub use runtime::*;

use tether_protocol::{AlertRequest, AlertTicket, BridgeError, RunId};
use thiserror::Error;

/// Errors from script execution
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script execution timed out")]
    Timeout,

    #[error("Script was cancelled")]
    Cancelled,

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("Runtime initialization failed: {0}")]
    InitError(String),
}

/// Script execution result
#[derive(Debug, Clone)]
pub struct ScriptResult {
    pub output: String,
    pub return_value: Option<String>,
}

/// Configuration for script execution
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    /// Maximum execution time in milliseconds
    pub timeout_ms: u64,
    /// Maximum memory usage in bytes
    pub memory_limit: usize,
    /// Name of the bridge global installed in the script context
    pub global_name: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,             // 30 seconds
            memory_limit: 64 * 1024 * 1024, // 64 MB
            global_name: "tether".into(),
        }
    }
}

/// Request from script to host
#[derive(Debug)]
pub enum HostRequest {
    /// Present a native alert prompt
    PresentAlert { request: AlertRequest },
    /// Hand a URL to the OS opener
    RouteTo { url: String },
}

/// Response from host to script
#[derive(Debug)]
pub enum HostResponse {
    /// Operation succeeded
    Ok,
    /// Prompt scheduled; completion arrives on the ticket
    AlertPending(AlertTicket),
    /// Operation failed
    Error(BridgeError),
}

/// Event emitted during script execution
#[derive(Debug, Clone)]
pub enum ScriptEvent {
    /// Script produced output
    Output { run_id: RunId, text: String },
    /// Script finished
    Finished { run_id: RunId, status: ScriptStatus },
}

/// Script completion status
#[derive(Debug, Clone)]
pub enum ScriptStatus {
    Success,
    Error { message: String },
    Cancelled,
    Timeout,
}
