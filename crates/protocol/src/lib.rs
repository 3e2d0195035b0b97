//! Tether Protocol
//!
//! Defines the bridge contract between a user script and its host: the
//! invocation argument store, the shared cell value, alert requests and
//! their single-fire completions, action bindings, and the error
//! taxonomy. This crate is the source of truth for what a script may
//! observe through the bridge.

mod action;
mod args;
mod completion;
mod error;
mod types;

pub use action::*;
pub use args::*;
pub use completion::*;
pub use error::*;
pub use types::*;

/// Bridge contract version for compatibility checking
pub const BRIDGE_VERSION: u32 = 1;
