//! Native capability trait definitions

use tether_protocol::{AlertRequest, AlertTicket, BridgeError};

/// Native capabilities the host wires into a script run
pub trait NativeActions: Send + Sync {
    /// Schedule a native alert prompt.
    ///
    /// Returns immediately with a ticket that completes when the user
    /// dismisses the prompt. No timeout is imposed on the interaction;
    /// callers must not assume bounded latency. Fails with
    /// [`BridgeError::UnavailablePrimitive`] when no prompt can be shown.
    fn present_alert(&self, request: &AlertRequest) -> Result<AlertTicket, BridgeError>;

    /// Hand a URL to the operating system's opener, fire-and-forget.
    ///
    /// Success means the hand-off happened, not that any application
    /// handled the URL; a handler-less scheme is only observable through
    /// the opener's exit status, which arrives after this call returns.
    fn dispatch_url(&self, url: &str) -> Result<(), BridgeError>;
}
