//! Tether Platform Abstraction
//!
//! OS-facing implementations of the bridge's two native capabilities:
//! presenting an alert prompt and handing a URL to the system opener.
//!
//! Platform support levels:
//! - macOS / Windows: alert and dispatch fully supported
//! - Linux: requires a display server for alerts; dispatch via `xdg-open`
//! - Headless hosts: alerts fail with `UnavailablePrimitive`

mod desktop;
mod traits;

pub use desktop::*;
pub use traits::*;
