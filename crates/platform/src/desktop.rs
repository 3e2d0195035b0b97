//! Desktop implementation: rfd dialogs and the system URL opener

use std::process::{Command, Stdio};

use tether_protocol::{
    completion_pair, validate_route_target, AlertRequest, AlertTicket, BridgeError,
};

use crate::NativeActions;

/// Desktop implementation of [`NativeActions`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopActions;

impl DesktopActions {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl NativeActions for DesktopActions {
    fn present_alert(&self, request: &AlertRequest) -> Result<AlertTicket, BridgeError> {
        ensure_display_available()?;

        let (completer, ticket) = completion_pair();
        let request = request.clone();
        std::thread::Builder::new()
            .name("tether-alert".into())
            .spawn(move || {
                // Blocks this thread until the user dismisses the prompt
                let _ = rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Info)
                    .set_title(request.title.as_str())
                    .set_description(request.message.as_str())
                    .set_buttons(rfd::MessageButtons::OkCustom(request.action_label.clone()))
                    .show();
                completer.complete();
            })
            .map_err(|e| {
                BridgeError::UnavailablePrimitive(format!("failed to spawn prompt thread: {e}"))
            })?;
        Ok(ticket)
    }

    fn dispatch_url(&self, url: &str) -> Result<(), BridgeError> {
        validate_route_target(url)?;

        let Some(mut command) = opener_command(url) else {
            return Err(BridgeError::DispatchFailed {
                target: url.to_string(),
                reason: "no URL opener on this platform".into(),
            });
        };
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BridgeError::DispatchFailed {
                target: url.to_string(),
                reason: e.to_string(),
            })?;

        // Ownership transferred; a later non-zero exit (e.g. no handler
        // for the scheme) is logged, not raised.
        let target = url.to_string();
        std::thread::spawn(move || match child.wait() {
            Ok(status) if !status.success() => {
                tracing::warn!(%target, %status, "URL opener reported failure");
            }
            Err(error) => {
                tracing::warn!(%target, %error, "failed to wait on URL opener");
            }
            Ok(_) => {}
        });
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn ensure_display_available() -> Result<(), BridgeError> {
    let has_display = std::env::var_os("DISPLAY").is_some_and(|v| !v.is_empty())
        || std::env::var_os("WAYLAND_DISPLAY").is_some_and(|v| !v.is_empty());
    if has_display {
        Ok(())
    } else {
        Err(BridgeError::UnavailablePrimitive(
            "no display server (DISPLAY/WAYLAND_DISPLAY unset)".into(),
        ))
    }
}

#[cfg(not(target_os = "linux"))]
fn ensure_display_available() -> Result<(), BridgeError> {
    Ok(())
}

#[cfg(target_os = "macos")]
fn opener_command(url: &str) -> Option<Command> {
    let mut command = Command::new("open");
    command.arg(url);
    Some(command)
}

#[cfg(target_os = "linux")]
fn opener_command(url: &str) -> Option<Command> {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    Some(command)
}

#[cfg(target_os = "windows")]
fn opener_command(url: &str) -> Option<Command> {
    let mut command = Command::new("cmd");
    command.arg("/C").arg("start").arg("").arg(url);
    Some(command)
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn opener_command(_url: &str) -> Option<Command> {
    None
}
