//! Single-fire alert completion channel

use std::sync::mpsc::{self, Receiver, SyncSender};

/// Create a completion channel for one alert prompt.
///
/// The presenting side keeps the [`AlertCompleter`] and consumes it when
/// the user finishes with the prompt; the script host blocks on the
/// [`AlertTicket`] when it is ready to deliver the callback. Move
/// semantics make double completion unrepresentable.
#[must_use]
pub fn completion_pair() -> (AlertCompleter, AlertTicket) {
    let (sender, receiver) = mpsc::sync_channel(1);
    (AlertCompleter { sender }, AlertTicket { receiver })
}

/// Sending half of an alert completion
#[derive(Debug)]
pub struct AlertCompleter {
    sender: SyncSender<()>,
}

impl AlertCompleter {
    /// Signal that the prompt finished. Consumes the completer.
    pub fn complete(self) {
        let _ = self.sender.send(());
    }
}

/// Receiving half of an alert completion
#[derive(Debug)]
pub struct AlertTicket {
    receiver: Receiver<()>,
}

impl AlertTicket {
    /// Block until the prompt finishes.
    ///
    /// Returns `false` if the presenting side went away without
    /// completing (host teardown); the completion is then never
    /// delivered, by contract.
    #[must_use]
    pub fn wait(self) -> bool {
        self.receiver.recv().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completes_exactly_once() {
        let (completer, ticket) = completion_pair();
        completer.complete();
        assert!(ticket.wait());
    }

    #[test]
    fn dropped_completer_never_delivers() {
        let (completer, ticket) = completion_pair();
        drop(completer);
        assert!(!ticket.wait());
    }

    #[test]
    fn completion_crosses_threads() {
        let (completer, ticket) = completion_pair();
        let handle = std::thread::spawn(move || {
            completer.complete();
        });
        assert!(ticket.wait());
        handle.join().expect("completer thread");
    }
}
