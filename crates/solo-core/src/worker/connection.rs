use thiserror::Error;
use tokio::sync::watch;

use solo_model::ConnectionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid connection transition {from} -> {to}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

/// Observable connection state of one worker.
///
/// Anyone may read or subscribe; only the connection supervisor and teardown write.
#[derive(Debug)]
pub struct ConnectionCell {
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionCell {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::Pending);
        Self { tx }
    }

    pub fn state(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Receiver notified on every accepted transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    pub(crate) fn mark_online(&self) -> Result<(), TransitionError> {
        self.transition(ConnectionState::Online).map(|_| ())
    }

    /// Move to `Terminated`, returning the previous state.
    pub(crate) fn terminate(&self) -> Result<ConnectionState, TransitionError> {
        self.transition(ConnectionState::Terminated)
    }

    fn transition(&self, to: ConnectionState) -> Result<ConnectionState, TransitionError> {
        let mut result = Err(TransitionError {
            from: to,
            to,
        });
        self.tx.send_if_modified(|cur| {
            if cur.can_transition_to(to) {
                result = Ok(*cur);
                *cur = to;
                true
            } else {
                result = Err(TransitionError { from: *cur, to });
                false
            }
        });
        result
    }
}

impl Default for ConnectionCell {
    fn default() -> Self {
        Self::new()
    }
}
