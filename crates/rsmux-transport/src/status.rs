use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

/// Lifecycle state of one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    NotConnected,
    Connecting,
    Connected,
    Closed,
    Error(String),
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Closed and Error end a transport generation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionStatus::Closed | ConnectionStatus::Error(_))
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::NotConnected => f.write_str("not connected"),
            ConnectionStatus::Connecting => f.write_str("connecting"),
            ConnectionStatus::Connected => f.write_str("connected"),
            ConnectionStatus::Closed => f.write_str("closed"),
            ConnectionStatus::Error(cause) => write!(f, "error ({cause})"),
        }
    }
}

/// Receives every status change, in order, starting after subscription.
pub type StatusObserver = mpsc::UnboundedReceiver<ConnectionStatus>;

/// Current status plus the observers to notify when it changes.
///
/// Cloned handles share state, so the status can be read and observed from
/// outside the task that owns the transport.
#[derive(Debug, Clone)]
pub struct StatusBroadcast {
    inner: Arc<Mutex<StatusState>>,
}

#[derive(Debug)]
struct StatusState {
    current: ConnectionStatus,
    observers: Vec<mpsc::UnboundedSender<ConnectionStatus>>,
}

impl Default for StatusBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBroadcast {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatusState {
                current: ConnectionStatus::NotConnected,
                observers: Vec::new(),
            })),
        }
    }

    pub fn current(&self) -> ConnectionStatus {
        self.lock().current.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.lock().current.is_connected()
    }

    /// Register an observer for subsequent changes.
    pub fn subscribe(&self) -> StatusObserver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().observers.push(tx);
        rx
    }

    /// Move to `next`, notifying observers. Returns false (and notifies
    /// nobody) when `next` equals the current status.
    pub(crate) fn transition(&self, next: ConnectionStatus) -> bool {
        let mut state = self.lock();
        if state.current == next {
            return false;
        }
        state.current = next.clone();
        state
            .observers
            .retain(|observer| observer.send(next.clone()).is_ok());
        true
    }

    fn lock(&self) -> MutexGuard<'_, StatusState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_notifies_only_on_change() {
        let status = StatusBroadcast::new();
        let mut observer = status.subscribe();

        assert!(status.transition(ConnectionStatus::Connecting));
        assert!(!status.transition(ConnectionStatus::Connecting));
        assert!(status.transition(ConnectionStatus::Connected));
        assert!(status.transition(ConnectionStatus::Error("reset".to_string())));
        assert!(!status.transition(ConnectionStatus::Error("reset".to_string())));

        assert_eq!(observer.try_recv().unwrap(), ConnectionStatus::Connecting);
        assert_eq!(observer.try_recv().unwrap(), ConnectionStatus::Connected);
        assert_eq!(
            observer.try_recv().unwrap(),
            ConnectionStatus::Error("reset".to_string())
        );
        assert!(observer.try_recv().is_err());
    }

    #[test]
    fn test_dropped_observers_are_pruned() {
        let status = StatusBroadcast::new();
        let dropped = status.subscribe();
        let mut kept = status.subscribe();
        drop(dropped);

        status.transition(ConnectionStatus::Connecting);
        assert_eq!(status.lock().observers.len(), 1);
        assert_eq!(kept.try_recv().unwrap(), ConnectionStatus::Connecting);
    }

    #[test]
    fn test_clones_share_state() {
        let status = StatusBroadcast::new();
        let view = status.clone();
        status.transition(ConnectionStatus::Connected);
        assert!(view.is_connected());
        assert_eq!(view.current().to_string(), "connected");
    }
}
