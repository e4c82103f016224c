//! Cooperative shutdown and node lifecycle state

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Shared cancellation flag passed into every pipeline loop
///
/// Every loop checks the token at the top of each iteration and exits
/// cleanly when it fires; sleeps inside the loops are bounded so stop
/// latency is bounded too.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Create a fresh, unfired token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the token. Idempotent.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Processing-loop lifecycle state
///
/// Shared shape of the detection and collector loops:
/// WAITING -> (samples available) -> PROCESSING -> (published/persisted)
/// -> WAITING; STOPPED is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeState {
    Waiting = 0,
    Processing = 1,
    Stopped = 2,
}

/// Lock-free cell holding a `NodeState`, readable from other tasks
#[derive(Debug)]
pub struct NodeStateCell(AtomicU8);

impl Default for NodeStateCell {
    fn default() -> Self {
        Self(AtomicU8::new(NodeState::Waiting as u8))
    }
}

impl NodeStateCell {
    /// Start in WAITING.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn get(&self) -> NodeState {
        match self.0.load(Ordering::Relaxed) {
            0 => NodeState::Waiting,
            1 => NodeState::Processing,
            _ => NodeState::Stopped,
        }
    }

    /// Transition to a new state. STOPPED is sticky.
    pub fn set(&self, state: NodeState) {
        if self.get() == NodeState::Stopped {
            return;
        }
        self.0.store(state as u8, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_fires_once_visible_everywhere() {
        let token = ShutdownToken::new();
        let clone = token.clone();
        assert!(!clone.is_shutdown());
        token.shutdown();
        assert!(clone.is_shutdown());
        token.shutdown();
        assert!(token.is_shutdown());
    }

    #[test]
    fn test_stopped_is_terminal() {
        let cell = NodeStateCell::new();
        assert_eq!(cell.get(), NodeState::Waiting);
        cell.set(NodeState::Processing);
        assert_eq!(cell.get(), NodeState::Processing);
        cell.set(NodeState::Stopped);
        cell.set(NodeState::Waiting);
        assert_eq!(cell.get(), NodeState::Stopped);
    }
}
