// crates/trustchain-daemon/src/state.rs
//
// Node lifecycle for the Trustchain daemon.
//
// Valid transitions:
//   Initializing -> Syncing -> Ready
//   Any state -> ShuttingDown

use std::fmt;

/// Lifecycle states of the daemon node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    /// Loading configuration and mining genesis.
    Initializing,
    /// Running the first synchronization round against configured peers.
    Syncing,
    /// Serving the engine; background sync and sealing are running.
    Ready,
    ShuttingDown,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Initializing => write!(f, "Initializing"),
            NodeState::Syncing => write!(f, "Syncing"),
            NodeState::Ready => write!(f, "Ready"),
            NodeState::ShuttingDown => write!(f, "ShuttingDown"),
        }
    }
}

pub struct NodeStateMachine {
    pub current: NodeState,
}

impl NodeStateMachine {
    pub fn new() -> Self {
        Self {
            current: NodeState::Initializing,
        }
    }

    /// Move to `new_state`, or explain why that transition is not allowed.
    pub fn transition(&mut self, new_state: NodeState) -> Result<(), String> {
        let valid = matches!(
            (&self.current, &new_state),
            (_, NodeState::ShuttingDown)
                | (NodeState::Initializing, NodeState::Syncing)
                | (NodeState::Syncing, NodeState::Ready)
        );

        if !valid {
            return Err(format!(
                "Invalid state transition: {} -> {}",
                self.current, new_state
            ));
        }
        tracing::info!("State transition: {} -> {}", self.current, new_state);
        self.current = new_state;
        Ok(())
    }
}

impl Default for NodeStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
