//! Server lifecycle states

use std::fmt;

/// Lifecycle of one managed server instance.
///
/// `Failed` is transient: a start attempt that loses its reservation or
/// bind passes through it and settles back at `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

impl ServerState {
    /// States in which a new `start` call is an idempotent no-op.
    pub fn is_start_in_progress(self) -> bool {
        matches!(self, ServerState::Starting | ServerState::Running)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
            ServerState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}
