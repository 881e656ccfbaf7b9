use std::sync::atomic::{AtomicU8, Ordering};

/// Server lifecycle.
///
/// ```text
/// NotStarted ──► Starting ──► Running ──► Stopping ──► Stopped
///                    └────── (start failed) ──┘
/// ```
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerState {
    NotStarted = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
    Stopped = 4,
}

impl ServerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ServerState::NotStarted,
            1 => ServerState::Starting,
            2 => ServerState::Running,
            3 => ServerState::Stopping,
            _ => ServerState::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServerState::NotStarted => "not_started",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
            ServerState::Stopped => "stopped",
        }
    }
}

/// Atomic holder of [`ServerState`]; every transition is a compare-and-set.
#[derive(Debug)]
pub(crate) struct Lifecycle(AtomicU8);

impl Default for Lifecycle {
    fn default() -> Self {
        Self(AtomicU8::new(ServerState::NotStarted as u8))
    }
}

impl Lifecycle {
    pub(crate) fn get(&self) -> ServerState {
        ServerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn transition(&self, from: ServerState, to: ServerState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn begin_start(&self) -> bool {
        self.transition(ServerState::NotStarted, ServerState::Starting)
    }

    pub(crate) fn mark_running(&self) -> bool {
        self.transition(ServerState::Starting, ServerState::Running)
    }

    /// The single stop gate: `true` for exactly one caller.
    pub(crate) fn begin_stop(&self) -> bool {
        self.transition(ServerState::Running, ServerState::Stopping)
    }

    pub(crate) fn abort_start(&self) -> bool {
        self.transition(ServerState::Starting, ServerState::Stopping)
    }

    pub(crate) fn mark_stopped(&self) {
        self.0.store(ServerState::Stopped as u8, Ordering::Release);
    }
}
