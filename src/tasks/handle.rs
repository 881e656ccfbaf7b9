use tokio_util::sync::CancellationToken;

/// Cancellation capability for one scheduled task.
///
/// Exposes only `cancel` / `is_cancelled`; clones share the same state.
///
/// # Example
/// ```
/// use bootvisor::tasks::TaskHandle;
///
/// let handle = TaskHandle::new();
/// let clone = handle.clone();
/// clone.cancel();
/// assert!(handle.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct TaskHandle {
    token: CancellationToken,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops future fires. An in-flight fire runs to completion.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}
