use std::sync::Arc;

use crate::tasks::handle::TaskHandle;

/// Per-fire context handed to a task invocable.
#[derive(Clone, Debug)]
pub struct TaskContext {
    name: Arc<str>,
    fire: u64,
    handle: TaskHandle,
}

impl TaskContext {
    pub(crate) fn new(name: Arc<str>, fire: u64, handle: TaskHandle) -> Self {
        Self { name, fire, handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based ordinal of the current fire.
    pub fn fire(&self) -> u64 {
        self.fire
    }

    /// Cancels the task from inside; the current fire finishes normally.
    pub fn stop(&self) {
        self.handle.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.handle.is_cancelled()
    }
}
