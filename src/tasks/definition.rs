use std::any::{Any, type_name};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::components::BeanRegistry;
use crate::cron::Schedule;
use crate::error::{ScheduleError, TaskError};
use crate::tasks::context::TaskContext;
use crate::tasks::task::Invocable;

/// Schedule attributes attached to a task method.
///
/// # Example
/// ```
/// use bootvisor::tasks::Scheduled;
///
/// let attrs = Scheduled::cron("0 */5 * * * *").named("report");
/// assert_eq!(attrs.name.as_deref(), Some("report"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scheduled {
    /// Explicit task name; `None` gets `task-N`.
    pub name: Option<String>,
    pub cron: Option<String>,
    pub delay_ms: Option<u64>,
}

impl Scheduled {
    pub fn cron(expr: impl Into<String>) -> Self {
        Self {
            cron: Some(expr.into()),
            ..Self::default()
        }
    }

    pub fn fixed_delay(ms: u64) -> Self {
        Self {
            delay_ms: Some(ms),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|n: &String| !n.trim().is_empty());
        self
    }
}

type Binder = Arc<dyn Fn(Arc<dyn BeanRegistry>) -> Invocable + Send + Sync>;

/// A task method discovered on a component, before it becomes a [`Task`](crate::tasks::Task).
///
/// The binder resolves the owning component from the registry on every
/// fire, so the target only has to be registered by the time the task runs.
#[derive(Clone)]
pub struct TaskDefinition {
    owner: &'static str,
    method: &'static str,
    attrs: Scheduled,
    binder: Binder,
}

impl TaskDefinition {
    /// Captures `f` as the task body for component type `T`.
    pub fn for_method<T, F>(method: &'static str, attrs: Scheduled, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &TaskContext) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let binder: Binder = Arc::new(move |registry: Arc<dyn BeanRegistry>| {
            let f = Arc::clone(&f);
            Arc::new(move |ctx: &TaskContext| {
                let target = registry.get::<T>().ok_or(TaskError::TargetMissing {
                    type_name: type_name::<T>(),
                })?;
                f(&target, ctx)
            }) as Invocable
        });
        Self {
            owner: type_name::<T>(),
            method,
            attrs,
            binder,
        }
    }

    /// Type name of the owning component.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    pub fn attrs(&self) -> &Scheduled {
        &self.attrs
    }

    pub fn schedule(&self) -> Result<Schedule, ScheduleError> {
        Schedule::resolve(self.attrs.cron.as_deref(), self.attrs.delay_ms)
    }

    pub(crate) fn bind(&self, registry: Arc<dyn BeanRegistry>) -> Invocable {
        (self.binder)(registry)
    }
}

impl std::fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("owner", &self.owner)
            .field("method", &self.method)
            .field("attrs", &self.attrs)
            .finish()
    }
}

/// Generator for `task-0`, `task-1`, ... names.
#[derive(Debug, Default)]
pub struct NameSequence {
    next: AtomicUsize,
}

impl NameSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&self) -> String {
        format!("task-{}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Ioc;
    use crate::tasks::TaskHandle;

    struct Counter(std::sync::atomic::AtomicU64);

    #[test]
    fn names_are_sequential() {
        let names = NameSequence::new();
        assert_eq!(names.next_name(), "task-0");
        assert_eq!(names.next_name(), "task-1");
    }

    #[test]
    fn blank_name_is_dropped() {
        assert_eq!(Scheduled::fixed_delay(5).named("  ").name, None);
    }

    #[test]
    fn bound_invocable_resolves_target_per_fire() {
        let def = TaskDefinition::for_method::<Counter, _>("tick", Scheduled::fixed_delay(10), |c, _| {
            c.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });
        assert!(def.owner().ends_with("Counter"));

        let ioc = Arc::new(Ioc::new());
        let invocable = def.bind(ioc.clone());
        let ctx = TaskContext::new("t".into(), 1, TaskHandle::new());

        assert!(matches!(invocable(&ctx), Err(TaskError::TargetMissing { .. })));

        ioc.register_value(Counter(std::sync::atomic::AtomicU64::new(0)));
        invocable(&ctx).unwrap();
        invocable(&ctx).unwrap();
        let counter = (ioc.as_ref() as &dyn BeanRegistry).get::<Counter>().unwrap();
        assert_eq!(counter.0.load(Ordering::Relaxed), 2);
    }
}
