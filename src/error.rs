//! Error types used by the bootvisor orchestrator, scheduler and tasks.
//!
//! The taxonomy follows how far a failure is allowed to travel:
//!
//! - [`BootError`]: fatal; aborts [`Server::start`](crate::Server::start).
//! - [`ScheduleError`]: schedule parsing and scheduler submission failures.
//! - [`TaskError`]: a single fire of a task invocable failed; the task keeps its schedule.
//! - [`ComponentError`]: one component registration step failed; the scan continues.
//!
//! Every enum provides `as_label` (stable snake_case label for logs/metrics)
//! and `as_message` (human-readable details).

use std::any::Any;
use std::io;

use thiserror::Error;

/// # Fatal startup errors.
///
/// Any of these aborts `start()`; resources acquired before the failure are
/// released through the regular stop sequence before the error is returned.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BootError {
    /// `start()` was called on a server that is not in the `NotStarted` state.
    #[error("server already started")]
    AlreadyStarted,

    /// The listening socket could not be resolved, created or bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address as configured (`host:port`).
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// TLS is enabled but the certificate or key material is missing or malformed.
    #[error("tls material rejected: {reason}")]
    Tls {
        /// What was wrong with the material.
        reason: String,
    },

    /// A task schedule is neither valid cron syntax nor a fixed delay.
    #[error("task {task}: {source}")]
    Schedule {
        /// Task name (explicit or generated).
        task: String,
        /// Parser error.
        #[source]
        source: ScheduleError,
    },

    /// A thread pool could not be constructed.
    #[error("failed to build {pool} pool: {source}")]
    Runtime {
        /// Pool label (`acceptor`, `io`, `housekeeping`, `task`).
        pool: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A configuration value has the wrong shape.
    #[error("invalid configuration {key}: {reason}")]
    Config {
        /// Offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl BootError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bootvisor::BootError;
    ///
    /// let err = BootError::Tls { reason: "missing cert".into() };
    /// assert_eq!(err.as_label(), "boot_tls");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BootError::AlreadyStarted => "boot_already_started",
            BootError::Bind { .. } => "boot_bind",
            BootError::Tls { .. } => "boot_tls",
            BootError::Schedule { .. } => "boot_schedule",
            BootError::Runtime { .. } => "boot_runtime",
            BootError::Config { .. } => "boot_config",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    pub(crate) fn tls(reason: impl Into<String>) -> Self {
        BootError::Tls {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(key: &str, reason: impl Into<String>) -> Self {
        BootError::Config {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// # Schedule parsing and submission errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// The input is neither a cron expression nor an integer delay.
    #[error("invalid schedule {input:?}: {reason}")]
    Parse {
        /// Raw schedule string.
        input: String,
        /// First problem found.
        reason: String,
    },

    /// The schedule parsed but has no fire instant after now.
    #[error("schedule {schedule} has no future fire time")]
    NoFutureFire {
        /// Rendered schedule.
        schedule: String,
    },

    /// `submit` was called before `initialize`.
    #[error("task scheduler is not initialized")]
    NotInitialized,

    /// `submit` was called after `shutdown`.
    #[error("task scheduler is shut down")]
    ShutDown,

    /// Another active task already uses this name.
    #[error("task {name} is already scheduled")]
    DuplicateName {
        /// Conflicting name.
        name: String,
    },
}

impl ScheduleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ScheduleError::Parse { .. } => "schedule_parse",
            ScheduleError::NoFutureFire { .. } => "schedule_no_future_fire",
            ScheduleError::NotInitialized => "scheduler_not_initialized",
            ScheduleError::ShutDown => "scheduler_shut_down",
            ScheduleError::DuplicateName { .. } => "task_duplicate_name",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        ScheduleError::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// # Errors produced by a single task fire.
///
/// None of these cancel the task: the scheduler logs them and computes the
/// next fire time as usual.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// The invocable reported a failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The invocable panicked; the panic was caught on the pool thread.
    #[error("invocable panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// The target component could not be resolved from the registry.
    #[error("target {type_name} is not registered")]
    TargetMissing {
        /// Type name of the missing component.
        type_name: &'static str,
    },

    /// The task observed its own cancellation.
    #[error("task cancelled")]
    Canceled,
}

impl TaskError {
    /// Wraps any displayable error as [`TaskError::Fail`].
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bootvisor::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::TargetMissing { .. } => "task_target_missing",
            TaskError::Canceled => "task_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TaskError::Fail { error } => format!("error: {error}"),
            TaskError::Panicked { info } => format!("panic: {info}"),
            TaskError::TargetMissing { type_name } => format!("missing target: {type_name}"),
            TaskError::Canceled => "task cancelled".to_string(),
        }
    }
}

/// # Component registration errors.
///
/// Reported per class or per producer method; the registration pass skips
/// the failing unit and continues.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ComponentError {
    /// A value-producer method of a configuration source failed.
    #[error("producer {class}::{method} failed: {error}")]
    Producer {
        /// Configuration source type name.
        class: &'static str,
        /// Producer method name.
        method: &'static str,
        /// The underlying error message.
        error: String,
    },

    /// The component factory panicked.
    #[error("cannot construct {class}: {error}")]
    Construct {
        /// Component type name.
        class: &'static str,
        /// Panic payload.
        error: String,
    },
}

impl ComponentError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ComponentError::Producer { .. } => "component_producer",
            ComponentError::Construct { .. } => "component_construct",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// Extracts a printable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
