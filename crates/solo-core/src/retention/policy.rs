use std::fmt;

/// Decision of a [`RetentionPolicy`] after a task completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionDecision {
    Keep,
    Terminate,
}

/// Terminate a worker after it ran `executions` tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    executions: u32,
}

impl RetentionPolicy {
    /// Single-use: tear down after the first completed task.
    pub const ONCE: Self = Self { executions: 1 };

    pub fn after(executions: u32) -> Self {
        Self {
            executions: executions.max(1),
        }
    }

    pub fn executions(&self) -> u32 {
        self.executions
    }

    pub fn evaluate(&self, completed: u32) -> RetentionDecision {
        if completed >= self.executions {
            RetentionDecision::Terminate
        } else {
            RetentionDecision::Keep
        }
    }
}

/// Why a worker is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    /// Retention policy fired after task completion.
    Retention,
    /// Provisioning failed before the worker came online.
    ProvisionFailed,
    /// Transport reported the worker gone.
    Disconnected,
    Shutdown,
}

impl TeardownReason {
    pub fn as_label(&self) -> &'static str {
        match self {
            TeardownReason::Retention => "retention",
            TeardownReason::ProvisionFailed => "provision_failed",
            TeardownReason::Disconnected => "disconnected",
            TeardownReason::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Outcome of the task that ran on a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskResult {
    Success,
    Failure,
}

impl TaskResult {
    pub fn from_success(success: bool) -> Self {
        if success {
            TaskResult::Success
        } else {
            TaskResult::Failure
        }
    }
}
