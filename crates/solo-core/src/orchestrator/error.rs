use std::{fmt, time::Duration};

use thiserror::Error;

use crate::{inventory::InventoryError, launch::LaunchError, metrics::ProvisionOutcome};

/// Why a wait for a worker was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The originating queue item was cancelled or removed.
    ItemGone,
    /// The provisioner is shutting down.
    Shutdown,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::ItemGone => f.write_str("queue item gone"),
            CancelReason::Shutdown => f.write_str("shutdown"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("launch failed: {0}")]
    Launch(#[from] LaunchError),

    #[error("registration conflict: no free worker name after {attempts} attempts (last: {last})")]
    RegistrationConflict { attempts: u32, last: String },

    #[error("worker not online within {0:?}")]
    ReadyTimeout(Duration),

    #[error("provisioning cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("inventory rejected worker: {0}")]
    Inventory(InventoryError),

    #[error("worker terminated before coming online")]
    Terminated,
}

impl ProvisionError {
    /// Stable error kind used as the `error_kind` log field and metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ProvisionError::Launch(_) => "launch_failure",
            ProvisionError::RegistrationConflict { .. } => "registration_conflict",
            ProvisionError::ReadyTimeout(_) => "ready_timeout",
            ProvisionError::Cancelled(CancelReason::ItemGone) => "cancelled_item_gone",
            ProvisionError::Cancelled(CancelReason::Shutdown) => "cancelled_shutdown",
            ProvisionError::Inventory(_) => "inventory",
            ProvisionError::Terminated => "terminated",
        }
    }

    /// Sub-kind of a launch failure, `None` for every other error.
    pub fn launch_kind(&self) -> Option<&'static str> {
        match self {
            ProvisionError::Launch(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Invariant violations, as opposed to recoverable task-level failures.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProvisionError::Inventory(InventoryError::DuplicateLabel(_))
        )
    }

    pub fn outcome(&self) -> ProvisionOutcome {
        match self {
            ProvisionError::ReadyTimeout(_) => ProvisionOutcome::Timeout,
            ProvisionError::Cancelled(_) => ProvisionOutcome::Canceled,
            _ => ProvisionOutcome::Failed,
        }
    }
}
