use std::fmt;

use serde::{Deserialize, Serialize};

use crate::label::{LabelBinding, LabelExpr};

/// Scheduler-assigned identity of a queued task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueItemId(pub u64);

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for QueueItemId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Read-only view of a task that just became buildable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildableItem {
    pub id: QueueItemId,

    /// Human-readable task name.
    pub task: String,

    /// Requested capability expression; `None` means "any worker".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LabelExpr>,

    /// Affinity binding already attached to the task, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<LabelBinding>,

    /// How many times a failed provisioning sent the task back to the queue.
    #[serde(default)]
    pub requeues: u32,
}

impl BuildableItem {
    pub fn new(id: QueueItemId, task: impl Into<String>, label: Option<LabelExpr>) -> Self {
        Self {
            id,
            task: task.into(),
            label,
            binding: None,
            requeues: 0,
        }
    }

    /// Expression the matcher uses: the binding overrides the requested label.
    pub fn effective_label(&self) -> Option<LabelExpr> {
        match &self.binding {
            Some(b) => Some(b.assigned_label()),
            None => self.label.clone(),
        }
    }
}
