use serde::{Deserialize, Serialize};

use crate::label::{AffinityLabel, LabelExpr, LabelSet};

/// Override attached to a task: it may only be matched to a worker carrying `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelBinding {
    label: AffinityLabel,
}

impl LabelBinding {
    pub fn new(label: AffinityLabel) -> Self {
        Self { label }
    }

    pub fn label(&self) -> &AffinityLabel {
        &self.label
    }

    /// Expression the matcher must use instead of the task's own label.
    pub fn assigned_label(&self) -> LabelExpr {
        self.label.as_expr()
    }

    /// Returns `true` if a worker with `labels` may run the bound task.
    pub fn permits(&self, labels: &LabelSet) -> bool {
        labels.contains(self.label.as_str())
    }
}
