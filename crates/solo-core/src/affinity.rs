use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;
use tracing::error;

use solo_model::AffinityLabel;

use crate::error::CoreError;

/// Live affinity labels, from mint until teardown.
#[derive(Clone, Default)]
pub struct AffinityRegistry {
    live: Arc<Mutex<HashSet<AffinityLabel>>>,
}

impl AffinityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh label and claim it.
    pub fn mint(&self, prefix: &str) -> Result<AffinityLabel, CoreError> {
        let label = AffinityLabel::mint(prefix)?;
        self.claim(label)
    }

    /// Claim an existing label; a label that is already live is a fatal collision.
    pub fn claim(&self, label: AffinityLabel) -> Result<AffinityLabel, CoreError> {
        if !self.live.lock().insert(label.clone()) {
            error!(label = %label, "affinity label collision");
            return Err(CoreError::LabelCollision(label));
        }
        Ok(label)
    }

    /// Returns `true` if the label was live.
    pub fn release(&self, label: &AffinityLabel) -> bool {
        self.live.lock().remove(label)
    }

    pub fn is_live(&self, label: &AffinityLabel) -> bool {
        self.live.lock().contains(label)
    }

    pub fn len(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.lock().is_empty()
    }
}
