use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    AFFINITY_SEPARATOR,
    error::{ModelError, ModelResult},
    label::{LabelExpr, expr::is_valid_atom},
};

/// Globally unique label binding one task to the one worker provisioned for it.
///
/// Format: `{prefix}_{uuid-v4-simple}`. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AffinityLabel(Arc<str>);

impl AffinityLabel {
    /// Mint a fresh label from a random v4 uuid.
    pub fn mint(prefix: &str) -> ModelResult<Self> {
        if !is_valid_atom(prefix) {
            return Err(ModelError::InvalidAffinityLabel(format!(
                "invalid prefix {prefix:?}"
            )));
        }
        let label = format!("{prefix}{AFFINITY_SEPARATOR}{}", Uuid::new_v4().simple());
        Ok(Self(label.into()))
    }

    /// Accept an existing label (e.g. read back from a request).
    pub fn parse(s: &str) -> ModelResult<Self> {
        let ok = is_valid_atom(s)
            && s.rsplit_once(AFFINITY_SEPARATOR)
                .is_some_and(|(prefix, id)| !prefix.is_empty() && !id.is_empty());
        if !ok {
            return Err(ModelError::InvalidAffinityLabel(s.to_string()));
        }
        Ok(Self(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0
            .rsplit_once(AFFINITY_SEPARATOR)
            .map(|(prefix, _)| prefix)
            .unwrap_or(&self.0)
    }

    /// Single-atom expression requiring this label.
    pub fn as_expr(&self) -> LabelExpr {
        LabelExpr::Atom(self.0.to_string())
    }
}

impl fmt::Display for AffinityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AffinityLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AffinityLabel {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<AffinityLabel> for String {
    fn from(l: AffinityLabel) -> Self {
        l.0.to_string()
    }
}
