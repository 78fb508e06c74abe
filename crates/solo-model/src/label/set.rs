use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ModelError, ModelResult},
    label::expr::is_valid_atom,
};

/// Set of label atoms carried by a worker or configured for on-demand provisioning.
///
/// Serialized as a whitespace-separated string, e.g. `"docker linux"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LabelSet(BTreeSet<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(s: &str) -> ModelResult<Self> {
        let mut set = Self::new();
        for atom in s.split_whitespace() {
            set.insert(atom)?;
        }
        Ok(set)
    }

    /// Set holding exactly one atom.
    pub fn single(atom: impl Into<String>) -> ModelResult<Self> {
        let mut set = Self::new();
        set.insert(atom)?;
        Ok(set)
    }

    /// Insert an atom; returns `false` if it was already present.
    pub fn insert(&mut self, atom: impl Into<String>) -> ModelResult<bool> {
        let atom = atom.into();
        if !is_valid_atom(&atom) {
            return Err(ModelError::InvalidAtom(atom));
        }
        Ok(self.0.insert(atom))
    }

    pub fn contains(&self, atom: &str) -> bool {
        self.0.contains(atom)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for atom in &self.0 {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(atom)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for LabelSet {
    type Err = ModelError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LabelSet {
    type Error = ModelError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<LabelSet> for String {
    fn from(set: LabelSet) -> Self {
        set.to_string()
    }
}
