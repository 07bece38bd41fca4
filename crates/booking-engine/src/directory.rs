//! Sitter lookup, provided by the surrounding user system.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::SitterId;

/// The directory's view of a sitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitterProfile {
    pub id: SitterId,
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Pet types the sitter services. Empty means no restriction.
    #[serde(default)]
    pub pet_types: BTreeSet<String>,
}

fn default_active() -> bool {
    true
}

impl SitterProfile {
    /// Whether the sitter can take every pet type in `requested`.
    pub fn services_all(&self, requested: &BTreeSet<String>) -> bool {
        self.pet_types.is_empty() || self.pet_types.is_superset(requested)
    }
}

/// Read access to the sitter directory.
pub trait SitterDirectory: Send + Sync {
    fn get(&self, id: &SitterId) -> Option<SitterProfile>;

    /// Sitters whose account is active, in a stable order.
    fn active_sitters(&self) -> Vec<SitterProfile>;
}

/// Directory backed by a map; used for snapshots and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    sitters: BTreeMap<SitterId, SitterProfile>,
}

impl InMemoryDirectory {
    pub fn new(sitters: impl IntoIterator<Item = SitterProfile>) -> Self {
        Self {
            sitters: sitters.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    pub fn upsert(&mut self, profile: SitterProfile) {
        self.sitters.insert(profile.id.clone(), profile);
    }

    pub fn profiles(&self) -> impl Iterator<Item = &SitterProfile> {
        self.sitters.values()
    }
}

impl SitterDirectory for InMemoryDirectory {
    fn get(&self, id: &SitterId) -> Option<SitterProfile> {
        self.sitters.get(id).cloned()
    }

    fn active_sitters(&self) -> Vec<SitterProfile> {
        self.sitters.values().filter(|s| s.is_active).cloned().collect()
    }
}
