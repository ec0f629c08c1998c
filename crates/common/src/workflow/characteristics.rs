//! Full-replacement diff for characteristic assignment

use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

/// IDs to insert and delete so the persisted set equals the desired set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CharacteristicDiff {
    pub to_add: Vec<Uuid>,
    pub to_remove: Vec<Uuid>,
}

impl CharacteristicDiff {
    pub fn compute(current: &[Uuid], desired: &[Uuid]) -> Self {
        let current: BTreeSet<Uuid> = current.iter().copied().collect();
        let desired: BTreeSet<Uuid> = desired.iter().copied().collect();

        Self {
            to_add: desired.difference(&current).copied().collect(),
            to_remove: current.difference(&desired).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
