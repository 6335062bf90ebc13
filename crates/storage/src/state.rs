// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use crate::operation::Operation;
use lg_core::{Lease, LeaseState, OutputId, OutputMeta, Resource, ResourceId};
use std::collections::BTreeMap;

/// Records rebuilt by applying operations in order.
///
/// Ordered maps keep listings and compaction output deterministic.
#[derive(Debug, Default, Clone)]
pub struct MaterializedState {
    pub resources: BTreeMap<ResourceId, Resource>,
    pub outputs: BTreeMap<OutputId, OutputMeta>,
    pub leases: BTreeMap<ResourceId, LeaseState>,
}

impl MaterializedState {
    pub fn from_ops<'a>(ops: impl IntoIterator<Item = &'a Operation>) -> Self {
        let mut state = Self::default();
        for op in ops {
            state.apply(op);
        }
        state
    }

    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::ResourceUpsert { resource } => {
                self.resources.insert(resource.id.clone(), resource.clone());
            }
            Operation::OutputMetaUpsert { meta } => {
                self.outputs.insert(meta.id, meta.clone());
            }
            Operation::LeaseSet { resource, state } => {
                self.leases.insert(resource.clone(), state.clone());
            }
        }
    }

    /// Lease for `id`; a resource never leased reads as free
    pub fn lease(&self, id: &ResourceId) -> Lease {
        let state = self.leases.get(id).cloned().unwrap_or_default();
        Lease::new(id.clone(), state)
    }

    /// One operation per record, enough to rebuild this state
    pub fn snapshot_ops(&self) -> Vec<Operation> {
        let resources = self
            .resources
            .values()
            .map(|r| Operation::ResourceUpsert { resource: r.clone() });
        let outputs = self
            .outputs
            .values()
            .map(|m| Operation::OutputMetaUpsert { meta: m.clone() });
        let leases = self.leases.iter().map(|(id, state)| Operation::LeaseSet {
            resource: id.clone(),
            state: state.clone(),
        });
        resources.chain(outputs).chain(leases).collect()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
