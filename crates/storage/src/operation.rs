// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lg_core::{LeaseState, OutputMeta, Resource, ResourceId};
use serde::{Deserialize, Serialize};

/// A single durable mutation of the record store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    ResourceUpsert { resource: Resource },
    OutputMetaUpsert { meta: OutputMeta },
    LeaseSet { resource: ResourceId, state: LeaseState },
}
