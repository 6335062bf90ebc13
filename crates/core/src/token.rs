// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Holder tokens and their generators

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque credential proving current ownership of a lease.
///
/// A fresh token is issued for every successful acquisition and never reused,
/// so a delayed signal carrying an old token can always be told apart from
/// the current holder.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderToken(String);

impl HolderToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HolderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues holder tokens
pub trait TokenGen: Clone + Send + Sync + 'static {
    fn issue(&self) -> HolderToken;
}

/// Random v4 UUID tokens (122 bits of entropy)
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidTokenGen;

impl TokenGen for UuidTokenGen {
    fn issue(&self) -> HolderToken {
        HolderToken(uuid::Uuid::new_v4().simple().to_string())
    }
}

/// Predictable tokens for tests: `<prefix>-1`, `<prefix>-2`, ...
///
/// Clones share the counter, so tokens stay unique across clones.
#[derive(Clone, Debug)]
pub struct SequentialTokenGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialTokenGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialTokenGen {
    fn default() -> Self {
        Self::new("token")
    }
}

impl TokenGen for SequentialTokenGen {
    fn issue(&self) -> HolderToken {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        HolderToken(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
