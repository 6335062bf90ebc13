// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event pattern matching and subscriptions

use crate::event::Event;
use crate::resource::ResourceId;

/// Pattern over colon-separated event names.
///
/// `lease:released` matches exactly, `lease:*` matches one segment and
/// `lease:**` matches the rest of the name. A bare `*` or `**` matches all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventPattern(String);

impl EventPattern {
    pub fn new(pattern: &str) -> Self {
        Self(pattern.to_string())
    }

    pub fn any() -> Self {
        Self::new("**")
    }

    pub fn matches(&self, event_name: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }
        if self.0 == "*" || self.0 == "**" {
            return true;
        }

        let pattern: Vec<&str> = self.0.split(':').collect();
        let name: Vec<&str> = event_name.split(':').collect();
        Self::match_segments(&pattern, &name)
    }

    fn match_segments(pattern: &[&str], name: &[&str]) -> bool {
        match (pattern.split_first(), name.split_first()) {
            (None, None) => true,
            (Some((&"**", _)), _) => true,
            (Some((&"*", p_rest)), Some((_, n_rest))) => Self::match_segments(p_rest, n_rest),
            (Some((p, p_rest)), Some((n, n_rest))) if p == n => {
                Self::match_segments(p_rest, n_rest)
            }
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub String);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event patterns plus an optional resource filter
#[derive(Clone, Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub patterns: Vec<EventPattern>,
    pub resource: Option<ResourceId>,
}

impl Subscription {
    pub fn new(id: impl Into<String>, patterns: Vec<EventPattern>) -> Self {
        Self {
            id: SubscriberId(id.into()),
            patterns,
            resource: None,
        }
    }

    /// Only deliver events about `resource`
    pub fn for_resource(mut self, resource: ResourceId) -> Self {
        self.resource = Some(resource);
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(filter) = &self.resource {
            if event.resource() != Some(filter) {
                return false;
            }
        }
        let name = event.name();
        self.patterns.iter().any(|p| p.matches(&name))
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
