// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User-friendly error display with context and suggestions.
//!
//! Each error says what went wrong, why it might have happened, and how
//! to fix it.

use std::fmt;

use lg_core::ResourceId;

/// Error with context and recovery suggestions for user-friendly display.
#[derive(Debug)]
pub struct LgError {
    /// What went wrong
    pub message: String,
    /// Why it might have happened
    pub context: Vec<String>,
    /// How to fix it
    pub suggestions: Vec<String>,
    /// Original error if any
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl LgError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for LgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "error: {}", self.message)?;

        if !self.context.is_empty() {
            writeln!(f)?;
            for ctx in &self.context {
                writeln!(f, "  -> {}", ctx)?;
            }
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            writeln!(f, "suggestions:")?;
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for LgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Common error builders for typical failure scenarios.
impl LgError {
    /// Someone else holds the lease
    pub fn resource_in_use(resource: &ResourceId) -> Self {
        LgError::new(format!("'{}' is currently in use", resource))
            .with_context("Another holder has the lease")
            .with_suggestion("Try again once the current holder is done")
            .with_suggestion(format!("See who holds it: lg status {}", resource))
            .with_suggestion(format!(
                "Free it as an operator: lg force-release {}",
                resource
            ))
    }

    pub fn resource_not_found(resource: &ResourceId) -> Self {
        LgError::new(format!("Resource '{}' not found", resource))
            .with_context("Resources are defined as [[resource]] entries in lg.toml")
            .with_suggestion("List known resources: lg status")
    }

    /// The daemon could not be reached or refused the request
    pub fn daemon_unavailable<E: std::error::Error + Send + Sync + 'static>(source: E) -> Self {
        LgError::new(format!("Lease service unavailable: {}", source))
            .with_context("The daemon may have failed to start or stopped")
            .with_suggestion("Check daemon status: lg daemon status")
            .with_suggestion("Inspect the log: lg daemon logs")
            .with_source(source)
    }

    /// An output command failed at the device
    pub fn output_failed(detail: impl Into<String>) -> Self {
        LgError::new("Output command failed")
            .with_context(detail)
            .with_context("Commands are best effort; the lease state is unaffected")
            .with_suggestion("Check the [device] section of lg.toml")
    }
}
