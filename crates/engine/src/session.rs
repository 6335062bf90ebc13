// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-step routines run under a lease
//!
//! [`run_with_lease`] acquires, binds the token to the caller's presence,
//! runs the steps, and unlocks on every exit path: completion, abort,
//! deadline, or a failing step. Neither abort nor the deadline interrupts a
//! call in flight, so the client's connection stays usable for the unlock.

use async_trait::async_trait;
use lg_core::{HolderToken, OutputCommand, OutputId, ResourceId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::manager::AcquireOutcome;

/// What a routine needs from the lease service
#[async_trait]
pub trait LeaseClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn acquire(&self, resource: &ResourceId) -> Result<AcquireOutcome, Self::Error>;

    /// Put the token into this client's presence payload
    async fn bind(&self, resource: &ResourceId, token: &HolderToken) -> Result<(), Self::Error>;

    /// Switch the resource's outputs off and release, if `token` still holds it
    async fn unlock(&self, resource: &ResourceId, token: &HolderToken) -> Result<(), Self::Error>;

    async fn send_output(&self, command: OutputCommand) -> Result<(), Self::Error>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Output(OutputCommand),
    Pause(Duration),
}

/// All on, all off, then each output on and off in turn
pub fn standard_routine(outputs: &[OutputId], pace: Duration) -> Vec<Step> {
    let mut steps = Vec::new();

    steps.extend(outputs.iter().map(|&o| Step::Output(OutputCommand::on(o))));
    steps.push(Step::Pause(pace));

    steps.extend(outputs.iter().map(|&o| Step::Output(OutputCommand::off(o))));
    steps.push(Step::Pause(pace));

    for &output in outputs {
        steps.push(Step::Output(OutputCommand::on(output)));
        steps.push(Step::Pause(pace));
        steps.push(Step::Output(OutputCommand::off(output)));
    }
    steps
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed { steps: usize },
    Aborted { after: usize },
    TimedOut { after: usize },
    Locked,
    NotFound,
}

enum Interrupted<E> {
    Aborted,
    TimedOut,
    Failed(E),
}

/// Run `steps` while holding `resource`.
///
/// Abort and the deadline are checked before every step and while pausing.
/// A step already talking to the service always finishes. A step error ends
/// the routine with that error, after unlocking.
pub async fn run_with_lease<C: LeaseClient>(
    client: &C,
    resource: &ResourceId,
    steps: &[Step],
    mut abort: watch::Receiver<bool>,
    deadline: Option<Duration>,
) -> Result<SessionOutcome, C::Error> {
    let token = match client.acquire(resource).await? {
        AcquireOutcome::Acquired { token } => token,
        AcquireOutcome::Locked => return Ok(SessionOutcome::Locked),
        AcquireOutcome::NotFound => return Ok(SessionOutcome::NotFound),
    };
    tracing::info!(%resource, steps = steps.len(), "session started");

    let expires = deadline.map(|limit| Instant::now() + limit);
    let mut done = 0usize;
    let result = async {
        client
            .bind(resource, &token)
            .await
            .map_err(Interrupted::Failed)?;
        for step in steps {
            if *abort.borrow() {
                return Err(Interrupted::Aborted);
            }
            if expires.is_some_and(|at| Instant::now() >= at) {
                return Err(Interrupted::TimedOut);
            }
            match step {
                Step::Output(command) => client
                    .send_output(*command)
                    .await
                    .map_err(Interrupted::Failed)?,
                Step::Pause(pause) => {
                    let wake = Instant::now() + *pause;
                    let (until, cut_short) = match expires {
                        Some(at) if at < wake => (at, true),
                        _ => (wake, false),
                    };
                    let sleep = tokio::time::sleep_until(until);
                    tokio::pin!(sleep);
                    loop {
                        tokio::select! {
                            _ = &mut sleep => break,
                            changed = abort.changed() => match changed {
                                Ok(()) if *abort.borrow() => return Err(Interrupted::Aborted),
                                Ok(()) => {}
                                // A dropped abort sender can no longer abort
                                Err(_) => {
                                    (&mut sleep).await;
                                    break;
                                }
                            },
                        }
                    }
                    if cut_short {
                        return Err(Interrupted::TimedOut);
                    }
                }
            }
            done += 1;
        }
        Ok::<(), Interrupted<C::Error>>(())
    }
    .await;

    let outcome = match result {
        Ok(()) => Ok(SessionOutcome::Completed { steps: done }),
        Err(Interrupted::Aborted) => Ok(SessionOutcome::Aborted { after: done }),
        Err(Interrupted::TimedOut) => Ok(SessionOutcome::TimedOut { after: done }),
        Err(Interrupted::Failed(e)) => Err(e),
    };

    if let Err(e) = client.unlock(resource, &token).await {
        tracing::error!(%resource, error = %e, "failed to unlock after session");
        if outcome.is_ok() {
            return Err(e);
        }
    }
    tracing::info!(%resource, ?outcome, "session ended");
    outcome
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
