// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Administrative override: force-release without token checks

use crate::error::LeaseError;
use crate::reclaim::{ReclaimOutcome, ReclaimReport, Reclaimer};
use lg_adapters::{OutputSink, RecordStore};
use lg_core::{ReclaimReason, ResourceId, TokenGen};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ForceReleaseOutcome {
    Released(ReclaimReport),
    /// Nothing to do; the lease was already free
    NotLocked,
    NotFound,
}

#[derive(Clone)]
pub struct AdminOverride<S, O, T> {
    reclaimer: Reclaimer<S, O, T>,
}

impl<S, O, T> AdminOverride<S, O, T>
where
    S: RecordStore,
    O: OutputSink,
    T: TokenGen,
{
    pub fn new(reclaimer: Reclaimer<S, O, T>) -> Self {
        Self { reclaimer }
    }

    pub async fn force_release(
        &self,
        id: &ResourceId,
    ) -> Result<ForceReleaseOutcome, LeaseError> {
        let store = self.reclaimer.leases().store();
        if store.resource(id).await?.is_none() {
            return Ok(ForceReleaseOutcome::NotFound);
        }
        if store.lease(id).await?.is_free() {
            tracing::info!(%id, "force release of free lease, nothing to do");
            return Ok(ForceReleaseOutcome::NotLocked);
        }

        tracing::info!(%id, "force releasing");
        Ok(match self.reclaimer.reclaim(id, ReclaimReason::Override).await? {
            ReclaimOutcome::Reclaimed(report) => ForceReleaseOutcome::Released(report),
            ReclaimOutcome::NotFound => ForceReleaseOutcome::NotFound,
            ReclaimOutcome::Stale => ForceReleaseOutcome::NotLocked,
        })
    }

    /// Force-release every busy lease, one resource at a time
    pub async fn force_release_all(
        &self,
    ) -> Result<Vec<(ResourceId, ForceReleaseOutcome)>, LeaseError> {
        let busy: Vec<ResourceId> = self
            .reclaimer
            .leases()
            .store()
            .leases()
            .await?
            .into_iter()
            .filter(|lease| !lease.is_free())
            .map(|lease| lease.resource)
            .collect();

        tracing::info!(count = busy.len(), "force releasing all busy leases");
        let mut results = Vec::with_capacity(busy.len());
        for id in busy {
            let outcome = self.force_release(&id).await?;
            results.push((id, outcome));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::LeaseManager;
    use lg_adapters::{FakeOutputSink, MemoryStore};
    use lg_core::{EventBus, Resource, SequentialTokenGen};

    fn admin() -> (
        AdminOverride<MemoryStore, FakeOutputSink, SequentialTokenGen>,
        FakeOutputSink,
    ) {
        let outputs = FakeOutputSink::new();
        let manager = LeaseManager::new(
            MemoryStore::with_resources([
                Resource::new("G1", "").with_outputs([1, 2, 3]),
                Resource::new("G2", "").with_outputs([4]),
                Resource::new("G3", "").with_outputs([5, 6]),
            ]),
            SequentialTokenGen::new("t"),
            EventBus::new(),
        );
        (
            AdminOverride::new(Reclaimer::new(manager, outputs.clone())),
            outputs,
        )
    }

    #[tokio::test]
    async fn force_release_of_free_lease_sends_nothing() {
        let (admin, outputs) = admin();

        let outcome = admin.force_release(&ResourceId::new("G1")).await.unwrap();

        assert_eq!(outcome, ForceReleaseOutcome::NotLocked);
        assert!(outputs.calls().is_empty());
    }

    #[tokio::test]
    async fn force_release_reclaims_held_lease() {
        let (admin, outputs) = admin();
        let g1 = ResourceId::new("G1");
        admin.reclaimer.leases().acquire(&g1).await.unwrap();

        let outcome = admin.force_release(&g1).await.unwrap();

        let ForceReleaseOutcome::Released(report) = outcome else {
            panic!("expected release");
        };
        assert_eq!(report.leds_off, 3);
        assert_eq!(report.reason, ReclaimReason::Override);
        assert_eq!(outputs.calls().len(), 3);
        assert!(!admin.reclaimer.leases().query(&g1).await.unwrap().busy);
    }

    #[tokio::test]
    async fn force_release_unknown_resource() {
        let (admin, _) = admin();
        assert_eq!(
            admin.force_release(&ResourceId::new("G9")).await.unwrap(),
            ForceReleaseOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn force_release_races_holder_release() {
        let (admin, _) = admin();
        let g1 = ResourceId::new("G1");
        admin.reclaimer.leases().acquire(&g1).await.unwrap();

        let leases = admin.reclaimer.leases().clone();
        let (forced, released) = tokio::join!(admin.force_release(&g1), leases.release(&g1));

        assert!(forced.is_ok());
        assert!(released.is_ok());
        assert!(!leases.query(&g1).await.unwrap().busy);
    }

    #[tokio::test]
    async fn force_release_all_only_touches_busy_leases() {
        let (admin, outputs) = admin();
        let leases = admin.reclaimer.leases();
        leases.acquire(&ResourceId::new("G1")).await.unwrap();
        leases.acquire(&ResourceId::new("G3")).await.unwrap();

        let results = admin.force_release_all().await.unwrap();

        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["G1", "G3"]);
        assert!(results
            .iter()
            .all(|(_, o)| matches!(o, ForceReleaseOutcome::Released(_))));
        assert_eq!(outputs.calls().len(), 5);
        for (_, snapshot) in leases.list().await.unwrap() {
            assert!(!snapshot.busy);
        }
    }
}
