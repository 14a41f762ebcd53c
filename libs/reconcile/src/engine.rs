//! The reconciliation pass.
//!
//! One pass runs per offer batch:
//! 1. Decline every offer the filter rejects.
//! 2. For each group, launch onto the first remaining acceptable offers while
//!    the group is short, or kill its youngest tasks while it has excess.
//! 3. Decline whatever acceptable offers are left.

use std::collections::VecDeque;
use std::time::Duration;

use fleet_events::Offer;
use fleet_id::GroupKey;
use tracing::{debug, info, instrument, warn};

use crate::filter::OfferFilter;
use crate::gateway::ResourceManagerGateway;
use crate::registry::GroupRegistry;
use crate::task::TaskDescriptorFactory;
use crate::{ReconcileError, DEFAULT_REFUSE_WINDOW};

/// Counters from a single pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PassStats {
    pub offered: usize,
    pub rejected: usize,
    pub launched: usize,
    pub killed: usize,
    /// Acceptable offers declined because no group needed them.
    pub declined: usize,
    /// Launches still owed after the pool ran dry.
    pub shortfall: u64,
}

impl PassStats {
    /// True if the pass changed nothing but offer bookkeeping.
    pub fn is_idle(&self) -> bool {
        self.launched == 0 && self.killed == 0
    }
}

/// Decides launches and kills for each offer batch.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    filter: OfferFilter,
    refuse_window: Duration,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_REFUSE_WINDOW)
    }
}

impl ReconciliationEngine {
    pub fn new(refuse_window: Duration) -> Self {
        Self {
            filter: OfferFilter::new(),
            refuse_window,
        }
    }

    pub fn refuse_window(&self) -> Duration {
        self.refuse_window
    }

    /// Run one pass over an offer batch.
    ///
    /// The caller must hold exclusive access to `registry` for the whole
    /// call. A gateway failure aborts the pass; offers still in the pool at
    /// that point are neither launched nor declined.
    #[instrument(skip_all, fields(offers = offers.len()))]
    pub fn reconcile<R, G, F>(
        &self,
        offers: Vec<Offer>,
        registry: &mut R,
        gateway: &G,
        factory: &F,
    ) -> Result<PassStats, ReconcileError>
    where
        R: GroupRegistry + ?Sized,
        G: ResourceManagerGateway + ?Sized,
        F: TaskDescriptorFactory + ?Sized,
    {
        let mut stats = PassStats {
            offered: offers.len(),
            ..PassStats::default()
        };

        let (acceptable, rejected) = self.filter.partition(offers);
        for offer in &rejected {
            gateway.decline_offer(&offer.id)?;
        }
        stats.rejected = rejected.len();
        info!(
            acceptable = acceptable.len(),
            rejected = stats.rejected,
            "Offers classified"
        );

        let mut pool: VecDeque<Offer> = acceptable.into();

        for (group, delta) in registry.deltas() {
            if delta > 0 {
                info!(group = %group, missing = delta, "Group is under-provisioned");
                let launched = self.scale_up(&group, delta, &mut pool, registry, gateway, factory)?;
                stats.launched += launched;
                stats.shortfall += (delta as u64).saturating_sub(launched as u64);
            } else if delta < 0 {
                info!(group = %group, excess = -delta, "Group is over-provisioned");
                stats.killed += self.scale_down(&group, delta, registry, gateway)?;
            }
        }

        while let Some(offer) = pool.pop_front() {
            gateway.decline_offer(&offer.id)?;
            stats.declined += 1;
        }

        info!(
            offered = stats.offered,
            rejected = stats.rejected,
            launched = stats.launched,
            killed = stats.killed,
            declined = stats.declined,
            shortfall = stats.shortfall,
            "Reconciliation pass complete"
        );

        Ok(stats)
    }

    fn scale_up<R, G, F>(
        &self,
        group: &GroupKey,
        mut delta: i64,
        pool: &mut VecDeque<Offer>,
        registry: &mut R,
        gateway: &G,
        factory: &F,
    ) -> Result<usize, ReconcileError>
    where
        R: GroupRegistry + ?Sized,
        G: ResourceManagerGateway + ?Sized,
        F: TaskDescriptorFactory + ?Sized,
    {
        let mut launched = 0;

        while delta > 0 {
            let Some(offer) = pool.pop_front() else {
                debug!(group = %group, remaining = delta, "Offer pool exhausted");
                break;
            };

            let task = factory.build(group, &offer);
            let task_id = task.task_id;
            if let Err(e) = registry.register_task(group, task_id) {
                gateway.decline_offer(&offer.id)?;
                return Err(e.into());
            }

            if let Err(e) = gateway.launch_task(&offer.id, task, self.refuse_window) {
                registry.unregister_task(&task_id);
                return Err(e.into());
            }

            info!(
                group = %group,
                task_id = %task_id,
                offer_id = %offer.id,
                agent_id = %offer.agent_id,
                "Launched task"
            );
            launched += 1;
            delta -= 1;
        }

        Ok(launched)
    }

    fn scale_down<R, G>(
        &self,
        group: &GroupKey,
        mut delta: i64,
        registry: &mut R,
        gateway: &G,
    ) -> Result<usize, ReconcileError>
    where
        R: GroupRegistry + ?Sized,
        G: ResourceManagerGateway + ?Sized,
    {
        let mut killed = 0;

        while delta < 0 {
            let Some(task_id) = registry.youngest_task(group) else {
                warn!(group = %group, excess = -delta, "No running task left to kill");
                break;
            };

            registry.unregister_task(&task_id);
            if let Err(e) = gateway.kill_task(&task_id) {
                // Still running; track it again as the youngest so the next
                // pass retries the kill.
                if let Err(restore) = registry.register_task(group, task_id) {
                    warn!(
                        group = %group,
                        task_id = %task_id,
                        error = %restore,
                        "Failed to restore task after kill failure"
                    );
                }
                return Err(e.into());
            }

            info!(group = %group, task_id = %task_id, "Killed task");
            killed += 1;
            delta += 1;
        }

        Ok(killed)
    }
}
