//! Offer acceptance.
//!
//! An offer is acceptable when it advertises each of the three resource
//! kinds a worker needs: `cpus`, `mem` and `ports`. Only presence is checked;
//! quantities are logged but never compared against what a task requires.

use fleet_events::{resource_names, Offer};
use tracing::info;

/// Classifies offers as acceptable or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfferFilter;

impl OfferFilter {
    pub fn new() -> Self {
        Self
    }

    /// Returns true if the offer carries a `cpus`, a `mem` and a `ports`
    /// resource, regardless of quantity.
    pub fn is_acceptable(&self, offer: &Offer) -> bool {
        let mut cpus = None;
        let mut mem = None;
        let mut ports = None;

        for resource in &offer.resources {
            match resource.name.as_str() {
                resource_names::CPUS => cpus = Some(resource.as_scalar().unwrap_or(0.0)),
                resource_names::MEM => mem = Some(resource.as_scalar().unwrap_or(0.0)),
                resource_names::PORTS => ports = Some(resource.range_count()),
                _ => {}
            }
        }

        let (Some(cpus), Some(mem), Some(ports)) = (cpus, mem, ports) else {
            let missing = [
                (cpus.is_none(), resource_names::CPUS),
                (mem.is_none(), resource_names::MEM),
                (ports.is_none(), resource_names::PORTS),
            ]
            .into_iter()
            .filter_map(|(absent, name)| absent.then_some(name))
            .collect::<Vec<_>>()
            .join(",");

            info!(offer_id = %offer.id, missing = %missing, "Offer does not meet requirements");
            return false;
        };

        info!(
            offer_id = %offer.id,
            cpus,
            mem,
            ports,
            "Offer is acceptable"
        );
        true
    }

    /// Split offers into (acceptable, rejected), both in delivery order.
    pub fn partition(&self, offers: Vec<Offer>) -> (Vec<Offer>, Vec<Offer>) {
        offers.into_iter().partition(|o| self.is_acceptable(o))
    }
}
