//! Reconciling the graph with fresh listings: liquidity aging, pruning and
//! alias refresh.

use std::collections::HashSet;
use std::time::Instant;

use circular_core::{Channel, ListedChannel, ListedNode, Msat};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// 10k sats.
pub const AVERAGE_AGING_AMOUNT: Msat = 10_000_000;
/// 5k sats, so aging moves an estimate by 5k to 15k sats per refresh.
pub const AGING_VARIANCE: Msat = 5_000_000;

/// Random walk applied to known liquidity estimates on every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityAging {
    pub average: Msat,
    pub variance: Msat,
}

impl Default for LiquidityAging {
    fn default() -> Self {
        Self {
            average: AVERAGE_AGING_AMOUNT,
            variance: AGING_VARIANCE,
        }
    }
}

impl LiquidityAging {
    /// Draw an aging delta uniformly from `[average - variance, average + variance]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Msat {
        let low = self.average.saturating_sub(self.variance);
        let high = self.average.saturating_add(self.variance);
        rng.gen_range(low..=high)
    }

    /// New estimate for a channel: the aged value, never below the neutral
    /// 50/50 prior and never above capacity.
    pub fn age(&self, previous: Msat, delta: Msat, capacity: Msat) -> Msat {
        let perfect_balance = capacity / 2;
        previous
            .min(capacity)
            .saturating_add(delta)
            .max(perfect_balance)
            .min(capacity)
    }
}

/// What a channel refresh did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub pruned: usize,
}

impl Graph {
    /// Apply a channel listing.
    ///
    /// New channels start at half their capacity, or at what the opposite
    /// direction leaves free when only that one is known. Known channels get their
    /// policy replaced and their liquidity aged; the opposite direction is
    /// then set to the remainder of the capacity.
    pub fn refresh_channels<R: Rng + ?Sized>(
        &mut self,
        listing: &[ListedChannel],
        aging: &LiquidityAging,
        rng: &mut R,
    ) -> RefreshSummary {
        let started = Instant::now();
        let mut summary = RefreshSummary::default();
        let mut seen = HashSet::with_capacity(listing.len());

        for listed in listing {
            if let Err(e) = listed.validate() {
                tracing::warn!(error = %e, "skipping channel record");
                summary.skipped += 1;
                continue;
            }

            let id = listed.channel_id();
            let capacity = listed.capacity_msat();
            seen.insert(id.clone());

            let liquidity = match self.channel(&id) {
                None => {
                    // A direction seen for the first time takes whatever its
                    // known opposite leaves free.
                    let liquidity = match self.channel_mut(&id.opposite()) {
                        Some(opposite) => {
                            opposite.capacity = capacity;
                            opposite.liquidity = opposite.liquidity.min(capacity);
                            capacity - opposite.liquidity
                        }
                        None => capacity / 2,
                    };
                    self.add_channel(Channel::from_listing(listed, liquidity));
                    summary.added += 1;
                    continue;
                }
                Some(existing) => {
                    let delta = aging.sample(rng);
                    aging.age(existing.liquidity, delta, capacity)
                }
            };

            if let Some(opposite) = self.channel_mut(&id.opposite()) {
                opposite.capacity = capacity;
                opposite.liquidity = capacity - liquidity;
            }
            self.add_channel(Channel::from_listing(listed, liquidity));
            summary.updated += 1;
        }

        self.last_listing = Some(seen);

        tracing::debug!(
            added = summary.added,
            updated = summary.updated,
            skipped = summary.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "channels refreshed"
        );
        summary
    }

    /// Remove every channel that was absent from the most recent listing.
    ///
    /// Does nothing until a listing has been applied, so a graph loaded from
    /// disk survives until the first refresh.
    pub fn prune_channels(&mut self) -> usize {
        let Some(seen) = self.last_listing.as_ref() else {
            return 0;
        };
        let stale: Vec<_> = self
            .channels
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();
        for id in &stale {
            self.remove_channel(id);
        }
        if !stale.is_empty() {
            tracing::debug!(pruned = stale.len(), "pruned stale channels");
        }
        stale.len()
    }

    /// Update the alias side table. Nodes without an alias keep their
    /// previous entry.
    pub fn refresh_aliases(&mut self, nodes: &[ListedNode]) -> usize {
        let mut updated = 0;
        for node in nodes {
            if let Some(alias) = node.alias.as_ref().filter(|a| !a.is_empty()) {
                self.aliases.insert(node.node_id.clone(), alias.clone());
                updated += 1;
            }
        }
        updated
    }
}
