use std::fmt;

use circular_core::{Channel, Msat, NodeId};
use serde::{Deserialize, Serialize};

/// One channel traversal of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHop {
    pub channel: Channel,
    /// Amount forwarded over `channel`.
    pub amount: Msat,
    /// CLTV delay that has to remain when the HTLC leaves over `channel`.
    pub delay: u32,
}

/// A complete route: hops in payment order, from `source` to `destination`.
///
/// Each hop's amount and delay are derived backward from the last hop, which
/// delivers exactly `amount` with `final_delay`. The payer never pays a fee
/// for the first hop since that channel is its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub source: NodeId,
    pub destination: NodeId,
    /// Amount delivered to `destination`.
    pub amount: Msat,
    pub final_delay: u32,
    hops: Vec<RouteHop>,
}

impl Route {
    /// Create a route from hops in payment order.
    pub fn new(source: NodeId, destination: NodeId, amount: Msat, hops: Vec<RouteHop>) -> Self {
        let final_delay = hops.last().map(|h| h.delay).unwrap_or(0);
        let mut route = Self {
            source,
            destination,
            amount,
            final_delay,
            hops,
        };
        route.recompute();
        route
    }

    pub fn hops(&self) -> &[RouteHop] {
        &self.hops
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Put `channel` in front of the route, making its source the new payer.
    pub fn prepend(&mut self, channel: Channel) {
        self.source = channel.source.clone();
        self.hops.insert(
            0,
            RouteHop {
                channel,
                amount: 0,
                delay: 0,
            },
        );
        self.recompute();
    }

    /// Add `channel` as the last hop, making its destination the new payee.
    pub fn append(&mut self, channel: Channel) {
        self.destination = channel.destination.clone();
        self.hops.push(RouteHop {
            channel,
            amount: 0,
            delay: 0,
        });
        self.recompute();
    }

    pub fn set_final_delay(&mut self, delay: u32) {
        self.final_delay = delay;
        self.recompute();
    }

    /// Re-derive every hop's amount and delay from the last hop backward.
    fn recompute(&mut self) {
        let mut amount = self.amount;
        let mut delay = self.final_delay;
        for hop in self.hops.iter_mut().rev() {
            hop.amount = amount;
            hop.delay = delay;
            amount = amount.saturating_add(hop.channel.compute_fee(amount));
            delay = delay.saturating_add(hop.channel.delay);
        }
    }

    /// Amount the payer sends into the first hop.
    pub fn sent_amount(&self) -> Msat {
        self.hops.first().map(|h| h.amount).unwrap_or(self.amount)
    }

    /// Total fee paid to intermediate nodes.
    pub fn fee(&self) -> Msat {
        self.sent_amount().saturating_sub(self.amount)
    }

    /// Fee per million of the delivered amount, rounded down.
    pub fn fee_ppm(&self) -> u64 {
        if self.amount == 0 {
            return 0;
        }
        let ppm = self.fee() as u128 * 1_000_000 / self.amount as u128;
        u64::try_from(ppm).unwrap_or(u64::MAX)
    }

    /// CLTV delay of the first hop, the longest the payer's funds can be locked.
    pub fn total_delay(&self) -> u32 {
        self.hops.first().map(|h| h.delay).unwrap_or(self.final_delay)
    }

    /// Fee charged by the node forwarding over hop `index`.
    pub fn hop_fee(&self, index: usize) -> Msat {
        if index == 0 {
            return 0;
        }
        self.hops
            .get(index)
            .map(|h| h.channel.compute_fee(h.amount))
            .unwrap_or(0)
    }

    /// Nodes visited, payer first.
    pub fn nodes(&self) -> Vec<&NodeId> {
        let mut nodes = Vec::with_capacity(self.hops.len() + 1);
        nodes.push(&self.source);
        nodes.extend(self.hops.iter().map(|h| &h.channel.destination));
        nodes
    }

    /// Returns true if each hop starts where the previous one ended.
    pub fn is_contiguous(&self) -> bool {
        let mut at = &self.source;
        for hop in &self.hops {
            if &hop.channel.source != at {
                return false;
            }
            at = &hop.channel.destination;
        }
        at == &self.destination
    }
}

/// Human readable rendering of a route, with node aliases resolved at
/// construction time.
#[derive(Debug, Clone)]
pub struct PrettyRoute {
    hops: Vec<PrettyHop>,
    amount: Msat,
    fee: Msat,
    fee_ppm: u64,
    total_delay: u32,
}

#[derive(Debug, Clone)]
struct PrettyHop {
    from: String,
    to: String,
    short_channel_id: String,
    amount: Msat,
    fee: Msat,
    delay: u32,
}

impl PrettyRoute {
    pub fn new<F>(route: &Route, alias: F) -> Self
    where
        F: Fn(&NodeId) -> String,
    {
        let hops = route
            .hops()
            .iter()
            .enumerate()
            .map(|(i, hop)| PrettyHop {
                from: alias(&hop.channel.source),
                to: alias(&hop.channel.destination),
                short_channel_id: hop.channel.short_channel_id.to_string(),
                amount: hop.amount,
                fee: route.hop_fee(i),
                delay: hop.delay,
            })
            .collect();
        Self {
            hops,
            amount: route.amount,
            fee: route.fee(),
            fee_ppm: route.fee_ppm(),
            total_delay: route.total_delay(),
        }
    }

    /// One-line summary: `a -> b -> c | amount=… fee=… ppm=…`.
    pub fn simple(&self) -> String {
        let mut names: Vec<&str> = Vec::with_capacity(self.hops.len() + 1);
        if let Some(first) = self.hops.first() {
            names.push(&first.from);
        }
        names.extend(self.hops.iter().map(|h| h.to.as_str()));
        format!(
            "{} | amount={} fee={} ppm={}",
            names.join(" -> "),
            self.amount,
            self.fee,
            self.fee_ppm
        )
    }
}

impl fmt::Display for PrettyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, hop) in self.hops.iter().enumerate() {
            writeln!(
                f,
                "{:>2}. {} -> {} via {} amount={} fee={} delay={}",
                i + 1,
                hop.from,
                hop.to,
                hop.short_channel_id,
                hop.amount,
                hop.fee,
                hop.delay
            )?;
        }
        write!(
            f,
            "total: amount={} fee={} ppm={} delay={}",
            self.amount, self.fee, self.fee_ppm, self.total_delay
        )
    }
}
