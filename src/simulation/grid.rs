//! Extension of the national grid to unelectrified settlements.
//!
//! The grid grows outward one settlement at a time. Each time a settlement is connected, its
//! neighbours' distance to the grid is relaxed, which may make them cheaper to connect in turn.
//! Links are compared by their length weighted by the extra line cost of each extension step, so a
//! nearer node deep in the extended network does not displace a cheaper link.
use super::costs::{CostOutcome, GridLink};
use super::spatial::SpatialIndex;
use crate::id::SettlementID;
use crate::model::{ExtensionLimits, Prioritization};
use crate::settlement::Settlement;
use crate::units::{Capacity, Dimensionless, Distance, Money, MoneyPerEnergy};
use log::debug;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::rc::Rc;

/// Tolerance when checking requests against the remaining limits
const LIMIT_TOLERANCE: f64 = 1e-9;

/// The state of the grid: which settlements are connected and how far the rest are from it
#[derive(Debug, Clone)]
pub struct GridNetwork {
    index: Rc<SpatialIndex>,
    /// Settlements further apart than this are never linked directly
    reach: Distance,
    /// Increase in line cost for each extension step away from the original network
    hop_cost_ratio: f64,
    /// Distance to the nearest grid node (zero for connected settlements)
    distance: Vec<Distance>,
    /// For unconnected settlements, the extension steps of the nearest grid node. For connected
    /// settlements, their own extension steps from the original network.
    hops: Vec<u32>,
    connected: Vec<bool>,
}

impl GridNetwork {
    /// Create the network as it is before any extension.
    ///
    /// Settlements which are already electrified form the original network. Unconnected
    /// settlements start at their distance to the existing MV or HV network from the input data.
    /// This is only replaced by the distance to an electrified settlement within `reach`, as
    /// settlements further apart are never linked directly.
    pub fn new(
        settlements: &[Settlement],
        reach: Distance,
        hop_cost_ratio: Dimensionless,
    ) -> Self {
        let index = Rc::new(SpatialIndex::new(settlements, reach));
        let mut network = Self {
            index,
            reach,
            hop_cost_ratio: hop_cost_ratio.value(),
            distance: settlements.iter().map(Settlement::dist_to_network).collect(),
            hops: vec![0; settlements.len()],
            connected: vec![false; settlements.len()],
        };

        for (idx, settlement) in settlements.iter().enumerate() {
            if settlement.electrified {
                network.connected[idx] = true;
                network.distance[idx] = Distance(0.0);
            }
        }
        for idx in 0..settlements.len() {
            if network.connected[idx] {
                network.relax_from(idx);
            }
        }

        network
    }

    /// Whether the settlement is connected to the grid
    pub fn is_connected(&self, idx: usize) -> bool {
        self.connected[idx]
    }

    /// How the settlement would be connected to the grid
    pub fn link(&self, idx: usize) -> GridLink {
        GridLink {
            distance: self.distance[idx],
            hops: self.hops[idx],
        }
    }

    /// Connect a settlement to the grid over the given link.
    ///
    /// Returns the unconnected settlements which now have a cheaper link to the grid.
    pub fn connect(&mut self, idx: usize, link: GridLink) -> Vec<usize> {
        if self.connected[idx] {
            return Vec::new();
        }

        self.connected[idx] = true;
        self.distance[idx] = Distance(0.0);
        self.hops[idx] = link.hops + 1;

        self.relax_from(idx)
    }

    /// Length of a link weighted by the extra line cost of its extension steps
    fn weighted_length(&self, distance: Distance, hops: u32) -> f64 {
        distance.value() * (1.0 + self.hop_cost_ratio * f64::from(hops))
    }

    fn relax_from(&mut self, idx: usize) -> Vec<usize> {
        let hops = self.hops[idx];
        let mut updated = Vec::new();
        for (other, distance) in self.index.within(idx, self.reach) {
            if self.connected[other] {
                continue;
            }

            let current = self.distance[other];
            let order = self
                .weighted_length(distance, hops)
                .total_cmp(&self.weighted_length(current, self.hops[other]))
                .then(distance.total_cmp(&current));
            if order != Ordering::Less {
                continue;
            }

            self.distance[other] = distance;
            self.hops[other] = hops;
            updated.push(other);
        }

        updated
    }
}

/// A settlement which could be connected to the grid this year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtensionRequest {
    /// Index of the settlement
    pub index: usize,
    /// ID of the settlement, used to break ties
    pub id: SettlementID,
    /// LCOE of the cheapest off-grid alternative ([`MoneyPerEnergy::INFINITE`] if there is none)
    pub benchmark: MoneyPerEnergy,
    /// Households which would be connected
    pub households: f64,
}

/// Rules deciding which settlements may be connected and in what order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtensionRules {
    /// Maximum length of a new line to the grid
    pub max_dist: Distance,
    /// How candidates are ranked
    pub prioritization: Prioritization,
    /// Maximum grid investment per household, if any
    pub max_cost_per_household: Option<Money>,
    /// Settlements this close to the grid are connected before ranking
    pub intensification_dist: Distance,
    /// Maximum investment per household for automatic connection
    pub intensification_threshold: Money,
    /// Whether candidates are connected in ranked order after intensification. Without a grid
    /// backbone, only intensification takes place.
    pub ranked: bool,
}

/// A settlement connected to the grid by [`extend_grid`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Index of the settlement
    pub index: usize,
    /// Cost of connecting the settlement
    pub cost: CostOutcome,
    /// How the settlement was connected
    pub link: GridLink,
    /// Whether the settlement was connected automatically, without being ranked
    pub intensified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Intensification,
    Ranked(Prioritization),
}

/// Ranking key for a candidate. Lower values are connected first.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Priority {
    primary: f64,
    secondary: f64,
    id: SettlementID,
}

impl Eq for Priority {}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.primary
            .total_cmp(&other.primary)
            .then(self.secondary.total_cmp(&other.secondary))
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    priority: Priority,
    index: usize,
    version: u32,
}

/// What is left of this year's extension limits
#[derive(Debug, Clone, Copy)]
struct Remaining {
    connections: Option<f64>,
    capacity: Option<Capacity>,
}

impl Remaining {
    fn admits(&self, households: f64, capacity: Capacity) -> bool {
        self.connections
            .is_none_or(|left| households <= left + LIMIT_TOLERANCE)
            && self
                .capacity
                .is_none_or(|left| capacity.value() <= left.value() + LIMIT_TOLERANCE)
    }

    fn deduct(&mut self, households: f64, capacity: Capacity) {
        if let Some(left) = self.connections.as_mut() {
            *left = (*left - households).max(0.0);
        }
        if let Some(left) = self.capacity.as_mut() {
            *left = (*left - capacity).max(Capacity(0.0));
        }
    }

    fn is_exhausted(&self) -> bool {
        self.connections.is_some_and(|left| left <= LIMIT_TOLERANCE)
            || self
                .capacity
                .is_some_and(|left| left.value() <= LIMIT_TOLERANCE)
    }
}

/// Extend the grid to as many of the requested settlements as the rules and limits allow.
///
/// Settlements within the intensification distance are connected first, in order of distance.
/// If `rules.ranked` is set, the remaining candidates are then connected greedily in order of
/// `rules.prioritization`, as long as their grid LCOE does not exceed their off-grid benchmark.
/// Ties are broken by settlement ID.
/// A candidate which does not fit within the remaining limits is skipped. `grid_cost` gives the
/// cost of connecting a settlement over the given link.
///
/// Returns the connections made, in the order they were made.
pub fn extend_grid<F>(
    network: &mut GridNetwork,
    requests: &[ExtensionRequest],
    rules: &ExtensionRules,
    limits: ExtensionLimits,
    mut grid_cost: F,
) -> Vec<Connection>
where
    F: FnMut(usize, GridLink) -> CostOutcome,
{
    let mut by_index = vec![None; network.connected.len()];
    for request in requests {
        by_index[request.index] = Some(*request);
    }

    let mut planner = Planner {
        network,
        requests: &by_index,
        rules,
        remaining: Remaining {
            connections: limits.connections,
            capacity: limits.capacity,
        },
        versions: vec![0; by_index.len()],
        queued: vec![None; by_index.len()],
        connections: Vec::new(),
    };

    if rules.intensification_dist > Distance(0.0) {
        planner.run(Phase::Intensification, &mut grid_cost);
    }
    let intensified = planner.connections.len();
    if rules.ranked {
        planner.run(Phase::Ranked(rules.prioritization), &mut grid_cost);
    }

    debug!(
        "Grid extended to {} settlements ({} by intensification)",
        planner.connections.len(),
        intensified
    );

    planner.connections
}

struct Planner<'a> {
    network: &'a mut GridNetwork,
    requests: &'a [Option<ExtensionRequest>],
    rules: &'a ExtensionRules,
    remaining: Remaining,
    versions: Vec<u32>,
    /// Cost and link of each candidate's latest queue entry
    queued: Vec<Option<(CostOutcome, GridLink)>>,
    connections: Vec<Connection>,
}

impl Planner<'_> {
    fn run<F>(&mut self, phase: Phase, grid_cost: &mut F)
    where
        F: FnMut(usize, GridLink) -> CostOutcome,
    {
        let requests = self.requests;
        let mut queue = BinaryHeap::new();
        self.queued.fill(None);
        for request in requests.iter().flatten() {
            self.enqueue(&mut queue, phase, request, grid_cost);
        }

        while let Some(Reverse(entry)) = queue.pop() {
            if self.remaining.is_exhausted() {
                break;
            }

            let idx = entry.index;
            if entry.version != self.versions[idx] || self.network.is_connected(idx) {
                continue;
            }
            let (Some(request), Some((cost, link))) = (requests[idx], self.queued[idx].take())
            else {
                continue;
            };
            if !self.remaining.admits(request.households, cost.capacity) {
                continue;
            }

            self.remaining.deduct(request.households, cost.capacity);
            self.connections.push(Connection {
                index: idx,
                cost,
                link,
                intensified: phase == Phase::Intensification,
            });

            // Neighbours now closer to the grid are ranked again with their new link
            for other in self.network.connect(idx, link) {
                if let Some(request) = &requests[other] {
                    self.enqueue(&mut queue, phase, request, grid_cost);
                }
            }
        }
    }

    /// Add a request to the queue with its current link, replacing any earlier entry for the same
    /// settlement unless that entry is cheaper.
    ///
    /// An earlier entry stays valid if the new link cannot be used, as its own link is still
    /// available.
    fn enqueue<F>(
        &mut self,
        queue: &mut BinaryHeap<Reverse<QueueEntry>>,
        phase: Phase,
        request: &ExtensionRequest,
        grid_cost: &mut F,
    ) where
        F: FnMut(usize, GridLink) -> CostOutcome,
    {
        let idx = request.index;
        let Some((priority, cost, link)) = self.candidate(phase, request, grid_cost) else {
            return;
        };
        if self.queued[idx].is_some_and(|(queued, _)| queued.lcoe < cost.lcoe) {
            return;
        }

        self.versions[idx] += 1;
        self.queued[idx] = Some((cost, link));
        queue.push(Reverse(QueueEntry {
            priority,
            index: idx,
            version: self.versions[idx],
        }));
    }

    /// Rank a request, or return `None` if it may not be connected in this phase
    fn candidate<F>(
        &self,
        phase: Phase,
        request: &ExtensionRequest,
        grid_cost: &mut F,
    ) -> Option<(Priority, CostOutcome, GridLink)>
    where
        F: FnMut(usize, GridLink) -> CostOutcome,
    {
        let idx = request.index;
        if self.network.is_connected(idx) {
            return None;
        }

        let link = self.network.link(idx);
        if link.distance > self.rules.max_dist {
            return None;
        }
        if phase == Phase::Intensification && link.distance > self.rules.intensification_dist {
            return None;
        }

        let cost = grid_cost(idx, link);
        if !cost.is_feasible() {
            return None;
        }
        let per_household = cost.investment_per_household(request.households);

        let (primary, secondary) = match phase {
            Phase::Intensification => {
                if per_household > self.rules.intensification_threshold {
                    return None;
                }
                (link.distance.value(), 0.0)
            }
            Phase::Ranked(prioritization) => {
                if cost.lcoe > request.benchmark {
                    return None;
                }
                if self
                    .rules
                    .max_cost_per_household
                    .is_some_and(|max_cost| per_household > max_cost)
                {
                    return None;
                }
                match prioritization {
                    Prioritization::Distance => (link.distance.value(), 0.0),
                    Prioritization::Lcoe => (cost.lcoe.value(), 0.0),
                    Prioritization::Hybrid => (f64::from(link.hops), cost.lcoe.value()),
                }
            }
        };

        let priority = Priority {
            primary,
            secondary,
            id: request.id,
        };
        Some((priority, cost, link))
    }
}
