//! Aggregation of settlement results by technology.
use crate::settlement::SettlementYear;
use crate::technology::TechnologyKind;
use crate::units::{Capacity, Money};
use indexmap::IndexMap;
use strum::IntoEnumIterator;

/// Totals for one technology in one year
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TechnologySummary {
    /// Population served by the technology
    pub population: f64,
    /// Households newly connected in this year
    pub new_connections: f64,
    /// Generation capacity added in this year
    pub new_capacity: Capacity,
    /// Investment made in this year
    pub investment: Money,
}

/// Totals for every technology in one year, in declaration order
pub type YearlySummary = IndexMap<TechnologyKind, TechnologySummary>;

/// Sum the results of electrified settlements by technology.
///
/// Every technology is included, with zeros if it serves no settlements.
pub fn summarise(states: &[SettlementYear]) -> YearlySummary {
    let mut summary: YearlySummary = TechnologyKind::iter()
        .map(|kind| (kind, TechnologySummary::default()))
        .collect();

    for state in states {
        let Some(kind) = state.technology else {
            continue;
        };
        let totals = summary.entry(kind).or_default();
        totals.population += state.population;
        totals.new_connections += state.new_connections;
        totals.new_capacity += state.new_capacity;
        totals.investment += state.investment;
    }

    summary
}
