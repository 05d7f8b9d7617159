//! Electrification-rate targets and the outcome of each year against them.
use crate::settlement::SettlementYear;

/// Tolerance when comparing electrification rates with targets
const RATE_TOLERANCE: f64 = 1e-9;

/// How a year's electrification compares with its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectrificationOutcome {
    /// The analysis year
    pub year: u32,
    /// Target share of the population with access to electricity, if any
    pub target: Option<f64>,
    /// Share of the population with access to electricity once the target has been enforced
    pub achieved_rate: f64,
    /// Population without access to electricity
    pub unelectrified_population: f64,
    /// Unelectrified settlements for which no technology was feasible
    pub infeasible_settlements: usize,
    /// Whether the target was reached before any settlements were removed to enforce it
    pub target_met: bool,
}

/// Share of the total population living in electrified settlements.
///
/// A model with no population is treated as fully electrified.
pub fn electrification_rate(states: &[SettlementYear]) -> f64 {
    let total: f64 = states.iter().map(|state| state.population).sum();
    if total <= 0.0 {
        return 1.0;
    }

    electrified_population(states) / total
}

fn electrified_population(states: &[SettlementYear]) -> f64 {
    states
        .iter()
        .filter(|state| state.is_electrified())
        .map(|state| state.population)
        .sum()
}

/// Whether `rate` reaches `target`, allowing for rounding error
pub fn meets_target(rate: f64, target: f64) -> bool {
    rate >= target - RATE_TOLERANCE
}

/// Unelectrify settlements, lowest priority first, until the electrification rate no longer
/// exceeds `target`.
///
/// Only settlements in `priority` (those electrified in this year, highest priority first) are
/// removed. Returns the indices of the settlements removed.
pub fn enforce_target(
    states: &mut [SettlementYear],
    priority: &[usize],
    target: f64,
) -> Vec<usize> {
    let total: f64 = states.iter().map(|state| state.population).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut electrified = electrified_population(states);
    let mut removed = Vec::new();
    for &idx in priority.iter().rev() {
        if electrified / total <= target + RATE_TOLERANCE {
            break;
        }

        let state = &mut states[idx];
        electrified -= state.population;
        state.unelectrify();
        removed.push(idx);
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::settlement;
    use crate::settlement::Settlement;
    use crate::technology::TechnologyKind;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    /// Four settlements of 100 people, the first already electrified
    #[fixture]
    fn states(settlement: Settlement) -> Vec<SettlementYear> {
        (0..4)
            .map(|i| {
                let mut state = SettlementYear::initial(&settlement, 2020, 5.0);
                state.population = 100.0;
                if i == 0 {
                    state.technology = Some(TechnologyKind::Grid);
                }
                state
            })
            .collect()
    }

    #[rstest]
    fn test_electrification_rate(mut states: Vec<SettlementYear>) {
        assert_approx_eq!(f64, electrification_rate(&states), 0.25);
        states[1].technology = Some(TechnologyKind::SaPv);
        assert_approx_eq!(f64, electrification_rate(&states), 0.5);
        assert_approx_eq!(f64, electrification_rate(&[]), 1.0);
    }

    #[rstest]
    fn test_enforce_target(mut states: Vec<SettlementYear>) {
        for (state, kind) in states[1..]
            .iter_mut()
            .zip([TechnologyKind::Grid, TechnologyKind::MgPv, TechnologyKind::SaPv])
        {
            state.technology = Some(kind);
        }

        // Rate is 100%, so the two lowest priority settlements must go to reach 50%
        let removed = enforce_target(&mut states, &[1, 2, 3], 0.5);
        assert_eq!(removed, [3, 2]);
        assert_approx_eq!(f64, electrification_rate(&states), 0.5);
        assert!(states[1].is_grid_connected());
        assert!(!states[2].is_electrified());
    }

    #[rstest]
    fn test_enforce_target_keeps_existing(mut states: Vec<SettlementYear>) {
        states[1].technology = Some(TechnologyKind::SaPv);

        // Only settlements electrified this year may be removed
        let removed = enforce_target(&mut states, &[1], 0.0);
        assert_eq!(removed, [1]);
        assert!(states[0].is_electrified());
        assert_approx_eq!(f64, electrification_rate(&states), 0.25);
    }

    #[rstest]
    fn test_enforce_target_already_met(mut states: Vec<SettlementYear>) {
        states[1].technology = Some(TechnologyKind::SaPv);
        assert!(enforce_target(&mut states, &[1], 0.5).is_empty());
        assert!(meets_target(electrification_rate(&states), 0.5));
        assert!(!meets_target(electrification_rate(&states), 0.75));
    }
}
