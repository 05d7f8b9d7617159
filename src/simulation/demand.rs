//! Calculation of settlement population and electricity demand.
use crate::scenario::{DemandTargets, ScenarioParameters, TierPolicy};
use crate::settlement::Settlement;
use crate::units::{Capacity, Dimensionless, Energy};

/// Hours in a (non-leap) year
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// The demand of a settlement in a given year
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementDemand {
    /// Projected population
    pub population: f64,
    /// Number of households
    pub households: f64,
    /// Annual energy demand, including commercial demand
    pub energy: Energy,
}

/// Demand per household in the given year (kWh/household/year).
///
/// For [`TierPolicy::Linear`], demand moves from the low target in `start_year` to the high target
/// in `end_year`, so it never decreases from one year to the next.
pub fn household_demand(
    targets: &DemandTargets,
    policy: TierPolicy,
    year: u32,
    start_year: u32,
    end_year: u32,
) -> f64 {
    match policy {
        TierPolicy::Low => targets.low,
        TierPolicy::High => targets.high,
        TierPolicy::Linear => {
            if end_year <= start_year {
                return targets.high;
            }
            let progress = (f64::from(year.saturating_sub(start_year))
                / f64::from(end_year - start_year))
            .clamp(0.0, 1.0);
            targets.low + (targets.high - targets.low) * progress
        }
    }
}

/// Calculate the population, households and annual energy demand of a settlement in a given year
pub fn settlement_demand(
    settlement: &Settlement,
    year: u32,
    params: &ScenarioParameters,
) -> SettlementDemand {
    let model = params.model;
    let settlement_type = settlement.settlement_type;
    let population = settlement.population_in(
        model.start_year,
        year,
        params.growth_rate(settlement_type),
    );
    let households = population / params.people_per_household(settlement_type);
    let targets = params.demand_targets(settlement_type);
    let per_household = household_demand(
        &targets,
        params.scenario.tier_policy,
        year,
        model.start_year,
        model.end_year(),
    );

    SettlementDemand {
        population,
        households,
        energy: Energy(households * per_household * (1.0 + targets.commercial_factor)),
    }
}

/// Energy which must be generated to deliver `energy` after distribution losses
pub fn generation_required(energy: Energy, losses: Dimensionless) -> Energy {
    energy / (Dimensionless(1.0) - losses)
}

/// Peak load implied by annual generation and the ratio of average to peak load
pub fn peak_load(generation: Energy, base_to_peak_load_ratio: f64) -> Capacity {
    Capacity(generation.value() / HOURS_PER_YEAR / base_to_peak_load_ratio)
}
