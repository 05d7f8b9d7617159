//! Fixtures for tests
use crate::id::SettlementID;
use crate::model::{
    DieselParameters, HybridParameters, Model, ModelParameters, NetworkParameters, Prioritization,
};
use crate::scenario::{GridOption, Scenario, ScenarioMap, TierPolicy};
use crate::settlement::{Settlement, SettlementType};
use crate::technology::{CapitalCostSchedule, TechnologyKind, TechnologyMap, TechnologySpec};
use crate::units::{Capacity, Dimensionless, Distance, Money, MoneyPerCapacity, MoneyPerEnergy};
use indexmap::indexmap;
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A rural settlement of 1000 people, 20 km from the grid
#[fixture]
pub fn settlement() -> Settlement {
    Settlement {
        id: SettlementID(1),
        x: 30.0,
        y: -1.0,
        population: 1000.0,
        grid_cell_area: 1.0,
        dist_to_mv: Distance(20.0),
        dist_to_hv: Distance(40.0),
        dist_to_road: Distance(5.0),
        travel_hours: 2.0,
        ghi: 2000.0,
        wind_cf: 0.2,
        hydro_potential: Capacity(0.0),
        hydro_distance: Distance(10.0),
        settlement_type: SettlementType::Rural,
        electrified: false,
        grid_penalty: 1.0,
    }
}

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters {
        start_year: 2020,
        milestone_years: vec![2025, 2030],
        electrification_targets: vec![1.0, 1.0],
        discount_rate: Dimensionless(0.1),
        people_per_household_urban: 6.6,
        people_per_household_rural: 5.0,
        urban_growth_rate: 0.03,
        rural_growth_rate: 0.02,
        max_grid_extension_dist: Distance(50.0),
        min_mini_grid_population: 100.0,
        prioritization: Prioritization::Lcoe,
        max_grid_cost_per_household: None,
        grid_limits: Vec::new(),
        network: NetworkParameters::default(),
        diesel: DieselParameters::default(),
        hybrid: HybridParameters::default(),
    }
}

#[fixture]
pub fn scenario() -> Scenario {
    Scenario {
        id: "base".into(),
        description: "Baseline".into(),
        tier_policy: TierPolicy::Low,
        rural_demand_low: 600.0,
        rural_demand_high: 900.0,
        urban_demand_low: 900.0,
        urban_demand_high: 1500.0,
        rural_commercial_factor: 0.2,
        urban_commercial_factor: 0.3,
        grid_generation_cost: MoneyPerEnergy(0.1),
        diesel_price: 1.2,
        pv_cost_factor: Dimensionless(1.0),
        lv_line_cost: None,
        mv_line_cost: None,
        intensification_dist: Distance(0.0),
        intensification_threshold: Money(0.0),
        grid_option: GridOption::NationalBackbone,
    }
}

/// A capital cost schedule with the same cost at every scale
pub fn flat_schedule(cost: f64) -> CapitalCostSchedule {
    CapitalCostSchedule::new(vec![(None, MoneyPerCapacity(cost))]).unwrap()
}

/// Parameters for a technology with a flat capital cost
#[allow(clippy::too_many_arguments)]
fn technology(
    kind: TechnologyKind,
    tech_life: u32,
    om_costs: f64,
    base_to_peak_load_ratio: f64,
    distribution_losses: f64,
    connection_cost_per_hh: f64,
    capacity_factor: Option<f64>,
    capital_cost: f64,
) -> TechnologySpec {
    TechnologySpec {
        kind,
        tech_life,
        om_costs: Dimensionless(om_costs),
        base_to_peak_load_ratio,
        distribution_losses: Dimensionless(distribution_losses),
        connection_cost_per_hh: Money(connection_cost_per_hh),
        capacity_factor,
        om_of_td_lines: Dimensionless(0.02),
        efficiency: None,
        discount_rate: None,
        capital_costs: flat_schedule(capital_cost),
    }
}

/// Every technology, with costs typical of sub-Saharan Africa
#[fixture]
pub fn technologies() -> TechnologyMap {
    let diesel = |spec: TechnologySpec, efficiency| TechnologySpec {
        efficiency: Some(efficiency),
        ..spec
    };

    [
        technology(TechnologyKind::Grid, 30, 0.02, 0.8, 0.08, 125.0, None, 2000.0),
        diesel(
            technology(TechnologyKind::SaDiesel, 10, 0.1, 0.5, 0.0, 0.0, Some(0.5), 938.0),
            0.28,
        ),
        technology(TechnologyKind::SaPv, 15, 0.02, 0.9, 0.0, 0.0, None, 9000.0),
        diesel(
            technology(TechnologyKind::MgDiesel, 15, 0.1, 0.5, 0.05, 100.0, Some(0.7), 721.0),
            0.33,
        ),
        technology(TechnologyKind::MgPv, 20, 0.015, 0.8, 0.1, 100.0, None, 4300.0),
        technology(TechnologyKind::MgWind, 20, 0.02, 0.75, 0.1, 100.0, None, 5000.0),
        technology(TechnologyKind::MgHydro, 30, 0.03, 0.5, 0.1, 100.0, Some(0.5), 5000.0),
        technology(TechnologyKind::MgPvHybrid, 20, 0.015, 0.5, 0.1, 100.0, None, 4300.0),
        technology(TechnologyKind::MgWindHybrid, 20, 0.02, 0.5, 0.1, 100.0, None, 5000.0),
    ]
    .into_iter()
    .map(|spec| (spec.kind, spec))
    .collect()
}

/// A small model with four settlements.
///
/// Settlement 1 is the [`settlement`] fixture. Settlement 2 is a smaller village about 5 km east of
/// it. Settlement 3 is an electrified town and settlement 4 is a remote hamlet too small for a
/// mini-grid.
#[fixture]
pub fn model(
    settlement: Settlement,
    model_parameters: ModelParameters,
    scenario: Scenario,
    technologies: TechnologyMap,
) -> Model {
    let settlements = vec![
        settlement.clone(),
        Settlement {
            id: SettlementID(2),
            x: 30.05,
            population: 400.0,
            dist_to_mv: Distance(25.0),
            dist_to_hv: Distance(45.0),
            ..settlement.clone()
        },
        Settlement {
            id: SettlementID(3),
            x: 30.2,
            population: 5000.0,
            grid_cell_area: 4.0,
            dist_to_mv: Distance(0.0),
            dist_to_hv: Distance(10.0),
            settlement_type: SettlementType::Urban,
            electrified: true,
            ..settlement.clone()
        },
        Settlement {
            id: SettlementID(4),
            x: 32.0,
            y: 1.0,
            population: 80.0,
            dist_to_mv: Distance(150.0),
            dist_to_hv: Distance(200.0),
            travel_hours: 8.0,
            ..settlement
        },
    ];
    let scenarios: ScenarioMap = indexmap! { scenario.id.clone() => scenario };

    Model {
        model_path: PathBuf::new(),
        parameters: model_parameters,
        settlements,
        technologies,
        scenarios,
    }
}
