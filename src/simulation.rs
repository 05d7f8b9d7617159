//! Functionality for running the electrification planning simulation.
use crate::id::{IDCollection, SettlementID};
use crate::model::Model;
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use crate::scenario::{Scenario, ScenarioID, ScenarioParameters};
use crate::settlement::{Settlement, SettlementYear};
use crate::technology::TechnologyKind;
use crate::units::{Capacity, Money, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::path::Path;

pub mod costs;
use costs::{CostModel, CostOutcome, GridLink, Load};
pub mod demand;
use demand::{SettlementDemand, settlement_demand};
pub mod grid;
use grid::{ExtensionRequest, ExtensionRules, GridNetwork, extend_grid};
pub mod hybrid;
pub mod offgrid;
use offgrid::{best_offgrid, evaluate_offgrid};
pub mod spatial;
pub mod summary;
use summary::{YearlySummary, summarise};
pub mod targets;
use targets::{ElectrificationOutcome, electrification_rate, enforce_target, meets_target};

/// The results of one analysis year
#[derive(Debug, Clone, PartialEq)]
pub struct YearResults {
    /// The analysis year
    pub year: u32,
    /// The state of each settlement at the end of the year, in input order
    pub settlements: Vec<SettlementYear>,
    /// Totals by technology
    pub summary: YearlySummary,
    /// Electrification achieved against the target
    pub outcome: ElectrificationOutcome,
}

/// The results of running one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioResults {
    /// The scenario which was run
    pub scenario_id: ScenarioID,
    /// Results for each analysis year, in ascending order
    pub years: Vec<YearResults>,
}

/// Run the simulation.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
/// * `debug_model` - Whether to write additional information to CSV files
/// * `scenario_id` - Only run the scenario with this ID, if given
pub fn run(
    model: &Model,
    output_path: &Path,
    debug_model: bool,
    scenario_id: Option<&str>,
) -> Result<()> {
    let scenarios: Vec<&Scenario> = match scenario_id {
        Some(id) => {
            let id = model
                .scenarios
                .get_id_by_str(id)
                .context("Invalid scenario selected")?;
            vec![&model.scenarios[&id]]
        }
        None => model.scenarios.values().collect(),
    };
    write_metadata(
        output_path,
        model,
        scenarios.iter().map(|s| s.id.to_string()).collect(),
    )
    .context("Failed to save metadata")?;

    for scenario in scenarios {
        info!("Running scenario: {}", scenario.id);
        let results = run_scenario(model, scenario)?;

        let mut writer = DataWriter::create(output_path, &scenario.id, debug_model)?;
        for year in &results.years {
            writer.write_year(&model.settlements, year)?;
        }
        writer.flush()?;
    }

    Ok(())
}

/// Run a single scenario over every analysis year
pub fn run_scenario(model: &Model, scenario: &Scenario) -> Result<ScenarioResults> {
    let params = ScenarioParameters::new(&model.parameters, scenario);
    let cost_model = CostModel::new(&params, &model.technologies);
    let rules = ExtensionRules {
        max_dist: model.parameters.max_grid_extension_dist,
        prioritization: model.parameters.prioritization,
        max_cost_per_household: model.parameters.max_grid_cost_per_household,
        intensification_dist: scenario.intensification_dist,
        intensification_threshold: scenario.intensification_threshold,
        ranked: scenario.grid_option.has_backbone(),
    };
    let mut network = GridNetwork::new(
        &model.settlements,
        model.parameters.max_grid_extension_dist,
        model.parameters.network.existing_grid_cost_ratio,
    );

    let start_year = model.parameters.start_year;
    let mut states: Vec<_> = model
        .settlements
        .iter()
        .map(|settlement| {
            let people_per_household = params.people_per_household(settlement.settlement_type);
            let mut state = SettlementYear::initial(settlement, start_year, people_per_household);
            if state.is_electrified() {
                state.demand = settlement_demand(settlement, start_year, &params).energy;
            }
            state
        })
        .collect();

    let mut years = Vec::new();
    for (year, time_step) in model.parameters.iter_time_steps() {
        info!("Scenario {}: milestone year {year}", scenario.id);
        let step = YearStep {
            model,
            params: &params,
            cost_model: &cost_model,
            rules: &rules,
            year,
            time_step,
        };
        let results = step
            .run(&mut network, &states)
            .with_context(|| format!("Error in scenario {} in year {year}", scenario.id))?;
        states.clone_from(&results.settlements);
        years.push(results);
    }

    Ok(ScenarioResults {
        scenario_id: scenario.id.clone(),
        years,
    })
}

/// Everything needed to plan one analysis year
struct YearStep<'a> {
    model: &'a Model,
    params: &'a ScenarioParameters<'a>,
    cost_model: &'a CostModel<'a>,
    rules: &'a ExtensionRules,
    year: u32,
    time_step: u32,
}

impl YearStep<'_> {
    /// Plan the year, starting from the state at the end of the previous year.
    ///
    /// `network` is updated with this year's grid connections.
    fn run(&self, network: &mut GridNetwork, previous: &[SettlementYear]) -> Result<YearResults> {
        let settlements = &self.model.settlements;
        let demands: Vec<_> = settlements
            .iter()
            .map(|settlement| settlement_demand(settlement, self.year, self.params))
            .collect();

        // Settlements electrified in earlier years grow with their existing technology; the rest
        // are evaluated for every technology
        let mut states = Vec::with_capacity(settlements.len());
        let mut requests = Vec::new();
        let mut offgrid_options = vec![None; settlements.len()];
        for (idx, (settlement, prev)) in settlements.iter().zip(previous).enumerate() {
            let demand = &demands[idx];
            let mut state = self.carry_forward(prev, demand, network.link(idx));
            if let Some(kind) = prev.technology {
                self.grow(&mut state, settlement, prev, demand, kind);
            } else {
                let (request, best) =
                    self.evaluate_unelectrified(&mut state, settlement, idx, demand);
                requests.push(request);
                offgrid_options[idx] = best;
            }
            states.push(state);
        }

        // Extend a copy of the grid, as target enforcement may undo some connections
        let limits = self.model.parameters.extension_limits(self.year, self.time_step);
        let mut extended = network.clone();
        let connections = extend_grid(&mut extended, &requests, self.rules, limits, |idx, link| {
            self.cost_model.evaluate(
                TechnologyKind::Grid,
                &settlements[idx],
                &load_of(&demands[idx]),
                Some(link),
            )
        });

        // Without a backbone, intensification expands the existing networks as mini-grids
        let has_backbone = self.params.scenario.grid_option.has_backbone();
        let mut priority = Vec::new();
        for connection in &connections {
            let idx = connection.index;
            let state = &mut states[idx];
            state.technology = Some(if connection.intensified && !has_backbone {
                TechnologyKind::ExpandedMiniGrid
            } else {
                TechnologyKind::Grid
            });
            state.grid_distance = connection.link.distance;
            state.grid_hops = connection.link.hops;
            state.lcoes.insert(TechnologyKind::Grid, connection.cost.lcoe);
            connect(state, &demands[idx], &connection.cost);
            priority.push(idx);
        }

        // Remaining settlements get their cheapest off-grid option, cheapest first
        let mut offgrid: Vec<_> = requests
            .iter()
            .filter(|request| !states[request.index].is_electrified())
            .filter_map(|request| {
                offgrid_options[request.index]
                    .map(|(kind, cost)| (request.index, request.id, kind, cost))
            })
            .collect();
        offgrid.sort_by(|a, b| a.3.lcoe.total_cmp(&b.3.lcoe).then(a.1.cmp(&b.1)));
        for (idx, _, kind, cost) in offgrid {
            let state = &mut states[idx];
            state.technology = Some(kind);
            connect(state, &demands[idx], &cost);
            priority.push(idx);
        }

        for (rank, &idx) in (1u32..).zip(&priority) {
            states[idx].elec_order = Some(rank);
        }

        let infeasible = self.report_infeasible(settlements, &states);
        let outcome = self.enforce_target(&mut states, &priority, infeasible);

        // Only connections which survived target enforcement extend the grid
        for connection in &connections {
            if states[connection.index].is_grid_connected() {
                network.connect(connection.index, connection.link);
            }
        }
        for (idx, state) in states.iter_mut().enumerate() {
            if !state.is_electrified() {
                let link = network.link(idx);
                state.grid_distance = link.distance;
                state.grid_hops = link.hops;
            }
        }

        for (settlement, state) in settlements.iter().zip(&states) {
            check_finite(settlement.id, state)?;
        }

        Ok(YearResults {
            year: self.year,
            summary: summarise(&states),
            settlements: states,
            outcome,
        })
    }

    /// The state at the start of this year, before any new electrification
    fn carry_forward(
        &self,
        prev: &SettlementYear,
        demand: &SettlementDemand,
        link: GridLink,
    ) -> SettlementYear {
        SettlementYear {
            year: self.year,
            population: demand.population,
            connected_households: prev.connected_households,
            new_connections: 0.0,
            new_capacity: Capacity(0.0),
            investment: Money(0.0),
            technology: prev.technology,
            demand: demand.energy,
            lcoes: IndexMap::new(),
            offgrid: None,
            grid_distance: link.distance,
            grid_hops: link.hops,
            elec_order: None,
        }
    }

    /// Extend the supply of an already electrified settlement to meet growth in demand
    fn grow(
        &self,
        state: &mut SettlementYear,
        settlement: &Settlement,
        prev: &SettlementYear,
        demand: &SettlementDemand,
        kind: TechnologyKind,
    ) {
        let link = Some(GridLink::CONNECTED);
        let households = prev.connected_households.max(demand.households);
        let now = self.cost_model.evaluate(
            kind,
            settlement,
            &Load {
                households,
                energy: demand.energy,
            },
            link,
        );
        let before = self.cost_model.evaluate(
            kind,
            settlement,
            &Load {
                households: prev.connected_households,
                energy: prev.demand,
            },
            link,
        );
        if !now.is_feasible() {
            debug!(
                "Settlement {}: {kind} can no longer meet demand in {}",
                settlement.id, self.year
            );
        }

        state.lcoes.insert(kind, now.lcoe);
        state.connected_households = households;
        state.new_connections = households - prev.connected_households;
        if now.is_feasible() && before.is_feasible() {
            state.new_capacity = (now.capacity - before.capacity).max(Capacity(0.0));
            state.investment = (now.investment - before.investment).max(Money(0.0));
        } else if now.is_feasible() {
            state.new_capacity = now.capacity;
            state.investment = now.investment;
        }
    }

    /// Record the cost of each technology for an unelectrified settlement and request a grid
    /// connection, with the cheapest off-grid option as the benchmark
    fn evaluate_unelectrified(
        &self,
        state: &mut SettlementYear,
        settlement: &Settlement,
        idx: usize,
        demand: &SettlementDemand,
    ) -> (ExtensionRequest, Option<(TechnologyKind, CostOutcome)>) {
        let load = load_of(demand);
        let grid = self.cost_model.evaluate(
            TechnologyKind::Grid,
            settlement,
            &load,
            Some(GridLink {
                distance: state.grid_distance,
                hops: state.grid_hops,
            }),
        );
        let options = evaluate_offgrid(
            self.cost_model,
            settlement,
            &load,
            demand.population,
            self.model.parameters.min_mini_grid_population,
        );
        let best = best_offgrid(&options);

        state.lcoes.insert(TechnologyKind::Grid, grid.lcoe);
        state
            .lcoes
            .extend(options.iter().map(|(kind, outcome)| (*kind, outcome.lcoe)));
        state.offgrid = best.map(|(kind, outcome)| (kind, outcome.lcoe));

        let request = ExtensionRequest {
            index: idx,
            id: settlement.id,
            benchmark: best.map_or(MoneyPerEnergy::INFINITE, |(_, outcome)| outcome.lcoe),
            households: demand.households,
        };
        (request, best)
    }

    /// Count and log the unelectrified settlements for which no off-grid technology is feasible
    fn report_infeasible(&self, settlements: &[Settlement], states: &[SettlementYear]) -> usize {
        let mut count = 0;
        for (settlement, state) in settlements.iter().zip(states) {
            if state.is_electrified() || state.offgrid.is_some() {
                continue;
            }
            debug!(
                "No feasible technology for settlement {} in {}",
                settlement.id, self.year
            );
            count += 1;
        }
        if count > 0 {
            warn!(
                "{count} settlements have no feasible technology in {}",
                self.year
            );
        }

        count
    }

    /// Remove the lowest priority electrifications if the target is exceeded and report how the
    /// year compares with the target
    fn enforce_target(
        &self,
        states: &mut [SettlementYear],
        priority: &[usize],
        infeasible_settlements: usize,
    ) -> ElectrificationOutcome {
        let target = self.model.parameters.electrification_target(self.year);
        let rate = electrification_rate(states);
        let target_met = target.is_none_or(|target| meets_target(rate, target));

        if let Some(target) = target {
            if target_met {
                let removed = enforce_target(states, priority, target);
                if !removed.is_empty() {
                    debug!(
                        "Unelectrified {} settlements to meet the target of {target} in {}",
                        removed.len(),
                        self.year
                    );
                }
            } else {
                warn!(
                    "Electrification target of {:.1}% not met in {} (achieved {:.1}%)",
                    target * 100.0,
                    self.year,
                    rate * 100.0
                );
            }
        }

        ElectrificationOutcome {
            year: self.year,
            target,
            achieved_rate: electrification_rate(states),
            unelectrified_population: states
                .iter()
                .filter(|state| !state.is_electrified())
                .map(|state| state.population)
                .sum(),
            infeasible_settlements,
            target_met,
        }
    }
}

fn load_of(demand: &SettlementDemand) -> Load {
    Load {
        households: demand.households,
        energy: demand.energy,
    }
}

/// Record a new electrification of a settlement
fn connect(state: &mut SettlementYear, demand: &SettlementDemand, cost: &CostOutcome) {
    state.connected_households = demand.households;
    state.new_connections = demand.households;
    state.new_capacity = cost.capacity;
    state.investment = cost.investment;
}

fn check_finite(id: SettlementID, state: &SettlementYear) -> Result<()> {
    ensure!(
        state.population.is_finite()
            && state.connected_households.is_finite()
            && state.new_capacity.is_finite()
            && state.investment.is_finite()
            && state.demand.is_finite(),
        "Non-finite result calculated for settlement {id}"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, settlement};
    use crate::model::GridLimit;
    use crate::scenario::GridOption;
    use crate::technology::{UNELECTRIFIED_LABEL, technology_label};
    use crate::units::Distance;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn scenario_results(model: &Model) -> ScenarioResults {
        let scenario = model.scenarios.values().next().unwrap();
        run_scenario(model, scenario).unwrap()
    }

    #[rstest]
    fn test_unelectrified_has_no_investment(model: Model) {
        for year in scenario_results(&model).years {
            for state in &year.settlements {
                if !state.is_electrified() {
                    assert_eq!(state.investment, Money(0.0));
                    assert_eq!(state.new_capacity, Capacity(0.0));
                    assert_eq!(state.elec_order, None);
                }
            }
        }
    }

    #[rstest]
    fn test_electrified_never_shrinks(model: Model) {
        let results = scenario_results(&model);
        for pair in results.years.windows(2) {
            for (before, after) in pair[0].settlements.iter().zip(&pair[1].settlements) {
                if before.is_electrified() {
                    assert_eq!(after.technology, before.technology);
                    assert!(after.population >= before.population);
                    assert!(after.connected_households >= before.connected_households);
                }
            }
        }
    }

    #[rstest]
    fn test_summary_conserves_totals(model: Model) {
        for year in scenario_results(&model).years {
            let electrified = year.settlements.iter().filter(|s| s.is_electrified());
            let population: f64 = electrified.clone().map(|s| s.population).sum();
            let new_connections: f64 = electrified.clone().map(|s| s.new_connections).sum();
            let new_capacity: Capacity = electrified.clone().map(|s| s.new_capacity).sum();
            let investment: Money = electrified.map(|s| s.investment).sum();

            assert_approx_eq!(
                f64,
                year.summary.values().map(|t| t.population).sum::<f64>(),
                population,
                epsilon = 1e-6
            );
            assert_approx_eq!(
                f64,
                year.summary.values().map(|t| t.new_connections).sum::<f64>(),
                new_connections,
                epsilon = 1e-6
            );
            assert_approx_eq!(
                Capacity,
                year.summary.values().map(|t| t.new_capacity).sum::<Capacity>(),
                new_capacity,
                epsilon = 1e-6
            );
            assert_approx_eq!(
                Money,
                year.summary.values().map(|t| t.investment).sum::<Money>(),
                investment,
                epsilon = 1e-6
            );
        }
    }

    #[rstest]
    fn test_grid_cheaper_than_offgrid(mut model: Model) {
        // One settlement of 1000 people 20 km from the grid, for which the grid is the cheapest
        model.settlements.truncate(1);
        let results = scenario_results(&model);
        let state = &results.years[0].settlements[0];
        assert!(state.lcoes[&TechnologyKind::Grid] < state.offgrid.unwrap().1);
        assert!(state.is_grid_connected());
        assert_eq!(state.elec_order, Some(1));
        assert_eq!(state.grid_distance, Distance(20.0));
    }

    #[rstest]
    fn test_connection_limit_respected(mut model: Model) {
        model.parameters.grid_limits = vec![GridLimit {
            until_year: 2030,
            annual_new_connections: 0.0,
            annual_new_capacity: None,
        }];
        for year in scenario_results(&model).years {
            for (settlement, state) in model.settlements.iter().zip(&year.settlements) {
                assert_eq!(state.is_grid_connected(), settlement.electrified);
            }
        }
    }

    #[rstest]
    fn test_target_enforced(mut model: Model) {
        // Only settlements electrified at the start may remain electrified
        model.parameters.electrification_targets = vec![0.0, 0.0];
        for year in scenario_results(&model).years {
            assert!(year.outcome.target_met);
            for (settlement, state) in model.settlements.iter().zip(&year.settlements) {
                assert_eq!(state.is_electrified(), settlement.electrified);
            }
        }
    }

    #[rstest]
    fn test_infeasible_settlement(mut model: Model, settlement: Settlement) {
        model.settlements = vec![Settlement {
            population: 0.0,
            ..settlement
        }];
        let results = scenario_results(&model);
        let year = &results.years[0];
        assert!(!year.settlements[0].is_electrified());
        assert_eq!(year.outcome.infeasible_settlements, 1);
        assert_eq!(
            technology_label(year.settlements[0].technology),
            UNELECTRIFIED_LABEL
        );
    }

    #[rstest]
    fn test_off_grid_only(mut model: Model) {
        // Without a backbone or intensification, only the original network is on the grid
        let scenario = model.scenarios.values_mut().next().unwrap();
        scenario.grid_option = GridOption::OffGridOnly;
        for year in scenario_results(&model).years {
            for (settlement, state) in model.settlements.iter().zip(&year.settlements) {
                assert_eq!(state.is_grid_connected(), settlement.electrified);
            }
        }
    }

    #[rstest]
    fn test_off_grid_only_expands_mini_grids(mut model: Model) {
        let scenario = model.scenarios.values_mut().next().unwrap();
        scenario.grid_option = GridOption::OffGridOnly;
        scenario.intensification_dist = Distance(30.0);
        scenario.intensification_threshold = Money(1e9);

        // The two villages near the town are intensified, but the town keeps its grid connection
        let results = scenario_results(&model);
        let year = &results.years[0];
        let technologies: Vec<_> = year.settlements.iter().map(|s| s.technology).collect();
        assert_eq!(technologies[0], Some(TechnologyKind::ExpandedMiniGrid));
        assert_eq!(technologies[1], Some(TechnologyKind::ExpandedMiniGrid));
        assert_eq!(technologies[2], Some(TechnologyKind::Grid));
        assert_ne!(technologies[3], Some(TechnologyKind::ExpandedMiniGrid));
        assert!(year.summary[&TechnologyKind::ExpandedMiniGrid].population > 0.0);

        // Expanded mini-grids carry on growing in later years
        let last = &results.years[results.years.len() - 1];
        assert_eq!(
            last.settlements[0].technology,
            Some(TechnologyKind::ExpandedMiniGrid)
        );
        assert!(last.settlements[0].lcoes[&TechnologyKind::ExpandedMiniGrid].is_finite());
    }

    #[rstest]
    fn test_deterministic(model: Model) {
        assert_eq!(scenario_results(&model), scenario_results(&model));
    }

    #[rstest]
    fn test_run_unknown_scenario(model: Model) {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&model, dir.path(), false, Some("missing")).is_err());
    }
}
