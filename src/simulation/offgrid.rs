//! Selection of the least-cost off-grid technology for a settlement.
use super::costs::{CostModel, CostOutcome, Load};
use crate::settlement::Settlement;
use crate::technology::TechnologyKind;
use indexmap::IndexMap;

/// The cost of each off-grid technology evaluated for a settlement, in declaration order
pub type OffGridOptions = IndexMap<TechnologyKind, CostOutcome>;

/// Evaluate every enabled off-grid technology for a settlement.
///
/// Mini-grids are not considered for settlements with fewer than `min_mini_grid_population`
/// people, but standalone systems always are.
pub fn evaluate_offgrid(
    cost_model: &CostModel,
    settlement: &Settlement,
    load: &Load,
    population: f64,
    min_mini_grid_population: f64,
) -> OffGridOptions {
    cost_model
        .technologies()
        .filter(|kind| !kind.extends_network())
        .filter(|kind| !kind.is_mini_grid() || population >= min_mini_grid_population)
        .map(|kind| (kind, cost_model.evaluate(kind, settlement, load, None)))
        .collect()
}

/// The off-grid technology with the lowest finite LCOE, if any.
///
/// Ties are broken in favour of the technology declared first.
pub fn best_offgrid(options: &OffGridOptions) -> Option<(TechnologyKind, CostOutcome)> {
    let mut best: Option<(TechnologyKind, CostOutcome)> = None;
    for (&kind, &outcome) in options {
        if !outcome.is_feasible() {
            continue;
        }

        match best {
            Some((best_kind, best_outcome))
                if (best_outcome.lcoe, best_kind) <= (outcome.lcoe, kind) => {}
            _ => best = Some((kind, outcome)),
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model_parameters, scenario, settlement, technologies};
    use crate::model::ModelParameters;
    use crate::scenario::{Scenario, ScenarioParameters};
    use crate::technology::TechnologyMap;
    use crate::units::{Capacity, Energy, Money, MoneyPerEnergy};
    use rstest::rstest;

    fn outcome(lcoe: f64) -> CostOutcome {
        CostOutcome {
            lcoe: MoneyPerEnergy(lcoe),
            investment: Money(1.0),
            capacity: Capacity(1.0),
        }
    }

    #[test]
    fn test_best_offgrid() {
        let options: OffGridOptions = [
            (TechnologyKind::SaDiesel, outcome(0.5)),
            (TechnologyKind::SaPv, outcome(0.4)),
            (TechnologyKind::MgPv, outcome(0.4)), // Same LCOE as SaPv, which is declared first
            (TechnologyKind::MgHydro, CostOutcome::INFEASIBLE),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            best_offgrid(&options),
            Some((TechnologyKind::SaPv, outcome(0.4)))
        );
    }

    #[test]
    fn test_best_offgrid_none_feasible() {
        let options: OffGridOptions = [(TechnologyKind::SaPv, CostOutcome::INFEASIBLE)]
            .into_iter()
            .collect();
        assert_eq!(best_offgrid(&options), None);
        assert_eq!(best_offgrid(&OffGridOptions::new()), None);
    }

    #[rstest]
    #[case(1000.0, true)]
    #[case(50.0, false)]
    fn test_evaluate_offgrid_min_population(
        settlement: Settlement,
        model_parameters: ModelParameters,
        scenario: Scenario,
        technologies: TechnologyMap,
        #[case] population: f64,
        #[case] mini_grids: bool,
    ) {
        let params = ScenarioParameters::new(&model_parameters, &scenario);
        let cost_model = CostModel::new(&params, &technologies);
        let load = Load {
            households: population / 5.0,
            energy: Energy(population * 30.0),
        };
        let options = evaluate_offgrid(&cost_model, &settlement, &load, population, 100.0);

        assert!(!options.contains_key(&TechnologyKind::Grid));
        assert!(options.contains_key(&TechnologyKind::SaPv));
        assert!(options.contains_key(&TechnologyKind::SaDiesel));
        assert_eq!(options.contains_key(&TechnologyKind::MgDiesel), mini_grids);
        assert_eq!(options.contains_key(&TechnologyKind::MgPvHybrid), mini_grids);
        assert!(best_offgrid(&options).is_some());
    }
}
