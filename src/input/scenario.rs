//! Code for reading scenarios from a CSV file.
use super::*;
use crate::scenario::{Scenario, ScenarioMap};
use anyhow::{Context, Result};
use std::path::Path;

const SCENARIOS_FILE_NAME: &str = "scenarios.csv";

/// Check that the numeric fields of a scenario are valid
fn check_scenario(scenario: &Scenario) -> Result<()> {
    check_non_negative("rural_demand_low", scenario.rural_demand_low)?;
    check_non_negative("rural_demand_high", scenario.rural_demand_high)?;
    check_non_negative("urban_demand_low", scenario.urban_demand_low)?;
    check_non_negative("urban_demand_high", scenario.urban_demand_high)?;
    ensure!(
        scenario.rural_demand_low <= scenario.rural_demand_high
            && scenario.urban_demand_low <= scenario.urban_demand_high,
        "Low demand targets cannot be greater than high demand targets"
    );
    check_non_negative("rural_commercial_factor", scenario.rural_commercial_factor)?;
    check_non_negative("urban_commercial_factor", scenario.urban_commercial_factor)?;
    check_non_negative(
        "grid_generation_cost",
        scenario.grid_generation_cost.value(),
    )?;
    check_non_negative("diesel_price", scenario.diesel_price)?;
    check_non_negative("pv_cost_factor", scenario.pv_cost_factor.value())?;
    if let Some(cost) = scenario.lv_line_cost {
        check_non_negative("lv_line_cost", cost.value())?;
    }
    if let Some(cost) = scenario.mv_line_cost {
        check_non_negative("mv_line_cost", cost.value())?;
    }
    check_non_negative(
        "intensification_dist",
        scenario.intensification_dist.value(),
    )?;
    check_non_negative(
        "intensification_threshold",
        scenario.intensification_threshold.value(),
    )?;

    Ok(())
}

/// Read scenarios from the scenarios CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of scenarios, in the order they appear in the file, or an error.
pub fn read_scenarios(model_dir: &Path) -> Result<ScenarioMap> {
    let file_path = model_dir.join(SCENARIOS_FILE_NAME);
    let scenarios = read_csv(&file_path)?;
    read_scenarios_from_iter(scenarios).with_context(|| input_err_msg(&file_path))
}

fn read_scenarios_from_iter<I>(iter: I) -> Result<ScenarioMap>
where
    I: Iterator<Item = Scenario>,
{
    let scenarios = into_id_map(iter)?;
    for (id, scenario) in &scenarios {
        check_scenario(scenario).with_context(|| format!("Invalid data for scenario {id}"))?;
    }

    Ok(scenarios)
}
