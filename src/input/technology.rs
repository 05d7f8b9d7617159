//! Code for reading technology parameters and capital cost schedules from CSV files.
use super::*;
use crate::technology::{CapitalCostSchedule, TechnologyKind, TechnologyMap, TechnologySpec};
use crate::units::{Dimensionless, Money, MoneyPerCapacity};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const TECHNOLOGIES_FILE_NAME: &str = "technologies.csv";
const CAPITAL_COSTS_FILE_NAME: &str = "capital_costs.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TechnologyRaw {
    id: TechnologyKind,
    tech_life: u32,
    om_costs: f64,
    base_to_peak_load_ratio: f64,
    distribution_losses: f64,
    connection_cost_per_hh: f64,
    capacity_factor: Option<f64>,
    om_of_td_lines: f64,
    efficiency: Option<f64>,
    discount_rate: Option<f64>,
}

impl TechnologyRaw {
    /// Check the parameters, returning an error naming the offending field
    fn validate(&self) -> Result<()> {
        ensure!(self.tech_life > 0, "tech_life must be greater than zero");
        check_non_negative("om_costs", self.om_costs)?;
        ensure!(
            self.base_to_peak_load_ratio > 0.0 && self.base_to_peak_load_ratio <= 1.0,
            "base_to_peak_load_ratio must be greater than zero and at most one (got {})",
            self.base_to_peak_load_ratio
        );
        ensure!(
            (0.0..1.0).contains(&self.distribution_losses),
            "distribution_losses must be at least zero and less than one (got {})",
            self.distribution_losses
        );
        check_non_negative("connection_cost_per_hh", self.connection_cost_per_hh)?;
        if let Some(capacity_factor) = self.capacity_factor {
            ensure!(
                capacity_factor > 0.0 && capacity_factor <= 1.0,
                "capacity_factor must be greater than zero and at most one (got {capacity_factor})"
            );
        }
        check_non_negative("om_of_td_lines", self.om_of_td_lines)?;
        ensure!(
            self.id != TechnologyKind::ExpandedMiniGrid,
            "{} is costed with the grid parameters and cannot be given",
            self.id
        );
        match self.efficiency {
            Some(efficiency) => ensure!(
                efficiency > 0.0 && efficiency <= 1.0,
                "efficiency must be greater than zero and at most one (got {efficiency})"
            ),
            None => ensure!(
                !self.id.is_diesel(),
                "efficiency must be given for diesel technologies"
            ),
        }
        if let Some(discount_rate) = self.discount_rate {
            check_non_negative("discount_rate", discount_rate)?;
        }

        Ok(())
    }
}

#[derive(PartialEq, Debug, Deserialize)]
struct CapitalCostRaw {
    technology_id: TechnologyKind,
    threshold: Option<f64>,
    capital_cost: f64,
}

/// Read technology parameters and their capital cost schedules.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// A map of technologies, in declaration order of [`TechnologyKind`], or an error.
pub fn read_technologies(model_dir: &Path) -> Result<TechnologyMap> {
    let file_path = model_dir.join(CAPITAL_COSTS_FILE_NAME);
    let capital_costs = read_csv(&file_path)?;
    let mut schedules =
        read_capital_costs_from_iter(capital_costs).with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(TECHNOLOGIES_FILE_NAME);
    let technologies = read_csv(&file_path)?;
    read_technologies_from_iter(technologies, &mut schedules)
        .with_context(|| input_err_msg(&file_path))
}

fn read_capital_costs_from_iter<I>(iter: I) -> Result<HashMap<TechnologyKind, CapitalCostSchedule>>
where
    I: Iterator<Item = CapitalCostRaw>,
{
    let mut entries: HashMap<TechnologyKind, Vec<_>> = HashMap::new();
    for raw in iter {
        entries
            .entry(raw.technology_id)
            .or_default()
            .push((raw.threshold, MoneyPerCapacity(raw.capital_cost)));
    }

    entries
        .into_iter()
        .map(|(kind, entries)| {
            let schedule = CapitalCostSchedule::new(entries)
                .with_context(|| format!("Invalid capital cost schedule for {kind}"))?;
            Ok((kind, schedule))
        })
        .collect()
}

fn read_technologies_from_iter<I>(
    iter: I,
    schedules: &mut HashMap<TechnologyKind, CapitalCostSchedule>,
) -> Result<TechnologyMap>
where
    I: Iterator<Item = TechnologyRaw>,
{
    let mut technologies = TechnologyMap::new();
    for raw in iter {
        let kind = raw.id;
        raw.validate()
            .with_context(|| format!("Invalid parameters for technology {kind}"))?;
        let capital_costs = schedules
            .remove(&kind)
            .with_context(|| format!("No capital costs given for technology {kind}"))?;

        let spec = TechnologySpec {
            kind,
            tech_life: raw.tech_life,
            om_costs: Dimensionless(raw.om_costs),
            base_to_peak_load_ratio: raw.base_to_peak_load_ratio,
            distribution_losses: Dimensionless(raw.distribution_losses),
            connection_cost_per_hh: Money(raw.connection_cost_per_hh),
            capacity_factor: raw.capacity_factor,
            om_of_td_lines: Dimensionless(raw.om_of_td_lines),
            efficiency: raw.efficiency,
            discount_rate: raw.discount_rate.map(Dimensionless),
            capital_costs,
        };
        ensure!(
            technologies.insert(kind, spec).is_none(),
            "Duplicate technology found: {kind}"
        );
    }

    if let Some(kind) = schedules.keys().min() {
        bail!("Capital costs given for technology {kind}, which is not in {TECHNOLOGIES_FILE_NAME}");
    }
    ensure!(
        technologies.contains_key(&TechnologyKind::Grid),
        "The grid technology must be defined"
    );
    technologies.sort_keys();

    Ok(technologies)
}
