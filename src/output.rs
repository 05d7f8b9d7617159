//! The module responsible for writing output data to disk.
use crate::id::SettlementID;
use crate::scenario::ScenarioID;
use crate::settlement::{Settlement, SettlementYear};
use crate::simulation::YearResults;
use crate::technology::{TechnologyKind, technology_label};
use crate::units::{Capacity, Distance, Energy, Money, MoneyPerEnergy};
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "elecplan_results";

/// The output file name for settlement results
const SETTLEMENTS_FILE_NAME: &str = "settlements.csv";

/// The output file name for totals by technology
const SUMMARY_FILE_NAME: &str = "summary.csv";

/// The output file name for electrification outcomes
const ELECTRIFICATION_FILE_NAME: &str = "electrification.csv";

/// The output file name for the LCOE of every technology considered
const LCOES_FILE_NAME: &str = "debug_lcoes.csv";

/// Get the model name from the specified directory path
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model specified at `model_dir`.
///
/// Returns `true` if an existing, non-empty folder is to be overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if output_dir.is_dir() {
        let is_empty = output_dir.read_dir()?.next().is_none();
        if is_empty {
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Rerun with --overwrite to overwrite it."
        );

        // Remove the old results so that stale files aren't left behind
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// LCOEs are written as empty fields where a technology is infeasible
fn finite(lcoe: MoneyPerEnergy) -> Option<MoneyPerEnergy> {
    lcoe.is_finite().then_some(lcoe)
}

/// Represents a row in the settlements CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SettlementRow {
    year: u32,
    settlement_id: SettlementID,
    population: f64,
    connected_households: f64,
    new_connections: f64,
    new_capacity: Capacity,
    investment: Money,
    technology: String,
    demand: Energy,
    grid_lcoe: Option<MoneyPerEnergy>,
    offgrid_technology: Option<String>,
    offgrid_lcoe: Option<MoneyPerEnergy>,
    grid_distance: Distance,
    grid_hops: u32,
    elec_order: Option<u32>,
}

impl SettlementRow {
    fn new(settlement_id: SettlementID, state: &SettlementYear) -> Self {
        let grid_lcoe = state
            .lcoes
            .get(&TechnologyKind::Grid)
            .copied()
            .and_then(finite);

        Self {
            year: state.year,
            settlement_id,
            population: state.population,
            connected_households: state.connected_households,
            new_connections: state.new_connections,
            new_capacity: state.new_capacity,
            investment: state.investment,
            technology: technology_label(state.technology),
            demand: state.demand,
            grid_lcoe,
            offgrid_technology: state.offgrid.map(|(kind, _)| kind.to_string()),
            offgrid_lcoe: state.offgrid.and_then(|(_, lcoe)| finite(lcoe)),
            grid_distance: state.grid_distance,
            grid_hops: state.grid_hops,
            elec_order: state.elec_order,
        }
    }
}

/// Represents a row in the summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SummaryRow {
    year: u32,
    technology: String,
    population: f64,
    new_connections: f64,
    new_capacity: Capacity,
    investment: Money,
}

/// Represents a row in the electrification CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ElectrificationRow {
    year: u32,
    target: Option<f64>,
    achieved_rate: f64,
    unelectrified_population: f64,
    infeasible_settlements: usize,
    target_met: bool,
}

/// Represents a row in the LCOEs CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct LcoeRow {
    year: u32,
    settlement_id: SettlementID,
    technology: String,
    lcoe: Option<MoneyPerEnergy>,
}

/// An object for writing the results of one scenario to file
pub struct DataWriter {
    settlements_writer: csv::Writer<File>,
    summary_writer: csv::Writer<File>,
    electrification_writer: csv::Writer<File>,
    lcoes_writer: Option<csv::Writer<File>>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder in which a subfolder for the scenario will be created
    /// * `scenario_id` - The scenario whose results will be written
    /// * `save_debug_info` - Whether to include extra CSV files for debugging model
    pub fn create(
        output_path: &Path,
        scenario_id: &ScenarioID,
        save_debug_info: bool,
    ) -> Result<Self> {
        let scenario_path = output_path.join(scenario_id.to_string());
        fs::create_dir_all(&scenario_path).with_context(|| {
            format!(
                "Failed to create output folder for scenario {scenario_id}: {}",
                scenario_path.display()
            )
        })?;

        let new_writer = |file_name| {
            let file_path = scenario_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        let lcoes_writer = if save_debug_info {
            Some(new_writer(LCOES_FILE_NAME)?)
        } else {
            None
        };

        Ok(Self {
            settlements_writer: new_writer(SETTLEMENTS_FILE_NAME)?,
            summary_writer: new_writer(SUMMARY_FILE_NAME)?,
            electrification_writer: new_writer(ELECTRIFICATION_FILE_NAME)?,
            lcoes_writer,
        })
    }

    /// Write the results of one year to the CSV files
    pub fn write_year(&mut self, settlements: &[Settlement], results: &YearResults) -> Result<()> {
        self.write_settlements(settlements, results)?;
        self.write_summary(results)?;
        self.write_electrification(results)?;
        if self.lcoes_writer.is_some() {
            self.write_lcoes(settlements, results)?;
        }

        Ok(())
    }

    /// Write the state of each settlement
    fn write_settlements(
        &mut self,
        settlements: &[Settlement],
        results: &YearResults,
    ) -> Result<()> {
        for (settlement, state) in settlements.iter().zip(&results.settlements) {
            let row = SettlementRow::new(settlement.id, state);
            self.settlements_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write totals by technology
    fn write_summary(&mut self, results: &YearResults) -> Result<()> {
        for (kind, totals) in &results.summary {
            let row = SummaryRow {
                year: results.year,
                technology: kind.to_string(),
                population: totals.population,
                new_connections: totals.new_connections,
                new_capacity: totals.new_capacity,
                investment: totals.investment,
            };
            self.summary_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Write how the year compares with its electrification target
    fn write_electrification(&mut self, results: &YearResults) -> Result<()> {
        let outcome = &results.outcome;
        let row = ElectrificationRow {
            year: outcome.year,
            target: outcome.target,
            achieved_rate: outcome.achieved_rate,
            unelectrified_population: outcome.unelectrified_population,
            infeasible_settlements: outcome.infeasible_settlements,
            target_met: outcome.target_met,
        };
        self.electrification_writer.serialize(row)?;

        Ok(())
    }

    /// Write the LCOE of every technology considered for each settlement
    fn write_lcoes(&mut self, settlements: &[Settlement], results: &YearResults) -> Result<()> {
        let Some(wtr) = self.lcoes_writer.as_mut() else {
            return Ok(());
        };

        for (settlement, state) in settlements.iter().zip(&results.settlements) {
            for (kind, lcoe) in &state.lcoes {
                let row = LcoeRow {
                    year: results.year,
                    settlement_id: settlement.id,
                    technology: kind.to_string(),
                    lcoe: finite(*lcoe),
                };
                wtr.serialize(row)?;
            }
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.settlements_writer.flush()?;
        self.summary_writer.flush()?;
        self.electrification_writer.flush()?;
        if let Some(wtr) = self.lcoes_writer.as_mut() {
            wtr.flush()?;
        }

        Ok(())
    }
}
