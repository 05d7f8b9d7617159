//! Code for reading settlement data from a CSV file.
use super::*;
use crate::id::SettlementID;
use crate::settlement::{Settlement, SettlementType};
use crate::units::{Capacity, Distance};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

const SETTLEMENTS_FILE_NAME: &str = "settlements.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct SettlementRaw {
    id: SettlementID,
    x: f64,
    y: f64,
    population: f64,
    grid_cell_area: f64,
    dist_to_mv: f64,
    dist_to_hv: f64,
    dist_to_road: f64,
    travel_hours: f64,
    ghi: f64,
    wind_cf: f64,
    hydro_potential: f64,
    hydro_distance: f64,
    settlement_type: SettlementType,
    electrified: bool,
    grid_penalty: Option<f64>,
}

impl SettlementRaw {
    fn into_settlement(self) -> Result<Settlement> {
        ensure!(
            self.x.is_finite() && self.y.is_finite(),
            "Coordinates must be finite"
        );
        check_non_negative("population", self.population)?;
        check_non_negative("grid_cell_area", self.grid_cell_area)?;
        check_non_negative("dist_to_mv", self.dist_to_mv)?;
        check_non_negative("dist_to_hv", self.dist_to_hv)?;
        check_non_negative("dist_to_road", self.dist_to_road)?;
        check_non_negative("travel_hours", self.travel_hours)?;
        check_non_negative("ghi", self.ghi)?;
        ensure!(
            (0.0..=1.0).contains(&self.wind_cf),
            "wind_cf must be between 0 and 1 (got {})",
            self.wind_cf
        );
        check_non_negative("hydro_potential", self.hydro_potential)?;
        check_non_negative("hydro_distance", self.hydro_distance)?;
        let grid_penalty = self.grid_penalty.unwrap_or(1.0);
        check_positive("grid_penalty", grid_penalty)?;

        Ok(Settlement {
            id: self.id,
            x: self.x,
            y: self.y,
            population: self.population,
            grid_cell_area: self.grid_cell_area,
            dist_to_mv: Distance(self.dist_to_mv),
            dist_to_hv: Distance(self.dist_to_hv),
            dist_to_road: Distance(self.dist_to_road),
            travel_hours: self.travel_hours,
            ghi: self.ghi,
            wind_cf: self.wind_cf,
            hydro_potential: Capacity(self.hydro_potential),
            hydro_distance: Distance(self.hydro_distance),
            settlement_type: self.settlement_type,
            electrified: self.electrified,
            grid_penalty,
        })
    }
}

/// Read settlements from the settlements CSV file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The settlements, in the order they appear in the file, or an error.
pub fn read_settlements(model_dir: &Path) -> Result<Vec<Settlement>> {
    let file_path = model_dir.join(SETTLEMENTS_FILE_NAME);
    let settlements = read_csv(&file_path)?;
    read_settlements_from_iter(settlements).with_context(|| input_err_msg(&file_path))
}

fn read_settlements_from_iter<I>(iter: I) -> Result<Vec<Settlement>>
where
    I: Iterator<Item = SettlementRaw>,
{
    let mut ids = HashSet::new();
    let mut settlements = Vec::new();
    for raw in iter {
        let id = raw.id;
        ensure!(ids.insert(id), "Duplicate settlement ID found: {id}");
        let settlement = raw
            .into_settlement()
            .with_context(|| format!("Invalid data for settlement {id}"))?;
        settlements.push(settlement);
    }

    Ok(settlements)
}
