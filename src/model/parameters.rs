//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{
    check_non_negative, check_positive, deserialise_proportion, input_err_msg,
    is_sorted_and_unique, read_toml,
};
use crate::units::{
    Capacity, Dimensionless, Distance, Money, MoneyPerCapacity, MoneyPerDistance, MoneyPerEnergy,
};
use anyhow::{Context, Result, ensure};
use log::warn;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_unit_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            <$type>::new($value)
        }
    };
}

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_unit_param_default!(default_discount_rate, Dimensionless, 0.1);
define_unit_param_default!(default_max_grid_extension_dist, Distance, 50.0);
define_param_default!(default_people_per_household_urban, f64, 6.6);
define_param_default!(default_people_per_household_rural, f64, 5.7);
define_param_default!(default_min_mini_grid_population, f64, 100.0);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The year in which the input data is calibrated
    pub start_year: u32,
    /// The years to analyse, all after the start year
    pub milestone_years: Vec<u32>,
    /// The maximum share of the population to be electrified by each milestone year
    pub electrification_targets: Vec<f64>,
    /// Default discount rate for all technologies
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Dimensionless,
    /// Average household size in urban settlements
    #[serde(default = "default_people_per_household_urban")]
    pub people_per_household_urban: f64,
    /// Average household size in rural settlements
    #[serde(default = "default_people_per_household_rural")]
    pub people_per_household_rural: f64,
    /// Annual population growth rate in urban settlements
    #[serde(default)]
    pub urban_growth_rate: f64,
    /// Annual population growth rate in rural settlements
    #[serde(default)]
    pub rural_growth_rate: f64,
    /// The furthest a settlement can be from the grid and still be connected to it
    #[serde(default = "default_max_grid_extension_dist")]
    pub max_grid_extension_dist: Distance,
    /// Settlements with a smaller population are not considered for mini-grids
    #[serde(default = "default_min_mini_grid_population")]
    pub min_mini_grid_population: f64,
    /// The rule used to rank candidate settlements for grid extension
    #[serde(default)]
    pub prioritization: Prioritization,
    /// The maximum grid investment per newly connected household, if any
    pub max_grid_cost_per_household: Option<Money>,
    /// Limits on grid extension over sub-periods of the analysis
    #[serde(default)]
    pub grid_limits: Vec<GridLimit>,
    /// Parameters for distribution networks
    #[serde(default)]
    pub network: NetworkParameters,
    /// Parameters for diesel supply
    #[serde(default)]
    pub diesel: DieselParameters,
    /// Parameters for hybrid mini-grids
    #[serde(default)]
    pub hybrid: HybridParameters,
}

/// The rule used to rank candidate settlements for grid extension
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default)]
pub enum Prioritization {
    /// Nearest settlements first
    #[string = "distance"]
    Distance,
    /// Cheapest settlements first
    #[default]
    #[string = "lcoe"]
    Lcoe,
    /// Fewest extension steps from the original network first, then cheapest
    #[string = "hybrid"]
    Hybrid,
}

/// Annual limits on grid extension which apply up to and including a given year
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GridLimit {
    /// The last year to which these limits apply
    pub until_year: u32,
    /// New grid connections allowed per year (households)
    pub annual_new_connections: f64,
    /// New generation capacity allowed per year, if limited
    pub annual_new_capacity: Option<Capacity>,
}

/// The limits on grid extension in a single analysis year.
///
/// `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtensionLimits {
    /// Households which may be newly connected
    pub connections: Option<f64>,
    /// Generation capacity which may be added
    pub capacity: Option<Capacity>,
}

/// Parameters describing the cost and sizing of distribution networks
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkParameters {
    /// Cost of high voltage lines
    pub hv_line_cost: MoneyPerDistance,
    /// Cost of medium voltage lines
    pub mv_line_cost: MoneyPerDistance,
    /// Cost of low voltage lines
    pub lv_line_cost: MoneyPerDistance,
    /// Load which can be carried by one medium voltage line
    pub mv_line_capacity: Capacity,
    /// Load which can be carried by one low voltage line
    pub lv_line_capacity: Capacity,
    /// Maximum length of a medium voltage line
    pub mv_line_max_length: Distance,
    /// Maximum length of a low voltage line
    pub lv_line_max_length: Distance,
    /// Rating of one service transformer
    pub service_transformer_capacity: Capacity,
    /// Cost of one service transformer
    pub service_transformer_cost: Money,
    /// Maximum number of households served by one service transformer
    pub max_nodes_per_service_transformer: f64,
    /// Cost of a substation connecting an extension to the existing medium voltage network
    pub mv_mv_substation_cost: Money,
    /// Cost of a substation connecting additional high voltage lines
    pub hv_mv_substation_cost: Money,
    /// Increase in line cost for each extension step away from the original network
    pub existing_grid_cost_ratio: Dimensionless,
    /// HV transmission cost added to grid electricity with separate regional backbones
    pub split_hv_transmission_cost: MoneyPerEnergy,
    /// HV transmission cost added to grid electricity with a national backbone
    pub national_hv_transmission_cost: MoneyPerEnergy,
}

impl Default for NetworkParameters {
    fn default() -> Self {
        Self {
            hv_line_cost: MoneyPerDistance(53000.0),
            mv_line_cost: MoneyPerDistance(7000.0),
            lv_line_cost: MoneyPerDistance(4250.0),
            mv_line_capacity: Capacity(50.0),
            lv_line_capacity: Capacity(10.0),
            mv_line_max_length: Distance(50.0),
            lv_line_max_length: Distance(30.0),
            service_transformer_capacity: Capacity(50.0),
            service_transformer_cost: Money(4250.0),
            max_nodes_per_service_transformer: 300.0,
            mv_mv_substation_cost: Money(10000.0),
            hv_mv_substation_cost: Money(25000.0),
            existing_grid_cost_ratio: Dimensionless(0.1),
            split_hv_transmission_cost: MoneyPerEnergy(0.0),
            national_hv_transmission_cost: MoneyPerEnergy(0.0),
        }
    }
}

impl NetworkParameters {
    fn validate(&self) -> Result<()> {
        check_non_negative("network.hv_line_cost", self.hv_line_cost.value())?;
        check_non_negative("network.mv_line_cost", self.mv_line_cost.value())?;
        check_non_negative("network.lv_line_cost", self.lv_line_cost.value())?;
        check_positive("network.mv_line_capacity", self.mv_line_capacity.value())?;
        check_positive("network.lv_line_capacity", self.lv_line_capacity.value())?;
        check_positive("network.mv_line_max_length", self.mv_line_max_length.value())?;
        check_positive("network.lv_line_max_length", self.lv_line_max_length.value())?;
        check_positive(
            "network.service_transformer_capacity",
            self.service_transformer_capacity.value(),
        )?;
        check_non_negative(
            "network.service_transformer_cost",
            self.service_transformer_cost.value(),
        )?;
        check_positive(
            "network.max_nodes_per_service_transformer",
            self.max_nodes_per_service_transformer,
        )?;
        check_non_negative(
            "network.mv_mv_substation_cost",
            self.mv_mv_substation_cost.value(),
        )?;
        check_non_negative(
            "network.hv_mv_substation_cost",
            self.hv_mv_substation_cost.value(),
        )?;
        check_non_negative(
            "network.existing_grid_cost_ratio",
            self.existing_grid_cost_ratio.value(),
        )?;
        check_non_negative(
            "network.split_hv_transmission_cost",
            self.split_hv_transmission_cost.value(),
        )?;
        check_non_negative(
            "network.national_hv_transmission_cost",
            self.national_hv_transmission_cost.value(),
        )?;

        Ok(())
    }
}

/// Parameters for the delivery of diesel by truck
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DieselParameters {
    /// Fuel used by the delivery truck (litres/hour)
    pub truck_consumption: f64,
    /// Fuel carried by the delivery truck (litres)
    pub truck_volume: f64,
}

impl Default for DieselParameters {
    fn default() -> Self {
        Self {
            truck_consumption: 14.0,
            truck_volume: 300.0,
        }
    }
}

/// Parameters for sizing and costing the components of hybrid mini-grids
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HybridParameters {
    /// Share of generation supplied by the renewable source
    #[serde(deserialize_with = "deserialise_proportion")]
    pub renewable_fraction: f64,
    /// Hours of average load the battery can supply from renewable generation
    pub battery_autonomy_hours: f64,
    /// Cost of battery storage (USD per kWh of storage)
    pub battery_cost: f64,
    /// Lifetime of the battery (years)
    pub battery_life: u32,
    /// Cost of the inverter per kW
    pub inverter_cost: MoneyPerCapacity,
    /// Lifetime of the inverter (years)
    pub inverter_life: u32,
    /// Cost of the backup diesel generator per kW
    pub diesel_generator_cost: MoneyPerCapacity,
    /// Lifetime of the backup diesel generator (years)
    pub diesel_generator_life: u32,
    /// Fuel-to-electricity efficiency of the backup diesel generator
    pub diesel_efficiency: f64,
}

impl Default for HybridParameters {
    fn default() -> Self {
        Self {
            renewable_fraction: 0.6,
            battery_autonomy_hours: 4.0,
            battery_cost: 139.0,
            battery_life: 10,
            inverter_cost: MoneyPerCapacity(142.0),
            inverter_life: 10,
            diesel_generator_cost: MoneyPerCapacity(150.0),
            diesel_generator_life: 10,
            diesel_efficiency: 0.33,
        }
    }
}

impl HybridParameters {
    fn validate(&self) -> Result<()> {
        check_non_negative("hybrid.battery_autonomy_hours", self.battery_autonomy_hours)?;
        check_non_negative("hybrid.battery_cost", self.battery_cost)?;
        check_non_negative("hybrid.inverter_cost", self.inverter_cost.value())?;
        check_non_negative("hybrid.diesel_generator_cost", self.diesel_generator_cost.value())?;
        ensure!(
            self.battery_life > 0 && self.inverter_life > 0 && self.diesel_generator_life > 0,
            "Hybrid component lifetimes must be greater than zero"
        );
        ensure!(
            self.diesel_efficiency.is_finite()
                && self.diesel_efficiency > 0.0
                && self.diesel_efficiency <= 1.0,
            "hybrid.diesel_efficiency must be greater than zero and at most one (got {})",
            self.diesel_efficiency
        );

        Ok(())
    }
}

/// Check that the `milestone_years` parameter is valid
fn check_milestone_years(start_year: u32, years: &[u32]) -> Result<()> {
    ensure!(!years.is_empty(), "`milestone_years` is empty");

    ensure!(
        is_sorted_and_unique(years),
        "`milestone_years` must be composed of unique values in order"
    );

    ensure!(
        years[0] > start_year,
        "`milestone_years` must all be after `start_year` ({start_year})"
    );

    Ok(())
}

/// Check that there is one valid electrification target per milestone year
fn check_electrification_targets(targets: &[f64], milestone_years: &[u32]) -> Result<()> {
    ensure!(
        targets.len() == milestone_years.len(),
        "`electrification_targets` must have one value per milestone year \
        (expected {}, got {})",
        milestone_years.len(),
        targets.len()
    );

    for target in targets {
        ensure!(
            (0.0..=1.0).contains(target),
            "`electrification_targets` must be between 0 and 1 (got {target})"
        );
    }

    Ok(())
}

/// Check that grid limit periods are valid
fn check_grid_limits(limits: &[GridLimit]) -> Result<()> {
    let until_years = limits.iter().map(|limit| limit.until_year).collect::<Vec<_>>();
    ensure!(
        is_sorted_and_unique(&until_years),
        "`grid_limits` must be in order of `until_year`, with no duplicates"
    );

    for limit in limits {
        check_non_negative(
            "grid_limits.annual_new_connections",
            limit.annual_new_connections,
        )?;
        if let Some(capacity) = limit.annual_new_capacity {
            check_non_negative("grid_limits.annual_new_capacity", capacity.value())?;
        }
    }

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_milestone_years(self.start_year, &self.milestone_years)?;
        check_electrification_targets(&self.electrification_targets, &self.milestone_years)?;
        check_non_negative("discount_rate", self.discount_rate.value())?;
        check_positive(
            "people_per_household_urban",
            self.people_per_household_urban,
        )?;
        check_positive(
            "people_per_household_rural",
            self.people_per_household_rural,
        )?;
        check_non_negative("urban_growth_rate", self.urban_growth_rate)?;
        check_non_negative("rural_growth_rate", self.rural_growth_rate)?;
        check_positive(
            "max_grid_extension_dist",
            self.max_grid_extension_dist.value(),
        )?;
        check_non_negative("min_mini_grid_population", self.min_mini_grid_population)?;
        if let Some(max_cost) = self.max_grid_cost_per_household {
            check_non_negative("max_grid_cost_per_household", max_cost.value())?;
        }
        check_grid_limits(&self.grid_limits)?;
        self.network.validate()?;
        check_positive("diesel.truck_volume", self.diesel.truck_volume)?;
        check_non_negative("diesel.truck_consumption", self.diesel.truck_consumption)?;
        self.hybrid.validate()?;

        if let Some(last) = self.grid_limits.last() {
            if last.until_year < self.end_year() {
                warn!(
                    "Grid limits are only given up to {}; grid extension will be unlimited after this",
                    last.until_year
                );
            }
        }

        Ok(())
    }

    /// The last milestone year
    pub fn end_year(&self) -> u32 {
        self.milestone_years.last().copied().unwrap_or(self.start_year)
    }

    /// Iterate over the milestone years with the length of the step leading up to each one
    pub fn iter_time_steps(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let previous = std::iter::once(self.start_year).chain(self.milestone_years.iter().copied());
        self.milestone_years
            .iter()
            .zip(previous)
            .map(|(&year, previous)| (year, year - previous))
    }

    /// The target electrification rate for the given milestone year, if it is one
    pub fn electrification_target(&self, year: u32) -> Option<f64> {
        self.milestone_years
            .iter()
            .position(|&y| y == year)
            .map(|idx| self.electrification_targets[idx])
    }

    /// The limits on grid extension for a step of `time_step` years ending in `year`.
    ///
    /// The annual limits of the first period which includes `year` are scaled by the length of the
    /// step. If no period includes `year`, extension is unlimited.
    pub fn extension_limits(&self, year: u32, time_step: u32) -> ExtensionLimits {
        let Some(limit) = self
            .grid_limits
            .iter()
            .find(|limit| limit.until_year >= year)
        else {
            return ExtensionLimits {
                connections: None,
                capacity: None,
            };
        };

        let years = f64::from(time_step);
        ExtensionLimits {
            connections: Some(limit.annual_new_connections * years),
            capacity: limit
                .annual_new_capacity
                .map(|capacity| capacity * Dimensionless(years)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const MINIMAL_MODEL: &str = "start_year = 2020
milestone_years = [2025, 2030]
electrification_targets = [0.5, 1.0]
";

    fn parse(contents: &str) -> ModelParameters {
        toml::from_str(contents).unwrap()
    }

    #[test]
    fn test_check_milestone_years() {
        // Valid
        assert!(check_milestone_years(2020, &[2025]).is_ok());
        assert!(check_milestone_years(2020, &[2025, 2030]).is_ok());

        // Invalid
        assert!(check_milestone_years(2020, &[]).is_err());
        assert!(check_milestone_years(2020, &[2025, 2025]).is_err());
        assert!(check_milestone_years(2020, &[2030, 2025]).is_err());
        assert!(check_milestone_years(2020, &[2020, 2025]).is_err());
    }

    #[rstest]
    #[case(&[0.5, 1.0], true)]
    #[case(&[0.0, 0.0], true)]
    #[case(&[0.5], false)] // Wrong length
    #[case(&[0.5, 1.1], false)]
    #[case(&[-0.1, 1.0], false)]
    fn test_check_electrification_targets(#[case] targets: &[f64], #[case] valid: bool) {
        assert_eq!(
            check_electrification_targets(targets, &[2025, 2030]).is_ok(),
            valid
        );
    }

    #[test]
    fn test_model_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            write!(file, "{MINIMAL_MODEL}").unwrap();
        }

        let model_params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(model_params.milestone_years, [2025, 2030]);
        assert_eq!(model_params.discount_rate, Dimensionless(0.1));
        assert_eq!(model_params.prioritization, Prioritization::Lcoe);
        assert_eq!(model_params.network, NetworkParameters::default());
        assert_eq!(model_params.end_year(), 2030);
    }

    #[test]
    fn test_model_params_invalid() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(file, "{MINIMAL_MODEL}rural_growth_rate = -0.01").unwrap();
        }

        assert_error!(
            ModelParameters::from_path(dir.path()),
            format!(
                "Error reading {}",
                dir.path().join(MODEL_PARAMETERS_FILE_NAME).display()
            )
        );
    }

    #[test]
    fn test_partial_sections() {
        let params = parse(&format!(
            "{MINIMAL_MODEL}prioritization = \"hybrid\"
[network]
mv_line_cost = 9000.0
[hybrid]
renewable_fraction = 0.8
"
        ));
        assert_eq!(params.prioritization, Prioritization::Hybrid);
        assert_eq!(params.network.mv_line_cost, MoneyPerDistance(9000.0));
        assert_eq!(params.network.lv_line_cost, MoneyPerDistance(4250.0));
        assert_approx_eq!(f64, params.hybrid.renewable_fraction, 0.8);
        assert_eq!(params.hybrid.battery_life, 10);
    }

    #[test]
    fn test_iter_time_steps() {
        let params = parse("start_year = 2020
milestone_years = [2023, 2025, 2030]
electrification_targets = [0.2, 0.5, 1.0]
");
        assert_eq!(
            params.iter_time_steps().collect::<Vec<_>>(),
            [(2023, 3), (2025, 2), (2030, 5)]
        );
        assert_eq!(params.electrification_target(2025), Some(0.5));
        assert_eq!(params.electrification_target(2024), None);
    }

    #[test]
    fn test_extension_limits() {
        let params = parse(&format!(
            "{MINIMAL_MODEL}
[[grid_limits]]
until_year = 2025
annual_new_connections = 100.0
annual_new_capacity = 50.0

[[grid_limits]]
until_year = 2027
annual_new_connections = 200.0
"
        ));
        assert!(check_grid_limits(&params.grid_limits).is_ok());

        assert_eq!(
            params.extension_limits(2025, 5),
            ExtensionLimits {
                connections: Some(500.0),
                capacity: Some(Capacity(250.0)),
            }
        );
        assert_eq!(
            params.extension_limits(2026, 1),
            ExtensionLimits {
                connections: Some(200.0),
                capacity: None,
            }
        );

        // No period covers this year
        assert_eq!(
            params.extension_limits(2030, 5),
            ExtensionLimits {
                connections: None,
                capacity: None,
            }
        );
    }

    #[test]
    fn test_check_grid_limits_unordered() {
        let limits = [
            GridLimit {
                until_year: 2030,
                annual_new_connections: 1.0,
                annual_new_capacity: None,
            },
            GridLimit {
                until_year: 2025,
                annual_new_connections: 1.0,
                annual_new_capacity: None,
            },
        ];
        assert!(check_grid_limits(&limits).is_err());
    }
}
