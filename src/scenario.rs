//! Scenarios vary demand, fuel and cost assumptions between otherwise identical model runs.
use crate::id::{define_id_getter, define_id_type};
use crate::model::{ModelParameters, NetworkParameters};
use crate::settlement::SettlementType;
use crate::units::{Dimensionless, Distance, Money, MoneyPerDistance, MoneyPerEnergy};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

define_id_type! {ScenarioID}

/// A map of [`Scenario`]s, keyed by scenario ID
pub type ScenarioMap = IndexMap<ScenarioID, Scenario>;

/// How per-household demand targets are chosen in each year
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq)]
pub enum TierPolicy {
    /// Always use the low demand target
    #[string = "low"]
    Low,
    /// Always use the high demand target
    #[string = "high"]
    High,
    /// Move linearly from the low target in the start year to the high target in the last year
    #[string = "linear"]
    Linear,
}

/// Whether and how settlements can be connected to a national grid
#[derive(DeserializeLabeledStringEnum, Debug, Clone, Copy, PartialEq, Default)]
pub enum GridOption {
    /// No grid backbone. Existing networks only grow by intensification, as expanded mini-grids.
    #[string = "off_grid_only"]
    OffGridOnly,
    /// Separate regional grids, each with its own HV backbone
    #[string = "split_backbone"]
    SplitBackbone,
    /// A single national HV backbone
    #[default]
    #[string = "national_backbone"]
    NationalBackbone,
}

impl GridOption {
    /// Whether settlements can be connected to a grid backbone
    pub fn has_backbone(self) -> bool {
        self != Self::OffGridOnly
    }
}

/// A single row of the scenarios file
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Scenario {
    /// Unique identifier for the scenario
    pub id: ScenarioID,
    /// Text description of the scenario
    pub description: String,
    /// How demand targets are chosen
    pub tier_policy: TierPolicy,
    /// Low demand target for rural households (kWh/household/year)
    pub rural_demand_low: f64,
    /// High demand target for rural households (kWh/household/year)
    pub rural_demand_high: f64,
    /// Low demand target for urban households (kWh/household/year)
    pub urban_demand_low: f64,
    /// High demand target for urban households (kWh/household/year)
    pub urban_demand_high: f64,
    /// Commercial demand in rural settlements as a share of residential demand
    pub rural_commercial_factor: f64,
    /// Commercial demand in urban settlements as a share of residential demand
    pub urban_commercial_factor: f64,
    /// Cost of generating and transmitting electricity on the national grid
    pub grid_generation_cost: MoneyPerEnergy,
    /// Price of diesel (USD/litre)
    pub diesel_price: f64,
    /// Multiplier applied to the capital cost of PV technologies
    #[serde(default = "default_pv_cost_factor")]
    pub pv_cost_factor: Dimensionless,
    /// Replaces the model's LV line cost, if given
    pub lv_line_cost: Option<MoneyPerDistance>,
    /// Replaces the model's MV line cost, if given
    pub mv_line_cost: Option<MoneyPerDistance>,
    /// Unelectrified settlements this close to the grid are connected before ranking
    #[serde(default)]
    pub intensification_dist: Distance,
    /// Maximum grid investment per household for automatic connection
    #[serde(default)]
    pub intensification_threshold: Money,
    /// The grid backbone available, if any
    #[serde(default)]
    pub grid_option: GridOption,
}
define_id_getter! {Scenario, ScenarioID}

fn default_pv_cost_factor() -> Dimensionless {
    Dimensionless(1.0)
}

/// Demand targets for one class of settlement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandTargets {
    /// Low per-household target (kWh/household/year)
    pub low: f64,
    /// High per-household target (kWh/household/year)
    pub high: f64,
    /// Commercial demand as a share of residential demand
    pub commercial_factor: f64,
}

/// All the parameters needed to run one scenario, combining model-wide values with those of the
/// scenario.
#[derive(Debug, Clone)]
pub struct ScenarioParameters<'a> {
    /// Model-wide parameters
    pub model: &'a ModelParameters,
    /// The scenario being run
    pub scenario: &'a Scenario,
    /// Network parameters with the scenario's line costs applied
    pub network: NetworkParameters,
}

impl<'a> ScenarioParameters<'a> {
    /// Resolve the parameters for a scenario
    pub fn new(model: &'a ModelParameters, scenario: &'a Scenario) -> Self {
        let mut network = model.network.clone();
        if let Some(cost) = scenario.lv_line_cost {
            network.lv_line_cost = cost;
        }
        if let Some(cost) = scenario.mv_line_cost {
            network.mv_line_cost = cost;
        }

        Self {
            model,
            scenario,
            network,
        }
    }

    /// Average household size for the given type of settlement
    pub fn people_per_household(&self, settlement_type: SettlementType) -> f64 {
        match settlement_type {
            SettlementType::Urban => self.model.people_per_household_urban,
            SettlementType::Rural => self.model.people_per_household_rural,
        }
    }

    /// Annual population growth rate for the given type of settlement
    pub fn growth_rate(&self, settlement_type: SettlementType) -> f64 {
        match settlement_type {
            SettlementType::Urban => self.model.urban_growth_rate,
            SettlementType::Rural => self.model.rural_growth_rate,
        }
    }

    /// Demand targets for the given type of settlement
    pub fn demand_targets(&self, settlement_type: SettlementType) -> DemandTargets {
        let scenario = self.scenario;
        match settlement_type {
            SettlementType::Urban => DemandTargets {
                low: scenario.urban_demand_low,
                high: scenario.urban_demand_high,
                commercial_factor: scenario.urban_commercial_factor,
            },
            SettlementType::Rural => DemandTargets {
                low: scenario.rural_demand_low,
                high: scenario.rural_demand_high,
                commercial_factor: scenario.rural_commercial_factor,
            },
        }
    }

    /// Cost of grid electricity, including HV transmission over the scenario's backbone
    pub fn grid_generation_cost(&self) -> MoneyPerEnergy {
        let transmission = match self.scenario.grid_option {
            GridOption::OffGridOnly => MoneyPerEnergy(0.0),
            GridOption::SplitBackbone => self.network.split_hv_transmission_cost,
            GridOption::NationalBackbone => self.network.national_hv_transmission_cost,
        };
        self.scenario.grid_generation_cost + transmission
    }

    /// The model's default discount rate
    pub fn discount_rate(&self) -> Dimensionless {
        self.model.discount_rate
    }
}
