//! Settlements are the geospatial units for which electrification options are planned.
use crate::id::{SettlementID, define_id_getter};
use crate::technology::TechnologyKind;
use crate::units::{Capacity, Distance, Energy, Money, MoneyPerEnergy};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;

/// Whether a settlement is classed as urban or rural
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeLabeledStringEnum)]
pub enum SettlementType {
    /// An urban settlement
    #[string = "urban"]
    Urban,
    /// A rural settlement
    #[string = "rural"]
    Rural,
}

/// A settlement and its static attributes, as provided in the input data
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    /// Unique identifier for the settlement
    pub id: SettlementID,
    /// Longitude (degrees)
    pub x: f64,
    /// Latitude (degrees)
    pub y: f64,
    /// Calibrated population in the start year
    pub population: f64,
    /// Area of the grid cell (km²)
    pub grid_cell_area: f64,
    /// Distance to the existing medium voltage network
    pub dist_to_mv: Distance,
    /// Distance to the existing high voltage network
    pub dist_to_hv: Distance,
    /// Distance to the nearest road
    pub dist_to_road: Distance,
    /// Travel time to the nearest town, used for diesel delivery costs (hours)
    pub travel_hours: f64,
    /// Global horizontal irradiation (kWh/m²/year)
    pub ghi: f64,
    /// Wind capacity factor
    pub wind_cf: f64,
    /// Hydropower potential available to the settlement
    pub hydro_potential: Capacity,
    /// Distance to the hydropower site
    pub hydro_distance: Distance,
    /// Urban or rural
    pub settlement_type: SettlementType,
    /// Whether the settlement is connected to the grid in the start year
    pub electrified: bool,
    /// Multiplier applied to grid line costs to account for terrain
    pub grid_penalty: f64,
}
define_id_getter! {Settlement, SettlementID}

impl Settlement {
    /// Initial distance to the existing network, before any extension has taken place
    pub fn dist_to_network(&self) -> Distance {
        self.dist_to_mv.min(self.dist_to_hv)
    }

    /// Project the settlement's population to the given year with a constant annual growth rate
    pub fn population_in(&self, start_year: u32, year: u32, growth_rate: f64) -> f64 {
        let years = year.saturating_sub(start_year);
        self.population * (1.0 + growth_rate).powi(i32::try_from(years).unwrap_or(i32::MAX))
    }
}

/// The state of a settlement at the end of an analysis year.
///
/// This is carried forward as the starting state of the next year.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementYear {
    /// The analysis year
    pub year: u32,
    /// Population in this year
    pub population: f64,
    /// Households served, including those connected in earlier years
    pub connected_households: f64,
    /// Households connected in this year
    pub new_connections: f64,
    /// Generation capacity added in this year
    pub new_capacity: Capacity,
    /// Investment made in this year
    pub investment: Money,
    /// The technology serving the settlement, or `None` if unelectrified
    pub technology: Option<TechnologyKind>,
    /// Annual energy demand in this year
    pub demand: Energy,
    /// LCOE of each technology evaluated in this year
    pub lcoes: IndexMap<TechnologyKind, MoneyPerEnergy>,
    /// The least-cost off-grid technology and its LCOE, if any is feasible
    pub offgrid: Option<(TechnologyKind, MoneyPerEnergy)>,
    /// Distance to the nearest grid-connected node
    pub grid_distance: Distance,
    /// Number of extension steps between the settlement and the original network
    pub grid_hops: u32,
    /// Priority rank among settlements electrified in this year (1 is highest), if any
    pub elec_order: Option<u32>,
}

impl SettlementYear {
    /// The state of a settlement before the first analysis year
    pub fn initial(settlement: &Settlement, start_year: u32, people_per_household: f64) -> Self {
        let (technology, connected_households, grid_distance) = if settlement.electrified {
            (
                Some(TechnologyKind::Grid),
                settlement.population / people_per_household,
                Distance(0.0),
            )
        } else {
            (None, 0.0, settlement.dist_to_network())
        };

        Self {
            year: start_year,
            population: settlement.population,
            connected_households,
            new_connections: 0.0,
            new_capacity: Capacity(0.0),
            investment: Money(0.0),
            technology,
            demand: Energy(0.0),
            lcoes: IndexMap::new(),
            offgrid: None,
            grid_distance,
            grid_hops: 0,
            elec_order: None,
        }
    }

    /// Whether the settlement is electrified in this year
    pub fn is_electrified(&self) -> bool {
        self.technology.is_some()
    }

    /// Whether the settlement is connected to the grid, or to an expanded mini-grid, in this year
    pub fn is_grid_connected(&self) -> bool {
        self.technology.is_some_and(TechnologyKind::extends_network)
    }

    /// Reset this year's outcome so that the settlement is unelectrified
    pub fn unelectrify(&mut self) {
        self.technology = None;
        self.connected_households = 0.0;
        self.new_connections = 0.0;
        self.new_capacity = Capacity(0.0);
        self.investment = Money(0.0);
        self.elec_order = None;
    }
}
