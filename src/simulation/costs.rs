//! The technology cost model: annualised costs and levelised cost of electricity (LCOE) of
//! supplying a settlement with a given technology.
use super::demand::{HOURS_PER_YEAR, generation_required, peak_load};
use super::hybrid::HybridSystem;
use crate::finance::{annual_capital_cost, annual_om_cost, lcoe};
use crate::model::{DieselParameters, NetworkParameters};
use crate::scenario::ScenarioParameters;
use crate::settlement::Settlement;
use crate::technology::{TechnologyKind, TechnologyMap, TechnologySpec};
use crate::units::{
    Capacity, Dimensionless, Distance, Energy, Money, MoneyPerCapacity, MoneyPerDistance,
    MoneyPerEnergy, MoneyPerYear,
};

/// Lower heating value of diesel (kWh/litre)
pub const LHV_DIESEL: f64 = 9.9445485;

/// Share of a grid network's LV lines needed by a mini-grid of the same size
const MINI_GRID_LV_SHARE: f64 = 0.75;

/// The demand to be supplied by a technology
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Load {
    /// Households to be connected
    pub households: f64,
    /// Annual energy to be delivered
    pub energy: Energy,
}

/// How a settlement would be connected to the existing grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLink {
    /// Length of the MV line needed to reach the grid
    pub distance: Distance,
    /// Number of extension steps between the nearest grid node and the original network
    pub hops: u32,
}

impl GridLink {
    /// A settlement which is already part of the grid
    pub const CONNECTED: GridLink = GridLink {
        distance: Distance(0.0),
        hops: 0,
    };
}

/// The cost of supplying a settlement with a technology
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostOutcome {
    /// Levelised cost of electricity
    pub lcoe: MoneyPerEnergy,
    /// Up-front investment
    pub investment: Money,
    /// Generation capacity installed
    pub capacity: Capacity,
}

impl CostOutcome {
    /// The outcome for a technology which cannot supply the settlement
    pub const INFEASIBLE: CostOutcome = CostOutcome {
        lcoe: MoneyPerEnergy::INFINITE,
        investment: Money(0.0),
        capacity: Capacity(0.0),
    };

    /// Whether the technology can supply the settlement at a finite cost
    pub fn is_feasible(&self) -> bool {
        self.lcoe.is_finite()
    }

    /// Investment per household connected
    pub fn investment_per_household(&self, households: f64) -> Money {
        if households > 0.0 {
            self.investment / Dimensionless(households)
        } else {
            Money(f64::INFINITY)
        }
    }
}

/// The layout of a distribution network within a settlement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistributionNetwork {
    /// Length of additional HV lines
    pub hv_length: Distance,
    /// Length of MV lines
    pub mv_length: Distance,
    /// Length of LV lines
    pub lv_length: Distance,
    /// Number of additional HV lines, each needing a substation
    pub hv_lines: f64,
    /// Number of service transformers
    pub transformers: f64,
}

impl DistributionNetwork {
    /// Lay out a network to carry `peak` to `households` spread evenly over `area` (km²).
    ///
    /// Mini-grids have no MV or HV lines and need fewer LV lines than the grid.
    pub fn layout(
        peak: Capacity,
        households: f64,
        area: f64,
        params: &NetworkParameters,
        mini_grid: bool,
    ) -> Self {
        if peak <= Capacity(0.0) || households <= 0.0 {
            return Self::default();
        }

        let mv_lines = (peak / params.mv_line_capacity).value();
        let lv_lines = (peak / params.lv_line_capacity).value();
        let lv_limited_by_capacity = lv_lines / mv_lines;
        let lv_limited_by_length =
            ((area / mv_lines) / (params.lv_line_max_length.value() / 2f64.sqrt())).powi(2);
        let lv_networks = households.min(lv_limited_by_capacity.max(lv_limited_by_length));
        let transformers = (households / params.max_nodes_per_service_transformer)
            .max(mv_lines * lv_networks)
            .max((peak / params.service_transformer_capacity).value())
            .ceil();

        // Households are spread evenly, so each needs a share of LV line proportional to the
        // spacing between them
        let lv_spacing = (area / households).sqrt() * 2f64.sqrt() / 2.0;
        let lv_length = 1.333 * households * lv_spacing;
        if mini_grid {
            return Self {
                lv_length: Distance(lv_length * MINI_GRID_LV_SHARE),
                transformers,
                ..Self::default()
            };
        }

        let (mv_length, hv_lines, hv_length) = if area > 0.0 {
            let line_reach = (area / mv_lines) / (2.0 * (area / lv_lines).sqrt());
            let reach = line_reach.min(params.mv_line_max_length.value());
            let hv_lines = ((area.sqrt() / (2.0 * reach * 10.0 / 3.0)) - 1.0)
                .round()
                .max(0.0);
            (reach * mv_lines, hv_lines, area.sqrt() / 2.0 * hv_lines * area.sqrt())
        } else {
            (0.0, 0.0, 0.0)
        };

        Self {
            hv_length: Distance(hv_length),
            mv_length: Distance(mv_length),
            lv_length: Distance(lv_length),
            hv_lines,
            transformers,
        }
    }

    /// The capital cost of the network, with MV and HV line costs scaled by `line_multiplier`
    pub fn cost(&self, params: &NetworkParameters, line_multiplier: Dimensionless) -> Money {
        (params.hv_line_cost * self.hv_length + params.mv_line_cost * self.mv_length)
            * line_multiplier
            + params.lv_line_cost * self.lv_length
            + params.service_transformer_cost * Dimensionless(self.transformers)
            + params.hv_mv_substation_cost * Dimensionless(self.hv_lines)
    }
}

/// The cost of fuel per kWh generated by a diesel generator.
///
/// Fuel delivered to remote settlements costs more, as the delivery truck burns fuel on the round
/// trip.
pub fn diesel_fuel_cost(
    diesel_price: f64,
    efficiency: f64,
    travel_hours: f64,
    params: &DieselParameters,
) -> MoneyPerEnergy {
    let delivered_price = diesel_price
        + 2.0 * diesel_price * params.truck_consumption * travel_hours / params.truck_volume;
    MoneyPerEnergy(delivered_price / LHV_DIESEL / efficiency)
}

/// Capital and annual cost of generation equipment, including fuel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationCost {
    /// Up-front cost
    pub capital: Money,
    /// Annualised capital, O&M and fuel cost
    pub annual: MoneyPerYear,
    /// Installed capacity
    pub capacity: Capacity,
}

/// Calculates the cost of supplying settlements with the available technologies
pub struct CostModel<'a> {
    params: &'a ScenarioParameters<'a>,
    technologies: &'a TechnologyMap,
}

impl<'a> CostModel<'a> {
    /// Create a cost model for a scenario
    pub fn new(params: &'a ScenarioParameters<'a>, technologies: &'a TechnologyMap) -> Self {
        Self {
            params,
            technologies,
        }
    }

    /// The technologies which can be evaluated, in declaration order
    pub fn technologies(&self) -> impl Iterator<Item = TechnologyKind> + '_ {
        self.technologies.keys().copied()
    }

    /// Calculate the cost of supplying `load` to a settlement with a technology.
    ///
    /// `link` is only used for the grid and expanded mini-grids; if `None`, the settlement is
    /// treated as already being connected. Technologies which are not enabled or cannot supply the
    /// settlement give [`CostOutcome::INFEASIBLE`], as does a load with no energy.
    pub fn evaluate(
        &self,
        kind: TechnologyKind,
        settlement: &Settlement,
        load: &Load,
        link: Option<GridLink>,
    ) -> CostOutcome {
        let Some(spec) = self.technologies.get(&kind.costed_as()) else {
            return CostOutcome::INFEASIBLE;
        };
        if load.energy <= Energy(0.0) || !load.energy.is_finite() || load.households <= 0.0 {
            return CostOutcome::INFEASIBLE;
        }

        let generation = generation_required(load.energy, spec.distribution_losses);
        let peak = peak_load(generation, spec.base_to_peak_load_ratio);
        let capacity_factor = capacity_factor(spec, settlement);
        if capacity_factor <= 0.0 {
            return CostOutcome::INFEASIBLE;
        }

        let discount_rate = spec
            .discount_rate
            .unwrap_or_else(|| self.params.discount_rate());
        let generation_cost = if kind.is_hybrid() {
            self.hybrid_generation_cost(
                spec,
                settlement,
                generation,
                peak,
                capacity_factor,
                discount_rate,
            )
        } else {
            self.generation_cost(
                spec,
                settlement,
                load,
                generation,
                peak,
                capacity_factor,
                discount_rate,
            )
        };
        if kind == TechnologyKind::MgHydro && generation_cost.capacity > settlement.hydro_potential
        {
            return CostOutcome::INFEASIBLE;
        }

        let network_capital = self.network_capital(spec, settlement, load, peak, link);
        let network_annual = annual_capital_cost(network_capital, spec.tech_life, discount_rate)
            + annual_om_cost(network_capital, spec.om_of_td_lines);

        CostOutcome {
            lcoe: lcoe(generation_cost.annual + network_annual, load.energy),
            investment: generation_cost.capital + network_capital,
            capacity: generation_cost.capacity,
        }
    }

    /// Cost of generation for technologies with a single source of energy
    #[allow(clippy::too_many_arguments)]
    fn generation_cost(
        &self,
        spec: &TechnologySpec,
        settlement: &Settlement,
        load: &Load,
        generation: Energy,
        peak: Capacity,
        capacity_factor: f64,
        discount_rate: Dimensionless,
    ) -> GenerationCost {
        let installed = peak / Dimensionless(capacity_factor);

        // Standalone systems are priced by the size of each household's system
        let scale = if spec.kind.is_standalone() {
            (peak / Dimensionless(load.households)).value()
        } else {
            installed.value()
        };
        let capital = self.unit_capital_cost(spec, scale) * installed;

        let fuel_cost = match spec.kind {
            TechnologyKind::Grid => self.params.grid_generation_cost(),
            kind if kind.is_diesel() => diesel_fuel_cost(
                self.params.scenario.diesel_price,
                spec.efficiency.unwrap_or(1.0),
                settlement.travel_hours,
                &self.params.model.diesel,
            ),
            _ => MoneyPerEnergy(0.0),
        };

        GenerationCost {
            capital,
            annual: annual_capital_cost(capital, spec.tech_life, discount_rate)
                + annual_om_cost(capital, spec.om_costs)
                + fuel_cost * generation,
            capacity: installed,
        }
    }

    /// Cost of generation for hybrid mini-grids, costing each component separately
    fn hybrid_generation_cost(
        &self,
        spec: &TechnologySpec,
        settlement: &Settlement,
        generation: Energy,
        peak: Capacity,
        capacity_factor: f64,
        discount_rate: Dimensionless,
    ) -> GenerationCost {
        let hybrid = &self.params.model.hybrid;
        let system = HybridSystem::size(generation, peak, capacity_factor, hybrid);
        let renewable_unit_cost = self.unit_capital_cost(spec, system.renewable.value());
        let fuel_cost = diesel_fuel_cost(
            self.params.scenario.diesel_price,
            hybrid.diesel_efficiency,
            settlement.travel_hours,
            &self.params.model.diesel,
        );

        system.cost(
            renewable_unit_cost,
            spec.tech_life,
            spec.om_costs,
            discount_rate,
            fuel_cost,
            hybrid,
        )
    }

    /// Capital cost per kW of the technology at the given scale
    fn unit_capital_cost(&self, spec: &TechnologySpec, scale: f64) -> MoneyPerCapacity {
        let cost = spec.capital_costs.cost_at(scale);
        if spec.kind.is_pv() {
            cost * self.params.scenario.pv_cost_factor
        } else {
            cost
        }
    }

    /// Capital cost of the distribution network, household connections and any lines needed to
    /// reach the grid or a hydropower site
    fn network_capital(
        &self,
        spec: &TechnologySpec,
        settlement: &Settlement,
        load: &Load,
        peak: Capacity,
        link: Option<GridLink>,
    ) -> Money {
        let network = &self.params.network;
        let connections = spec.connection_cost_per_hh * Dimensionless(load.households);
        if spec.kind.is_standalone() {
            return connections;
        }

        let layout = DistributionNetwork::layout(
            peak,
            load.households,
            settlement.grid_cell_area,
            network,
            spec.kind.is_mini_grid(),
        );

        match spec.kind {
            TechnologyKind::Grid => {
                let link = link.unwrap_or(GridLink::CONNECTED);
                let penalty = Dimensionless(settlement.grid_penalty);
                let hop_multiplier =
                    Dimensionless(1.0) + network.existing_grid_cost_ratio * hop_count(link.hops);
                let extension = if link.distance > Distance(0.0) {
                    line_cost(network.mv_line_cost, link.distance) * penalty * hop_multiplier
                        + network.mv_mv_substation_cost
                } else {
                    Money(0.0)
                };
                layout.cost(network, penalty * hop_multiplier) + connections + extension
            }
            TechnologyKind::MgHydro => {
                layout.cost(network, Dimensionless(1.0))
                    + connections
                    + line_cost(network.mv_line_cost, settlement.hydro_distance)
            }
            _ => layout.cost(network, Dimensionless(1.0)) + connections,
        }
    }
}

fn line_cost(unit_cost: MoneyPerDistance, length: Distance) -> Money {
    unit_cost * length
}

fn hop_count(hops: u32) -> Dimensionless {
    Dimensionless(f64::from(hops))
}

/// The capacity factor of a technology at a settlement.
///
/// Unless fixed for the technology, PV uses the settlement's solar irradiation and wind uses the
/// settlement's wind capacity factor.
pub fn capacity_factor(spec: &TechnologySpec, settlement: &Settlement) -> f64 {
    spec.capacity_factor.unwrap_or_else(|| {
        if spec.kind.is_pv() {
            settlement.ghi / HOURS_PER_YEAR
        } else if spec.kind.is_wind() {
            settlement.wind_cf
        } else {
            1.0
        }
    })
}
