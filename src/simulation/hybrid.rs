//! Sizing and costing of hybrid mini-grids, which combine a renewable source with battery storage
//! and a backup diesel generator.
use super::costs::GenerationCost;
use super::demand::HOURS_PER_YEAR;
use crate::finance::{annual_capital_cost, annual_om_cost};
use crate::model::HybridParameters;
use crate::units::{Capacity, Dimensionless, Energy, Money, MoneyPerCapacity, MoneyPerEnergy};

/// The components of a hybrid mini-grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridSystem {
    /// Capacity of the renewable source
    pub renewable: Capacity,
    /// Capacity of the backup diesel generator
    pub diesel: Capacity,
    /// Battery storage (kWh)
    pub battery_storage: f64,
    /// Capacity of the inverter
    pub inverter: Capacity,
    /// Annual generation from diesel
    pub diesel_generation: Energy,
}

impl HybridSystem {
    /// Size a hybrid system to meet `generation` with the given peak load.
    ///
    /// The renewable source supplies a fixed fraction of generation and the diesel generator the
    /// rest. The battery stores the renewable share of average load for the configured number of
    /// hours and the inverter is sized to the peak.
    pub fn size(
        generation: Energy,
        peak: Capacity,
        capacity_factor: f64,
        params: &HybridParameters,
    ) -> Self {
        let fraction = params.renewable_fraction;
        let renewable_generation = generation.value() * fraction;
        let average_load = generation.value() / HOURS_PER_YEAR;

        Self {
            renewable: Capacity(renewable_generation / (HOURS_PER_YEAR * capacity_factor)),
            diesel: peak * Dimensionless(1.0 - fraction),
            battery_storage: params.battery_autonomy_hours * average_load * fraction,
            inverter: peak,
            diesel_generation: generation * Dimensionless(1.0 - fraction),
        }
    }

    /// Generation capacity of the system
    pub fn capacity(&self) -> Capacity {
        self.renewable + self.diesel
    }

    /// Calculate the capital and annual cost of the system.
    ///
    /// Each component is annualised over its own lifetime. O&M is charged on the renewable source
    /// and diesel generator.
    pub fn cost(
        &self,
        renewable_unit_cost: MoneyPerCapacity,
        renewable_life: u32,
        om_rate: Dimensionless,
        discount_rate: Dimensionless,
        fuel_cost: MoneyPerEnergy,
        params: &HybridParameters,
    ) -> GenerationCost {
        let renewable = renewable_unit_cost * self.renewable;
        let diesel = params.diesel_generator_cost * self.diesel;
        let battery = Money(params.battery_cost * self.battery_storage);
        let inverter = params.inverter_cost * self.inverter;

        let annual = annual_capital_cost(renewable, renewable_life, discount_rate)
            + annual_capital_cost(diesel, params.diesel_generator_life, discount_rate)
            + annual_capital_cost(battery, params.battery_life, discount_rate)
            + annual_capital_cost(inverter, params.inverter_life, discount_rate)
            + annual_om_cost(renewable + diesel, om_rate)
            + fuel_cost * self.diesel_generation;

        GenerationCost {
            capital: renewable + diesel + battery + inverter,
            annual,
            capacity: self.capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::MoneyPerYear;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn params() -> HybridParameters {
        HybridParameters {
            renewable_fraction: 0.6,
            battery_autonomy_hours: 4.0,
            ..HybridParameters::default()
        }
    }

    #[rstest]
    fn test_size(params: HybridParameters) {
        let system = HybridSystem::size(Energy(87600.0), Capacity(20.0), 0.2, &params);

        // 60% of 87.6 MWh from a source with a capacity factor of 0.2
        assert_approx_eq!(Capacity, system.renewable, Capacity(30.0), epsilon = 1e-9);
        assert_approx_eq!(Capacity, system.diesel, Capacity(8.0), epsilon = 1e-9);
        assert_approx_eq!(f64, system.battery_storage, 4.0 * 10.0 * 0.6, epsilon = 1e-9);
        assert_eq!(system.inverter, Capacity(20.0));
        assert_approx_eq!(
            Energy,
            system.diesel_generation,
            Energy(87600.0 * 0.4),
            epsilon = 1e-9
        );
        assert_approx_eq!(Capacity, system.capacity(), Capacity(38.0), epsilon = 1e-9);
    }

    #[rstest]
    fn test_cost(params: HybridParameters) {
        let system = HybridSystem {
            renewable: Capacity(10.0),
            diesel: Capacity(5.0),
            battery_storage: 20.0,
            inverter: Capacity(8.0),
            diesel_generation: Energy(1000.0),
        };
        let params = HybridParameters {
            battery_life: 5,
            inverter_life: 5,
            diesel_generator_life: 5,
            ..params
        };
        let cost = system.cost(
            MoneyPerCapacity(1000.0),
            10,
            Dimensionless(0.01),
            Dimensionless(0.0),
            MoneyPerEnergy(0.5),
            &params,
        );

        let renewable = 10000.0;
        let diesel = 5.0 * params.diesel_generator_cost.value();
        let battery = 20.0 * params.battery_cost;
        let inverter = 8.0 * params.inverter_cost.value();
        assert_approx_eq!(
            Money,
            cost.capital,
            Money(renewable + diesel + battery + inverter),
            epsilon = 1e-9
        );

        // Without discounting, capital is spread evenly over each component's lifetime
        let expected = renewable / 10.0
            + (diesel + battery + inverter) / 5.0
            + 0.01 * (renewable + diesel)
            + 0.5 * 1000.0;
        assert_approx_eq!(MoneyPerYear, cost.annual, MoneyPerYear(expected), epsilon = 1e-9);
        assert_eq!(cost.capacity, Capacity(15.0));
    }
}
