//! General functions related to finance.
use crate::units::{Dimensionless, Energy, Money, MoneyPerEnergy, MoneyPerYear};

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualise capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let exponent = i32::try_from(lifetime).unwrap_or(i32::MAX);
    let factor = (Dimensionless(1.0) + discount_rate).powi(exponent);
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the annualised cost of a capital investment
pub fn annual_capital_cost(
    capital_cost: Money,
    lifetime: u32,
    discount_rate: Dimensionless,
) -> MoneyPerYear {
    let crf = capital_recovery_factor(lifetime, discount_rate);
    MoneyPerYear((capital_cost * crf).value())
}

/// Calculates an annual operation and maintenance cost as a fixed share of capital cost
pub fn annual_om_cost(capital_cost: Money, om_rate: Dimensionless) -> MoneyPerYear {
    MoneyPerYear((capital_cost * om_rate).value())
}

/// Calculates the levelised cost of electricity from annualised costs and annual energy delivered.
///
/// Returns [`MoneyPerEnergy::INFINITE`] if no energy is delivered, so that settlements without
/// demand are never selected for a technology.
pub fn lcoe(annual_cost: MoneyPerYear, energy_delivered: Energy) -> MoneyPerEnergy {
    if energy_delivered.value() <= 0.0 || !energy_delivered.is_finite() {
        return MoneyPerEnergy::INFINITE;
    }

    annual_cost / energy_delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.05, 0.0)] // Edge case: lifetime==0
    #[case(10, 0.0, 0.1)] // Other edge case: discount_rate==0
    #[case(10, 0.05, 0.1295045749654567)]
    #[case(5, 0.03, 0.2183545714005762)]
    fn test_capital_recovery_factor(
        #[case] lifetime: u32,
        #[case] discount_rate: f64,
        #[case] expected: f64,
    ) {
        let result = capital_recovery_factor(lifetime, Dimensionless(discount_rate));
        assert_approx_eq!(f64, result.0, expected, epsilon = 1e-10);
    }

    #[rstest]
    #[case(1000.0, 10, 0.05, 129.5045749654567)]
    #[case(500.0, 5, 0.03, 109.17728570028798)]
    #[case(1000.0, 0, 0.05, 0.0)] // Zero lifetime
    #[case(2000.0, 20, 0.0, 100.0)] // Zero discount rate
    fn test_annual_capital_cost(
        #[case] capital_cost: f64,
        #[case] lifetime: u32,
        #[case] discount_rate: f64,
        #[case] expected: f64,
    ) {
        let result = annual_capital_cost(
            Money(capital_cost),
            lifetime,
            Dimensionless(discount_rate),
        );
        assert_approx_eq!(MoneyPerYear, result, MoneyPerYear(expected), epsilon = 1e-8);
    }

    #[test]
    fn test_annual_om_cost() {
        assert_approx_eq!(
            MoneyPerYear,
            annual_om_cost(Money(2000.0), Dimensionless(0.02)),
            MoneyPerYear(40.0)
        );
    }

    #[rstest]
    #[case(500.0, 2000.0, 0.25)]
    #[case(0.0, 1000.0, 0.0)]
    fn test_lcoe(#[case] annual_cost: f64, #[case] energy: f64, #[case] expected: f64) {
        assert_approx_eq!(
            MoneyPerEnergy,
            lcoe(MoneyPerYear(annual_cost), Energy(energy)),
            MoneyPerEnergy(expected)
        );
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn test_lcoe_no_energy(#[case] energy: f64) {
        assert_eq!(
            lcoe(MoneyPerYear(100.0), Energy(energy)),
            MoneyPerEnergy::INFINITE
        );
    }
}
