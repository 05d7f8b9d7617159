//! Technologies which can supply electricity to a settlement.
use crate::units::{Dimensionless, Money, MoneyPerCapacity};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;
use strum::{EnumIter, IntoEnumIterator};

/// The label written in place of a technology for settlements which are not electrified
pub const UNELECTRIFIED_LABEL: &str = "unelectrified";

/// The technologies which can be used to electrify a settlement.
///
/// The declaration order is used to break ties between technologies with equal LCOE.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    strum::Display,
    DeserializeLabeledStringEnum,
)]
#[strum(serialize_all = "snake_case")]
pub enum TechnologyKind {
    /// Extension of the national grid
    #[string = "grid"]
    Grid,
    /// An existing network grown to nearby settlements without a national grid backbone. It is
    /// costed with the grid's parameters.
    #[string = "expanded_mg"]
    #[strum(serialize = "expanded_mg")]
    ExpandedMiniGrid,
    /// Standalone diesel generator
    #[string = "sa_diesel"]
    SaDiesel,
    /// Standalone solar home system
    #[string = "sa_pv"]
    SaPv,
    /// Diesel mini-grid
    #[string = "mg_diesel"]
    MgDiesel,
    /// Solar PV mini-grid
    #[string = "mg_pv"]
    MgPv,
    /// Wind mini-grid
    #[string = "mg_wind"]
    MgWind,
    /// Small hydropower mini-grid
    #[string = "mg_hydro"]
    MgHydro,
    /// Solar PV mini-grid with diesel and battery backup
    #[string = "mg_pv_hybrid"]
    MgPvHybrid,
    /// Wind mini-grid with diesel and battery backup
    #[string = "mg_wind_hybrid"]
    MgWindHybrid,
}

impl TechnologyKind {
    /// Whether this is a standalone (household-level) system
    pub fn is_standalone(self) -> bool {
        matches!(self, Self::SaDiesel | Self::SaPv)
    }

    /// Whether this is a mini-grid, including hybrids and expanded networks
    pub fn is_mini_grid(self) -> bool {
        !self.is_standalone() && self != Self::Grid
    }

    /// Whether this technology is supplied by extending an existing network
    pub fn extends_network(self) -> bool {
        matches!(self, Self::Grid | Self::ExpandedMiniGrid)
    }

    /// The technology whose parameters are used to cost this one
    pub fn costed_as(self) -> Self {
        if self == Self::ExpandedMiniGrid {
            Self::Grid
        } else {
            self
        }
    }

    /// Whether this combines a renewable source with diesel and battery backup
    pub fn is_hybrid(self) -> bool {
        matches!(self, Self::MgPvHybrid | Self::MgWindHybrid)
    }

    /// Whether this technology burns diesel as its only source of energy
    pub fn is_diesel(self) -> bool {
        matches!(self, Self::SaDiesel | Self::MgDiesel)
    }

    /// Whether this technology generates from solar PV
    pub fn is_pv(self) -> bool {
        matches!(self, Self::SaPv | Self::MgPv | Self::MgPvHybrid)
    }

    /// Whether this technology generates from wind
    pub fn is_wind(self) -> bool {
        matches!(self, Self::MgWind | Self::MgWindHybrid)
    }

    /// Iterate over the technologies which do not extend a network, in declaration order
    pub fn iter_offgrid() -> impl Iterator<Item = TechnologyKind> {
        Self::iter().filter(|kind| !kind.extends_network())
    }
}

/// Format an optional technology, using [`UNELECTRIFIED_LABEL`] for `None`
pub fn technology_label(technology: Option<TechnologyKind>) -> String {
    technology.map_or_else(|| UNELECTRIFIED_LABEL.to_string(), |kind| kind.to_string())
}

/// A schedule of capital costs which depends on the scale of the installation.
///
/// Entries are `(threshold, cost)` pairs in ascending order of threshold. The applicable cost is
/// that of the first entry whose threshold is at least the installation's scale. The last entry
/// always has an infinite threshold, so every scale has a cost.
#[derive(Debug, Clone, PartialEq)]
pub struct CapitalCostSchedule(Vec<(f64, MoneyPerCapacity)>);

impl CapitalCostSchedule {
    /// Create a new schedule from `(threshold, cost)` entries in any order.
    ///
    /// A threshold of `None` indicates the fallback entry, which must be present exactly once.
    pub fn new(entries: Vec<(Option<f64>, MoneyPerCapacity)>) -> Result<Self> {
        let fallbacks = entries.iter().filter(|(threshold, _)| threshold.is_none()).count();
        ensure!(
            fallbacks == 1,
            "Capital cost schedule must have exactly one entry without a threshold (found {fallbacks})"
        );

        let mut schedule = Vec::with_capacity(entries.len());
        for (threshold, cost) in entries {
            ensure!(
                cost.is_finite() && cost >= MoneyPerCapacity(0.0),
                "Capital costs must be finite and non-negative (got {})",
                cost.value()
            );
            let threshold = match threshold {
                Some(threshold) => {
                    ensure!(
                        threshold.is_finite() && threshold > 0.0,
                        "Capital cost thresholds must be finite and greater than zero (got {threshold})"
                    );
                    threshold
                }
                None => f64::INFINITY,
            };
            schedule.push((threshold, cost));
        }
        schedule.sort_by(|(a, _), (b, _)| a.total_cmp(b));
        ensure!(
            schedule.windows(2).all(|w| w[0].0 < w[1].0),
            "Capital cost schedule contains duplicate thresholds"
        );

        Ok(Self(schedule))
    }

    /// Look up the unit capital cost for an installation of the given scale
    pub fn cost_at(&self, scale: f64) -> MoneyPerCapacity {
        self.0
            .iter()
            .find(|(threshold, _)| *threshold >= scale)
            .or(self.0.last())
            .map_or(MoneyPerCapacity(0.0), |(_, cost)| *cost)
    }
}

/// Cost and performance parameters for a technology.
///
/// These are shared read-only between all settlements for a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct TechnologySpec {
    /// Which technology these parameters describe
    pub kind: TechnologyKind,
    /// Technical lifetime of the generation equipment (years)
    pub tech_life: u32,
    /// Annual O&M cost as a share of generation capital cost
    pub om_costs: Dimensionless,
    /// Ratio of average to peak load
    pub base_to_peak_load_ratio: f64,
    /// Share of generated energy lost in distribution
    pub distribution_losses: Dimensionless,
    /// Cost of connecting one household
    pub connection_cost_per_hh: Money,
    /// Capacity factor of the generation equipment.
    ///
    /// If `None`, PV and wind technologies use the settlement's resource data and other
    /// technologies use a capacity factor of one.
    pub capacity_factor: Option<f64>,
    /// Annual O&M cost of the distribution network as a share of its capital cost
    pub om_of_td_lines: Dimensionless,
    /// Fuel-to-electricity efficiency of diesel generation
    pub efficiency: Option<f64>,
    /// Technology-specific discount rate, overriding the model's
    pub discount_rate: Option<Dimensionless>,
    /// Capital cost of generation equipment by scale
    pub capital_costs: CapitalCostSchedule,
}

/// A map of technology parameters, in [`TechnologyKind`] declaration order
pub type TechnologyMap = IndexMap<TechnologyKind, TechnologySpec>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn pv_schedule() -> CapitalCostSchedule {
        CapitalCostSchedule::new(vec![
            (None, MoneyPerCapacity(2700.0)),
            (Some(0.2), MoneyPerCapacity(2700.0)),
            (Some(0.08), MoneyPerCapacity(2625.0)),
            (Some(0.03), MoneyPerCapacity(2200.0)),
            (Some(0.006), MoneyPerCapacity(9200.0)),
        ])
        .unwrap()
    }

    #[rstest]
    #[case(0.001, 9200.0)]
    #[case(0.006, 9200.0)] // Threshold is inclusive
    #[case(0.0061, 2200.0)] // No interpolation between thresholds
    #[case(0.05, 2625.0)]
    #[case(0.2, 2700.0)]
    #[case(100.0, 2700.0)] // Fallback
    fn test_cost_at(pv_schedule: CapitalCostSchedule, #[case] scale: f64, #[case] expected: f64) {
        assert_eq!(pv_schedule.cost_at(scale), MoneyPerCapacity(expected));
    }

    #[test]
    fn test_schedule_invalid() {
        // No fallback
        assert!(CapitalCostSchedule::new(vec![(Some(1.0), MoneyPerCapacity(1.0))]).is_err());

        // Two fallbacks
        assert!(
            CapitalCostSchedule::new(vec![
                (None, MoneyPerCapacity(1.0)),
                (None, MoneyPerCapacity(2.0))
            ])
            .is_err()
        );

        // Duplicate thresholds
        assert!(
            CapitalCostSchedule::new(vec![
                (None, MoneyPerCapacity(1.0)),
                (Some(1.0), MoneyPerCapacity(2.0)),
                (Some(1.0), MoneyPerCapacity(3.0))
            ])
            .is_err()
        );

        // Negative cost
        assert!(CapitalCostSchedule::new(vec![(None, MoneyPerCapacity(-1.0))]).is_err());
    }

    #[test]
    fn test_kind_classes() {
        assert!(TechnologyKind::SaPv.is_standalone());
        assert!(!TechnologyKind::SaPv.is_mini_grid());
        assert!(TechnologyKind::MgPvHybrid.is_mini_grid());
        assert!(TechnologyKind::MgPvHybrid.is_hybrid());
        assert!(TechnologyKind::MgPvHybrid.is_pv());
        assert!(!TechnologyKind::Grid.is_mini_grid());
        assert!(TechnologyKind::ExpandedMiniGrid.extends_network());
        assert_eq!(TechnologyKind::ExpandedMiniGrid.costed_as(), TechnologyKind::Grid);
        assert_eq!(TechnologyKind::MgPv.costed_as(), TechnologyKind::MgPv);
        assert_eq!(TechnologyKind::iter_offgrid().count(), 8);
    }

    #[test]
    fn test_labels() {
        assert_eq!(TechnologyKind::MgWindHybrid.to_string(), "mg_wind_hybrid");
        assert_eq!(technology_label(Some(TechnologyKind::Grid)), "grid");
        assert_eq!(
            technology_label(Some(TechnologyKind::ExpandedMiniGrid)),
            "expanded_mg"
        );
        assert_eq!(technology_label(None), "unelectrified");
    }
}
