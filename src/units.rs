//! This module defines various unit types and their conversions.
//!
//! Energy quantities are annual throughout (kWh per year), so an [`Energy`] divided into an annual
//! cost yields a levelised cost.
use float_cmp::{ApproxEq, F64Margin};
use serde::{Deserialize, Serialize};

macro_rules! base_unit_struct {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
        )]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub const fn new(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }

            /// The smaller of two values
            pub fn min(self, other: Self) -> Self {
                Self(self.0.min(other.0))
            }

            /// The larger of two values
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }

            /// Compare two values with [`f64::total_cmp`]
            pub fn total_cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $name> for $name {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! unit_struct {
    ($(#[$meta:meta])* $name:ident) => {
        base_unit_struct!($(#[$meta])* $name);

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::ops::Div<$name> for $name {
            type Output = Dimensionless;
            fn div(self, rhs: $name) -> Dimensionless {
                Dimensionless(self.0 / rhs.0)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

base_unit_struct!(
    /// Represents a dimensionless quantity.
    Dimensionless
);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

impl Dimensionless {
    /// Raise to an integer power
    pub fn powi(self, rhs: i32) -> Self {
        Dimensionless(self.0.powi(rhs))
    }
}

// Base quantities
unit_struct!(
    /// An amount of money (USD)
    Money
);
unit_struct!(
    /// Annual energy (kWh/year)
    Energy
);
unit_struct!(
    /// Power capacity (kW)
    Capacity
);
unit_struct!(
    /// A distance (km)
    Distance
);

// Derived quantities
unit_struct!(
    /// An annualised amount of money (USD/year)
    MoneyPerYear
);
unit_struct!(
    /// Cost per unit of energy (USD/kWh)
    MoneyPerEnergy
);
unit_struct!(
    /// Cost per unit of capacity (USD/kW)
    MoneyPerCapacity
);
unit_struct!(
    /// Cost per unit of line length (USD/km)
    MoneyPerDistance
);

// Division rules
impl_div!(MoneyPerYear, Energy, MoneyPerEnergy);
impl_div!(Money, Capacity, MoneyPerCapacity);

// Multiplication rules
impl_mul!(MoneyPerCapacity, Capacity, Money);
impl_mul!(MoneyPerDistance, Distance, Money);
impl_mul!(MoneyPerEnergy, Energy, MoneyPerYear);

impl MoneyPerEnergy {
    /// The sentinel used for technologies which cannot supply a settlement
    pub const INFINITE: MoneyPerEnergy = MoneyPerEnergy(f64::INFINITY);
}
