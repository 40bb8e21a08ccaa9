use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

/// A US dollar amount.
///
/// Kept as a float: holdings may be fractional shares and the rebalancer
/// reports to the cent, so no integer-cent rounding happens here.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Usd {
    pub amount: f64,
}

impl Usd {
    pub const ZERO: Usd = Usd { amount: 0.0 };

    pub fn new(amount: f64) -> Self {
        Self { amount }
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0.0
    }
}

impl From<f64> for Usd {
    fn from(amount: f64) -> Self {
        Self { amount }
    }
}

impl Add for Usd {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            amount: self.amount + other.amount,
        }
    }
}

impl Sub for Usd {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self {
            amount: self.amount - other.amount,
        }
    }
}

/// Price times a share count.
impl Mul<f64> for Usd {
    type Output = Usd;

    fn mul(self, quantity: f64) -> Usd {
        Usd {
            amount: self.amount * quantity,
        }
    }
}

impl Sum for Usd {
    fn sum<I: Iterator<Item = Usd>>(iter: I) -> Usd {
        iter.fold(Usd::ZERO, |acc, x| acc + x)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // round first so float residue like -1e-13 shows as $0.00
        let cents = (self.amount * 100.0).round();
        if cents < 0.0 {
            write!(f, "-${:.2}", -cents / 100.0)
        } else {
            write!(f, "${:.2}", cents.abs() / 100.0)
        }
    }
}
