//! Monetary amounts as integer minor units.
//!
//! Amounts are stored and summed as whole cents; the decimal display value
//! exists only at the serialization boundary.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Cents(pub i64);

impl Cents {
    /// Converts a decimal currency value (e.g. `4.5`) to whole cents.
    pub fn from_display(value: f64) -> Self {
        Cents((value * 100.0).round() as i64)
    }

    /// Decimal currency value for response bodies.
    pub fn to_display(self) -> f64 {
        self.0 as f64 / 100.0
    }
}
