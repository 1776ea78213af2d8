use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weights (kg) of the flour and bran samples taken during one
/// extraction window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInput {
    pub flour: Decimal,
    pub bran: Decimal,
}

impl SampleInput {
    pub fn new(
        flour: Decimal,
        bran: Decimal,
    ) -> Self {
        Self { flour, bran }
    }

    pub fn is_empty(&self) -> bool {
        self.flour.is_zero() && self.bran.is_zero()
    }
}
