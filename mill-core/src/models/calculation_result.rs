use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Hourly throughput derived from a [`crate::SampleInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    /// Flour produced per hour (kg/h).
    pub flour_per_hour: Decimal,

    /// Bran produced per hour (kg/h).
    pub bran_per_hour: Decimal,

    /// Sum of flour and bran per hour (kg/h).
    pub total_per_hour: Decimal,

    /// Share of the total attributable to flour, in `[0, 100]`.
    /// Zero when nothing was produced.
    pub yield_percentage: Decimal,
}

/// One slice of the flour/bran distribution chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionSlice {
    pub label: &'static str,
    /// Hourly rate (kg/h) this slice represents.
    pub value: Decimal,
    /// Percentage of the total, zero when the total is zero.
    pub share: Decimal,
}

impl CalculationResult {
    pub fn zero() -> Self {
        Self {
            flour_per_hour: Decimal::ZERO,
            bran_per_hour: Decimal::ZERO,
            total_per_hour: Decimal::ZERO,
            yield_percentage: Decimal::ZERO,
        }
    }

    /// The flour and bran slices, in that order.
    pub fn distribution(&self) -> [DistributionSlice; 2] {
        let bran_share = if self.total_per_hour > Decimal::ZERO {
            Decimal::ONE_HUNDRED - self.yield_percentage
        } else {
            Decimal::ZERO
        };

        [
            DistributionSlice {
                label: "Flour",
                value: self.flour_per_hour,
                share: self.yield_percentage,
            },
            DistributionSlice {
                label: "Bran",
                value: self.bran_per_hour,
                share: bran_share,
            },
        ]
    }
}
