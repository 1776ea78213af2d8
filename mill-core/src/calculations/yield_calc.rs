//! Hourly extraction yield from a pair of sample weights.
//!
//! | Value | Formula |
//! |-------|---------|
//! | Flour per hour | flour sample × 6 × 60 |
//! | Bran per hour | bran sample × 6 × 60 |
//! | Total per hour | flour per hour + bran per hour |
//! | Yield | flour per hour ÷ total per hour × 100 (0 when total is 0) |
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use mill_core::calculations::YieldCalculator;
//! use mill_core::SampleInput;
//!
//! let calculator = YieldCalculator::default();
//! let result = calculator
//!     .calculate(&SampleInput::new(dec!(1.50), dec!(0.50)))
//!     .unwrap();
//!
//! assert_eq!(result.flour_per_hour, dec!(540));
//! assert_eq!(result.bran_per_hour, dec!(180));
//! assert_eq!(result.total_per_hour, dec!(720));
//! assert_eq!(result.yield_percentage, dec!(75));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::checked_product;
use crate::models::{CalculationResult, SampleInput};

/// Samples are taken over a 10-second window: six per minute.
pub const SAMPLES_PER_MINUTE: Decimal = Decimal::from_parts(6, 0, 0, false, 0);

pub const MINUTES_PER_HOUR: Decimal = Decimal::from_parts(60, 0, 0, false, 0);

/// `SAMPLES_PER_MINUTE × MINUTES_PER_HOUR`.
pub const HOURLY_FACTOR: Decimal = Decimal::from_parts(360, 0, 0, false, 0);

/// Errors that reject an input before any result is produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("{field} sample cannot be negative (got {value})")]
    NegativeSample { field: &'static str, value: Decimal },

    /// Both samples were zero and the calculator is configured to refuse.
    #[error("enter at least one sample weight")]
    NoSamples,

    #[error("{field} sample {value} is too large")]
    Overflow { field: &'static str, value: Decimal },
}

impl CalculationError {
    /// Message shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::NegativeSample { .. } => "Sample values cannot be negative.".to_string(),
            Self::NoSamples => "Enter the flour and bran sample weights.".to_string(),
            Self::Overflow { .. } => "Sample value is too large.".to_string(),
        }
    }
}

/// What to do when both samples are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZeroSamplePolicy {
    /// Produce an all-zero result (yield 0 %).
    #[default]
    Compute,
    /// Refuse with [`CalculationError::NoSamples`].
    Reject,
}

/// Calculator for hourly throughput and flour yield.
#[derive(Debug, Clone, Copy, Default)]
pub struct YieldCalculator {
    zero_policy: ZeroSamplePolicy,
}

impl YieldCalculator {
    pub fn new(zero_policy: ZeroSamplePolicy) -> Self {
        Self { zero_policy }
    }

    pub fn zero_policy(&self) -> ZeroSamplePolicy {
        self.zero_policy
    }

    /// Computes the hourly rates and yield for `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`CalculationError`] if:
    /// - either sample is negative
    /// - both samples are zero under [`ZeroSamplePolicy::Reject`]
    /// - a projected rate does not fit in a [`Decimal`]
    pub fn calculate(
        &self,
        sample: &SampleInput,
    ) -> Result<CalculationResult, CalculationError> {
        Self::ensure_non_negative("flour", sample.flour)?;
        Self::ensure_non_negative("bran", sample.bran)?;

        if sample.is_empty() && self.zero_policy == ZeroSamplePolicy::Reject {
            return Err(CalculationError::NoSamples);
        }

        let flour_per_hour = Self::per_hour("flour", sample.flour)?;
        let bran_per_hour = Self::per_hour("bran", sample.bran)?;
        let total_per_hour = flour_per_hour
            .checked_add(bran_per_hour)
            .ok_or(CalculationError::Overflow {
                field: "total",
                value: flour_per_hour,
            })?;
        let yield_percentage = Self::yield_percentage(flour_per_hour, total_per_hour);

        debug!(
            %flour_per_hour,
            %bran_per_hour,
            %yield_percentage,
            "computed extraction yield"
        );

        Ok(CalculationResult {
            flour_per_hour,
            bran_per_hour,
            total_per_hour,
            yield_percentage,
        })
    }

    fn ensure_non_negative(
        field: &'static str,
        value: Decimal,
    ) -> Result<(), CalculationError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(CalculationError::NegativeSample { field, value });
        }
        Ok(())
    }

    /// Projects a 10-second sample to an hourly rate.
    fn per_hour(
        field: &'static str,
        sample: Decimal,
    ) -> Result<Decimal, CalculationError> {
        checked_product(sample, SAMPLES_PER_MINUTE)
            .and_then(|per_minute| checked_product(per_minute, MINUTES_PER_HOUR))
            .ok_or(CalculationError::Overflow {
                field,
                value: sample,
            })
    }

    /// Flour share of the total, guarded against an empty total.
    fn yield_percentage(
        flour_per_hour: Decimal,
        total_per_hour: Decimal,
    ) -> Decimal {
        if total_per_hour > Decimal::ZERO {
            flour_per_hour / total_per_hour * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        }
    }
}
