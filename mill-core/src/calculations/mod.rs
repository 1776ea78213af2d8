//! Extraction yield calculations.
//!
//! Samples are weighed over a fixed 10-second window, so a sample weight
//! multiplied by [`HOURLY_FACTOR`] projects the hourly rate.

pub mod common;
pub mod yield_calc;

pub use yield_calc::{
    CalculationError, HOURLY_FACTOR, MINUTES_PER_HOUR, SAMPLES_PER_MINUTE, YieldCalculator,
    ZeroSamplePolicy,
};
