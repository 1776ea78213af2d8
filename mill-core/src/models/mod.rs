mod calculation_result;
mod extraction;
mod identity;
mod sample;

pub use calculation_result::{CalculationResult, DistributionSlice};
pub use extraction::{NewExtraction, SavedExtraction};
pub use identity::{Identity, UserId};
pub use sample::SampleInput;
