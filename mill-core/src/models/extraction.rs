use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculations::HOURLY_FACTOR;
use crate::calculations::common::checked_product;
use crate::models::{CalculationResult, Identity, SampleInput, UserId};

/// A calculation persisted in the history store.
///
/// `id` and `created_at` are assigned by the store. Records are never
/// updated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedExtraction {
    pub id: i64,
    pub user_id: UserId,
    pub flour: Decimal,
    pub bran: Decimal,
    pub yield_percentage: Decimal,
    pub created_at: DateTime<Utc>,
}

impl SavedExtraction {
    /// `None` when a stored sample is too large to project; rows are not
    /// validated on load.
    pub fn flour_per_hour(&self) -> Option<Decimal> {
        checked_product(self.flour, HOURLY_FACTOR)
    }

    pub fn bran_per_hour(&self) -> Option<Decimal> {
        checked_product(self.bran, HOURLY_FACTOR)
    }
}

/// For appending new extractions (no id or timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExtraction {
    pub user_id: UserId,
    pub flour: Decimal,
    pub bran: Decimal,
    pub yield_percentage: Decimal,
}

impl NewExtraction {
    /// Pairs the raw samples with the yield they produced, owned by `identity`.
    pub fn new(
        identity: &Identity,
        sample: &SampleInput,
        result: &CalculationResult,
    ) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            flour: sample.flour,
            bran: sample.bran,
            yield_percentage: result.yield_percentage,
        }
    }
}
