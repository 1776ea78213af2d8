//! Saving and reading an operator's extraction history.
//!
//! Reads prefer the store's own ordering. When the store cannot serve the
//! ordered query (typically a missing secondary index) the same owner-scoped
//! records are fetched unordered and sorted here, newest first.

use std::cmp::Ordering;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::repository::{ExtractionRepository, RepositoryError};
use crate::models::{CalculationResult, Identity, NewExtraction, SampleInput, SavedExtraction};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("failed to save extraction: {0}")]
    Save(#[source] RepositoryError),

    /// Both the ordered query and its unordered fallback failed.
    #[error("failed to load history: {fallback} (ordered query: {ordered})")]
    Query {
        ordered: RepositoryError,
        #[source]
        fallback: RepositoryError,
    },

    /// The store could not be opened, so no query was attempted.
    #[error("history store unavailable: {0}")]
    Unavailable(#[source] RepositoryError),
}

impl HistoryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Save(_) => "Could not save the extraction. Please try again.",
            Self::Query { .. } | Self::Unavailable(_) => "No history available.",
        }
    }
}

/// History operations on behalf of an explicitly passed [`Identity`].
pub struct HistoryService<'a> {
    repository: &'a dyn ExtractionRepository,
}

impl<'a> HistoryService<'a> {
    pub fn new(repository: &'a dyn ExtractionRepository) -> Self {
        Self { repository }
    }

    /// Persists `result` with the samples that produced it.
    ///
    /// The write is attempted once; failures are returned, never retried.
    pub async fn save(
        &self,
        identity: &Identity,
        sample: &SampleInput,
        result: &CalculationResult,
    ) -> Result<SavedExtraction, HistoryError> {
        let extraction = NewExtraction::new(identity, sample, result);

        match self.repository.append(extraction).await {
            Ok(saved) => {
                info!(user_id = %identity.user_id, id = saved.id, "saved extraction");
                Ok(saved)
            }
            Err(e) => {
                error!(user_id = %identity.user_id, error = %e, "failed to save extraction");
                Err(HistoryError::Save(e))
            }
        }
    }

    /// All extractions owned by `identity`, most recent first.
    pub async fn query_by_owner(
        &self,
        identity: &Identity,
    ) -> Result<Vec<SavedExtraction>, HistoryError> {
        let ordered = match self
            .repository
            .list_by_owner_ordered(&identity.user_id)
            .await
        {
            Ok(records) => return Ok(records),
            Err(e) => e,
        };

        warn!(
            user_id = %identity.user_id,
            error = %ordered,
            "ordered history query failed, sorting locally"
        );

        match self.repository.list_by_owner(&identity.user_id).await {
            Ok(mut records) => {
                sort_most_recent_first(&mut records);
                Ok(records)
            }
            Err(fallback) => {
                error!(user_id = %identity.user_id, error = %fallback, "history fallback failed");
                Err(HistoryError::Query { ordered, fallback })
            }
        }
    }
}

/// Sorts by `created_at` descending, newer ids first on equal timestamps.
pub fn sort_most_recent_first(records: &mut [SavedExtraction]) {
    records.sort_by(|a, b| match b.created_at.cmp(&a.created_at) {
        Ordering::Equal => b.id.cmp(&a.id),
        other => other,
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::UserId;

    /// In-memory store whose ordered query can be switched off.
    struct MemoryRepository {
        records: Mutex<Vec<SavedExtraction>>,
        ordered_available: bool,
        fail_unordered: bool,
        fail_append: bool,
        append_calls: AtomicUsize,
    }

    impl MemoryRepository {
        fn new(records: Vec<SavedExtraction>) -> Self {
            Self {
                records: Mutex::new(records),
                ordered_available: true,
                fail_unordered: false,
                fail_append: false,
                append_calls: AtomicUsize::new(0),
            }
        }

        fn without_index(mut self) -> Self {
            self.ordered_available = false;
            self
        }

        fn owned_by(
            &self,
            user_id: &UserId,
        ) -> Vec<SavedExtraction> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| &r.user_id == user_id)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl ExtractionRepository for MemoryRepository {
        async fn append(
            &self,
            extraction: NewExtraction,
        ) -> Result<SavedExtraction, RepositoryError> {
            self.append_calls.fetch_add(1, AtomicOrdering::SeqCst);
            if self.fail_append {
                return Err(RepositoryError::Connection("offline".to_string()));
            }
            let mut records = self.records.lock().unwrap();
            let saved = SavedExtraction {
                id: records.len() as i64 + 1,
                user_id: extraction.user_id,
                flour: extraction.flour,
                bran: extraction.bran,
                yield_percentage: extraction.yield_percentage,
                created_at: at(0),
            };
            records.push(saved.clone());
            Ok(saved)
        }

        async fn list_by_owner_ordered(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<SavedExtraction>, RepositoryError> {
            if !self.ordered_available {
                return Err(RepositoryError::MissingIndex(
                    "idx_extractions_user_date".to_string(),
                ));
            }
            let mut records = self.owned_by(user_id);
            sort_most_recent_first(&mut records);
            Ok(records)
        }

        async fn list_by_owner(
            &self,
            user_id: &UserId,
        ) -> Result<Vec<SavedExtraction>, RepositoryError> {
            if self.fail_unordered {
                return Err(RepositoryError::Database("disk I/O error".to_string()));
            }
            Ok(self.owned_by(user_id))
        }
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 6, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn record(
        id: i64,
        owner: &str,
        minutes: i64,
    ) -> SavedExtraction {
        SavedExtraction {
            id,
            user_id: UserId::new(owner),
            flour: dec!(1.50),
            bran: dec!(0.50),
            yield_percentage: dec!(75),
            created_at: at(minutes),
        }
    }

    /// Deliberately out of chronological order, with a foreign record.
    fn shuffled_records() -> Vec<SavedExtraction> {
        vec![
            record(1, "alice", 30),
            record(2, "bob", 45),
            record(3, "alice", 90),
            record(4, "alice", 10),
            record(5, "alice", 90),
        ]
    }

    fn ids(records: &[SavedExtraction]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn query_uses_store_ordering() {
        let repo = MemoryRepository::new(shuffled_records());
        let service = HistoryService::new(&repo);

        let history = service
            .query_by_owner(&Identity::new("alice"))
            .await
            .unwrap();

        assert_eq!(ids(&history), vec![5, 3, 1, 4]);
    }

    #[tokio::test]
    async fn fallback_matches_ordered_result() {
        let ordered_repo = MemoryRepository::new(shuffled_records());
        let fallback_repo = MemoryRepository::new(shuffled_records()).without_index();
        let alice = Identity::new("alice");

        let ordered = HistoryService::new(&ordered_repo)
            .query_by_owner(&alice)
            .await
            .unwrap();
        let fallback = HistoryService::new(&fallback_repo)
            .query_by_owner(&alice)
            .await
            .unwrap();

        assert_eq!(fallback, ordered);
    }

    #[tokio::test]
    async fn fallback_stays_owner_scoped() {
        let repo = MemoryRepository::new(shuffled_records()).without_index();

        let history = HistoryService::new(&repo)
            .query_by_owner(&Identity::new("bob"))
            .await
            .unwrap();

        assert_eq!(ids(&history), vec![2]);
    }

    #[tokio::test]
    async fn query_fails_only_when_fallback_fails() {
        let mut repo = MemoryRepository::new(shuffled_records()).without_index();
        repo.fail_unordered = true;

        let err = HistoryService::new(&repo)
            .query_by_owner(&Identity::new("alice"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HistoryError::Query {
                ordered: RepositoryError::MissingIndex(_),
                fallback: RepositoryError::Database(_),
            }
        ));
        assert_eq!(err.user_message(), "No history available.");
    }

    #[test]
    fn unavailable_store_reads_as_no_history() {
        let err = HistoryError::Unavailable(RepositoryError::Connection("locked".to_string()));

        assert_eq!(err.user_message(), "No history available.");
        assert_eq!(err.to_string(), "history store unavailable: Connection error: locked");
    }

    #[tokio::test]
    async fn query_for_unknown_owner_is_empty() {
        let repo = MemoryRepository::new(shuffled_records());

        let history = HistoryService::new(&repo)
            .query_by_owner(&Identity::new("carol"))
            .await
            .unwrap();

        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn save_stores_samples_and_yield() {
        let repo = MemoryRepository::new(Vec::new());
        let identity = Identity::new("alice");
        let sample = SampleInput::new(dec!(1.50), dec!(0.50));
        let result = CalculationResult {
            flour_per_hour: dec!(540),
            bran_per_hour: dec!(180),
            total_per_hour: dec!(720),
            yield_percentage: dec!(75),
        };

        let saved = HistoryService::new(&repo)
            .save(&identity, &sample, &result)
            .await
            .unwrap();

        assert_eq!(saved.user_id, identity.user_id);
        assert_eq!(saved.flour, dec!(1.50));
        assert_eq!(saved.bran, dec!(0.50));
        assert_eq!(saved.yield_percentage, dec!(75));
    }

    #[tokio::test]
    async fn failed_save_is_reported_without_retry() {
        let mut repo = MemoryRepository::new(Vec::new());
        repo.fail_append = true;

        let err = HistoryService::new(&repo)
            .save(
                &Identity::new("alice"),
                &SampleInput::default(),
                &CalculationResult::zero(),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            HistoryError::Save(RepositoryError::Connection("offline".to_string()))
        );
        assert_eq!(repo.append_calls.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn sort_breaks_timestamp_ties_by_id() {
        let mut records = vec![record(1, "a", 5), record(3, "a", 5), record(2, "a", 7)];

        sort_most_recent_first(&mut records);

        assert_eq!(ids(&records), vec![2, 3, 1]);
    }
}
