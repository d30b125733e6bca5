//! Data-access port: an abstract interface for reads/writes of
//! transactions, settlements, adjustments, and match results. Not a
//! concrete database layer — the core only ever talks to this trait.

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::model::{Adjustment, MatchResult, Settlement, Transaction, TransactionStatus};
use crate::money::Money;

/// Optional filters accepted by the unmatched-record and mismatch queries.
#[derive(Debug, Clone, Default)]
pub struct RecordFilters {
    pub currency: Option<String>,
    pub min_amount: Option<Money>,
}

#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    async fn load_transactions(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        status_filter: Option<TransactionStatus>,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn load_settlements(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Settlement>, StoreError>;

    async fn load_adjustments(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Adjustment>, StoreError>;

    /// Deletes all existing MatchResults in one logical step.
    async fn clear_matches(&self) -> Result<(), StoreError>;

    /// Inserts all MatchResults. Atomic relative to the preceding
    /// `clear_matches` call (all-or-nothing).
    async fn persist_matches(&self, matches: Vec<MatchResult>) -> Result<(), StoreError>;

    async fn fetch_unmatched_transactions(
        &self,
        filters: &RecordFilters,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn fetch_unmatched_settlements(
        &self,
        filters: &RecordFilters,
    ) -> Result<Vec<Settlement>, StoreError>;

    async fn fetch_unmatched_adjustments(
        &self,
        filters: &RecordFilters,
    ) -> Result<Vec<Adjustment>, StoreError>;

    /// MatchResults with `amount_difference > 0` and a settlement.
    async fn fetch_amount_mismatches(
        &self,
        filters: &RecordFilters,
    ) -> Result<Vec<MatchResult>, StoreError>;

    async fn all_matches(&self) -> Result<Vec<MatchResult>, StoreError>;

    async fn match_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<MatchResult>, StoreError>;
}

/// Reference in-memory implementation. Sufficient to exercise the
/// orchestrator end-to-end in tests and local runs; not a persistence
/// engine.
#[derive(Default)]
pub struct InMemoryStore {
    transactions: RwLock<Vec<Transaction>>,
    settlements: RwLock<Vec<Settlement>>,
    adjustments: RwLock<Vec<Adjustment>>,
    matches: RwLock<Vec<MatchResult>>,
}

impl InMemoryStore {
    pub fn new(
        transactions: Vec<Transaction>,
        settlements: Vec<Settlement>,
        adjustments: Vec<Adjustment>,
    ) -> Self {
        Self {
            transactions: RwLock::new(transactions),
            settlements: RwLock::new(settlements),
            adjustments: RwLock::new(adjustments),
            matches: RwLock::new(Vec::new()),
        }
    }

    fn in_range(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
        from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
    }

    fn passes_filters(amount: Money, currency: &str, filters: &RecordFilters) -> bool {
        filters
            .currency
            .as_ref()
            .map_or(true, |c| c.eq_ignore_ascii_case(currency))
            && filters.min_amount.map_or(true, |min| amount >= min)
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryStore {
    async fn load_transactions(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
        status_filter: Option<TransactionStatus>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let txns = self.transactions.read().await;
        Ok(txns
            .iter()
            .filter(|t| Self::in_range(t.timestamp.date_naive(), date_from, date_to))
            .filter(|t| status_filter.map_or(true, |s| t.status == s))
            .cloned()
            .collect())
    }

    async fn load_settlements(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Settlement>, StoreError> {
        let stls = self.settlements.read().await;
        Ok(stls
            .iter()
            .filter(|s| Self::in_range(s.settlement_date, date_from, date_to))
            .cloned()
            .collect())
    }

    async fn load_adjustments(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<Vec<Adjustment>, StoreError> {
        let adjs = self.adjustments.read().await;
        Ok(adjs
            .iter()
            .filter(|a| Self::in_range(a.date, date_from, date_to))
            .cloned()
            .collect())
    }

    async fn clear_matches(&self) -> Result<(), StoreError> {
        self.matches.write().await.clear();
        Ok(())
    }

    async fn persist_matches(&self, matches: Vec<MatchResult>) -> Result<(), StoreError> {
        *self.matches.write().await = matches;
        Ok(())
    }

    async fn fetch_unmatched_transactions(
        &self,
        filters: &RecordFilters,
    ) -> Result<Vec<Transaction>, StoreError> {
        let txns = self.transactions.read().await;
        let matches = self.matches.read().await;
        Ok(txns
            .iter()
            .filter(|t| t.status == TransactionStatus::Captured)
            .filter(|t| {
                !matches
                    .iter()
                    .any(|m| m.transaction_id == t.transaction_id && m.settlement_id.is_some())
            })
            .filter(|t| Self::passes_filters(t.amount, &t.currency, filters))
            .cloned()
            .collect())
    }

    async fn fetch_unmatched_settlements(
        &self,
        filters: &RecordFilters,
    ) -> Result<Vec<Settlement>, StoreError> {
        let stls = self.settlements.read().await;
        let matches = self.matches.read().await;
        Ok(stls
            .iter()
            .filter(|s| !matches.iter().any(|m| m.settlement_id.as_deref() == Some(s.id.as_str())))
            .filter(|s| Self::passes_filters(s.amount, &s.currency, filters))
            .cloned()
            .collect())
    }

    async fn fetch_unmatched_adjustments(
        &self,
        filters: &RecordFilters,
    ) -> Result<Vec<Adjustment>, StoreError> {
        let adjs = self.adjustments.read().await;
        let matches = self.matches.read().await;
        Ok(adjs
            .iter()
            .filter(|a| !matches.iter().any(|m| m.adjustment_id.as_deref() == Some(a.id.as_str())))
            .filter(|a| Self::passes_filters(a.amount, &a.currency, filters))
            .cloned()
            .collect())
    }

    async fn fetch_amount_mismatches(
        &self,
        filters: &RecordFilters,
    ) -> Result<Vec<MatchResult>, StoreError> {
        let matches = self.matches.read().await;
        let txns = self.transactions.read().await;
        Ok(matches
            .iter()
            .filter(|m| !m.amount_difference.is_zero() && m.settlement_id.is_some())
            .filter(|m| {
                let currency = txns
                    .iter()
                    .find(|t| t.transaction_id == m.transaction_id)
                    .map(|t| t.currency.as_str());
                match (currency, &filters.currency) {
                    (Some(c), Some(f)) => c.eq_ignore_ascii_case(f),
                    (None, Some(_)) => false,
                    _ => true,
                }
            })
            .filter(|m| filters.min_amount.map_or(true, |min| m.amount_difference >= min))
            .cloned()
            .collect())
    }

    async fn all_matches(&self) -> Result<Vec<MatchResult>, StoreError> {
        Ok(self.matches.read().await.clone())
    }

    async fn match_for_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Option<MatchResult>, StoreError> {
        Ok(self
            .matches
            .read()
            .await
            .iter()
            .find(|m| m.transaction_id == transaction_id && m.settlement_id.is_some())
            .cloned())
    }
}
