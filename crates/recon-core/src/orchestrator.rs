//! Drives one reconciliation run end to end: clear the match table, load
//! records, run the five-phase pipeline, persist, and report counts.

use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::config::ReconConfig;
use crate::error::RunError;
use crate::matching;
use crate::port::{RecordFilters, ReconciliationStore};

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub matched: usize,
    pub unmatched_transactions: usize,
    pub unmatched_settlements: usize,
    pub unmatched_adjustments: usize,
    pub amount_mismatches: usize,
    pub processing_time_ms: i64,
}

/// `clear_matches` and `persist_matches` are one logical transaction: if
/// the store fails anywhere between them, the run has no partial effect.
pub async fn run_reconciliation(
    store: &dyn ReconciliationStore,
    config: &ReconConfig,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
    now: DateTime<Utc>,
) -> Result<RunReport, RunError> {
    let started = Instant::now();
    let span = tracing::info_span!("reconciliation_run", date_from = ?date_from, date_to = ?date_to);
    let _enter = span.enter();
    tracing::info!("starting reconciliation run");

    store.clear_matches().await?;

    let transactions = store.load_transactions(date_from, date_to, None).await?;
    let settlements = store.load_settlements(date_from, date_to).await?;
    let adjustments = store.load_adjustments(date_from, date_to).await?;
    tracing::debug!(
        transactions = transactions.len(),
        settlements = settlements.len(),
        adjustments = adjustments.len(),
        "loaded records"
    );

    let outcome = matching::run_matching(&transactions, &settlements, &adjustments, config, now);
    let matches = outcome.matches;
    let matched = matches.len();
    let amount_mismatches = outcome.phase2_amount_mismatches;
    tracing::debug!(matched, amount_mismatches, "matching pipeline complete");

    store.persist_matches(matches).await?;

    let filters = RecordFilters::default();
    let unmatched_transactions = store.fetch_unmatched_transactions(&filters).await?.len();
    let unmatched_settlements = store.fetch_unmatched_settlements(&filters).await?.len();
    let unmatched_adjustments = store.fetch_unmatched_adjustments(&filters).await?.len();

    let processing_time_ms = started.elapsed().as_millis() as i64;
    tracing::info!(matched, processing_time_ms, "reconciliation run complete");

    Ok(RunReport {
        matched,
        unmatched_transactions,
        unmatched_settlements,
        unmatched_adjustments,
        amount_mismatches,
        processing_time_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Settlement, Transaction, TransactionStatus};
    use crate::money::Money;
    use crate::port::InMemoryStore;

    fn txn(id: &str) -> Transaction {
        Transaction {
            id: format!("internal_{id}"),
            transaction_id: id.into(),
            merchant_order_id: format!("order_{id}"),
            amount: Money::from_str_decimal("100.00").unwrap(),
            currency: "MXN".into(),
            timestamp: chrono::DateTime::parse_from_rfc3339("2024-01-15T10:00:00Z").unwrap(),
            status: TransactionStatus::Captured,
            customer_id: "cust_1".into(),
            country: "MX".into(),
            created_at: Utc::now(),
        }
    }

    fn stl(id: &str, reference: &str) -> Settlement {
        Settlement {
            id: id.into(),
            settlement_reference: format!("ref_{id}"),
            amount: Money::from_str_decimal("100.00").unwrap(),
            gross_amount: None,
            currency: "MXN".into(),
            settlement_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            transaction_reference: Some(reference.into()),
            fees_deducted: Money::ZERO,
            bank_name: "Bank".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn run_reconciliation_persists_matches_and_reports_counts() {
        let t = txn("txn_100");
        let s = stl("stl_100", "txn_100");
        let store = InMemoryStore::new(vec![t], vec![s], vec![]);
        let config = ReconConfig::default();

        let report = run_reconciliation(&store, &config, None, None, Utc::now()).await.unwrap();

        assert_eq!(report.matched, 1);
        assert_eq!(report.unmatched_transactions, 0);
        assert_eq!(report.unmatched_settlements, 0);

        let all = store.all_matches().await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn a_second_run_is_idempotent() {
        let t = txn("txn_200");
        let s = stl("stl_200", "txn_200");
        let store = InMemoryStore::new(vec![t], vec![s], vec![]);
        let config = ReconConfig::default();

        run_reconciliation(&store, &config, None, None, Utc::now()).await.unwrap();
        let second = run_reconciliation(&store, &config, None, None, Utc::now()).await.unwrap();

        assert_eq!(second.matched, 1);
        let all = store.all_matches().await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
