//! Discrepancy classification, priority assignment, and the summary
//! counters shown on the reconciliation dashboard. Pure over already
//! loaded records — no data-access calls happen in this module.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ReconConfig;
use crate::model::{Adjustment, AdjustmentType, MatchResult, MatchStatus, MatchType, ReasonTag, Settlement, Transaction};
use crate::money::{self, Money};
use crate::scoring;
use crate::time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyCategory {
    UnmatchedTransaction,
    UnmatchedSettlement,
    UnmatchedAdjustment,
    AmountMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionRecordType {
    Settlement,
    Transaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub record_type: SuggestionRecordType,
    pub record_id: String,
    pub confidence: u8,
    pub reasons: Vec<ReasonTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    pub category: DiscrepancyCategory,
    pub transaction_id: Option<String>,
    pub settlement_id: Option<String>,
    pub adjustment_id: Option<String>,
    pub match_id: Option<String>,
    pub amount: Money,
    pub currency: String,
    pub age_days: i64,
    pub priority: Priority,
    pub suggested_matches: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscrepancySummary {
    pub total_unmatched_value_usd: f64,
    pub unmatched_by_currency: BTreeMap<String, f64>,
    pub avg_settlement_time_hours: Option<f64>,
    pub chargeback_rate: f64,
    pub orphaned_records_over_7_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub total_records: i64,
    pub match_rate: f64,
}

/// High if `to_usd(amount) > $1000` or `age_days > 7`; medium if `> $100`
/// or `> 3` days; else low. Adjustments are always high regardless of
/// amount or age.
pub fn calculate_priority(amount: Money, currency: &str, age_days: i64, is_adjustment: bool) -> Priority {
    if is_adjustment {
        return Priority::High;
    }
    let usd_amount = money::to_usd(amount, currency);
    if usd_amount > 1000.0 || age_days > 7 {
        Priority::High
    } else if usd_amount > 100.0 || age_days > 3 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Top-3 suggestions for an unmatched transaction among unmatched
/// settlements, confidence > 30, ties broken by ascending settlement id.
pub fn suggest_settlements_for_transaction(
    t: &Transaction,
    unmatched_settlements: &[Settlement],
    config: &ReconConfig,
) -> Vec<Suggestion> {
    let mut candidates: Vec<(String, u8, Vec<ReasonTag>)> = unmatched_settlements
        .iter()
        .map(|s| {
            let (confidence, reasons) = scoring::score_suggestion(t, s, config);
            (s.id.clone(), confidence, reasons)
        })
        .filter(|(_, confidence, _)| *confidence > 30)
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    candidates
        .into_iter()
        .take(3)
        .map(|(id, confidence, reasons)| Suggestion {
            record_type: SuggestionRecordType::Settlement,
            record_id: id,
            confidence,
            reasons,
        })
        .collect()
}

/// Top-3 suggestions for an unmatched settlement among unmatched (captured)
/// transactions, same scorer and tie-break rule.
pub fn suggest_transactions_for_settlement(
    s: &Settlement,
    unmatched_transactions: &[Transaction],
    config: &ReconConfig,
) -> Vec<Suggestion> {
    let mut candidates: Vec<(String, u8, Vec<ReasonTag>)> = unmatched_transactions
        .iter()
        .map(|t| {
            let (confidence, reasons) = scoring::score_suggestion(t, s, config);
            (t.transaction_id.clone(), confidence, reasons)
        })
        .filter(|(_, confidence, _)| *confidence > 30)
        .collect();

    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    candidates
        .into_iter()
        .take(3)
        .map(|(id, confidence, reasons)| Suggestion {
            record_type: SuggestionRecordType::Transaction,
            record_id: id,
            confidence,
            reasons,
        })
        .collect()
}

/// Builds the full discrepancy inventory: one entry per unmatched
/// transaction, unmatched settlement, unmatched adjustment, and
/// amount-mismatched match.
#[allow(clippy::too_many_arguments)]
pub fn build_discrepancies(
    unmatched_transactions: &[Transaction],
    unmatched_settlements: &[Settlement],
    unmatched_adjustments: &[Adjustment],
    amount_mismatches: &[MatchResult],
    all_transactions: &[Transaction],
    config: &ReconConfig,
    today: NaiveDate,
) -> Vec<Discrepancy> {
    let mut out = Vec::new();

    for t in unmatched_transactions {
        let age_days = time::days_between(&t.timestamp, &today);
        let priority = calculate_priority(t.amount, &t.currency, age_days, false);
        out.push(Discrepancy {
            category: DiscrepancyCategory::UnmatchedTransaction,
            transaction_id: Some(t.transaction_id.clone()),
            settlement_id: None,
            adjustment_id: None,
            match_id: None,
            amount: t.amount,
            currency: t.currency.clone(),
            age_days,
            priority,
            suggested_matches: suggest_settlements_for_transaction(t, unmatched_settlements, config),
        });
    }

    for s in unmatched_settlements {
        let age_days = time::days_between(&s.settlement_date, &today);
        let priority = calculate_priority(s.amount, &s.currency, age_days, false);
        out.push(Discrepancy {
            category: DiscrepancyCategory::UnmatchedSettlement,
            transaction_id: None,
            settlement_id: Some(s.id.clone()),
            adjustment_id: None,
            match_id: None,
            amount: s.amount,
            currency: s.currency.clone(),
            age_days,
            priority,
            suggested_matches: suggest_transactions_for_settlement(s, unmatched_transactions, config),
        });
    }

    for a in unmatched_adjustments {
        let age_days = time::days_between(&a.date, &today);
        out.push(Discrepancy {
            category: DiscrepancyCategory::UnmatchedAdjustment,
            transaction_id: None,
            settlement_id: None,
            adjustment_id: Some(a.id.clone()),
            match_id: None,
            amount: a.amount,
            currency: a.currency.clone(),
            age_days,
            priority: calculate_priority(a.amount, &a.currency, age_days, true),
            suggested_matches: Vec::new(),
        });
    }

    for m in amount_mismatches {
        let currency = all_transactions
            .iter()
            .find(|t| t.transaction_id == m.transaction_id)
            .map(|t| t.currency.clone())
            .unwrap_or_default();
        out.push(Discrepancy {
            category: DiscrepancyCategory::AmountMismatch,
            transaction_id: Some(m.transaction_id.clone()),
            settlement_id: m.settlement_id.clone(),
            adjustment_id: None,
            match_id: Some(m.id.clone()),
            amount: m.amount_difference,
            currency,
            age_days: m.date_difference_days,
            priority: Priority::Medium,
            suggested_matches: Vec::new(),
        });
    }

    out
}

/// Aggregate counters across unmatched records and the current match table.
pub fn calculate_summary(
    unmatched_transactions: &[Transaction],
    unmatched_settlements: &[Settlement],
    unmatched_adjustments: &[Adjustment],
    all_transactions: &[Transaction],
    all_adjustments: &[Adjustment],
    all_matches: &[MatchResult],
    config: &ReconConfig,
    today: NaiveDate,
) -> DiscrepancySummary {
    let mut unmatched_by_currency: BTreeMap<String, Money> = BTreeMap::new();
    let mut total_usd = 0.0;

    for t in unmatched_transactions {
        let entry = unmatched_by_currency.entry(t.currency.clone()).or_insert(Money::ZERO);
        *entry = *entry + t.amount;
        total_usd += money::to_usd(t.amount, &t.currency);
    }
    for s in unmatched_settlements {
        let entry = unmatched_by_currency.entry(s.currency.clone()).or_insert(Money::ZERO);
        *entry = *entry + s.amount;
        total_usd += money::to_usd(s.amount, &s.currency);
    }

    let settlement_match_hours: Vec<f64> = all_matches
        .iter()
        .filter(|m| m.match_type == MatchType::TransactionSettlement && m.status == MatchStatus::Matched)
        .map(|m| (m.date_difference_days * 24) as f64)
        .collect();
    let avg_settlement_time_hours = if settlement_match_hours.is_empty() {
        None
    } else {
        Some(round4(settlement_match_hours.iter().sum::<f64>() / settlement_match_hours.len() as f64))
    };

    let chargeback_rate = if all_transactions.is_empty() {
        0.0
    } else {
        let chargebacks = all_adjustments.iter().filter(|a| a.kind == AdjustmentType::Chargeback).count();
        round4(chargebacks as f64 / all_transactions.len() as f64)
    };

    let orphaned_records_over_7_days = unmatched_transactions
        .iter()
        .filter(|t| time::days_between(&t.timestamp, &today) > config.orphan_threshold_days)
        .count() as i64
        + unmatched_settlements
            .iter()
            .filter(|s| time::days_between(&s.settlement_date, &today) > config.orphan_threshold_days)
            .count() as i64
        + unmatched_adjustments
            .iter()
            .filter(|a| time::days_between(&a.date, &today) > config.orphan_threshold_days)
            .count() as i64;

    DiscrepancySummary {
        total_unmatched_value_usd: round4(total_usd),
        unmatched_by_currency: unmatched_by_currency
            .into_iter()
            .map(|(currency, amount)| (currency, amount.cents() as f64 / 100.0))
            .collect(),
        avg_settlement_time_hours,
        chargeback_rate,
        orphaned_records_over_7_days,
    }
}

pub fn calculate_run_status(
    last_match_created_at: Option<DateTime<Utc>>,
    total_records: i64,
    match_count: i64,
) -> RunStatus {
    let match_rate = round4(match_count as f64 / (total_records.max(1)) as f64);
    RunStatus {
        last_run: last_match_created_at,
        total_records,
        match_rate,
    }
}
