//! End-to-end scenarios (spec §8 S1-S6) and the quantified invariants,
//! driven through `run_matching` and the reporting module together
//! rather than any single phase function in isolation.

use chrono::{DateTime, NaiveDate, Utc};

use reconcile_core::matching::run_matching;
use reconcile_core::model::{
    Adjustment, AdjustmentType, MatchStatus, ReasonTag, Settlement, Transaction, TransactionStatus,
};
use reconcile_core::money::Money;
use reconcile_core::reporting;
use reconcile_core::ReconConfig;

fn txn(id: &str, merchant_order_id: &str, amount: &str, ts: &str, currency: &str) -> Transaction {
    Transaction {
        id: format!("internal_{id}"),
        transaction_id: id.into(),
        merchant_order_id: merchant_order_id.into(),
        amount: Money::from_str_decimal(amount).unwrap(),
        currency: currency.into(),
        timestamp: DateTime::parse_from_rfc3339(ts).unwrap(),
        status: TransactionStatus::Captured,
        customer_id: "cust_1".into(),
        country: "MX".into(),
        created_at: Utc::now(),
    }
}

fn stl(id: &str, reference: Option<&str>, amount: &str, date: &str, currency: &str) -> Settlement {
    Settlement {
        id: id.into(),
        settlement_reference: format!("ref_{id}"),
        amount: Money::from_str_decimal(amount).unwrap(),
        gross_amount: None,
        currency: currency.into(),
        settlement_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        transaction_reference: reference.map(String::from),
        fees_deducted: Money::ZERO,
        bank_name: "Bank".into(),
        created_at: Utc::now(),
    }
}

fn adj(
    id: &str,
    reference: Option<&str>,
    amount: &str,
    date: &str,
    currency: &str,
    kind: AdjustmentType,
) -> Adjustment {
    Adjustment {
        id: id.into(),
        adjustment_id: format!("adj_{id}"),
        transaction_reference: reference.map(String::from),
        amount: Money::from_str_decimal(amount).unwrap(),
        currency: currency.into(),
        kind,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        reason_code: None,
        created_at: Utc::now(),
    }
}

#[test]
fn s1_exact_id_exact_amount_same_day() {
    let t = txn("txn_001", "order_1", "1000.00", "2024-01-15T10:00:00Z", "MXN");
    let s = stl("stl_A", Some("txn_001"), "1000.00", "2024-01-15", "MXN");
    let config = ReconConfig::default();

    let results = run_matching(&[t], &[s], &[], &config, Utc::now()).matches;

    assert_eq!(results.len(), 1);
    let m = &results[0];
    assert_eq!(m.confidence_score, 100);
    assert_eq!(m.status, MatchStatus::Matched);
    assert_eq!(m.amount_difference, Money::ZERO);
    assert_eq!(m.date_difference_days, 0);
    assert!(m.match_reasons.contains(&ReasonTag::ExactTransactionIdMatch));
}

// Spec erratum: the written example states confidence 88, but the
// date-bonus table (and the original implementation) give +1 at a 2-day
// difference, not +3 — 86 is the value the table actually produces.
#[test]
fn s2_amount_variance_within_date_window() {
    let t = txn("txn_002", "order_2", "1000.00", "2024-01-15T10:00:00Z", "MXN");
    let s = stl("stl_B", None, "970.00", "2024-01-17", "MXN");
    let config = ReconConfig::default();

    let results = run_matching(&[t], &[s], &[], &config, Utc::now()).matches;

    assert_eq!(results.len(), 1);
    let m = &results[0];
    assert_eq!(m.confidence_score, 86);
    assert_eq!(m.status, MatchStatus::Matched);
    assert_eq!(m.amount_difference, Money::from_str_decimal("30.00").unwrap());
    assert_eq!(m.date_difference_days, 2);
}

#[test]
fn s3_merchant_order_id_fuzzy_match() {
    let t = txn("txn_003", "order_X", "500.00", "2024-01-10T09:00:00Z", "MXN");
    let s = stl("stl_C", Some("order_X"), "500.00", "2024-01-11", "MXN");
    let config = ReconConfig::default();

    let results = run_matching(&[t], &[s], &[], &config, Utc::now()).matches;

    assert_eq!(results.len(), 1);
    let m = &results[0];
    assert_eq!(m.confidence_score, 90);
    assert!(m.match_reasons.contains(&ReasonTag::MerchantOrderIdMatch));
}

#[test]
fn s4_cross_currency_always_pending_review() {
    let t = txn("txn_004", "order_4", "17500.00", "2024-01-15T10:00:00Z", "MXN");
    let s = stl("stl_D", Some("txn_004"), "1000.00", "2024-01-16", "USD");
    let config = ReconConfig::default();

    let results = run_matching(&[t], &[s], &[], &config, Utc::now()).matches;

    assert_eq!(results.len(), 1);
    let m = &results[0];
    assert_eq!(m.confidence_score, 95);
    assert_eq!(m.status, MatchStatus::PendingReview);
    assert!(m.match_reasons.contains(&ReasonTag::CrossCurrencyMatch));
    assert!(m.match_reasons.contains(&ReasonTag::NeedsReview));
}

#[test]
fn s5_refund_outside_window_surfaces_as_unmatched_adjustment() {
    let t = txn("txn_005", "order_5", "200.00", "2024-01-01T10:00:00Z", "MXN");
    let a = adj("adj_005", Some("txn_005"), "200.00", "2024-02-15", "MXN", AdjustmentType::Refund);
    let config = ReconConfig::default();

    let results = run_matching(&[t.clone()], &[], &[a.clone()], &config, Utc::now()).matches;
    assert!(results.is_empty());

    let today = NaiveDate::from_ymd_opt(2024, 2, 16).unwrap();
    let discrepancies =
        reporting::build_discrepancies(&[], &[], std::slice::from_ref(&a), &[], &[t], &config, today);
    assert_eq!(discrepancies.len(), 1);
    assert_eq!(discrepancies[0].priority, reporting::Priority::High);
}

#[test]
fn s6_orphan_settlement_gets_suggestions_once_outside_tolerance() {
    let t = txn("txn_006", "order_6", "330.00", "2024-01-15T10:00:00Z", "MXN");
    let s_in_tolerance = stl("stl_E", None, "330.00", "2024-01-16", "MXN");
    let config = ReconConfig::default();

    // Within Phase 2 tolerance: a match IS produced even with no reference.
    let results = run_matching(&[t.clone()], &[s_in_tolerance], &[], &config, Utc::now()).matches;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, MatchStatus::Matched);

    // Replace the settlement amount so it falls outside tolerance: now unmatched,
    // and the suggestion scorer still surfaces the transaction as a candidate.
    let s_out_of_tolerance = stl("stl_E", None, "500.00", "2024-01-16", "MXN");
    let results = run_matching(&[t.clone()], &[s_out_of_tolerance.clone()], &[], &config, Utc::now()).matches;
    assert!(results.is_empty());

    let suggestions =
        reporting::suggest_transactions_for_settlement(&s_out_of_tolerance, &[t], &config);
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].record_id, "txn_006");
    assert!(suggestions[0].confidence >= 30);
}

// Property 1: each settlement id and adjustment id appears in at most one MatchResult.
#[test]
fn uniqueness_of_settlement_and_adjustment_ids() {
    let t1 = txn("txn_100", "order_100", "100.00", "2024-01-10T10:00:00Z", "MXN");
    let t2 = txn("txn_101", "order_101", "100.00", "2024-01-10T10:00:00Z", "MXN");
    let s = stl("stl_100", Some("txn_100"), "100.00", "2024-01-10", "MXN");
    let s_dup_candidate = stl("stl_101", Some("txn_100"), "100.00", "2024-01-10", "MXN");
    let config = ReconConfig::default();

    let results = run_matching(&[t1, t2], &[s, s_dup_candidate], &[], &config, Utc::now()).matches;

    let mut settlement_ids: Vec<&String> = results.iter().filter_map(|m| m.settlement_id.as_ref()).collect();
    settlement_ids.sort();
    settlement_ids.dedup();
    assert_eq!(
        settlement_ids.len(),
        results.iter().filter(|m| m.settlement_id.is_some()).count()
    );
}

// Property 2: status == matched iff confidence >= MIN_CONFIDENCE_FOR_AUTO_MATCH,
// except phase-4 outputs which are always pending_review.
#[test]
fn status_coupling_holds_across_a_mixed_run() {
    let exact = txn("txn_200", "order_200", "100.00", "2024-01-10T10:00:00Z", "MXN");
    let s_exact = stl("stl_200", Some("txn_200"), "100.00", "2024-01-10", "MXN");
    let weak = txn("txn_201", "order_201", "100.00", "2024-01-10T10:00:00Z", "MXN");
    let s_weak = stl("stl_201", None, "80.00", "2024-01-16", "MXN");
    let cross = txn("txn_202", "order_202", "17500.00", "2024-01-15T10:00:00Z", "MXN");
    let s_cross = stl("stl_202", Some("txn_202"), "1000.00", "2024-01-16", "USD");
    let config = ReconConfig::default();

    let results = run_matching(&[exact, weak, cross], &[s_exact, s_weak, s_cross], &[], &config, Utc::now()).matches;

    for m in &results {
        if m.match_reasons.contains(&ReasonTag::NeedsReview) {
            assert_eq!(m.status, MatchStatus::PendingReview);
        } else if m.confidence_score >= config.min_confidence_for_auto_match {
            assert_eq!(m.status, MatchStatus::Matched);
        } else {
            assert_eq!(m.status, MatchStatus::PendingReview);
        }
    }
}

// Property 3: range bounds hold for every emitted MatchResult.
#[test]
fn ranges_are_always_within_declared_bounds() {
    let t = txn("txn_300", "order_300", "1000.00", "2024-01-15T10:00:00Z", "MXN");
    let s = stl("stl_300", None, "970.00", "2024-01-17", "MXN");
    let config = ReconConfig::default();

    let results = run_matching(&[t], &[s], &[], &config, Utc::now()).matches;
    for m in &results {
        assert!(m.confidence_score <= 100);
        assert!(m.amount_difference.cents() >= 0);
        assert!(m.date_difference_days >= 0);
    }
}

// Property 4: a Phase-1 (t, s) pair blocks every later phase from re-matching either.
#[test]
fn phase_dominance_exact_match_excludes_later_phases() {
    let t = txn("txn_400", "order_400", "1000.00", "2024-01-15T10:00:00Z", "MXN");
    let s_exact = stl("stl_400", Some("txn_400"), "1000.00", "2024-01-15", "MXN");
    let s_also_fuzzy = stl("stl_401", Some("order_400"), "1000.00", "2024-01-15", "MXN");
    let config = ReconConfig::default();

    let results = run_matching(&[t], &[s_exact, s_also_fuzzy], &[], &config, Utc::now()).matches;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].settlement_id.as_deref(), Some("stl_400"));
}

// Property 5 & 7: determinism and idempotence across repeated runs.
#[test]
fn determinism_across_repeated_runs() {
    let t = txn("txn_500", "order_500", "1000.00", "2024-01-15T10:00:00Z", "MXN");
    let s = stl("stl_500", Some("txn_500"), "1000.00", "2024-01-15", "MXN");
    let config = ReconConfig::default();
    let now = Utc::now();

    let first = run_matching(&[t.clone()], &[s.clone()], &[], &config, now).matches;
    let second = run_matching(&[t], &[s], &[], &config, now).matches;

    assert_eq!(first.len(), second.len());
    assert_eq!(first[0].transaction_id, second[0].transaction_id);
    assert_eq!(first[0].settlement_id, second[0].settlement_id);
    assert_eq!(first[0].confidence_score, second[0].confidence_score);
}

// Property 6: currency pivot round-trip within rounding precision.
#[test]
fn fx_pivot_round_trip_within_a_cent() {
    let amount = Money::from_str_decimal("17500.00").unwrap();
    let usd = reconcile_core::money::convert(amount, "MXN", "USD");
    let back = reconcile_core::money::convert(usd, "USD", "MXN");
    assert!((back.cents() - amount.cents()).abs() <= 1);
}
