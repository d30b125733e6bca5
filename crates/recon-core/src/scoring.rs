//! Pure functions mapping a (record, candidate) pair to a confidence
//! score and an ordered list of reason tags. Scoring never raises: a
//! rejected candidate is simply `None`.

use crate::config::ReconConfig;
use crate::model::{Adjustment, AdjustmentType, MatchResult, ReasonTag, Settlement, Transaction};
use crate::money::{self, Money};
use crate::time;

/// Result of scoring one (record, candidate) pair. `force_pending_review`
/// is set by phase 4: cross-currency matches always require human review,
/// regardless of confidence.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub confidence: u8,
    pub reasons: Vec<ReasonTag>,
    pub amount_difference: Money,
    pub date_difference_days: i64,
    pub force_pending_review: bool,
}

fn clamp_confidence(raw: i32) -> u8 {
    raw.clamp(0, 100) as u8
}

/// Phase 1 — exact reference match. Confidence is always 100.
pub fn phase1_exact_reference(t: &Transaction, s: &Settlement) -> Option<ScoreOutcome> {
    let reference = s.transaction_reference.as_deref()?;
    if reference != t.transaction_id || s.currency != t.currency {
        return None;
    }

    Some(ScoreOutcome {
        confidence: 100,
        reasons: vec![ReasonTag::ExactTransactionIdMatch, ReasonTag::CurrencyMatch],
        amount_difference: s.amount.diff(t.amount),
        date_difference_days: time::days_between(&s.settlement_date, &t.timestamp),
        force_pending_review: false,
    })
}

/// Phase 2 — amount + date window. Emits only when the result reaches
/// `config.min_confidence_for_auto_match`.
pub fn phase2_amount_date(t: &Transaction, s: &Settlement, config: &ReconConfig) -> Option<ScoreOutcome> {
    if s.currency != t.currency {
        return None;
    }
    if !s.amount.within_tolerance(t.amount, t.amount, config.amount_tolerance_percent) {
        return None;
    }
    let hours = time::hours_between_date_and_instant(s.settlement_date, &t.timestamp);
    if hours > config.settlement_window_hours as f64 {
        return None;
    }

    let diff = s.amount.diff(t.amount);
    let diff_percent = s.amount.diff_percent(t.amount, t.amount);

    let mut confidence: i32 = 80;
    if diff.is_zero() {
        confidence += 15;
    } else if diff_percent <= 1.0 {
        confidence += 10;
    } else if diff_percent <= 5.0 {
        confidence += 5;
    }

    let day_diff = time::days_between(&s.settlement_date, &t.timestamp);
    if day_diff == 0 {
        confidence += 5;
    } else if day_diff <= 1 {
        confidence += 3;
    } else if day_diff <= 2 {
        confidence += 1;
    }

    let confidence = clamp_confidence(confidence);
    if confidence < config.min_confidence_for_auto_match {
        return None;
    }

    let mut reasons = vec![ReasonTag::AmountWithinTolerance, ReasonTag::DateWithinWindow];
    if !diff.is_zero() {
        reasons.push(ReasonTag::AmountVarianceDetected);
    }

    Some(ScoreOutcome {
        confidence,
        reasons,
        amount_difference: diff,
        date_difference_days: day_diff,
        force_pending_review: false,
    })
}

/// Phase 3 — fuzzy reference: partial transaction id, or merchant order id.
pub fn phase3_fuzzy_reference(t: &Transaction, s: &Settlement, config: &ReconConfig) -> Option<ScoreOutcome> {
    let reference = s.transaction_reference.as_deref()?;
    if s.currency != t.currency {
        return None;
    }

    let mut confidence: i32 = 0;
    let mut reasons = Vec::new();

    if let (Some(reference_prefix), Some(txn_id_prefix)) = (reference.get(..8), t.transaction_id.get(..8)) {
        if t.transaction_id.contains(reference_prefix) || reference.contains(txn_id_prefix) {
            confidence = 70;
            reasons.push(ReasonTag::PartialIdMatch);
        }
    }

    if reference == t.merchant_order_id {
        confidence = confidence.max(75);
        reasons.push(ReasonTag::MerchantOrderIdMatch);
    }

    if confidence == 0 {
        return None;
    }

    if !s.amount.within_tolerance(t.amount, t.amount, config.amount_tolerance_percent) {
        return None;
    }

    let diff = s.amount.diff(t.amount);
    let diff_percent = s.amount.diff_percent(t.amount, t.amount);
    if diff.is_zero() {
        confidence += 15;
    } else if diff_percent <= 2.0 {
        confidence += 10;
    }
    reasons.push(ReasonTag::AmountWithinTolerance);

    Some(ScoreOutcome {
        confidence: clamp_confidence(confidence),
        reasons,
        amount_difference: diff,
        date_difference_days: time::days_between(&s.settlement_date, &t.timestamp),
        force_pending_review: false,
    })
}

/// Phase 4 — cross-currency. Always `pending_review`, even at confidence 100.
pub fn phase4_cross_currency(t: &Transaction, s: &Settlement, config: &ReconConfig) -> Option<ScoreOutcome> {
    if s.currency == t.currency {
        return None;
    }

    let converted = money::convert(s.amount, &s.currency, &t.currency);
    if !converted.within_tolerance(t.amount, t.amount, config.currency_fx_tolerance_percent) {
        return None;
    }
    let hours = time::hours_between_date_and_instant(s.settlement_date, &t.timestamp);
    if hours > config.settlement_window_hours as f64 {
        return None;
    }

    let diff_percent = converted.diff_percent(t.amount, t.amount);
    let mut confidence: i32 = 60;
    if diff_percent <= 5.0 {
        confidence += 15;
    } else if diff_percent <= 8.0 {
        confidence += 10;
    }
    if s.transaction_reference.as_deref() == Some(t.transaction_id.as_str()) {
        confidence += 20;
    }

    let confidence = clamp_confidence(confidence);
    if confidence < 60 {
        return None;
    }

    Some(ScoreOutcome {
        confidence,
        reasons: vec![
            ReasonTag::CrossCurrencyMatch,
            ReasonTag::AmountWithinFxTolerance,
            ReasonTag::NeedsReview,
        ],
        amount_difference: converted.diff(t.amount),
        date_difference_days: time::days_between(&s.settlement_date, &t.timestamp),
        force_pending_review: true,
    })
}

/// Phase 5 — adjustment matching. Scans all transactions (any status).
pub fn phase5_adjustment(a: &Adjustment, t: &Transaction, config: &ReconConfig) -> Option<ScoreOutcome> {
    let reference = a.transaction_reference.as_deref()?;

    let mut confidence: i32;
    let mut reasons = Vec::new();

    if reference == t.transaction_id {
        confidence = 100;
        reasons.push(ReasonTag::ExactTransactionIdMatch);
    } else if reference == t.merchant_order_id {
        confidence = 90;
        reasons.push(ReasonTag::MerchantOrderIdMatch);
    } else {
        return None;
    }

    if a.currency != t.currency {
        confidence -= 20;
        reasons.push(ReasonTag::CurrencyMismatch);
    }
    if a.amount > t.amount {
        confidence -= 10;
        reasons.push(ReasonTag::AdjustmentExceedsTransaction);
    }

    let window_days = match a.kind {
        AdjustmentType::Chargeback => config.chargeback_window_days,
        AdjustmentType::Refund => config.refund_window_days,
    };
    let day_diff = time::days_between(&a.date, &t.timestamp);
    if day_diff > window_days {
        return None;
    }
    reasons.push(ReasonTag::DateWithinWindow);

    Some(ScoreOutcome {
        confidence: clamp_confidence(confidence),
        reasons,
        amount_difference: a.amount.diff(t.amount),
        date_difference_days: day_diff,
        force_pending_review: false,
    })
}

/// Relaxed scorer used by the suggestion generator: credits
/// `date_within_7d` as well as the 72h window, and is not gated by any
/// minimum-confidence threshold — callers filter by their own cutoff.
pub fn score_suggestion(t: &Transaction, s: &Settlement, config: &ReconConfig) -> (u8, Vec<ReasonTag>) {
    let mut confidence: i32 = 0;
    let mut reasons = Vec::new();

    if s.currency == t.currency {
        confidence += 20;
        reasons.push(ReasonTag::CurrencyMatch);
    }

    if t.amount.cents() > 0 {
        let diff_percent = s.amount.diff_percent(t.amount, t.amount);
        if diff_percent == 0.0 {
            confidence += 40;
            reasons.push(ReasonTag::ExactAmountMatch);
        } else if diff_percent <= config.amount_tolerance_percent {
            confidence += 25;
            reasons.push(ReasonTag::AmountWithinTolerance);
        }
    }

    let day_diff = time::days_between(&s.settlement_date, &t.timestamp);
    if day_diff <= 3 {
        confidence += 20;
        reasons.push(ReasonTag::DateWithin72h);
    } else if day_diff <= 7 {
        confidence += 10;
        reasons.push(ReasonTag::DateWithin7d);
    }

    if s.transaction_reference.as_deref() == Some(t.transaction_id.as_str()) {
        confidence += 20;
        reasons.push(ReasonTag::IdMatch);
    }

    (confidence.clamp(0, 100) as u8, reasons)
}

/// Builds the stored MatchResult for a scored settlement candidate.
pub fn build_settlement_match(
    id: String,
    t: &Transaction,
    s: &Settlement,
    outcome: &ScoreOutcome,
    config: &ReconConfig,
    created_at: chrono::DateTime<chrono::Utc>,
) -> MatchResult {
    let status = if outcome.force_pending_review {
        crate::model::MatchStatus::PendingReview
    } else {
        crate::model::MatchStatus::from_confidence(outcome.confidence, config.min_confidence_for_auto_match)
    };
    MatchResult {
        id,
        transaction_id: t.transaction_id.clone(),
        settlement_id: Some(s.id.clone()),
        adjustment_id: None,
        match_type: crate::model::MatchType::TransactionSettlement,
        confidence_score: outcome.confidence,
        match_reasons: outcome.reasons.clone(),
        amount_difference: outcome.amount_difference,
        date_difference_days: outcome.date_difference_days,
        status,
        created_at,
    }
}

/// Builds the stored MatchResult for a scored adjustment candidate.
pub fn build_adjustment_match(
    id: String,
    t: &Transaction,
    a: &Adjustment,
    outcome: &ScoreOutcome,
    config: &ReconConfig,
    created_at: chrono::DateTime<chrono::Utc>,
) -> MatchResult {
    MatchResult {
        id,
        transaction_id: t.transaction_id.clone(),
        settlement_id: None,
        adjustment_id: Some(a.id.clone()),
        match_type: crate::model::MatchType::TransactionAdjustment,
        confidence_score: outcome.confidence,
        match_reasons: outcome.reasons.clone(),
        amount_difference: outcome.amount_difference,
        date_difference_days: outcome.date_difference_days,
        status: crate::model::MatchStatus::from_confidence(
            outcome.confidence,
            config.min_confidence_for_auto_match,
        ),
        created_at,
    }
}
