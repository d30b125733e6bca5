//! Five-phase matching pipeline. Each phase owns the unmatched records
//! left by the phases before it; nothing is ever matched twice within a
//! single run.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::ReconConfig;
use crate::model::{Adjustment, MatchResult, ReasonTag, Settlement, Transaction, TransactionStatus};
use crate::scoring::{self, ScoreOutcome};

type SettlementScorer = fn(&Transaction, &Settlement, &ReconConfig) -> Option<ScoreOutcome>;

/// Everything a run of the pipeline produces: the emitted matches, plus
/// the phase-2 variance count (`amount_variance_detected` reasons emitted
/// while scoring the amount+date phase), mirroring the original's
/// `phase2_mismatches` that alone feeds the run-level `amount_mismatches`
/// counter.
#[derive(Debug, Clone, Default)]
pub struct MatchingOutcome {
    pub matches: Vec<MatchResult>,
    pub phase2_amount_mismatches: usize,
}

/// Runs the full pipeline once: phases 1-4 against settlements, phase 5
/// against adjustments. Returns every `MatchResult` produced, in the
/// order the phases found them.
pub fn run_matching(
    transactions: &[Transaction],
    settlements: &[Settlement],
    adjustments: &[Adjustment],
    config: &ReconConfig,
    now: DateTime<Utc>,
) -> MatchingOutcome {
    let mut results = Vec::new();
    let mut matched_txn_ids: HashSet<String> = HashSet::new();
    let mut matched_settlement_ids: HashSet<String> = HashSet::new();

    let eligible_txns: BTreeMap<String, &Transaction> = transactions
        .iter()
        .filter(|t| t.status == TransactionStatus::Captured)
        .map(|t| (t.transaction_id.clone(), t))
        .collect();

    let settlement_index: BTreeMap<String, &Settlement> =
        settlements.iter().map(|s| (s.id.clone(), s)).collect();

    run_settlement_phase(
        "phase1_exact_reference",
        &eligible_txns,
        &settlement_index,
        &mut matched_txn_ids,
        &mut matched_settlement_ids,
        &mut results,
        config,
        now,
        |t, s, _cfg| scoring::phase1_exact_reference(t, s),
    );

    // Phase 2 is split out from the phase3/4 loop below because only its
    // variance count feeds `amount_mismatches` (spec.md §4.4.2).
    let before_phase2 = results.len();
    run_settlement_phase(
        "phase2_amount_date",
        &eligible_txns,
        &settlement_index,
        &mut matched_txn_ids,
        &mut matched_settlement_ids,
        &mut results,
        config,
        now,
        scoring::phase2_amount_date,
    );
    let phase2_amount_mismatches = results[before_phase2..]
        .iter()
        .filter(|m| m.match_reasons.contains(&ReasonTag::AmountVarianceDetected))
        .count();

    let remaining_phases: [(&str, SettlementScorer); 2] = [
        ("phase3_fuzzy_reference", scoring::phase3_fuzzy_reference),
        ("phase4_cross_currency", scoring::phase4_cross_currency),
    ];
    for (label, scorer) in remaining_phases {
        run_settlement_phase(
            label,
            &eligible_txns,
            &settlement_index,
            &mut matched_txn_ids,
            &mut matched_settlement_ids,
            &mut results,
            config,
            now,
            scorer,
        );
    }

    let all_txns: BTreeMap<String, &Transaction> =
        transactions.iter().map(|t| (t.transaction_id.clone(), t)).collect();
    run_adjustment_phase(&all_txns, adjustments, config, now, &mut results);

    MatchingOutcome { matches: results, phase2_amount_mismatches }
}

/// Iterates settlements in ascending id order — the deterministic order
/// named in spec.md §4.5 — and for each unmatched settlement picks the
/// best unmatched transaction under `scorer`. A settlement claims at
/// most one transaction per phase; a transaction claimed in this phase
/// becomes invisible to every later phase.
#[allow(clippy::too_many_arguments)]
fn run_settlement_phase<F>(
    label: &str,
    txns: &BTreeMap<String, &Transaction>,
    settlements: &BTreeMap<String, &Settlement>,
    matched_txn_ids: &mut HashSet<String>,
    matched_settlement_ids: &mut HashSet<String>,
    results: &mut Vec<MatchResult>,
    config: &ReconConfig,
    now: DateTime<Utc>,
    scorer: F,
) where
    F: Fn(&Transaction, &Settlement, &ReconConfig) -> Option<ScoreOutcome>,
{
    for (settlement_id, s) in settlements.iter() {
        let s: &Settlement = *s;
        if matched_settlement_ids.contains(settlement_id) {
            continue;
        }

        let mut best: Option<(&String, &Transaction, ScoreOutcome)> = None;
        for (txn_id, t) in txns.iter() {
            let t: &Transaction = *t;
            if matched_txn_ids.contains(txn_id) {
                continue;
            }
            if let Some(outcome) = scorer(t, s, config) {
                let replace = match &best {
                    None => true,
                    Some((_, _, current)) => outcome.confidence > current.confidence,
                };
                if replace {
                    best = Some((txn_id, t, outcome));
                }
            }
        }

        if let Some((txn_id, t, outcome)) = best {
            tracing::debug!(
                phase = label,
                transaction_id = %t.transaction_id,
                settlement_id = %s.id,
                confidence = outcome.confidence,
                "settlement matched"
            );
            let id = uuid::Uuid::new_v4().to_string();
            results.push(scoring::build_settlement_match(id, t, s, &outcome, config, now));
            matched_txn_ids.insert(txn_id.clone());
            matched_settlement_ids.insert(settlement_id.clone());
        }
    }
}

fn run_adjustment_phase(
    all_txns: &BTreeMap<String, &Transaction>,
    adjustments: &[Adjustment],
    config: &ReconConfig,
    now: DateTime<Utc>,
    results: &mut Vec<MatchResult>,
) {
    let mut sorted_adjustments: Vec<&Adjustment> = adjustments.iter().collect();
    sorted_adjustments.sort_by(|a, b| a.id.cmp(&b.id));

    for a in sorted_adjustments {
        let mut best: Option<(&Transaction, ScoreOutcome)> = None;
        for t in all_txns.values() {
            let t: &Transaction = *t;
            if let Some(outcome) = scoring::phase5_adjustment(a, t, config) {
                let replace = match &best {
                    None => true,
                    Some((_, current)) => outcome.confidence > current.confidence,
                };
                if replace {
                    best = Some((t, outcome));
                }
            }
        }

        if let Some((t, outcome)) = best {
            tracing::debug!(
                phase = "phase5_adjustment",
                transaction_id = %t.transaction_id,
                adjustment_id = %a.id,
                confidence = outcome.confidence,
                "adjustment matched"
            );
            let id = uuid::Uuid::new_v4().to_string();
            results.push(scoring::build_adjustment_match(id, t, a, &outcome, config, now));
        }
    }
}
