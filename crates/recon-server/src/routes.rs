//! HTTP handlers for the reconciliation surface. Each one is a thin
//! translation layer: parse query parameters, call into
//! `reconcile_core`, serialize the result. No matching or scoring logic
//! lives here.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use reconcile_core::port::RecordFilters;
use reconcile_core::reporting::{self, Discrepancy, DiscrepancySummary, Priority, RunStatus};
use reconcile_core::{orchestrator, MatchResult, MatchStatus, MatchType, Money};

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/reconcile", post(reconcile))
        .route("/reconcile/status", get(reconcile_status))
        .route("/discrepancies", get(list_discrepancies))
        .route("/discrepancies/summary", get(discrepancies_summary))
        .route("/matches", get(list_matches))
        .route("/matches/:transaction_id", get(match_by_transaction))
        .with_state(state)
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ReconcileRequest {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

async fn reconcile(
    State(state): State<AppState>,
    body: bytes::Bytes,
) -> Result<Json<orchestrator::RunReport>, ApiError> {
    let req: ReconcileRequest = if body.is_empty() {
        ReconcileRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::SchemaViolation(e.to_string()))?
    };
    let report = orchestrator::run_reconciliation(
        state.store.as_ref(),
        &state.config,
        req.date_from,
        req.date_to,
        Utc::now(),
    )
    .await?;
    Ok(Json(report))
}

async fn reconcile_status(State(state): State<AppState>) -> Result<Json<RunStatus>, ApiError> {
    let transactions = state.store.load_transactions(None, None, None).await?;
    let settlements = state.store.load_settlements(None, None).await?;
    let adjustments = state.store.load_adjustments(None, None).await?;
    let matches = state.store.all_matches().await?;

    let total_records = (transactions.len() + settlements.len() + adjustments.len()) as i64;
    let last_run = matches.iter().map(|m| m.created_at).max();
    let status = reporting::calculate_run_status(last_run, total_records, matches.len() as i64);
    Ok(Json(status))
}

fn parse_query<T: FromStr>(name: &str, raw: &Option<String>) -> Result<Option<T>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|_| ApiError::BadQuery(format!("invalid {name}: {s}"))),
    }
}

fn parse_priority(raw: &Option<String>) -> Result<Option<Priority>, ApiError> {
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("low") => Ok(Some(Priority::Low)),
        Some("medium") => Ok(Some(Priority::Medium)),
        Some("high") => Ok(Some(Priority::High)),
        Some(other) => Err(ApiError::BadQuery(format!("invalid priority: {other}"))),
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct DiscrepancyQuery {
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub currency: Option<String>,
    pub min_amount: Option<String>,
    pub priority: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiscrepancyPage {
    pub items: Vec<Discrepancy>,
    pub summary: DiscrepancySummary,
    pub total: usize,
}

async fn gather_discrepancies(
    state: &AppState,
) -> Result<(Vec<Discrepancy>, DiscrepancySummary), ApiError> {
    let filters = RecordFilters::default();
    let unmatched_transactions = state.store.fetch_unmatched_transactions(&filters).await?;
    let unmatched_settlements = state.store.fetch_unmatched_settlements(&filters).await?;
    let unmatched_adjustments = state.store.fetch_unmatched_adjustments(&filters).await?;
    let amount_mismatches = state.store.fetch_amount_mismatches(&filters).await?;
    let all_transactions = state.store.load_transactions(None, None, None).await?;
    let all_adjustments = state.store.load_adjustments(None, None).await?;
    let all_matches = state.store.all_matches().await?;

    let today = Utc::now().date_naive();
    let discrepancies = reporting::build_discrepancies(
        &unmatched_transactions,
        &unmatched_settlements,
        &unmatched_adjustments,
        &amount_mismatches,
        &all_transactions,
        &state.config,
        today,
    );
    let summary = reporting::calculate_summary(
        &unmatched_transactions,
        &unmatched_settlements,
        &unmatched_adjustments,
        &all_transactions,
        &all_adjustments,
        &all_matches,
        &state.config,
        today,
    );
    Ok((discrepancies, summary))
}

async fn list_discrepancies(
    State(state): State<AppState>,
    Query(q): Query<DiscrepancyQuery>,
) -> Result<Json<DiscrepancyPage>, ApiError> {
    let min_amount: Option<Money> = match &q.min_amount {
        None => None,
        Some(s) if s.is_empty() => None,
        Some(s) => Some(
            Money::from_str_decimal(s)
                .ok_or_else(|| ApiError::BadQuery(format!("invalid min_amount: {s}")))?,
        ),
    };
    let priority = parse_priority(&q.priority)?;
    let limit: usize = parse_query("limit", &q.limit)?.unwrap_or(50);
    let offset: usize = parse_query("offset", &q.offset)?.unwrap_or(0);

    let (mut discrepancies, summary) = gather_discrepancies(&state).await?;

    if let Some(category) = &q.category {
        if !category.is_empty() {
            discrepancies.retain(|d| {
                serde_json::to_value(d.category)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .as_deref()
                    == Some(category.as_str())
            });
        }
    }
    if let Some(currency) = &q.currency {
        if !currency.is_empty() {
            discrepancies.retain(|d| d.currency.eq_ignore_ascii_case(currency));
        }
    }
    if let Some(min_amount) = min_amount {
        discrepancies.retain(|d| d.amount >= min_amount);
    }
    if let Some(priority) = priority {
        discrepancies.retain(|d| d.priority == priority);
    }

    let total = discrepancies.len();
    let page = discrepancies.into_iter().skip(offset).take(limit).collect();

    Ok(Json(DiscrepancyPage { items: page, summary, total }))
}

async fn discrepancies_summary(
    State(state): State<AppState>,
) -> Result<Json<DiscrepancySummary>, ApiError> {
    let (_, summary) = gather_discrepancies(&state).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct MatchQuery {
    pub confidence_min: Option<String>,
    pub status: Option<String>,
    pub match_type: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchPage {
    pub items: Vec<MatchResult>,
    pub total: usize,
}

fn parse_status(raw: &Option<String>) -> Result<Option<MatchStatus>, ApiError> {
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("matched") => Ok(Some(MatchStatus::Matched)),
        Some("pending_review") => Ok(Some(MatchStatus::PendingReview)),
        Some("unmatched") => Ok(Some(MatchStatus::Unmatched)),
        Some(other) => Err(ApiError::BadQuery(format!("invalid status: {other}"))),
    }
}

fn parse_match_type(raw: &Option<String>) -> Result<Option<MatchType>, ApiError> {
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some("transaction_settlement") => Ok(Some(MatchType::TransactionSettlement)),
        Some("transaction_adjustment") => Ok(Some(MatchType::TransactionAdjustment)),
        Some(other) => Err(ApiError::BadQuery(format!("invalid match_type: {other}"))),
    }
}

async fn list_matches(
    State(state): State<AppState>,
    Query(q): Query<MatchQuery>,
) -> Result<Json<MatchPage>, ApiError> {
    let confidence_min: u8 = parse_query("confidence_min", &q.confidence_min)?.unwrap_or(0);
    let status = parse_status(&q.status)?;
    let match_type = parse_match_type(&q.match_type)?;
    let limit: usize = parse_query("limit", &q.limit)?.unwrap_or(50);
    let offset: usize = parse_query("offset", &q.offset)?.unwrap_or(0);

    let mut matches = state.store.all_matches().await?;
    matches.retain(|m| m.confidence_score >= confidence_min);
    if let Some(status) = status {
        matches.retain(|m| m.status == status);
    }
    if let Some(match_type) = match_type {
        matches.retain(|m| m.match_type == match_type);
    }

    let total = matches.len();
    let page = matches.into_iter().skip(offset).take(limit).collect();
    Ok(Json(MatchPage { items: page, total }))
}

async fn match_by_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<MatchResult>, ApiError> {
    state
        .store
        .match_for_transaction(&transaction_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
