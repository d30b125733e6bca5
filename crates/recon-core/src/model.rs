//! Core entities: Transaction, Settlement, Adjustment, MatchResult.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Authorized,
    Captured,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub transaction_id: String,
    pub merchant_order_id: String,
    pub amount: Money,
    pub currency: String,
    pub timestamp: DateTime<FixedOffset>,
    pub status: TransactionStatus,
    pub customer_id: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub settlement_reference: String,
    pub amount: Money,
    pub gross_amount: Option<Money>,
    pub currency: String,
    pub settlement_date: NaiveDate,
    pub transaction_reference: Option<String>,
    pub fees_deducted: Money,
    pub bank_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Refund,
    Chargeback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: String,
    pub adjustment_id: String,
    pub transaction_reference: Option<String>,
    pub amount: Money,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: AdjustmentType,
    pub date: NaiveDate,
    pub reason_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    TransactionSettlement,
    TransactionAdjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    PendingReview,
    Unmatched,
}

impl MatchStatus {
    /// `matched` iff `confidence >= min_confidence`, else `pending_review`.
    pub fn from_confidence(confidence: u8, min_confidence: u8) -> Self {
        if confidence >= min_confidence {
            MatchStatus::Matched
        } else {
            MatchStatus::PendingReview
        }
    }
}

/// Stable reason tags emitted alongside a confidence score. Serializes
/// to the exact snake_case strings named in the glossary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    ExactTransactionIdMatch,
    CurrencyMatch,
    AmountWithinTolerance,
    AmountVarianceDetected,
    DateWithinWindow,
    PartialIdMatch,
    MerchantOrderIdMatch,
    CrossCurrencyMatch,
    AmountWithinFxTolerance,
    NeedsReview,
    CurrencyMismatch,
    AdjustmentExceedsTransaction,
    DateWithin72h,
    DateWithin7d,
    ExactAmountMatch,
    IdMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: String,
    pub transaction_id: String,
    pub settlement_id: Option<String>,
    pub adjustment_id: Option<String>,
    pub match_type: MatchType,
    pub confidence_score: u8,
    pub match_reasons: Vec<ReasonTag>,
    pub amount_difference: Money,
    pub date_difference_days: i64,
    pub status: MatchStatus,
    pub created_at: DateTime<Utc>,
}
