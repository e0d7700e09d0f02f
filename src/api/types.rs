//! Wire-shape DTOs for the HTTP surface. Kept separate from `crate::types`:
//! the core speaks in typed values (`VerifyResult`, `SettleResult`), this
//! module speaks in the JSON shape callers actually expect (string-encoded
//! satoshi amounts, `isValid`/`success` discriminators).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{InvalidReason, PaymentPayload, PaymentRequirements, SettleResult, VerifyResult};

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    #[serde(rename = "paymentPayload")]
    pub payment_payload: PaymentPayload,
    #[serde(rename = "paymentRequirements")]
    pub payment_requirements: PaymentRequirements,
}

pub type SettleRequest = VerifyRequest;

#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntryDto {
    #[serde(rename = "utxoId")]
    pub utxo_id: String,
    #[serde(rename = "transactionValueSat")]
    pub transaction_value_sat: String,
    #[serde(rename = "totalDebitedSat")]
    pub total_debited_sat: String,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    pub payer: String,
    #[serde(rename = "remainingBalanceSat", skip_serializing_if = "Option::is_none")]
    pub remaining_balance_sat: Option<String>,
    #[serde(rename = "ledgerEntry", skip_serializing_if = "Option::is_none")]
    pub ledger_entry: Option<LedgerEntryDto>,
    #[serde(rename = "invalidReason", skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<InvalidReason>,
}

impl From<VerifyResult> for VerifyResponse {
    fn from(result: VerifyResult) -> Self {
        match result {
            VerifyResult::Valid {
                payer,
                remaining_balance_sat,
                ledger_entry,
            } => VerifyResponse {
                is_valid: true,
                payer,
                remaining_balance_sat: Some(remaining_balance_sat.to_string()),
                ledger_entry: ledger_entry.map(|e| LedgerEntryDto {
                    utxo_id: e.utxo_id,
                    transaction_value_sat: e.transaction_value_sat.to_string(),
                    total_debited_sat: e.total_debited_sat.to_string(),
                    last_updated: e.last_updated,
                }),
                invalid_reason: None,
            },
            VerifyResult::Invalid {
                invalid_reason,
                payer,
            } => VerifyResponse {
                is_valid: false,
                payer,
                remaining_balance_sat: None,
                ledger_entry: None,
                invalid_reason: Some(invalid_reason),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SettleResponse {
    pub success: bool,
    #[serde(rename = "errorReason", skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<InvalidReason>,
    pub transaction: String,
    pub network: String,
    pub payer: String,
    #[serde(rename = "remainingBalanceSat", skip_serializing_if = "Option::is_none")]
    pub remaining_balance_sat: Option<String>,
}

impl From<SettleResult> for SettleResponse {
    fn from(result: SettleResult) -> Self {
        SettleResponse {
            success: result.success,
            error_reason: result.error_reason,
            transaction: result.transaction,
            network: result.network,
            payer: result.payer,
            remaining_balance_sat: result.remaining_balance_sat.map(|v| v.to_string()),
        }
    }
}
