//! Wire and domain types shared across the ledger, pipelines, and HTTP layer.
//!
//! Dynamic input shapes (v1 vs v2 payloads, legacy field names, number-or-string
//! amounts) are normalized here, at the boundary, so the core never has to
//! juggle them again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A reference to the UTXO an authorization is drawn against.
///
/// The wire format uses `txid: "*"` as a sentinel for "pick any usable UTXO for
/// this payer"; we turn that into a proper variant immediately instead of
/// threading the sentinel string through the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationRef {
    Specific { txid: String, vout: u32 },
    AnyForAddress,
}

/// A payer-signed authorization referencing a funded UTXO.
///
/// Not persisted directly; the ledger engine turns an accepted authorization
/// into a [`LedgerEntry`].
#[derive(Debug, Clone)]
pub struct Authorization {
    pub from: String,
    pub to: String,
    pub value: u64,
    pub reference: AuthorizationRef,
    /// Informational: the total size of the referenced output, when known.
    pub amount: Option<u64>,
}

/// Raw wire shape of an authorization, as it appears inside a payment payload.
///
/// `txid` carries either a concrete transaction id or the `"*"` sentinel;
/// `vout` is `None` exactly when `txid == "*"`. `value`/`amount` accept either
/// a JSON integer or a numeric string, matching the source's lax encoding.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorizationWire {
    pub from: String,
    pub to: String,
    #[serde(with = "amount_as_u64")]
    pub value: AmountValue,
    pub txid: String,
    pub vout: Option<u32>,
    #[serde(default)]
    pub amount: Option<AmountValue>,
}

impl AuthorizationWire {
    pub fn normalize(&self) -> Authorization {
        let reference = if self.txid == "*" {
            AuthorizationRef::AnyForAddress
        } else {
            AuthorizationRef::Specific {
                txid: self.txid.clone(),
                vout: self.vout.unwrap_or(0),
            }
        };
        Authorization {
            from: self.from.clone(),
            to: self.to.clone(),
            value: self.value.as_u64(),
            reference,
            amount: self.amount.as_ref().map(AmountValue::as_u64),
        }
    }

    /// The deterministic message a client signs over, including the raw
    /// `txid: "*"` sentinel for check-my-tab authorizations. Field order is
    /// fixed so the same logical authorization always serializes identically.
    pub fn signing_message(&self) -> String {
        serde_json::json!({
            "from": self.from,
            "to": self.to,
            "value": self.value.as_u64().to_string(),
            "txid": self.txid,
            "vout": self.vout,
        })
        .to_string()
    }
}

/// A monetary amount accepted on the wire as either a JSON number or a
/// numeric string. Never coerced to floating-point.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AmountValue {
    Int(u64),
    Text(String),
}

impl AmountValue {
    pub fn as_u64(&self) -> u64 {
        match self {
            AmountValue::Int(n) => *n,
            AmountValue::Text(s) => s.parse().unwrap_or(0),
        }
    }
}

impl<'de> Deserialize<'de> for AmountValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(u64),
            Text(String),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Int(n) => AmountValue::Int(n),
            Repr::Text(s) => AmountValue::Text(s),
        })
    }
}

mod amount_as_u64 {
    use super::AmountValue;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(value: &AmountValue, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<AmountValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        AmountValue::deserialize(deserializer)
    }
}

/// Inner `payload` object carried by both payment-payload wire versions.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExactUtxoPayload {
    pub signature: Option<String>,
    pub authorization: Option<AuthorizationWire>,
}

/// The `accepted` sub-object used by the v2 payload shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcceptedKind {
    pub scheme: Option<String>,
    pub network: Option<String>,
}

/// A payment payload in either of the two wire shapes the protocol has used:
///
/// - v1: `{scheme, network, payload: {...}}`
/// - v2: `{accepted: {scheme, network, ...}, payload: {...}}`
///
/// `scheme`/`network` are read from `accepted` when present, else from the
/// top level.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentPayload {
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub accepted: Option<AcceptedKind>,
    pub payload: ExactUtxoPayload,
}

impl PaymentPayload {
    pub fn scheme(&self) -> Option<&str> {
        self.accepted
            .as_ref()
            .and_then(|a| a.scheme.as_deref())
            .or(self.scheme.as_deref())
    }

    pub fn network(&self) -> Option<&str> {
        self.accepted
            .as_ref()
            .and_then(|a| a.network.as_deref())
            .or(self.network.as_deref())
    }
}

/// Requirements the facilitator's caller attaches to a resource, describing
/// the expected scheme/network/recipient and cost.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    #[serde(rename = "payTo")]
    pub pay_to: String,
    #[serde(default)]
    pub amount: Option<AmountValue>,
    #[serde(default, rename = "minAmountRequired")]
    pub min_amount_required: Option<AmountValue>,
    #[serde(default, rename = "maxAmountRequired")]
    pub max_amount_required: Option<AmountValue>,
}

impl PaymentRequirements {
    /// Cost in base units: the first of `amount`, `minAmountRequired`,
    /// `maxAmountRequired` that is present.
    pub fn cost(&self) -> Option<u64> {
        self.amount
            .as_ref()
            .or(self.min_amount_required.as_ref())
            .or(self.max_amount_required.as_ref())
            .map(AmountValue::as_u64)
    }
}

/// The persisted record tracking how much of a specific UTXO remains
/// debitable. Keyed by `utxoId = txid + ":" + vout` in [`UtxoDB`](crate::ledger::store::UtxoDb).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub utxo_id: String,
    pub txid: String,
    pub vout: u32,
    pub payer_address: String,
    pub receiver_address: String,
    pub transaction_value_sat: u64,
    pub remaining_balance_sat: u64,
    /// Legacy alias some older entries were written under; read-only fallback.
    #[serde(default, rename = "remainingBalance")]
    pub remaining_balance_legacy: Option<u64>,
    pub total_debited_sat: u64,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub last_checked: DateTime<Utc>,
}

impl LedgerEntry {
    /// `remainingBalanceSat`, tolerating the legacy `remainingBalance` field
    /// name for entries written by an older version of the facilitator.
    pub fn remaining(&self) -> u64 {
        if self.remaining_balance_sat != 0 {
            self.remaining_balance_sat
        } else {
            self.remaining_balance_legacy.unwrap_or(0)
        }
    }
}

/// Reasons a verify/settle call can fail, drawn from the closed set in the
/// external interface contract. Never extended ad hoc at a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    MissingAuthorization,
    InvalidNetwork,
    InvalidScheme,
    InvalidPayload,
    InvalidExactBchPayloadSignature,
    NoUtxoFoundForAddress,
    UtxoNotFound,
    InvalidReceiverAddress,
    InsufficientUtxoBalance,
    InsufficientFunds,
    InvalidTransactionState,
    InvalidPayment,
    InvalidUtxo,
    UnexpectedUtxoValidationError,
    UnexpectedVerifyError,
    UnexpectedSettleError,
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        write!(f, "{s}")
    }
}

/// Outcome of [`verify_payment`](crate::pipeline::verify::verify_payment).
///
/// Kept as a plain Rust enum rather than a wire-shaped struct; the HTTP layer
/// (`api::handlers`) is responsible for translating this into the JSON shape
/// callers expect.
#[derive(Debug, Clone)]
pub enum VerifyResult {
    Valid {
        payer: String,
        remaining_balance_sat: u64,
        ledger_entry: Option<VerifyLedgerSummary>,
    },
    Invalid {
        invalid_reason: InvalidReason,
        payer: String,
    },
}

impl VerifyResult {
    pub fn payer(&self) -> &str {
        match self {
            VerifyResult::Valid { payer, .. } => payer,
            VerifyResult::Invalid { payer, .. } => payer,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VerifyLedgerSummary {
    pub utxo_id: String,
    pub transaction_value_sat: u64,
    pub total_debited_sat: u64,
    pub last_updated: DateTime<Utc>,
}

/// Outcome of [`settle_payment`](crate::pipeline::settle::settle_payment).
#[derive(Debug, Clone)]
pub struct SettleResult {
    pub success: bool,
    pub error_reason: Option<InvalidReason>,
    pub transaction: String,
    pub network: String,
    pub payer: String,
    pub remaining_balance_sat: Option<u64>,
}

/// Static capability description returned by `listSupportedKinds`.
#[derive(Debug, Clone, Serialize)]
pub struct SupportedKinds {
    pub kinds: Vec<SupportedKind>,
    pub extensions: Vec<String>,
    #[serde(rename = "signerNamespaces")]
    pub signer_namespaces: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportedKind {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: u32,
    pub scheme: String,
    pub network: String,
}
