//! Settlement Pipeline (§4.6): re-verify, then instruct the facilitator's
//! wallet to broadcast the authorized amount to the recipient.

use crate::adapters::Adapters;
use crate::network::CANONICAL_NET;
use crate::types::{InvalidReason, PaymentPayload, PaymentRequirements, SettleResult, VerifyResult};

use super::verify::verify_payment;

pub async fn settle_payment(
    adapters: &Adapters,
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
) -> SettleResult {
    match run(adapters, payload, requirements).await {
        Ok(result) => result,
        Err(e) => {
            log::error!("unexpected error in settle_payment: {:#}", anyhow::anyhow!(e));
            SettleResult {
                success: false,
                error_reason: Some(InvalidReason::UnexpectedSettleError),
                transaction: String::new(),
                network: CANONICAL_NET.to_string(),
                payer: best_effort_payer(payload),
                remaining_balance_sat: None,
            }
        }
    }
}

async fn run(
    adapters: &Adapters,
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
) -> Result<SettleResult, crate::error::FacilitatorError> {
    let verified = verify_payment(adapters, payload, requirements).await;
    let (payer, remaining_balance_sat) = match &verified {
        VerifyResult::Invalid {
            invalid_reason,
            payer,
        } => {
            return Ok(failure(invalid_reason.clone(), payer.clone()));
        }
        VerifyResult::Valid {
            payer,
            remaining_balance_sat,
            ..
        } => (payer.clone(), *remaining_balance_sat),
    };

    let Some(authorization) = payload
        .payload
        .authorization
        .as_ref()
        .map(|a| a.normalize())
    else {
        return Ok(failure(InvalidReason::InvalidPayload, payer));
    };

    let Some(cost) = requirements.cost() else {
        return Ok(failure(InvalidReason::InvalidPayload, payer));
    };
    if authorization.value != cost {
        return Ok(failure(InvalidReason::InvalidPayload, payer));
    }

    adapters.wallet.ensure_initialized().await?;

    let balance = adapters.wallet.balance().await?;
    if balance < authorization.value {
        return Ok(failure(InvalidReason::InsufficientFunds, payer));
    }

    let txid = adapters
        .wallet
        .send_to(&requirements.pay_to, authorization.value)
        .await?;
    if txid.is_empty() {
        return Ok(failure(InvalidReason::InvalidTransactionState, payer));
    }

    log::info!(
        "settled payment: payer={} amount_sat={} txid={}",
        payer,
        authorization.value,
        txid
    );

    Ok(SettleResult {
        success: true,
        error_reason: None,
        transaction: txid,
        network: CANONICAL_NET.to_string(),
        payer,
        remaining_balance_sat: Some(remaining_balance_sat),
    })
}

fn failure(reason: InvalidReason, payer: String) -> SettleResult {
    SettleResult {
        success: false,
        error_reason: Some(reason),
        transaction: String::new(),
        network: CANONICAL_NET.to_string(),
        payer,
        remaining_balance_sat: None,
    }
}

fn best_effort_payer(payload: &PaymentPayload) -> String {
    payload
        .payload
        .authorization
        .as_ref()
        .map(|a| a.from.clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ChainClient, ChainOutput, FacilitatorWallet, SignatureVerifier, UtxoValidation};
    use crate::error::{ChainClientError, SignatureError, WalletAdapterError};
    use crate::ledger::locks::KeyedLocks;
    use crate::storage::InMemoryLedgerStore;
    use crate::types::{AcceptedKind, AmountValue, AuthorizationWire, ExactUtxoPayload};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct AlwaysValidSignature;
    #[async_trait]
    impl SignatureVerifier for AlwaysValidSignature {
        async fn verify(&self, _a: &str, _s: &str, _m: &str) -> Result<bool, SignatureError> {
            Ok(true)
        }
    }

    struct FakeChain {
        amount_sat: u64,
        receiver: String,
    }
    #[async_trait]
    impl ChainClient for FakeChain {
        async fn validate_utxo(
            &self,
            _txid: &str,
            _vout: u32,
        ) -> Result<UtxoValidation, ChainClientError> {
            Ok(UtxoValidation {
                is_valid: true,
                invalid_reason: None,
                utxo_amount_sat: Some(self.amount_sat),
                receiver_address: Some(self.receiver.clone()),
            })
        }
        async fn send(&self, _o: &[ChainOutput]) -> Result<String, ChainClientError> {
            unimplemented!()
        }
        async fn get_balance(&self, _a: &str) -> Result<u64, ChainClientError> {
            unimplemented!()
        }
    }

    struct RecordingWallet {
        balance_sat: u64,
        sent: Mutex<Vec<(String, u64)>>,
    }
    #[async_trait]
    impl FacilitatorWallet for RecordingWallet {
        async fn ensure_initialized(&self) -> Result<(), WalletAdapterError> {
            Ok(())
        }
        async fn balance(&self) -> Result<u64, WalletAdapterError> {
            Ok(self.balance_sat)
        }
        async fn send_to(&self, address: &str, amount_sat: u64) -> Result<String, WalletAdapterError> {
            self.sent.lock().unwrap().push((address.to_string(), amount_sat));
            Ok("broadcast-txid".to_string())
        }
    }

    fn payload(txid: &str, value: u64) -> PaymentPayload {
        PaymentPayload {
            scheme: None,
            network: None,
            accepted: Some(AcceptedKind {
                scheme: Some("utxo".to_string()),
                network: Some("bch".to_string()),
            }),
            payload: ExactUtxoPayload {
                signature: Some("sig".to_string()),
                authorization: Some(AuthorizationWire {
                    from: "A".to_string(),
                    to: "S".to_string(),
                    value: AmountValue::Int(value),
                    txid: txid.to_string(),
                    vout: Some(0),
                    amount: None,
                }),
            },
        }
    }

    fn requirements(cost: u64) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "utxo".to_string(),
            network: "bch".to_string(),
            pay_to: "S".to_string(),
            amount: None,
            min_amount_required: Some(AmountValue::Int(cost)),
            max_amount_required: None,
        }
    }

    #[tokio::test]
    async fn settles_after_valid_verify() {
        let wallet = Arc::new(RecordingWallet {
            balance_sat: 10_000,
            sent: Mutex::new(Vec::new()),
        });
        let adapters = Adapters {
            store: Arc::new(InMemoryLedgerStore::new()),
            chain_client: Arc::new(FakeChain {
                amount_sat: 2000,
                receiver: "S".to_string(),
            }),
            signature_verifier: Arc::new(AlwaysValidSignature),
            wallet: wallet.clone(),
            locks: Arc::new(KeyedLocks::new()),
        };

        let result = settle_payment(&adapters, &payload("tx1", 1000), &requirements(1000)).await;
        assert!(result.success);
        assert_eq!(result.payer, "A");
        assert_eq!(result.transaction, "broadcast-txid");
        assert_eq!(result.network, CANONICAL_NET);
        assert_eq!(*wallet.sent.lock().unwrap(), vec![("S".to_string(), 1000)]);
    }

    #[tokio::test]
    async fn insufficient_wallet_balance_fails_without_broadcasting() {
        let wallet = Arc::new(RecordingWallet {
            balance_sat: 10,
            sent: Mutex::new(Vec::new()),
        });
        let adapters = Adapters {
            store: Arc::new(InMemoryLedgerStore::new()),
            chain_client: Arc::new(FakeChain {
                amount_sat: 2000,
                receiver: "S".to_string(),
            }),
            signature_verifier: Arc::new(AlwaysValidSignature),
            wallet: wallet.clone(),
            locks: Arc::new(KeyedLocks::new()),
        };

        let result = settle_payment(&adapters, &payload("tx1", 1000), &requirements(1000)).await;
        assert!(!result.success);
        assert_eq!(result.error_reason, Some(InvalidReason::InsufficientFunds));
        assert!(wallet.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_verify_short_circuits_settlement() {
        let wallet = Arc::new(RecordingWallet {
            balance_sat: 10_000,
            sent: Mutex::new(Vec::new()),
        });
        let adapters = Adapters {
            store: Arc::new(InMemoryLedgerStore::new()),
            chain_client: Arc::new(FakeChain {
                amount_sat: 2000,
                receiver: "S".to_string(),
            }),
            signature_verifier: Arc::new(AlwaysValidSignature),
            wallet: wallet.clone(),
            locks: Arc::new(KeyedLocks::new()),
        };

        let mut reqs = requirements(1000);
        reqs.network = "btc".to_string();
        let result = settle_payment(&adapters, &payload("tx1", 1000), &reqs).await;
        assert!(!result.success);
        assert_eq!(result.error_reason, Some(InvalidReason::InvalidNetwork));
        assert!(wallet.sent.lock().unwrap().is_empty());
    }
}
