//! Verification Pipeline (§4.5): network check → scheme check → payload
//! shape check → signature check → (optional) UTXO selection → ledger debit.

use crate::adapters::Adapters;
use crate::ledger::{select_utxo, DebitOutcome, LedgerEngine};
use crate::network::same_network;
use crate::types::{
    AuthorizationRef, InvalidReason, PaymentPayload, PaymentRequirements, VerifyLedgerSummary,
    VerifyResult,
};

pub async fn verify_payment(
    adapters: &Adapters,
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
) -> VerifyResult {
    match run(adapters, payload, requirements).await {
        Ok(result) => result,
        Err(e) => {
            log::error!("unexpected error in verify_payment: {:#}", anyhow::anyhow!(e));
            VerifyResult::Invalid {
                invalid_reason: InvalidReason::UnexpectedVerifyError,
                payer: best_effort_payer(payload),
            }
        }
    }
}

async fn run(
    adapters: &Adapters,
    payload: &PaymentPayload,
    requirements: &PaymentRequirements,
) -> Result<VerifyResult, crate::error::FacilitatorError> {
    if !same_network(Some(&requirements.network), payload.network()) {
        return Ok(invalid(InvalidReason::InvalidNetwork, ""));
    }
    if requirements.scheme != "utxo" || payload.scheme() != Some("utxo") {
        return Ok(invalid(InvalidReason::InvalidScheme, ""));
    }

    let Some(authorization_wire) = &payload.payload.authorization else {
        return Ok(invalid(InvalidReason::InvalidPayload, ""));
    };
    let Some(signature) = &payload.payload.signature else {
        return Ok(invalid(InvalidReason::InvalidPayload, ""));
    };

    let authorization = authorization_wire.normalize();
    let message = authorization_wire.signing_message();

    let signature_ok = adapters
        .signature_verifier
        .verify(&authorization.from, signature, &message)
        .await
        .unwrap_or_else(|e| {
            log::warn!("signature verification error for {}: {}", authorization.from, e);
            false
        });
    if !signature_ok {
        return Ok(invalid(
            InvalidReason::InvalidExactBchPayloadSignature,
            &authorization.from,
        ));
    }

    let Some(cost) = requirements.cost() else {
        return Ok(invalid(InvalidReason::InvalidPayload, &authorization.from));
    };

    let selected_entry = if matches!(authorization.reference, AuthorizationRef::AnyForAddress) {
        let entry = select_utxo(
            adapters.store.as_ref(),
            &authorization.from,
            &requirements.pay_to,
            cost,
        )
        .await;
        if entry.is_none() {
            return Ok(invalid(
                InvalidReason::NoUtxoFoundForAddress,
                &authorization.from,
            ));
        }
        entry
    } else {
        None
    };

    let engine = LedgerEngine::new(
        adapters.store.clone(),
        adapters.chain_client.clone(),
        adapters.locks.clone(),
    );
    let outcome = engine.debit(&authorization, cost, selected_entry).await?;

    Ok(match outcome {
        DebitOutcome::Invalid { reason } => invalid(reason, &authorization.from),
        DebitOutcome::Valid {
            remaining_balance_sat,
            entry,
        } => VerifyResult::Valid {
            payer: authorization.from.clone(),
            remaining_balance_sat,
            ledger_entry: Some(VerifyLedgerSummary {
                utxo_id: entry.utxo_id,
                transaction_value_sat: entry.transaction_value_sat,
                total_debited_sat: entry.total_debited_sat,
                last_updated: entry.last_updated,
            }),
        },
    })
}

fn invalid(reason: InvalidReason, payer: &str) -> VerifyResult {
    VerifyResult::Invalid {
        invalid_reason: reason,
        payer: payer.to_string(),
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
