//! The UTXO-backed debit ledger: the engine that decides when an
//! authorization is accepted, the per-`utxoId` lock that keeps concurrent
//! debits linearizable, and the check-my-tab selector.

pub mod engine;
pub mod locks;
pub mod selector;

pub use engine::{DebitOutcome, LedgerEngine};
pub use selector::select_utxo;
