//! Verification and settlement pipelines (§4.5, §4.6): the only externally
//! observable entry points of the core besides `listSupportedKinds` (§6).

pub mod settle;
pub mod verify;

pub use settle::settle_payment;
pub use verify::verify_payment;
