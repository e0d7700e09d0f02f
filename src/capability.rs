//! Capability Advertiser (§4.2): a static description of what this
//! facilitator supports, returned verbatim by `GET /supported`.

use std::collections::HashMap;

use crate::network::CANONICAL_NET;
use crate::types::{SupportedKind, SupportedKinds};

pub fn list_supported_kinds() -> SupportedKinds {
    SupportedKinds {
        kinds: vec![SupportedKind {
            protocol_version: 2,
            scheme: "utxo".to_string(),
            network: CANONICAL_NET.to_string(),
        }],
        extensions: Vec::new(),
        signer_namespaces: HashMap::from([("bip122:*".to_string(), Vec::new())]),
    }
}
