//! Network Identity Resolver.
//!
//! Maps legacy and CAIP-2 network tags to this facilitator's canonical
//! network id, and decides whether two tags name the same network. This
//! facilitator serves exactly one chain, so `same_network` is deliberately
//! asymmetric toward everything else: two foreign networks never match even
//! if their tags are textually identical.

/// CAIP-2 identifier for this facilitator's native chain.
pub const CANONICAL_NET: &str = "bip122:000000000000000000651ef99cb9fcbe";

const LEGACY_ALIAS: &str = "bch";

/// Canonicalize a network tag.
///
/// - empty/absent → [`CANONICAL_NET`]
/// - `"bch"` → [`CANONICAL_NET`]
/// - exactly [`CANONICAL_NET`] → [`CANONICAL_NET`]
/// - any other `bip122:*` id → returned unchanged
/// - anything else → returned unchanged
pub fn canonicalize(net: Option<&str>) -> String {
    match net {
        None => CANONICAL_NET.to_string(),
        Some("") => CANONICAL_NET.to_string(),
        Some(LEGACY_ALIAS) => CANONICAL_NET.to_string(),
        Some(other) => other.to_string(),
    }
}

/// True iff `a` and `b` both canonicalize to [`CANONICAL_NET`].
///
/// Note this is *not* a general equivalence check: `same_network("foo",
/// "foo")` is false, because "foo" is a foreign network and this facilitator
/// only ever serves its own chain.
pub fn same_network(a: Option<&str>, b: Option<&str>) -> bool {
    let ca = canonicalize(a);
    let cb = canonicalize(b);
    ca == CANONICAL_NET && cb == CANONICAL_NET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_absent_canonicalize_to_native() {
        assert_eq!(canonicalize(None), CANONICAL_NET);
        assert_eq!(canonicalize(Some("")), CANONICAL_NET);
    }

    #[test]
    fn legacy_alias_canonicalizes_to_native() {
        assert_eq!(canonicalize(Some("bch")), CANONICAL_NET);
    }

    #[test]
    fn canonical_net_is_a_fixed_point() {
        assert_eq!(canonicalize(Some(CANONICAL_NET)), CANONICAL_NET);
    }

    #[test]
    fn canonicalize_is_idempotent() {
        for net in [None, Some(""), Some("bch"), Some(CANONICAL_NET), Some("bip122:other"), Some("btc")] {
            let once = canonicalize(net);
            let twice = canonicalize(Some(once.as_str()));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn foreign_networks_pass_through_unchanged() {
        assert_eq!(canonicalize(Some("bip122:other-chain")), "bip122:other-chain");
        assert_eq!(canonicalize(Some("btc")), "btc");
    }

    #[test]
    fn same_network_requires_both_sides_native() {
        assert!(same_network(Some("bch"), Some(CANONICAL_NET)));
        assert!(same_network(None, Some("bch")));
        assert!(!same_network(Some("btc"), Some("btc")));
        assert!(!same_network(Some(CANONICAL_NET), Some("btc")));
    }

    #[test]
    fn same_network_is_symmetric() {
        let pairs = [
            (Some("bch"), Some(CANONICAL_NET)),
            (Some("btc"), Some("btc")),
            (None, Some("bip122:other")),
        ];
        for (a, b) in pairs {
            assert_eq!(same_network(a, b), same_network(b, a));
        }
    }
}
