//! Address validation gate.
//!
//! Every component validates identifiers through here before touching the
//! network; a malformed string must never reach an RPC call.

use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

/// Returns true if `address` parses as a Solana public key.
pub fn is_valid_address(address: &str) -> bool {
    Pubkey::from_str(address).is_ok()
}

/// Parse `address` into a [`Pubkey`], mapping failure to
/// [`crate::Error::InvalidAddress`].
pub fn parse_address(address: &str) -> crate::Result<Pubkey> {
    Pubkey::from_str(address).map_err(|_| crate::Error::InvalidAddress(address.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // System program id, always a well-formed address.
    const VALID: &str = "11111111111111111111111111111111";

    #[test]
    fn test_valid_address() {
        assert!(is_valid_address(VALID));
        assert!(is_valid_address("vines1vzrYbzLMRdu58ou5XTby4qAqVRLmqo36NKPTg"));
    }

    #[test]
    fn test_malformed_addresses() {
        for bad in [
            "",
            "not-an-address",
            "0x52908400098527886E0F7030069857D2E4169EE7", // EVM style
            "too-short",
            "O0l1", // characters outside base58
            "                                ",
        ] {
            assert!(!is_valid_address(bad), "{:?} should be invalid", bad);
        }
    }

    #[test]
    fn test_parse_address_error_kind() {
        let err = parse_address("garbage").unwrap_err();
        assert!(matches!(err, crate::Error::InvalidAddress(_)));
        assert!(parse_address(VALID).is_ok());
    }
}
