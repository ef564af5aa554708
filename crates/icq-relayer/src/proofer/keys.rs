//! Store keys of the cosmos-sdk modules that interchain queries read.

use icq_types::ModuleKeySpec;

use crate::error::RelayError;

pub const BANK_STORE_KEY: &str = "bank";
pub const STAKING_STORE_KEY: &str = "staking";

/// `x/bank` prefix of balances, keyed by address then denom.
const BALANCES_PREFIX: u8 = 0x02;
/// `x/staking` prefix of delegations, keyed by delegator then validator.
const DELEGATION_KEY: u8 = 0x31;

/// Where a query's values live in a module store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyDerivation {
    /// Exactly one value under `key`.
    Exact { store_key: String, key: Vec<u8> },
    /// Every value whose key starts with `prefix`, possibly none.
    Prefix { store_key: String, prefix: Vec<u8> },
}

/// Decodes a bech32 address, requiring its human readable part to be `prefix`.
pub fn decode_address(prefix: &str, address: &str) -> Result<Vec<u8>, RelayError> {
    let invalid = |reason: String| RelayError::Address {
        address: address.to_string(),
        reason,
    };

    let (hrp, data) = bech32::decode(address).map_err(|e| invalid(e.to_string()))?;
    if hrp.as_str() != prefix {
        return Err(invalid(format!("expected prefix {prefix}, found {hrp}")));
    }
    if data.is_empty() {
        return Err(invalid("empty address".to_string()));
    }

    Ok(data)
}

fn length_prefixed(address: &[u8]) -> Result<Vec<u8>, RelayError> {
    let len = u8::try_from(address.len()).map_err(|_| RelayError::Address {
        address: hex::encode(address),
        reason: format!("address of {} bytes is too long", address.len()),
    })?;

    let mut key = Vec::with_capacity(address.len() + 1);
    key.push(len);
    key.extend_from_slice(address);
    Ok(key)
}

pub fn account_balances_prefix(address: &[u8]) -> Result<Vec<u8>, RelayError> {
    let mut key = vec![BALANCES_PREFIX];
    key.extend(length_prefixed(address)?);
    Ok(key)
}

pub fn balance_key(address: &[u8], denom: &str) -> Result<Vec<u8>, RelayError> {
    let mut key = account_balances_prefix(address)?;
    key.extend_from_slice(denom.as_bytes());
    Ok(key)
}

pub fn delegations_key(delegator: &[u8]) -> Result<Vec<u8>, RelayError> {
    let mut key = vec![DELEGATION_KEY];
    key.extend(length_prefixed(delegator)?);
    Ok(key)
}

/// Derives the store location of `spec`, decoding addresses with `prefix`.
pub fn derive(prefix: &str, spec: &ModuleKeySpec) -> Result<KeyDerivation, RelayError> {
    match spec {
        ModuleKeySpec::Balance { address, denom } => Ok(KeyDerivation::Exact {
            store_key: BANK_STORE_KEY.to_string(),
            key: balance_key(&decode_address(prefix, address)?, denom)?,
        }),
        ModuleKeySpec::Delegations { delegator } => Ok(KeyDerivation::Prefix {
            store_key: STAKING_STORE_KEY.to_string(),
            prefix: delegations_key(&decode_address(prefix, delegator)?)?,
        }),
        ModuleKeySpec::Raw { store_key, key } => Ok(KeyDerivation::Exact {
            store_key: store_key.clone(),
            key: key.clone(),
        }),
        ModuleKeySpec::RawPrefix { store_key, prefix } => Ok(KeyDerivation::Prefix {
            store_key: store_key.clone(),
            prefix: prefix.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use bech32::{Bech32, Hrp};

    use super::*;

    fn address(prefix: &str, bytes: &[u8]) -> String {
        bech32::encode::<Bech32>(Hrp::parse(prefix).unwrap(), bytes).unwrap()
    }

    #[test]
    fn test_balance_key_layout() {
        let addr = [0xabu8; 20];
        let key = balance_key(&addr, "uatom").unwrap();

        assert_eq!(key[0], 0x02);
        assert_eq!(key[1], 20);
        assert_eq!(&key[2..22], &addr);
        assert!(key.ends_with(b"uatom"));
    }

    #[test]
    fn test_delegations_prefix_layout() {
        let addr = [0x11u8; 32];
        let key = delegations_key(&addr).unwrap();

        assert_eq!(key.len(), 34);
        assert_eq!(&key[..2], &[0x31, 32]);
    }

    #[test]
    fn test_derive_uses_prefix() {
        let delegator = address("cosmos", &[5u8; 20]);
        let derived = derive(
            "cosmos",
            &ModuleKeySpec::Delegations {
                delegator: delegator.clone(),
            },
        )
        .unwrap();

        assert_eq!(
            derived,
            KeyDerivation::Prefix {
                store_key: STAKING_STORE_KEY.to_string(),
                prefix: delegations_key(&[5u8; 20]).unwrap(),
            }
        );

        assert!(matches!(
            derive("osmo", &ModuleKeySpec::Delegations { delegator }),
            Err(RelayError::Address { .. })
        ));
    }

    #[test]
    fn test_raw_keys_are_verbatim() {
        let derived = derive(
            "cosmos",
            &ModuleKeySpec::Raw {
                store_key: "acc".into(),
                key: vec![1, 2],
            },
        )
        .unwrap();

        assert_eq!(
            derived,
            KeyDerivation::Exact {
                store_key: "acc".into(),
                key: vec![1, 2],
            }
        );
    }

    #[test]
    fn test_oversized_address_is_rejected() {
        let addr = [0x0fu8; 256];

        match balance_key(&addr, "uatom") {
            Err(RelayError::Address { address, reason }) => {
                assert_eq!(address, hex::encode(addr));
                assert!(reason.contains("256 bytes"), "{reason}");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(delegations_key(&[0u8; 255]).is_ok());
    }

    #[test]
    fn test_malformed_address() {
        assert!(matches!(
            decode_address("cosmos", "cosmos1notbech32"),
            Err(RelayError::Address { .. })
        ));
    }
}
