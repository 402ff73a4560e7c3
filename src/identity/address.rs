use crate::identity::{KeypairError, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const ADDRESS_PREFIX: &str = "acct:";

#[derive(Error, Debug)]
pub enum AddressError {
    #[error("Invalid address format: {0}")]
    InvalidFormat(String),

    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid address length: expected 32 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Address is not a valid public key: {0}")]
    InvalidPublicKey(#[from] KeypairError),
}

/// Account identity on the ledger, written as `acct:<base58 public key>`
///
/// Airlines, passengers, the owner and authorized gateways are all
/// addressed the same way. An address built from a keypair can be turned
/// back into the public key that verifies its calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address([u8; 32]);

impl Address {
    /// Create an address from a public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(public_key.as_bytes());
        Self(bytes)
    }

    /// Create an address from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse an address from its display form
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        if s.is_empty() {
            return Err(AddressError::InvalidFormat("address cannot be empty".into()));
        }

        let key_part = s
            .strip_prefix(ADDRESS_PREFIX)
            .ok_or_else(|| AddressError::InvalidFormat(format!("expected '{}' prefix", ADDRESS_PREFIX)))?;

        if key_part.is_empty() {
            return Err(AddressError::InvalidFormat("key part cannot be empty".into()));
        }

        let bytes = bs58::decode(key_part)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;

        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;

        Ok(Self(arr))
    }

    /// Recover the public key behind this address
    pub fn public_key(&self) -> Result<PublicKey, AddressError> {
        Ok(PublicKey::from_bytes(&self.0)?)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", ADDRESS_PREFIX, bs58::encode(self.0).into_string())
    }
}
