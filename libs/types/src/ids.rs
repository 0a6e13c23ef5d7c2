//! Account addresses for the token ledger
//!
//! Addresses are opaque 20-byte identifiers rendered as `0x`-prefixed hex.
//! Two addresses carry meaning of their own:
//! - `Address::ZERO` is never a valid transfer participant
//! - `Address::DEAD` is an ordinary account nobody controls; value sent there
//!   is locked forever but still counts toward total supply

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::TypesError;

/// Length of an address in bytes
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The zero address. Rejected as a transfer participant.
    pub const ZERO: Address = Address([0u8; ADDRESS_LEN]);

    /// Permanent custody address (`0x000…dEaD`).
    pub const DEAD: Address = Address([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xde, 0xad,
    ]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Fresh unique address backed by a UUID v7.
    ///
    /// Intended for tests and simulations where addresses only need to be
    /// distinct; the leading marker byte keeps them clear of `ZERO`/`DEAD`.
    pub fn random() -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[0] = 0xa0;
        bytes[4..].copy_from_slice(Uuid::now_v7().as_bytes());
        Self(bytes)
    }

    /// Address whose low 8 bytes hold `n` (big-endian).
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes[ADDRESS_LEN - 8..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Build from an arbitrary byte slice of exactly 20 bytes
    pub fn from_slice(slice: &[u8]) -> Result<Self, TypesError> {
        let bytes: [u8; ADDRESS_LEN] =
            slice
                .try_into()
                .map_err(|_| TypesError::InvalidAddressLength {
                    expected: ADDRESS_LEN,
                    actual: slice.len(),
                })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| TypesError::InvalidAddressHex {
            input: s.to_string(),
        })?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
