//! Strong type definitions for the MetaBoard indexer.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Hash32;
use crate::error::CoreError;

/// A 20-byte origin-log address (an origin contract or a submitter).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to lowercase hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without a `0x` prefix. Mixed case is accepted.
    pub fn from_hex(s: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s))?;
        Self::try_from(bytes.as_slice())
    }

    /// The zero address.
    pub const ZERO: Self = Self([0u8; 20]);
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 20] = slice.try_into().map_err(|_| CoreError::InvalidLength {
            expected: 20,
            actual: slice.len(),
        })?;
        Ok(Self(arr))
    }
}

/// The submitter-chosen subject tag: a 256-bit unsigned integer, big-endian.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subject(pub [u8; 32]);

impl Subject {
    /// Create from big-endian bytes.
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the big-endian bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The value as a `u128`, if it fits.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|b| *b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    pub const ZERO: Self = Self([0u8; 32]);
}

impl From<u128> for Subject {
    fn from(value: u128) -> Self {
        let mut bytes = [0u8; 32];
        bytes[16..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }
}

impl From<u64> for Subject {
    fn from(value: u64) -> Self {
        Self::from(u128::from(value))
    }
}

impl TryFrom<&[u8]> for Subject {
    type Error = CoreError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into().map_err(|_| CoreError::InvalidLength {
            expected: 32,
            actual: slice.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_u128() {
            Some(v) => write!(f, "Subject({})", v),
            None => write!(f, "Subject(0x{})", self.to_hex()),
        }
    }
}

/// Identifier of a Meta record.
///
/// Which variant a deployment produces is fixed by its identifier scheme;
/// the two never mix within one store.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetaId {
    /// Ordinal of the event within its board (0-indexed).
    Sequence { board: Address, seq: u64 },
    /// A content-derived digest.
    Hash(Hash32),
}

/// Storage key discriminators.
const SEQUENCE_KEY_TAG: u8 = 0x01;
const HASH_KEY_TAG: u8 = 0x02;

impl MetaId {
    /// Encode as a flat storage key.
    ///
    /// Format: `0x01 || board(20) || seq(8, BE)` or `0x02 || hash(32)`.
    pub fn to_key(&self) -> Vec<u8> {
        match self {
            MetaId::Sequence { board, seq } => {
                let mut key = Vec::with_capacity(29);
                key.push(SEQUENCE_KEY_TAG);
                key.extend_from_slice(&board.0);
                key.extend_from_slice(&seq.to_be_bytes());
                key
            }
            MetaId::Hash(hash) => {
                let mut key = Vec::with_capacity(33);
                key.push(HASH_KEY_TAG);
                key.extend_from_slice(&hash.0);
                key
            }
        }
    }

    /// Decode a storage key produced by [`MetaId::to_key`].
    pub fn from_key(key: &[u8]) -> Result<Self, CoreError> {
        match key.split_first() {
            Some((&SEQUENCE_KEY_TAG, rest)) if rest.len() == 28 => {
                let board = Address::try_from(&rest[..20])?;
                let mut seq = [0u8; 8];
                seq.copy_from_slice(&rest[20..]);
                Ok(MetaId::Sequence {
                    board,
                    seq: u64::from_be_bytes(seq),
                })
            }
            Some((&HASH_KEY_TAG, rest)) => Ok(MetaId::Hash(Hash32::try_from(rest)?)),
            _ => Err(CoreError::MalformedMetaId(hex::encode(key))),
        }
    }

    /// Whether this id was assigned from a board's sequence counter.
    pub fn is_sequence(&self) -> bool {
        matches!(self, MetaId::Sequence { .. })
    }
}

impl fmt::Debug for MetaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetaId({})", self)
    }
}

impl fmt::Display for MetaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaId::Sequence { board, seq } => write!(f, "{}/{}", board, seq),
            MetaId::Hash(hash) => write!(f, "{}", hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::from_bytes([0xab; 20]);
        assert_eq!(Address::from_hex(&addr.to_string()).unwrap(), addr);
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
    }

    #[test]
    fn test_address_mixed_case() {
        let addr = Address::from_hex("0xc0D477556c25C9d67E1f57245C7453DA776B51cf").unwrap();
        assert_eq!(addr.to_string(), "0xc0d477556c25c9d67e1f57245c7453da776b51cf");
    }

    #[test]
    fn test_subject_from_small_int() {
        let subject = Subject::from(1000u64);
        assert_eq!(subject.to_u128(), Some(1000));
        assert_eq!(subject.0[30..], [0x03, 0xe8]);
    }

    #[test]
    fn test_subject_too_large_for_u128() {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        assert_eq!(Subject::from_be_bytes(bytes).to_u128(), None);
    }

    #[test]
    fn test_meta_id_key_roundtrip() {
        let seq_id = MetaId::Sequence {
            board: Address::from_bytes([0x11; 20]),
            seq: 7,
        };
        let hash_id = MetaId::Hash(Hash32::digest(b"meta"));

        assert_eq!(MetaId::from_key(&seq_id.to_key()).unwrap(), seq_id);
        assert_eq!(MetaId::from_key(&hash_id.to_key()).unwrap(), hash_id);
        assert!(seq_id.is_sequence());
        assert!(!hash_id.is_sequence());
    }

    #[test]
    fn test_meta_id_malformed_key() {
        assert!(MetaId::from_key(&[]).is_err());
        assert!(MetaId::from_key(&[0x01, 0x00]).is_err());
        assert!(MetaId::from_key(&[0x09; 33]).is_err());
    }
}
