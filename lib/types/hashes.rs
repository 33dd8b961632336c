//! Fixed-width identifiers and the keccak commitment primitives

use std::{fmt, str::FromStr};

use num::BigUint;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use thiserror::Error;

pub type Hash = [u8; 32];

pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("invalid hex identifier `{input}`")]
    Decode { input: String },
    #[error("identifier `{input}` is {len} bytes, at most {max} allowed")]
    TooLong {
        input: String,
        len: usize,
        max: usize,
    },
}

/// Canonical even-length `0x`-prefixed spelling of a hex identifier.
///
/// Odd-length digit strings are left-padded with a single `0` nibble, so
/// `0x1` and `0x01` canonicalize to the same key. Already even-length
/// input is returned unchanged apart from the prefix.
pub fn normalize_hex(input: &str) -> String {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    if digits.len() % 2 == 1 {
        format!("0x0{digits}")
    } else {
        format!("0x{digits}")
    }
}

/// Decode a hex identifier into `N` bytes, left-padding short values with
/// zero bytes so that every spelling of the same number yields one key.
fn decode_left_padded<const N: usize>(input: &str) -> Result<[u8; N], HexError> {
    let normalized = normalize_hex(input);
    let bytes = hex::decode(&normalized[2..]).map_err(|_| HexError::Decode {
        input: input.to_owned(),
    })?;
    if bytes.len() > N {
        return Err(HexError::TooLong {
            input: input.to_owned(),
            len: bytes.len(),
            max: N,
        });
    }
    let mut res = [0u8; N];
    res[N - bytes.len()..].copy_from_slice(&bytes);
    Ok(res)
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:literal) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            Default,
            Deserialize,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            Serialize,
        )]
        #[repr(transparent)]
        #[serde(transparent)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;
            pub const ZERO: Self = Self([0u8; $len]);

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; $len]
            }

            pub fn from_hex(input: &str) -> Result<Self, HexError> {
                decode_left_padded(input).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = HexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_hex(s)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }
    };
}

fixed_bytes!(
    /// 20-byte account or contract address
    Address,
    20
);
fixed_bytes!(TxHash, 32);
fixed_bytes!(
    /// Identifier of a condition prepared on the conditional tokens contract
    ConditionId,
    32
);
fixed_bytes!(QuestionId, 32);
fixed_bytes!(
    /// Commitment to a combination of outcome-slot selections across one
    /// or more conditions. The all-zero value is the root collection.
    CollectionId,
    32
);
fixed_bytes!(
    /// Commitment over (collateral, collection); the unit of ownership
    PositionId,
    32
);

impl PositionId {
    /// Canonical position for a numeric token identifier.
    ///
    /// Token identifiers arrive as unsigned integers whose hex spelling may
    /// have odd length; they go through the same normalization as any other
    /// hex identifier before being used as a ledger key.
    pub fn from_token_id(token_id: &BigUint) -> Result<Self, HexError> {
        Self::from_hex(&token_id.to_str_radix(16))
    }

    pub fn to_token_id(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}

/// Single-slot index set, encoded as a big-endian uint256 bitmask.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct IndexSet([u8; 32]);

impl IndexSet {
    pub const MAX_SLOTS: u32 = 256;

    /// `1 << slot`; `None` if the slot does not fit in 256 bits.
    pub fn singleton(slot: u32) -> Option<Self> {
        if slot >= Self::MAX_SLOTS {
            return None;
        }
        let mut bytes = [0u8; 32];
        bytes[31 - (slot / 8) as usize] = 1 << (slot % 8);
        Some(Self(bytes))
    }

    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }
}
