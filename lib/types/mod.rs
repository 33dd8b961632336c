use serde::{Deserialize, Serialize};

mod hashes;
pub mod records;

pub use hashes::{
    Address, CollectionId, ConditionId, Hash, HexError, IndexSet, PositionId,
    QuestionId, TxHash, keccak256, normalize_hex,
};
pub use records::{
    ConditionResolution, Event, FundingChange, FundingKind, MarketCreated,
    PoolShareTransfer, Record, Trade, TradeKind, TransferBatch, TransferSingle,
};

/// Unsigned on-chain quantity (uint256)
pub type Amount = num::BigUint;

/// Signed ledger balance. Balances may go transiently negative when
/// records arrive mis-ordered and are never clamped.
pub type Balance = num::BigInt;

/// Where a record came from on chain
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Provenance {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub transaction_hash: TxHash,
    pub log_index: u32,
}

impl Provenance {
    pub fn event_key(&self) -> EventKey {
        EventKey {
            transaction_hash: self.transaction_hash,
            log_index: self.log_index,
        }
    }
}

/// Unique key of a single log within the chain: (transaction, log index)
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
pub struct EventKey {
    pub transaction_hash: TxHash,
    pub log_index: u32,
}

impl std::fmt::Display for EventKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.transaction_hash, self.log_index)
    }
}
