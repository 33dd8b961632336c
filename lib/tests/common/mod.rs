#![allow(dead_code)]

use std::{
    cell::Cell,
    collections::{HashMap, HashSet},
};

use outcome_ledger::{
    Config, Indexer,
    oracle::{self, ConditionalTokens},
    positions::LocalHash,
    types::{
        Address, Amount, CollectionId, ConditionId, ConditionResolution,
        Event, IndexSet, MarketCreated, PositionId, Provenance, QuestionId,
        Record, TransferBatch, TransferSingle, TxHash,
    },
};
use tempfile::TempDir;

/// Deterministic conditional tokens contract backed by local hashing
#[derive(Default)]
pub struct MockOracle {
    pub slot_counts: HashMap<ConditionId, u32>,
    /// Conditions whose slot count call reverts
    pub revert_slot_count: HashSet<ConditionId>,
    /// (condition, slot) pairs whose collection call reverts
    pub revert_collection: HashSet<(ConditionId, u32)>,
    /// Flip a bit in every position id returned
    pub corrupt_positions: bool,
    pub calls: Cell<usize>,
}

impl MockOracle {
    pub fn with_slots(slots: &[(ConditionId, u32)]) -> Self {
        Self {
            slot_counts: slots.iter().copied().collect(),
            ..Self::default()
        }
    }

    fn revert(&self, reason: &str) -> oracle::Error {
        oracle::Error::Reverted {
            contract: conditional_tokens(),
            reason: reason.to_owned(),
        }
    }
}

impl ConditionalTokens for MockOracle {
    fn get_outcome_slot_count(
        &self,
        _contract: &Address,
        condition_id: &ConditionId,
    ) -> Result<u32, oracle::Error> {
        self.calls.set(self.calls.get() + 1);
        if self.revert_slot_count.contains(condition_id) {
            return Err(self.revert("getOutcomeSlotCount"));
        }
        // unprepared conditions report zero slots
        Ok(self.slot_counts.get(condition_id).copied().unwrap_or(0))
    }

    fn get_collection_id(
        &self,
        _contract: &Address,
        parent: &CollectionId,
        condition_id: &ConditionId,
        index_set: &IndexSet,
    ) -> Result<CollectionId, oracle::Error> {
        self.calls.set(self.calls.get() + 1);
        let slot = index_set.to_biguint().trailing_zeros().unwrap_or(0) as u32;
        if self.revert_collection.contains(&(*condition_id, slot)) {
            return Err(self.revert("getCollectionId"));
        }
        Ok(LocalHash::hash_collection(parent, condition_id, index_set))
    }

    fn get_position_id(
        &self,
        _contract: &Address,
        collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> Result<PositionId, oracle::Error> {
        self.calls.set(self.calls.get() + 1);
        let mut position =
            LocalHash::hash_position(collateral_token, collection_id);
        if self.corrupt_positions {
            position.0[0] ^= 1;
        }
        Ok(position)
    }
}

pub fn open_indexer(
    config: Config,
    oracle: MockOracle,
) -> (TempDir, Indexer<MockOracle>) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: dir.path().to_owned(),
        map_size: 64 * 1024 * 1024,
        ..config
    };
    let indexer = Indexer::new(config, oracle).unwrap();
    (dir, indexer)
}

pub fn address(byte: u8) -> Address {
    Address::new([byte; 20])
}

pub fn condition(byte: u8) -> ConditionId {
    ConditionId::new([byte; 32])
}

pub fn conditional_tokens() -> Address {
    address(0xc7)
}

pub fn amount(value: u64) -> Amount {
    Amount::from(value)
}

pub fn token_id(position: &PositionId) -> Amount {
    position.to_token_id()
}

/// Records need unique (transaction, log index) keys; derive both from a
/// running counter.
pub fn record(seq: u32, event: Event) -> Record {
    let mut transaction_hash = [0u8; 32];
    transaction_hash[28..].copy_from_slice(&seq.to_be_bytes());
    Record {
        provenance: Provenance {
            block_number: u64::from(seq),
            block_timestamp: 1_700_000_000 + u64::from(seq) * 12,
            transaction_hash: TxHash::new(transaction_hash),
            log_index: seq,
        },
        event,
    }
}

pub fn market_created(
    market: Address,
    collateral_token: Address,
    condition_ids: Vec<ConditionId>,
) -> Event {
    Event::MarketCreated(MarketCreated {
        creator: address(0xcc),
        market,
        conditional_tokens: conditional_tokens(),
        collateral_token,
        condition_ids,
        fee: amount(20_000_000_000_000_000),
        max_fee: amount(50_000_000_000_000_000),
        end_time: 1_800_000_000,
    })
}

pub fn transfer(
    from: Address,
    to: Address,
    position: &PositionId,
    value: u64,
) -> Event {
    Event::TransferSingle(TransferSingle {
        operator: from,
        from,
        to,
        id: token_id(position),
        value: amount(value),
    })
}

pub fn transfer_batch(
    from: Address,
    to: Address,
    positions: &[PositionId],
    values: &[u64],
) -> Event {
    Event::TransferBatch(TransferBatch {
        operator: from,
        from,
        to,
        ids: positions.iter().map(token_id).collect(),
        values: values.iter().copied().map(amount).collect(),
    })
}

pub fn resolution(condition_id: ConditionId, payouts: &[u64]) -> Event {
    Event::ConditionResolution(ConditionResolution {
        condition_id,
        oracle: address(0x0a),
        question_id: QuestionId::new([0x51; 32]),
        outcome_slot_count: payouts.len() as u32,
        payout_numerators: payouts.iter().copied().map(amount).collect(),
    })
}
