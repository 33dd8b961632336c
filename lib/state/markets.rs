//! Markets, conditions and the position reverse index

use fallible_iterator::FallibleIterator as _;
use heed::types::SerdeBincode;
use serde::{Deserialize, Serialize};
use sneed::{DatabaseUnique, RoTxn, RwTxn, db, env};

use crate::{
    state::Error,
    types::{Address, Amount, ConditionId, PositionId, Provenance},
};

/// A fixed-product market maker over the combinatorial outcome space of its
/// conditions
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Market {
    pub id: Address,
    /// Creation order among markets
    pub index: u64,
    pub creator: Address,
    pub conditional_tokens: Address,
    pub collateral_token: Address,
    pub condition_ids: Vec<ConditionId>,
    /// Slot count used for each condition when deriving positions
    pub outcome_slot_counts: Vec<u32>,
    pub fee: Amount,
    pub max_fee: Amount,
    pub end_time: u64,
    /// Derived positions in enumeration order. Combinations whose
    /// derivation failed are absent, so this may be shorter than the
    /// product of the slot counts.
    pub position_ids: Vec<PositionId>,
    pub solved: bool,
    pub payout_numerators: Option<Vec<Amount>>,
    pub collateral_volume: Amount,
    pub created: Provenance,
}

impl Market {
    /// Balance vector length for holdings in this market
    pub fn outcome_count(&self) -> usize {
        self.position_ids.len()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Condition {
    pub id: ConditionId,
    /// Markets created while referencing this condition, in creation order
    pub markets: Vec<Address>,
    pub payout_numerators: Option<Vec<Amount>>,
    pub resolved: Option<Provenance>,
}

impl Condition {
    pub fn new(id: ConditionId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Reverse index row: which market slot a position belongs to
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PositionEntry {
    pub market: Address,
    pub outcome_index: u32,
}

#[derive(Clone)]
pub struct Dbs {
    markets: DatabaseUnique<SerdeBincode<Address>, SerdeBincode<Market>>,
    conditions: DatabaseUnique<SerdeBincode<ConditionId>, SerdeBincode<Condition>>,
    positions:
        DatabaseUnique<SerdeBincode<PositionId>, SerdeBincode<PositionEntry>>,
}

impl Dbs {
    pub const NUM_DBS: u32 = 3;

    pub(in crate::state) fn new(
        env: &sneed::Env,
        rwtxn: &mut RwTxn,
    ) -> Result<Self, env::error::CreateDb> {
        let markets = DatabaseUnique::create(env, rwtxn, "markets")?;
        let conditions = DatabaseUnique::create(env, rwtxn, "conditions")?;
        let positions =
            DatabaseUnique::create(env, rwtxn, "positions_to_market")?;
        Ok(Self {
            markets,
            conditions,
            positions,
        })
    }

    pub fn try_get_market(
        &self,
        rotxn: &RoTxn,
        market: &Address,
    ) -> Result<Option<Market>, db::error::TryGet> {
        self.markets.try_get(rotxn, market)
    }

    pub fn put_market(
        &self,
        rwtxn: &mut RwTxn,
        market: &Market,
    ) -> Result<(), db::error::Put> {
        self.markets.put(rwtxn, &market.id, market)
    }

    /// All markets, ordered by address
    pub fn get_all_markets(&self, rotxn: &RoTxn) -> Result<Vec<Market>, Error> {
        let markets = self
            .markets
            .iter(rotxn)?
            .map(|(_, market)| Ok(market))
            .collect()?;
        Ok(markets)
    }

    pub fn try_get_condition(
        &self,
        rotxn: &RoTxn,
        condition_id: &ConditionId,
    ) -> Result<Option<Condition>, db::error::TryGet> {
        self.conditions.try_get(rotxn, condition_id)
    }

    pub fn put_condition(
        &self,
        rwtxn: &mut RwTxn,
        condition: &Condition,
    ) -> Result<(), db::error::Put> {
        self.conditions.put(rwtxn, &condition.id, condition)
    }

    /// Record that `market` references `condition_id`, creating the
    /// condition row on first reference.
    pub fn add_condition_reference(
        &self,
        rwtxn: &mut RwTxn,
        condition_id: &ConditionId,
        market: &Address,
    ) -> Result<(), Error> {
        let mut condition = self
            .conditions
            .try_get(rwtxn, condition_id)?
            .unwrap_or_else(|| Condition::new(*condition_id));
        if !condition.markets.contains(market) {
            condition.markets.push(*market);
            self.conditions.put(rwtxn, condition_id, &condition)?;
        }
        Ok(())
    }

    pub fn try_get_position(
        &self,
        rotxn: &RoTxn,
        position: &PositionId,
    ) -> Result<Option<PositionEntry>, db::error::TryGet> {
        self.positions.try_get(rotxn, position)
    }

    /// Write a reverse index row unless the position is already mapped.
    ///
    /// Two markets over the same collateral and conditions derive the same
    /// positions; the first market to claim a position keeps it. Returns
    /// the entry that is in effect after the call.
    pub fn insert_position(
        &self,
        rwtxn: &mut RwTxn,
        position: &PositionId,
        entry: PositionEntry,
    ) -> Result<PositionEntry, Error> {
        if let Some(existing) = self.positions.try_get(rwtxn, position)? {
            if existing != entry {
                tracing::warn!(
                    %position,
                    claimed_by = %existing.market,
                    rejected = %entry.market,
                    "position is already mapped to another market slot"
                );
            }
            return Ok(existing);
        }
        self.positions.put(rwtxn, position, &entry)?;
        Ok(entry)
    }
}
