use num::Zero as _;
use sneed::RoTxn;

use crate::types::{Address, Balance, ConditionId, PositionId};

pub mod effect;
pub mod error;
pub mod holdings;
pub mod ledger;
pub mod logs;
pub mod markets;
pub mod record;
mod resolution;
pub mod sequence;

pub use effect::{Effect, Report, SkipReason};
pub use error::Error;
pub use holdings::{Holding, User};
pub use ledger::{BatchTransfer, OutcomeTransfer};
pub use logs::{FundingRow, ResolutionRow, TradeRow, TransferRow};
pub use markets::{Condition, Market, PositionEntry};
pub use sequence::{SequenceAllocator, SequenceTag};

/// Everything the indexer persists. Each record is applied inside a single
/// write transaction owned by the caller.
#[derive(Clone)]
pub struct State {
    pub(in crate::state) markets: markets::Dbs,
    pub(in crate::state) holdings: holdings::Dbs,
    pub(in crate::state) logs: logs::Dbs,
    pub(in crate::state) sequence: SequenceAllocator,
}

impl State {
    pub const NUM_DBS: u32 = markets::Dbs::NUM_DBS
        + holdings::Dbs::NUM_DBS
        + logs::Dbs::NUM_DBS
        + SequenceAllocator::NUM_DBS;

    pub fn new(env: &sneed::Env) -> Result<Self, Error> {
        let mut rwtxn = env.write_txn()?;
        let markets = markets::Dbs::new(env, &mut rwtxn)?;
        let holdings = holdings::Dbs::new(env, &mut rwtxn)?;
        let logs = logs::Dbs::new(env, &mut rwtxn)?;
        let sequence = SequenceAllocator::new(env, &mut rwtxn)?;
        rwtxn.commit()?;
        Ok(Self {
            markets,
            holdings,
            logs,
            sequence,
        })
    }

    pub fn markets(&self) -> &markets::Dbs {
        &self.markets
    }

    pub fn holdings(&self) -> &holdings::Dbs {
        &self.holdings
    }

    pub fn logs(&self) -> &logs::Dbs {
        &self.logs
    }

    pub fn sequence(&self) -> &SequenceAllocator {
        &self.sequence
    }

    pub fn try_get_market(
        &self,
        rotxn: &RoTxn,
        market: &Address,
    ) -> Result<Option<Market>, Error> {
        Ok(self.markets.try_get_market(rotxn, market)?)
    }

    pub fn try_get_condition(
        &self,
        rotxn: &RoTxn,
        condition_id: &ConditionId,
    ) -> Result<Option<Condition>, Error> {
        Ok(self.markets.try_get_condition(rotxn, condition_id)?)
    }

    pub fn try_get_position(
        &self,
        rotxn: &RoTxn,
        position: &PositionId,
    ) -> Result<Option<PositionEntry>, Error> {
        Ok(self.markets.try_get_position(rotxn, position)?)
    }

    pub fn try_get_holding(
        &self,
        rotxn: &RoTxn,
        market: &Address,
        holder: &Address,
    ) -> Result<Option<Holding>, Error> {
        Ok(self.holdings.try_get_holding(rotxn, market, holder)?)
    }

    pub fn try_get_user(
        &self,
        rotxn: &RoTxn,
        address: &Address,
    ) -> Result<Option<User>, Error> {
        Ok(self.holdings.try_get_user(rotxn, address)?)
    }

    pub fn counter(
        &self,
        rotxn: &RoTxn,
        tag: SequenceTag,
    ) -> Result<u64, Error> {
        Ok(self.sequence.current(rotxn, tag)?)
    }

    /// Per-slot sum of every holder's balance in `market`. Equals minted
    /// minus burned at each slot.
    pub fn total_supply(
        &self,
        rotxn: &RoTxn,
        market: &Address,
    ) -> Result<Vec<Balance>, Error> {
        let mut totals = vec![Balance::zero(); self.outcome_count(rotxn, market)?];
        for holding in self.holdings.holdings_for_market(rotxn, market)? {
            if holding.holder.is_zero() {
                continue;
            }
            if totals.len() < holding.balances.len() {
                totals.resize(holding.balances.len(), Balance::zero());
            }
            for (total, balance) in totals.iter_mut().zip(&holding.balances) {
                *total += balance;
            }
        }
        Ok(totals)
    }
}
