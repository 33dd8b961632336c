//! Append-only log rows

use fallible_iterator::FallibleIterator as _;
use heed::types::SerdeBincode;
use serde::{Deserialize, Serialize};
use sneed::{DatabaseDup, DatabaseUnique, RoTxn, RwTxn, db, env};

use crate::{
    state::Error,
    types::{
        Address, Amount, ConditionId, EventKey, FundingKind, Provenance,
        QuestionId, Record, TradeKind,
    },
};

/// One applied outcome-token movement. Batch transfers produce one row per
/// element.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TransferRow {
    pub index: u64,
    pub market: Address,
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub outcome_index: u32,
    pub amount: Amount,
    pub provenance: Provenance,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TradeRow {
    /// Per-kind order index
    pub index: u64,
    pub market: Address,
    pub kind: TradeKind,
    pub counterparty: Address,
    pub principal: Amount,
    pub fee: Amount,
    pub outcome_index: u32,
    pub outcome_tokens: Amount,
    /// Pool prices after the trade; empty when undefined
    pub marginal_prices: Vec<f64>,
    pub provenance: Provenance,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FundingRow {
    pub index: u64,
    pub market: Address,
    pub kind: FundingKind,
    pub funder: Address,
    pub amounts: Vec<Amount>,
    pub shares: Amount,
    pub fee_pool_remainder: Option<Amount>,
    pub provenance: Provenance,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ResolutionRow {
    pub index: u64,
    pub condition_id: ConditionId,
    pub oracle: Address,
    pub question_id: QuestionId,
    pub outcome_slot_count: u32,
    pub payout_numerators: Vec<Amount>,
    /// Markets settled by this resolution
    pub markets: Vec<Address>,
    pub provenance: Provenance,
}

#[derive(Clone)]
pub struct Dbs {
    transfers: DatabaseUnique<
        SerdeBincode<(EventKey, u32)>,
        SerdeBincode<TransferRow>,
    >,
    /// (market, holder) -> keys of transfer rows debiting or crediting the
    /// holder
    transfers_by_holder: DatabaseDup<
        SerdeBincode<(Address, Address)>,
        SerdeBincode<(EventKey, u32)>,
    >,
    trades: DatabaseUnique<SerdeBincode<EventKey>, SerdeBincode<TradeRow>>,
    funding: DatabaseUnique<SerdeBincode<EventKey>, SerdeBincode<FundingRow>>,
    resolutions:
        DatabaseUnique<SerdeBincode<EventKey>, SerdeBincode<ResolutionRow>>,
    /// Conditional tokens events kept verbatim
    conditional_tokens:
        DatabaseUnique<SerdeBincode<EventKey>, SerdeBincode<Record>>,
}

impl Dbs {
    pub const NUM_DBS: u32 = 6;

    pub(in crate::state) fn new(
        env: &sneed::Env,
        rwtxn: &mut RwTxn,
    ) -> Result<Self, env::error::CreateDb> {
        let transfers = DatabaseUnique::create(env, rwtxn, "log_transfers")?;
        let transfers_by_holder =
            DatabaseDup::create(env, rwtxn, "log_transfers_by_holder")?;
        let trades = DatabaseUnique::create(env, rwtxn, "log_trades")?;
        let funding = DatabaseUnique::create(env, rwtxn, "log_funding")?;
        let resolutions =
            DatabaseUnique::create(env, rwtxn, "log_resolutions")?;
        let conditional_tokens =
            DatabaseUnique::create(env, rwtxn, "log_conditional_tokens")?;
        Ok(Self {
            transfers,
            transfers_by_holder,
            trades,
            funding,
            resolutions,
            conditional_tokens,
        })
    }

    pub fn put_transfer(
        &self,
        rwtxn: &mut RwTxn,
        element: u32,
        row: &TransferRow,
    ) -> Result<(), db::error::Put> {
        let key = (row.provenance.event_key(), element);
        self.transfers.put(rwtxn, &key, row)?;
        for holder in [row.from, row.to] {
            if !holder.is_zero() {
                self.transfers_by_holder
                    .put(rwtxn, &(row.market, holder), &key)?;
            }
        }
        Ok(())
    }

    pub fn put_trade(
        &self,
        rwtxn: &mut RwTxn,
        row: &TradeRow,
    ) -> Result<(), db::error::Put> {
        self.trades.put(rwtxn, &row.provenance.event_key(), row)
    }

    pub fn put_funding(
        &self,
        rwtxn: &mut RwTxn,
        row: &FundingRow,
    ) -> Result<(), db::error::Put> {
        self.funding.put(rwtxn, &row.provenance.event_key(), row)
    }

    pub fn put_resolution(
        &self,
        rwtxn: &mut RwTxn,
        row: &ResolutionRow,
    ) -> Result<(), db::error::Put> {
        self.resolutions.put(rwtxn, &row.provenance.event_key(), row)
    }

    pub fn put_conditional_tokens_event(
        &self,
        rwtxn: &mut RwTxn,
        record: &Record,
    ) -> Result<(), db::error::Put> {
        self.conditional_tokens
            .put(rwtxn, &record.provenance.event_key(), record)
    }

    pub fn try_get_conditional_tokens_event(
        &self,
        rotxn: &RoTxn,
        key: &EventKey,
    ) -> Result<Option<Record>, db::error::TryGet> {
        self.conditional_tokens.try_get(rotxn, key)
    }

    /// Transfers in `market` that debit or credit `holder`, in order
    pub fn transfers_for(
        &self,
        rotxn: &RoTxn,
        market: &Address,
        holder: &Address,
    ) -> Result<Vec<TransferRow>, Error> {
        let index_key = (*market, *holder);
        let mut keys = self.transfers_by_holder.get(rotxn, &index_key)?;
        let mut res = Vec::new();
        while let Some(key) = keys.next()? {
            if let Some(row) = self.transfers.try_get(rotxn, &key)? {
                res.push(row);
            }
        }
        res.sort_by_key(|row| row.index);
        Ok(res)
    }

    /// Trades in `market`, buys and sells interleaved in chain order
    pub fn trades_for(
        &self,
        rotxn: &RoTxn,
        market: &Address,
    ) -> Result<Vec<TradeRow>, Error> {
        let mut res: Vec<TradeRow> = self
            .trades
            .iter(rotxn)?
            .filter(|(_, row)| Ok(row.market == *market))
            .map(|(_, row)| Ok(row))
            .collect()?;
        res.sort_by_key(|row| {
            (row.provenance.block_number, row.provenance.log_index)
        });
        Ok(res)
    }

    pub fn funding_for(
        &self,
        rotxn: &RoTxn,
        market: &Address,
    ) -> Result<Vec<FundingRow>, Error> {
        let mut res: Vec<FundingRow> = self
            .funding
            .iter(rotxn)?
            .filter(|(_, row)| Ok(row.market == *market))
            .map(|(_, row)| Ok(row))
            .collect()?;
        res.sort_by_key(|row| {
            (row.provenance.block_number, row.provenance.log_index)
        });
        Ok(res)
    }

    pub fn resolutions_of(
        &self,
        rotxn: &RoTxn,
        condition_id: &ConditionId,
    ) -> Result<Vec<ResolutionRow>, Error> {
        let mut res: Vec<ResolutionRow> = self
            .resolutions
            .iter(rotxn)?
            .filter(|(_, row)| Ok(row.condition_id == *condition_id))
            .map(|(_, row)| Ok(row))
            .collect()?;
        res.sort_by_key(|row| row.index);
        Ok(res)
    }
}
