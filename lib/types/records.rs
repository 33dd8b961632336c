//! Inbound records, delivered one at a time in chain order

use serde::{Deserialize, Serialize};

use super::{Address, Amount, CollectionId, ConditionId, Provenance, QuestionId};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Record {
    pub provenance: Provenance,
    pub event: Event,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    strum::Display,
)]
pub enum TradeKind {
    Buy,
    Sell,
}

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    strum::Display,
)]
pub enum FundingKind {
    Added,
    Removed,
}

/// A fixed-product market maker was deployed
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MarketCreated {
    pub creator: Address,
    pub market: Address,
    pub conditional_tokens: Address,
    pub collateral_token: Address,
    pub condition_ids: Vec<ConditionId>,
    pub fee: Amount,
    pub max_fee: Amount,
    pub end_time: u64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConditionResolution {
    pub condition_id: ConditionId,
    pub oracle: Address,
    pub question_id: QuestionId,
    pub outcome_slot_count: u32,
    pub payout_numerators: Vec<Amount>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TransferSingle {
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub id: Amount,
    pub value: Amount,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TransferBatch {
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub ids: Vec<Amount>,
    pub values: Vec<Amount>,
}

/// Liquidity-share transfer emitted by a market's pool token
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PoolShareTransfer {
    pub market: Address,
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Trade {
    pub market: Address,
    pub kind: TradeKind,
    pub counterparty: Address,
    /// Investment amount for buys, return amount for sells
    pub principal: Amount,
    pub fee: Amount,
    pub outcome_index: u32,
    /// Tokens bought, or tokens sold
    pub outcome_tokens: Amount,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FundingChange {
    pub market: Address,
    pub kind: FundingKind,
    pub funder: Address,
    pub amounts: Vec<Amount>,
    pub shares: Amount,
    /// Only present on removals
    pub fee_pool_remainder: Option<Amount>,
}

#[derive(
    Clone, Debug, Deserialize, Eq, PartialEq, Serialize, strum::IntoStaticStr,
)]
pub enum Event {
    MarketCreated(MarketCreated),
    ConditionPreparation {
        condition_id: ConditionId,
        oracle: Address,
        question_id: QuestionId,
        outcome_slot_count: u32,
    },
    ConditionResolution(ConditionResolution),
    PositionSplit {
        stakeholder: Address,
        collateral_token: Address,
        parent_collection_id: CollectionId,
        condition_id: ConditionId,
        partition: Vec<Amount>,
        amount: Amount,
    },
    PositionsMerge {
        stakeholder: Address,
        collateral_token: Address,
        parent_collection_id: CollectionId,
        condition_id: ConditionId,
        partition: Vec<Amount>,
        amount: Amount,
    },
    PayoutRedemption {
        redeemer: Address,
        collateral_token: Address,
        parent_collection_id: CollectionId,
        condition_id: ConditionId,
        index_sets: Vec<Amount>,
        payout: Amount,
    },
    TransferSingle(TransferSingle),
    TransferBatch(TransferBatch),
    PoolShareTransfer(PoolShareTransfer),
    Trade(Trade),
    FundingChange(FundingChange),
}

impl Event {
    pub fn name(&self) -> &'static str {
        self.into()
    }
}
