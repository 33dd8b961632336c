//! Read-only calls against the conditional tokens contract

use thiserror::Error;

use crate::types::{Address, CollectionId, ConditionId, IndexSet, PositionId};

#[derive(Debug, Error)]
pub enum Error {
    #[error("call to {contract} reverted: {reason}")]
    Reverted { contract: Address, reason: String },
    #[error("malformed reply from {contract}: {reason}")]
    Malformed { contract: Address, reason: String },
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

/// Single-attempt, blocking view calls. Implementations must not retry;
/// callers decide how to degrade on failure.
pub trait ConditionalTokens {
    fn get_outcome_slot_count(
        &self,
        contract: &Address,
        condition_id: &ConditionId,
    ) -> Result<u32, Error>;

    fn get_collection_id(
        &self,
        contract: &Address,
        parent: &CollectionId,
        condition_id: &ConditionId,
        index_set: &IndexSet,
    ) -> Result<CollectionId, Error>;

    fn get_position_id(
        &self,
        contract: &Address,
        collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> Result<PositionId, Error>;
}

impl<T> ConditionalTokens for &T
where
    T: ConditionalTokens + ?Sized,
{
    fn get_outcome_slot_count(
        &self,
        contract: &Address,
        condition_id: &ConditionId,
    ) -> Result<u32, Error> {
        (**self).get_outcome_slot_count(contract, condition_id)
    }

    fn get_collection_id(
        &self,
        contract: &Address,
        parent: &CollectionId,
        condition_id: &ConditionId,
        index_set: &IndexSet,
    ) -> Result<CollectionId, Error> {
        (**self).get_collection_id(contract, parent, condition_id, index_set)
    }

    fn get_position_id(
        &self,
        contract: &Address,
        collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> Result<PositionId, Error> {
        (**self).get_position_id(contract, collateral_token, collection_id)
    }
}

/// Oracle for deployments without chain access. Every call fails, so slot
/// counts fall back to the configured default.
#[derive(Clone, Copy, Debug, Default)]
pub struct Offline;

impl ConditionalTokens for Offline {
    fn get_outcome_slot_count(
        &self,
        _contract: &Address,
        condition_id: &ConditionId,
    ) -> Result<u32, Error> {
        Err(Error::Unavailable(format!(
            "no chain access to read slot count of {condition_id}"
        )))
    }

    fn get_collection_id(
        &self,
        _contract: &Address,
        _parent: &CollectionId,
        condition_id: &ConditionId,
        _index_set: &IndexSet,
    ) -> Result<CollectionId, Error> {
        Err(Error::Unavailable(format!(
            "no chain access to derive collection under {condition_id}"
        )))
    }

    fn get_position_id(
        &self,
        _contract: &Address,
        _collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> Result<PositionId, Error> {
        Err(Error::Unavailable(format!(
            "no chain access to derive position of {collection_id}"
        )))
    }
}
