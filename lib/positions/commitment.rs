//! One-way combiners for collection and position identifiers

use thiserror::Error;

use crate::{
    oracle::{self, ConditionalTokens},
    types::{
        Address, CollectionId, ConditionId, IndexSet, PositionId, keccak256,
    },
};

#[derive(Debug, Error)]
pub enum CommitmentError {
    #[error(transparent)]
    Oracle(#[from] oracle::Error),
    #[error(
        "oracle returned {remote} for {what}, but the local commitment is {local}"
    )]
    Mismatch {
        what: &'static str,
        local: String,
        remote: String,
    },
}

pub trait CommitmentScheme {
    /// Commit to `index_set` of `condition_id` on top of `parent`.
    fn collection_id(
        &self,
        parent: &CollectionId,
        condition_id: &ConditionId,
        index_set: &IndexSet,
    ) -> Result<CollectionId, CommitmentError>;

    /// Commit to a collection backed by `collateral_token`.
    fn position_id(
        &self,
        collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> Result<PositionId, CommitmentError>;
}

/// Keccak-256 over the packed operands. This is the canonical scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalHash;

impl LocalHash {
    pub fn hash_collection(
        parent: &CollectionId,
        condition_id: &ConditionId,
        index_set: &IndexSet,
    ) -> CollectionId {
        let mut preimage = [0u8; 96];
        preimage[..32].copy_from_slice(parent.as_bytes());
        preimage[32..64].copy_from_slice(condition_id.as_bytes());
        preimage[64..].copy_from_slice(&index_set.to_be_bytes());
        CollectionId::new(keccak256(&preimage))
    }

    pub fn hash_position(
        collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> PositionId {
        let mut preimage = [0u8; Address::LEN + CollectionId::LEN];
        preimage[..Address::LEN].copy_from_slice(collateral_token.as_bytes());
        preimage[Address::LEN..].copy_from_slice(collection_id.as_bytes());
        PositionId::new(keccak256(&preimage))
    }
}

impl CommitmentScheme for LocalHash {
    fn collection_id(
        &self,
        parent: &CollectionId,
        condition_id: &ConditionId,
        index_set: &IndexSet,
    ) -> Result<CollectionId, CommitmentError> {
        Ok(Self::hash_collection(parent, condition_id, index_set))
    }

    fn position_id(
        &self,
        collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> Result<PositionId, CommitmentError> {
        Ok(Self::hash_position(collateral_token, collection_id))
    }
}

/// Delegates every commitment to the conditional tokens contract.
#[derive(Debug)]
pub struct RemoteOracle<'a, O> {
    pub oracle: &'a O,
    pub contract: Address,
}

impl<O> Clone for RemoteOracle<'_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for RemoteOracle<'_, O> {}

impl<O> CommitmentScheme for RemoteOracle<'_, O>
where
    O: ConditionalTokens,
{
    fn collection_id(
        &self,
        parent: &CollectionId,
        condition_id: &ConditionId,
        index_set: &IndexSet,
    ) -> Result<CollectionId, CommitmentError> {
        let res = self.oracle.get_collection_id(
            &self.contract,
            parent,
            condition_id,
            index_set,
        )?;
        Ok(res)
    }

    fn position_id(
        &self,
        collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> Result<PositionId, CommitmentError> {
        let res = self.oracle.get_position_id(
            &self.contract,
            collateral_token,
            collection_id,
        )?;
        Ok(res)
    }
}

/// Local hashing is authoritative; the oracle only verifies it.
///
/// An unreachable oracle does not block derivation. A reachable oracle that
/// disagrees is an error for that combination, since one of the two paths
/// is computing something other than the contract's identifiers.
#[derive(Debug)]
pub struct CrossChecked<'a, O> {
    pub remote: RemoteOracle<'a, O>,
}

impl<O> Clone for CrossChecked<'_, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<O> Copy for CrossChecked<'_, O> {}

impl<O> CrossChecked<'_, O> {
    fn check<T>(
        &self,
        what: &'static str,
        local: T,
        remote: Result<T, CommitmentError>,
    ) -> Result<T, CommitmentError>
    where
        T: Eq + std::fmt::Display,
    {
        match remote {
            Ok(remote) if remote == local => Ok(local),
            Ok(remote) => {
                tracing::error!(
                    %local,
                    %remote,
                    "{what} cross-check disagrees with oracle"
                );
                Err(CommitmentError::Mismatch {
                    what,
                    local: local.to_string(),
                    remote: remote.to_string(),
                })
            }
            Err(err) => {
                tracing::warn!(
                    %local,
                    "could not cross-check {what} against oracle: {err}"
                );
                Ok(local)
            }
        }
    }
}

impl<O> CommitmentScheme for CrossChecked<'_, O>
where
    O: ConditionalTokens,
{
    fn collection_id(
        &self,
        parent: &CollectionId,
        condition_id: &ConditionId,
        index_set: &IndexSet,
    ) -> Result<CollectionId, CommitmentError> {
        let local = LocalHash::hash_collection(parent, condition_id, index_set);
        let remote = self.remote.collection_id(parent, condition_id, index_set);
        self.check("collection id", local, remote)
    }

    fn position_id(
        &self,
        collateral_token: &Address,
        collection_id: &CollectionId,
    ) -> Result<PositionId, CommitmentError> {
        let local = LocalHash::hash_position(collateral_token, collection_id);
        let remote = self.remote.position_id(collateral_token, collection_id);
        self.check("position id", local, remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_preimage_is_packed() {
        let collateral = Address::new([0x11; 20]);
        let collection = CollectionId::new([0x22; 32]);
        let mut preimage = vec![0x11; 20];
        preimage.extend_from_slice(&[0x22; 32]);
        assert_eq!(
            LocalHash::hash_position(&collateral, &collection),
            PositionId::new(keccak256(&preimage))
        );
    }

    #[test]
    fn collection_is_order_sensitive() {
        let a = ConditionId::new([1; 32]);
        let b = ConditionId::new([2; 32]);
        let slot0 = IndexSet::singleton(0).unwrap();
        let slot1 = IndexSet::singleton(1).unwrap();
        let ab = LocalHash::hash_collection(
            &LocalHash::hash_collection(&CollectionId::ZERO, &b, &slot1),
            &a,
            &slot0,
        );
        let ba = LocalHash::hash_collection(
            &LocalHash::hash_collection(&CollectionId::ZERO, &a, &slot0),
            &b,
            &slot1,
        );
        assert_ne!(ab, ba);
    }

    #[test]
    fn offline_oracle_cannot_commit() {
        let remote = RemoteOracle {
            oracle: &oracle::Offline,
            contract: Address::ZERO,
        };
        assert!(matches!(
            remote.position_id(&Address::ZERO, &CollectionId::ZERO),
            Err(CommitmentError::Oracle(oracle::Error::Unavailable(_)))
        ));
    }

    #[test]
    fn cross_check_tolerates_offline_oracle() {
        let scheme = CrossChecked {
            remote: RemoteOracle {
                oracle: &oracle::Offline,
                contract: Address::ZERO,
            },
        };
        let collateral = Address::new([7; 20]);
        assert_eq!(
            scheme.position_id(&collateral, &CollectionId::ZERO).unwrap(),
            LocalHash::hash_position(&collateral, &CollectionId::ZERO)
        );
    }
}
