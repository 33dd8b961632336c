//! Combinatorial position derivation
//!
//! Every market splits its collateral over the full product of its
//! conditions' outcome slots. Atomic combination `k` is decoded into one
//! slot per condition (mixed radix, first condition varying fastest), and
//! its collection identifier is built by folding the conditions from last
//! to first over the all-zero root collection.

use thiserror::Error;

use crate::{
    config::{CommitmentMode, Config},
    oracle::ConditionalTokens,
    types::{Address, CollectionId, ConditionId, IndexSet, PositionId},
};

mod commitment;

pub use commitment::{
    CommitmentError, CommitmentScheme, CrossChecked, LocalHash, RemoteOracle,
};

/// Slot counts the contract can represent in a uint256 index set.
pub const SLOT_COUNT_RANGE: std::ops::RangeInclusive<u32> =
    2..=IndexSet::MAX_SLOTS;

#[derive(Debug, Error)]
#[error("market has {total} atomic positions (max {max})")]
pub struct TooManyPositions {
    pub slot_counts: Vec<u32>,
    /// Saturates at `u128::MAX`
    pub total: u128,
    pub max: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DerivedPosition {
    pub outcome_index: u32,
    pub collection_id: CollectionId,
    pub position_id: PositionId,
}

#[derive(Debug)]
pub struct SkippedPosition {
    pub outcome_index: u32,
    pub error: CommitmentError,
}

#[derive(Debug, Default)]
pub struct Derivation {
    /// Slot count used for each condition, in declared order
    pub slot_counts: Vec<u32>,
    /// Successfully derived positions, in enumeration order
    pub positions: Vec<DerivedPosition>,
    /// Combinations whose commitment failed. They have no position and
    /// will surface as unknown identifiers at transfer time.
    pub skipped: Vec<SkippedPosition>,
}

impl Derivation {
    pub fn position_ids(&self) -> Vec<PositionId> {
        self.positions.iter().map(|p| p.position_id).collect()
    }
}

/// Decode atomic combination `k` into one slot index per condition.
pub fn mixed_radix_digits(k: u64, slot_counts: &[u32]) -> Vec<u32> {
    let mut cur = k;
    slot_counts
        .iter()
        .map(|&slots| {
            let slots = u64::from(slots.max(1));
            let digit = cur % slots;
            cur /= slots;
            digit as u32
        })
        .collect()
}

/// Derive the collection identifier for one slot selection per condition.
pub fn collection_for<S>(
    scheme: &S,
    condition_ids: &[ConditionId],
    indices: &[u32],
) -> Result<CollectionId, CommitmentError>
where
    S: CommitmentScheme + ?Sized,
{
    condition_ids.iter().zip(indices).rev().try_fold(
        CollectionId::ZERO,
        |parent, (condition_id, &slot)| {
            // slot counts are validated against SLOT_COUNT_RANGE, so this
            // only fails for hand-built inputs
            let index_set = IndexSet::singleton(slot).ok_or_else(|| {
                crate::oracle::Error::Malformed {
                    contract: Address::ZERO,
                    reason: format!("outcome slot {slot} exceeds index set"),
                }
            })?;
            scheme.collection_id(&parent, condition_id, &index_set)
        },
    )
}

/// Enumerate every atomic position under `scheme`.
///
/// A failed commitment skips only the affected combination.
pub fn enumerate<S>(
    scheme: &S,
    collateral_token: &Address,
    condition_ids: &[ConditionId],
    slot_counts: &[u32],
    total: u32,
) -> (Vec<DerivedPosition>, Vec<SkippedPosition>)
where
    S: CommitmentScheme + ?Sized,
{
    let mut positions = Vec::with_capacity(total as usize);
    let mut skipped = Vec::new();
    for outcome_index in 0..total {
        let indices = mixed_radix_digits(u64::from(outcome_index), slot_counts);
        let derived = collection_for(scheme, condition_ids, &indices).and_then(
            |collection_id| {
                let position_id =
                    scheme.position_id(collateral_token, &collection_id)?;
                Ok(DerivedPosition {
                    outcome_index,
                    collection_id,
                    position_id,
                })
            },
        );
        match derived {
            Ok(position) => positions.push(position),
            Err(error) => {
                tracing::error!(
                    %collateral_token,
                    outcome_index,
                    "skipping atomic position: {error}"
                );
                skipped.push(SkippedPosition {
                    outcome_index,
                    error,
                })
            }
        }
    }
    (positions, skipped)
}

pub struct PositionDeriver<'a, O> {
    oracle: &'a O,
    mode: CommitmentMode,
    default_slot_count: u32,
    max_atomic_positions: usize,
}

impl<'a, O> PositionDeriver<'a, O>
where
    O: ConditionalTokens,
{
    pub fn new(oracle: &'a O, config: &Config) -> Self {
        Self {
            oracle,
            mode: config.commitment,
            default_slot_count: config.default_outcome_slot_count,
            max_atomic_positions: config.max_atomic_positions,
        }
    }

    /// Outcome slot count of each condition. Oracle failures and
    /// counts the contract cannot represent fall back to the default.
    pub fn outcome_slot_counts(
        &self,
        contract: &Address,
        condition_ids: &[ConditionId],
    ) -> Vec<u32> {
        condition_ids
            .iter()
            .map(|condition_id| {
                match self.oracle.get_outcome_slot_count(contract, condition_id)
                {
                    Ok(count) if SLOT_COUNT_RANGE.contains(&count) => count,
                    Ok(count) => {
                        tracing::warn!(
                            %condition_id,
                            "oracle reported {count} outcome slots, using default of {}",
                            self.default_slot_count
                        );
                        self.default_slot_count
                    }
                    Err(err) => {
                        tracing::warn!(
                            %condition_id,
                            "failed to read outcome slot count, using default of {}: {err}",
                            self.default_slot_count
                        );
                        self.default_slot_count
                    }
                }
            })
            .collect()
    }

    fn total(&self, slot_counts: &[u32]) -> Result<u32, TooManyPositions> {
        let total = slot_counts
            .iter()
            .try_fold(1u128, |acc, &slots| acc.checked_mul(u128::from(slots)))
            .unwrap_or(u128::MAX);
        let too_many = TooManyPositions {
            slot_counts: slot_counts.to_vec(),
            total,
            max: self.max_atomic_positions,
        };
        if total > self.max_atomic_positions as u128 {
            return Err(too_many);
        }
        u32::try_from(total).map_err(|_| too_many)
    }

    /// Derive every atomic position of a market.
    ///
    /// `contract` is the conditional tokens contract the market is bound to.
    pub fn derive(
        &self,
        contract: &Address,
        collateral_token: &Address,
        condition_ids: &[ConditionId],
    ) -> Result<Derivation, TooManyPositions> {
        let slot_counts = self.outcome_slot_counts(contract, condition_ids);
        let total = self.total(&slot_counts)?;
        let remote = RemoteOracle {
            oracle: self.oracle,
            contract: *contract,
        };
        let (positions, skipped) = match self.mode {
            CommitmentMode::Local => enumerate(
                &LocalHash,
                collateral_token,
                condition_ids,
                &slot_counts,
                total,
            ),
            CommitmentMode::Oracle => enumerate(
                &remote,
                collateral_token,
                condition_ids,
                &slot_counts,
                total,
            ),
            CommitmentMode::CrossCheck => enumerate(
                &CrossChecked { remote },
                collateral_token,
                condition_ids,
                &slot_counts,
                total,
            ),
        };
        Ok(Derivation {
            slot_counts,
            positions,
            skipped,
        })
    }
}
