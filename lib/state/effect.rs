//! Outcomes of applying a record

use serde::{Deserialize, Serialize};

use crate::types::{Address, ConditionId, PositionId};

/// Why a record, or one element of it, left state untouched
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum SkipReason {
    /// Token identifier is outside every derived combinatorial space
    UnknownPosition(PositionId),
    /// Token identifier does not fit a position identifier
    MalformedTokenId,
    OutcomeIndexOutOfRange { index: u32, len: usize },
    UnknownCondition(ConditionId),
    UnknownMarket(Address),
    /// Transfer side is the mint/burn address
    ZeroAddress,
    /// Batch element without a counterpart in the other array
    LengthMismatch { ids: usize, amounts: usize },
    DuplicateMarket(Address),
    /// Commitment failed for one atomic combination of a new market
    PositionUnderivable { outcome_index: u32 },
    /// New market's combinatorial space exceeds the configured limit
    TooManyPositions { total: u128 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownPosition(position) => {
                write!(f, "unknown position {position}")
            }
            Self::MalformedTokenId => write!(f, "malformed token id"),
            Self::OutcomeIndexOutOfRange { index, len } => {
                write!(f, "outcome index {index} out of range for {len} slots")
            }
            Self::UnknownCondition(condition) => {
                write!(f, "unknown condition {condition}")
            }
            Self::UnknownMarket(market) => write!(f, "unknown market {market}"),
            Self::ZeroAddress => write!(f, "zero address"),
            Self::LengthMismatch { ids, amounts } => write!(
                f,
                "{ids} token ids but {amounts} amounts in batch transfer"
            ),
            Self::DuplicateMarket(market) => {
                write!(f, "market {market} already exists")
            }
            Self::PositionUnderivable { outcome_index } => {
                write!(f, "could not derive position {outcome_index}")
            }
            Self::TooManyPositions { total } => {
                write!(f, "{total} atomic positions exceed the limit")
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[must_use]
pub enum Effect<T> {
    Applied(T),
    Skipped(SkipReason),
}

/// Tally of what one record did
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Report {
    pub applied: usize,
    pub skipped: Vec<SkipReason>,
}

impl Report {
    pub fn record<T>(&mut self, effect: Effect<T>) -> Option<T> {
        match effect {
            Effect::Applied(value) => {
                self.applied += 1;
                Some(value)
            }
            Effect::Skipped(reason) => {
                self.skipped.push(reason);
                None
            }
        }
    }

    pub fn applied_one() -> Self {
        Self {
            applied: 1,
            skipped: Vec::new(),
        }
    }

    pub fn skipped_one(reason: SkipReason) -> Self {
        Self {
            applied: 0,
            skipped: vec![reason],
        }
    }
}
