//! Per-tag monotonic sequence numbers

use heed::types::SerdeBincode;
use serde::{Deserialize, Serialize};
use sneed::{DatabaseUnique, RoTxn, RwTxn, db, env};

/// Record types that carry a global order index.
///
/// Stored by variant index, so new tags go at the end.
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
    strum::Display,
    strum::EnumIter,
)]
pub enum SequenceTag {
    User,
    #[strum(serialize = "FixedProductMarketMaker")]
    Market,
    Transfer,
    #[strum(serialize = "FPMMBuy")]
    Buy,
    #[strum(serialize = "FPMMSell")]
    Sell,
    #[strum(serialize = "FPMMFundingAdded")]
    FundingAdded,
    #[strum(serialize = "FPMMFundingRemoved")]
    FundingRemoved,
    ConditionResolution,
}

/// Counters live in the record's write transaction, so a number handed out
/// is durable exactly when the record that consumed it is.
#[derive(Clone)]
pub struct SequenceAllocator {
    counters: DatabaseUnique<SerdeBincode<SequenceTag>, SerdeBincode<u64>>,
}

impl SequenceAllocator {
    pub const NUM_DBS: u32 = 1;

    pub(in crate::state) fn new(
        env: &sneed::Env,
        rwtxn: &mut RwTxn,
    ) -> Result<Self, env::error::CreateDb> {
        let counters = DatabaseUnique::create(env, rwtxn, "sequence_counters")?;
        Ok(Self { counters })
    }

    /// Last value handed out for `tag`, 0 if none
    pub fn current(
        &self,
        rotxn: &RoTxn,
        tag: SequenceTag,
    ) -> Result<u64, db::error::TryGet> {
        Ok(self.counters.try_get(rotxn, &tag)?.unwrap_or(0))
    }

    /// Increment the counter for `tag` and return the new value.
    pub fn next(
        &self,
        rwtxn: &mut RwTxn,
        tag: SequenceTag,
    ) -> Result<u64, crate::state::Error> {
        let index = self.current(rwtxn, tag)? + 1;
        self.counters.put(rwtxn, &tag, &index)?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn display_names() {
        assert_eq!(SequenceTag::Buy.to_string(), "FPMMBuy");
        assert_eq!(SequenceTag::FundingRemoved.to_string(), "FPMMFundingRemoved");
        assert_eq!(SequenceTag::User.to_string(), "User");
    }

    #[test]
    fn counters_are_independent() {
        let (_dir, env, allocator) = crate::state::tests::open(
            SequenceAllocator::NUM_DBS,
            |env, rwtxn| SequenceAllocator::new(env, rwtxn),
        );
        let mut rwtxn = env.write_txn().unwrap();
        for tag in SequenceTag::iter() {
            assert_eq!(allocator.current(&rwtxn, tag).unwrap(), 0);
        }
        assert_eq!(allocator.next(&mut rwtxn, SequenceTag::User).unwrap(), 1);
        assert_eq!(allocator.next(&mut rwtxn, SequenceTag::User).unwrap(), 2);
        assert_eq!(allocator.next(&mut rwtxn, SequenceTag::Buy).unwrap(), 1);
        rwtxn.commit().unwrap();

        let rotxn = env.read_txn().unwrap();
        assert_eq!(allocator.current(&rotxn, SequenceTag::User).unwrap(), 2);
        assert_eq!(allocator.current(&rotxn, SequenceTag::Sell).unwrap(), 0);
    }

    #[test]
    fn aborted_transaction_does_not_consume_numbers() {
        let (_dir, env, allocator) = crate::state::tests::open(
            SequenceAllocator::NUM_DBS,
            |env, rwtxn| SequenceAllocator::new(env, rwtxn),
        );
        {
            let mut rwtxn = env.write_txn().unwrap();
            assert_eq!(
                allocator.next(&mut rwtxn, SequenceTag::Transfer).unwrap(),
                1
            );
            drop(rwtxn);
        }
        let mut rwtxn = env.write_txn().unwrap();
        assert_eq!(
            allocator.next(&mut rwtxn, SequenceTag::Transfer).unwrap(),
            1
        );
    }
}
