//! Per-holder balances and users

use fallible_iterator::FallibleIterator as _;
use heed::types::SerdeBincode;
use num::Zero as _;
use serde::{Deserialize, Serialize};
use sneed::{DatabaseDup, DatabaseUnique, RoTxn, RwTxn, db, env};

use crate::{
    state::Error,
    types::{Address, Balance, Provenance},
};

/// Holding length used while a market record is unavailable
pub const DEFAULT_OUTCOME_COUNT: usize = 2;

/// Balances of one holder in one market
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Holding {
    pub market: Address,
    pub holder: Address,
    /// Indexed by outcome slot
    pub balances: Vec<Balance>,
    pub lp_shares: Balance,
}

impl Holding {
    pub fn new(market: Address, holder: Address, outcome_count: usize) -> Self {
        Self {
            market,
            holder,
            balances: vec![Balance::zero(); outcome_count],
            lp_shares: Balance::zero(),
        }
    }

    /// Grow the balance vector to `outcome_count` slots. Never shrinks.
    pub fn ensure_len(&mut self, outcome_count: usize) {
        if self.balances.len() < outcome_count {
            self.balances.resize(outcome_count, Balance::zero());
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    pub address: Address,
    /// Order of first appearance among users
    pub index: u64,
    pub first_seen: Provenance,
}

#[derive(Clone)]
pub struct Dbs {
    holdings:
        DatabaseUnique<SerdeBincode<(Address, Address)>, SerdeBincode<Holding>>,
    /// Market -> each holder with a holding row, as sorted duplicates
    holders_by_market:
        DatabaseDup<SerdeBincode<Address>, SerdeBincode<Address>>,
    users: DatabaseUnique<SerdeBincode<Address>, SerdeBincode<User>>,
}

impl Dbs {
    pub const NUM_DBS: u32 = 3;

    pub(in crate::state) fn new(
        env: &sneed::Env,
        rwtxn: &mut RwTxn,
    ) -> Result<Self, env::error::CreateDb> {
        let holdings = DatabaseUnique::create(env, rwtxn, "holdings")?;
        let holders_by_market =
            DatabaseDup::create(env, rwtxn, "holders_by_market")?;
        let users = DatabaseUnique::create(env, rwtxn, "users")?;
        Ok(Self {
            holdings,
            holders_by_market,
            users,
        })
    }

    pub fn try_get_holding(
        &self,
        rotxn: &RoTxn,
        market: &Address,
        holder: &Address,
    ) -> Result<Option<Holding>, db::error::TryGet> {
        self.holdings.try_get(rotxn, &(*market, *holder))
    }

    /// Load the holding, or a fresh zeroed one that is not yet persisted.
    /// Either way its vector is at least `outcome_count` long.
    pub fn get_or_new_holding(
        &self,
        rotxn: &RoTxn,
        market: &Address,
        holder: &Address,
        outcome_count: usize,
    ) -> Result<Holding, db::error::TryGet> {
        let mut holding = self
            .try_get_holding(rotxn, market, holder)?
            .unwrap_or_else(|| Holding::new(*market, *holder, outcome_count));
        holding.ensure_len(outcome_count);
        Ok(holding)
    }

    pub fn put_holding(
        &self,
        rwtxn: &mut RwTxn,
        holding: &Holding,
    ) -> Result<(), Error> {
        let key = (holding.market, holding.holder);
        if !self.holdings.contains_key(rwtxn, &key)? {
            self.holders_by_market
                .put(rwtxn, &holding.market, &holding.holder)?;
        }
        self.holdings.put(rwtxn, &key, holding)?;
        Ok(())
    }

    /// Holdings in `market`, ordered by holder address
    pub fn holdings_for_market(
        &self,
        rotxn: &RoTxn,
        market: &Address,
    ) -> Result<Vec<Holding>, Error> {
        let mut holders = self.holders_by_market.get(rotxn, market)?;
        let mut res = Vec::new();
        while let Some(holder) = holders.next()? {
            if let Some(holding) = self.try_get_holding(rotxn, market, &holder)?
            {
                res.push(holding);
            }
        }
        Ok(res)
    }

    pub fn try_get_user(
        &self,
        rotxn: &RoTxn,
        address: &Address,
    ) -> Result<Option<User>, db::error::TryGet> {
        self.users.try_get(rotxn, address)
    }

    /// Insert a user row on first sight. Returns `None` if the user
    /// already existed. `index` is only evaluated for new users.
    pub fn insert_user_with<F>(
        &self,
        rwtxn: &mut RwTxn,
        address: &Address,
        provenance: &Provenance,
        index: F,
    ) -> Result<Option<User>, Error>
    where
        F: FnOnce(&mut RwTxn) -> Result<u64, Error>,
    {
        if self.users.try_get(rwtxn, address)?.is_some() {
            return Ok(None);
        }
        let user = User {
            address: *address,
            index: index(rwtxn)?,
            first_seen: *provenance,
        };
        self.users.put(rwtxn, address, &user)?;
        Ok(Some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_len_never_shrinks() {
        let mut holding =
            Holding::new(Address::new([1; 20]), Address::new([2; 20]), 4);
        holding.balances[3] = Balance::from(-7);
        holding.ensure_len(2);
        assert_eq!(holding.balances.len(), 4);
        holding.ensure_len(6);
        assert_eq!(holding.balances.len(), 6);
        assert_eq!(holding.balances[3], Balance::from(-7));
        assert!(holding.balances[4..].iter().all(|b| *b == Balance::from(0)));
    }

    #[test]
    fn holders_are_indexed_once() {
        let (_dir, env, dbs) =
            crate::state::tests::open(Dbs::NUM_DBS, |env, rwtxn| {
                Dbs::new(env, rwtxn)
            });
        let (market, other_market) =
            (Address::new([1; 20]), Address::new([9; 20]));
        let (late, early) = (Address::new([3; 20]), Address::new([2; 20]));
        let mut rwtxn = env.write_txn().unwrap();
        let mut holding =
            dbs.get_or_new_holding(&rwtxn, &market, &late, 2).unwrap();
        dbs.put_holding(&mut rwtxn, &holding).unwrap();
        holding.lp_shares = Balance::from(10);
        dbs.put_holding(&mut rwtxn, &holding).unwrap();
        let other = Holding::new(market, early, 2);
        dbs.put_holding(&mut rwtxn, &other).unwrap();
        dbs.put_holding(&mut rwtxn, &Holding::new(other_market, late, 3))
            .unwrap();
        rwtxn.commit().unwrap();

        let rotxn = env.read_txn().unwrap();
        let holdings = dbs.holdings_for_market(&rotxn, &market).unwrap();
        assert_eq!(holdings, vec![other, holding]);
        assert_eq!(
            dbs.holdings_for_market(&rotxn, &other_market).unwrap().len(),
            1
        );
        assert!(dbs.holdings_for_market(&rotxn, &late).unwrap().is_empty());
    }
}
