//! Single-writer driver over the persisted state

use sneed::{Env, EnvError, RwTxnError, env, rwtxn};
use thiserror::Error;

use crate::{
    config::{self, Config},
    oracle::ConditionalTokens,
    state::{
        self, Condition, Holding, Market, PositionEntry, Report, SequenceTag,
        State, TradeRow, TransferRow, User,
    },
    types::{
        Address, Balance, ConditionId, EventKey, HexError, PositionId, Record,
    },
};

#[allow(clippy::duplicated_attributes)]
#[derive(transitive::Transitive, Debug, Error)]
#[transitive(from(env::error::OpenEnv, EnvError))]
#[transitive(from(env::error::ReadTxn, EnvError))]
#[transitive(from(env::error::WriteTxn, EnvError))]
#[transitive(from(rwtxn::error::Commit, RwTxnError))]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error("failed to create data directory")]
    CreateDataDir(#[source] std::io::Error),
    #[error("Database env error")]
    DbEnv(#[from] EnvError),
    #[error("Database write error")]
    DbWrite(#[from] RwTxnError),
    #[error(transparent)]
    Hex(#[from] HexError),
    #[error(transparent)]
    State(#[from] state::Error),
}

/// Applies records one at a time, each in its own write transaction.
///
/// A record either commits completely or, on a storage error, not at all,
/// so the caller can retry it.
pub struct Indexer<O> {
    env: Env,
    state: State,
    oracle: O,
    config: Config,
}

impl<O> Indexer<O>
where
    O: ConditionalTokens,
{
    pub fn new(config: Config, oracle: O) -> Result<Self, Error> {
        config.validate()?;
        let env_path = config.data_dir.join("data.mdb");
        std::fs::create_dir_all(&env_path).map_err(Error::CreateDataDir)?;
        let env = {
            let mut env_open_opts = heed::EnvOpenOptions::new();
            env_open_opts
                .map_size(config.map_size)
                .max_dbs(State::NUM_DBS);
            unsafe { Env::open(&env_open_opts, &env_path) }?
        };
        let state = State::new(&env)?;
        tracing::debug!(
            path = %env_path.display(),
            commitment = %config.commitment,
            "opened indexer state"
        );
        Ok(Self {
            env,
            state,
            oracle,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn apply(&mut self, record: &Record) -> Result<Report, Error> {
        let mut rwtxn = self.env.write_txn()?;
        let report = state::record::apply(
            &self.state,
            &mut rwtxn,
            &self.oracle,
            &self.config,
            record,
        )?;
        rwtxn.commit()?;
        for reason in &report.skipped {
            tracing::debug!(
                event = record.event.name(),
                transaction = %record.provenance.transaction_hash,
                log_index = record.provenance.log_index,
                "skipped: {reason}"
            );
        }
        Ok(report)
    }

    pub fn apply_all<'a, I>(&mut self, records: I) -> Result<Report, Error>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut total = Report::default();
        for record in records {
            let report = self.apply(record)?;
            total.applied += report.applied;
            total.skipped.extend(report.skipped);
        }
        Ok(total)
    }

    pub fn market(&self, market: &Address) -> Result<Option<Market>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.try_get_market(&rotxn, market)?)
    }

    pub fn markets(&self) -> Result<Vec<Market>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.markets().get_all_markets(&rotxn)?)
    }

    pub fn condition(
        &self,
        condition_id: &ConditionId,
    ) -> Result<Option<Condition>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.try_get_condition(&rotxn, condition_id)?)
    }

    /// Look up a position by any hex spelling of its identifier.
    pub fn position(&self, position: &str) -> Result<Option<PositionEntry>, Error> {
        let position = PositionId::from_hex(position)?;
        let rotxn = self.env.read_txn()?;
        Ok(self.state.try_get_position(&rotxn, &position)?)
    }

    pub fn holding(
        &self,
        market: &Address,
        holder: &Address,
    ) -> Result<Option<Holding>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.try_get_holding(&rotxn, market, holder)?)
    }

    pub fn holdings_for_market(
        &self,
        market: &Address,
    ) -> Result<Vec<Holding>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.holdings().holdings_for_market(&rotxn, market)?)
    }

    pub fn user(&self, address: &Address) -> Result<Option<User>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.try_get_user(&rotxn, address)?)
    }

    pub fn transfers_for(
        &self,
        market: &Address,
        holder: &Address,
    ) -> Result<Vec<TransferRow>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.logs().transfers_for(&rotxn, market, holder)?)
    }

    /// A conditional tokens event as it was received
    pub fn conditional_tokens_event(
        &self,
        key: &EventKey,
    ) -> Result<Option<Record>, Error> {
        let rotxn = self.env.read_txn()?;
        let record = self
            .state
            .logs()
            .try_get_conditional_tokens_event(&rotxn, key)
            .map_err(state::Error::from)?;
        Ok(record)
    }

    pub fn trades_for(&self, market: &Address) -> Result<Vec<TradeRow>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.logs().trades_for(&rotxn, market)?)
    }

    pub fn counter(&self, tag: SequenceTag) -> Result<u64, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.counter(&rotxn, tag)?)
    }

    pub fn total_supply(&self, market: &Address) -> Result<Vec<Balance>, Error> {
        let rotxn = self.env.read_txn()?;
        Ok(self.state.total_supply(&rotxn, market)?)
    }
}
