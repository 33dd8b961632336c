//! Condition resolution fan-out

use sneed::RwTxn;

use crate::{
    state::{
        Error, State,
        effect::{Effect, SkipReason},
    },
    types::{Address, Amount, ConditionId, Provenance},
};

impl State {
    /// Settle every market that references `condition_id` with
    /// `payout_numerators`.
    ///
    /// Overwrites rather than accumulates, so replaying a resolution leaves
    /// state unchanged. Returns the markets that were settled.
    pub fn resolve_condition(
        &self,
        rwtxn: &mut RwTxn,
        provenance: &Provenance,
        condition_id: &ConditionId,
        payout_numerators: &[Amount],
    ) -> Result<Effect<Vec<Address>>, Error> {
        let Some(mut condition) =
            self.markets.try_get_condition(rwtxn, condition_id)?
        else {
            tracing::debug!(
                %condition_id,
                "ignoring resolution of untracked condition"
            );
            return Ok(Effect::Skipped(SkipReason::UnknownCondition(
                *condition_id,
            )));
        };
        if condition.resolved.is_none() {
            condition.resolved = Some(*provenance);
        }
        condition.payout_numerators = Some(payout_numerators.to_vec());
        self.markets.put_condition(rwtxn, &condition)?;

        let mut settled = Vec::with_capacity(condition.markets.len());
        for market_id in &condition.markets {
            let Some(mut market) = self.markets.try_get_market(rwtxn, market_id)?
            else {
                tracing::debug!(
                    market = %market_id,
                    %condition_id,
                    "condition references missing market"
                );
                continue;
            };
            market.solved = true;
            market.payout_numerators = Some(payout_numerators.to_vec());
            self.markets.put_market(rwtxn, &market)?;
            settled.push(*market_id);
        }
        tracing::info!(
            %condition_id,
            markets = settled.len(),
            "resolved condition"
        );
        Ok(Effect::Applied(settled))
    }
}
