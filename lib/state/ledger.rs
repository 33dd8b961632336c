//! Outcome-token and liquidity-share movements

use itertools::{EitherOrBoth, Itertools as _};
use sneed::{RoTxn, RwTxn};

use crate::{
    state::{
        Error, State,
        effect::{Effect, SkipReason},
        holdings::DEFAULT_OUTCOME_COUNT,
        logs::TransferRow,
        markets::PositionEntry,
        sequence::SequenceTag,
    },
    types::{Address, Amount, Balance, PositionId, Provenance},
};

/// A single ERC-1155 style movement of one outcome token
#[derive(Clone, Copy, Debug)]
pub struct OutcomeTransfer<'a> {
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub token_id: &'a Amount,
    pub amount: &'a Amount,
}

#[derive(Clone, Copy, Debug)]
pub struct BatchTransfer<'a> {
    pub operator: Address,
    pub from: Address,
    pub to: Address,
    pub token_ids: &'a [Amount],
    pub amounts: &'a [Amount],
}

impl State {
    /// Balance vector length for holdings in `market`
    pub fn outcome_count(
        &self,
        rotxn: &RoTxn,
        market: &Address,
    ) -> Result<usize, Error> {
        let res = self
            .markets
            .try_get_market(rotxn, market)?
            .map_or(DEFAULT_OUTCOME_COUNT, |market| market.outcome_count());
        Ok(res)
    }

    /// Create the user row for `address` if this is its first appearance.
    pub(in crate::state) fn touch_user(
        &self,
        rwtxn: &mut RwTxn,
        address: &Address,
        provenance: &Provenance,
    ) -> Result<(), Error> {
        if let Some(user) =
            self.holdings
                .insert_user_with(rwtxn, address, provenance, |rwtxn| {
                    self.sequence.next(rwtxn, SequenceTag::User)
                })?
        {
            tracing::trace!(address = %user.address, index = user.index, "new user");
        }
        Ok(())
    }

    /// Add `delta` to one slot of `holder`'s holding, creating the holding
    /// if needed. The holding is persisted even when the slot is out of
    /// range.
    fn adjust_outcome_balance(
        &self,
        rwtxn: &mut RwTxn,
        provenance: &Provenance,
        entry: &PositionEntry,
        holder: &Address,
        outcome_count: usize,
        delta: &Balance,
    ) -> Result<Effect<()>, Error> {
        self.touch_user(rwtxn, holder, provenance)?;
        let mut holding = self.holdings.get_or_new_holding(
            rwtxn,
            &entry.market,
            holder,
            outcome_count,
        )?;
        let len = holding.balances.len();
        let effect = match holding.balances.get_mut(entry.outcome_index as usize)
        {
            Some(balance) => {
                *balance += delta;
                Effect::Applied(())
            }
            None => {
                tracing::debug!(
                    market = %entry.market,
                    %holder,
                    "outcome index {} out of range for {len} slots",
                    entry.outcome_index
                );
                Effect::Skipped(SkipReason::OutcomeIndexOutOfRange {
                    index: entry.outcome_index,
                    len,
                })
            }
        };
        self.holdings.put_holding(rwtxn, &holding)?;
        Ok(effect)
    }

    /// Apply one outcome-token transfer.
    ///
    /// `element` distinguishes the members of a batch within one log.
    /// Unknown token identifiers leave state untouched. Balances are never
    /// clamped, so a debit that arrives before its matching credit goes
    /// negative.
    pub fn apply_transfer(
        &self,
        rwtxn: &mut RwTxn,
        transfer_log: bool,
        provenance: &Provenance,
        element: u32,
        transfer: OutcomeTransfer<'_>,
    ) -> Result<Effect<PositionEntry>, Error> {
        let Ok(position) = PositionId::from_token_id(transfer.token_id) else {
            tracing::debug!(
                token_id = %transfer.token_id,
                "ignoring transfer of malformed token id"
            );
            return Ok(Effect::Skipped(SkipReason::MalformedTokenId));
        };
        let Some(entry) = self.markets.try_get_position(rwtxn, &position)?
        else {
            tracing::debug!(%position, "ignoring transfer of unknown position");
            return Ok(Effect::Skipped(SkipReason::UnknownPosition(position)));
        };
        let outcome_count = self.outcome_count(rwtxn, &entry.market)?;
        let amount = Balance::from(transfer.amount.clone());
        let mut applied = false;
        let mut skipped = None;
        for (holder, delta) in
            [(transfer.from, -amount.clone()), (transfer.to, amount)]
        {
            if holder.is_zero() {
                continue;
            }
            match self.adjust_outcome_balance(
                rwtxn,
                provenance,
                &entry,
                &holder,
                outcome_count,
                &delta,
            )? {
                Effect::Applied(()) => applied = true,
                Effect::Skipped(reason) => skipped = Some(reason),
            }
        }
        if !applied {
            return Ok(Effect::Skipped(
                skipped.unwrap_or(SkipReason::ZeroAddress),
            ));
        }
        if transfer_log {
            let row = TransferRow {
                index: self.sequence.next(rwtxn, SequenceTag::Transfer)?,
                market: entry.market,
                operator: transfer.operator,
                from: transfer.from,
                to: transfer.to,
                outcome_index: entry.outcome_index,
                amount: transfer.amount.clone(),
                provenance: *provenance,
            };
            self.logs.put_transfer(rwtxn, element, &row)?;
        }
        Ok(Effect::Applied(entry))
    }

    /// Apply each element of a batch independently, in array order.
    ///
    /// Arrays of unequal length apply the common prefix and skip the rest.
    pub fn apply_batch_transfer(
        &self,
        rwtxn: &mut RwTxn,
        transfer_log: bool,
        provenance: &Provenance,
        batch: BatchTransfer<'_>,
    ) -> Result<Vec<Effect<PositionEntry>>, Error> {
        let mismatch = SkipReason::LengthMismatch {
            ids: batch.token_ids.len(),
            amounts: batch.amounts.len(),
        };
        let mut effects = Vec::with_capacity(
            batch.token_ids.len().max(batch.amounts.len()),
        );
        for (element, pair) in
            batch.token_ids.iter().zip_longest(batch.amounts).enumerate()
        {
            let effect = match pair {
                EitherOrBoth::Both(token_id, amount) => {
                    let transfer = OutcomeTransfer {
                        operator: batch.operator,
                        from: batch.from,
                        to: batch.to,
                        token_id,
                        amount,
                    };
                    // batches are bounded by the log size, far below u32::MAX
                    let element = u32::try_from(element).unwrap_or(u32::MAX);
                    self.apply_transfer(
                        rwtxn,
                        transfer_log,
                        provenance,
                        element,
                        transfer,
                    )?
                }
                EitherOrBoth::Left(_) | EitherOrBoth::Right(_) => {
                    tracing::debug!(
                        transaction = %provenance.transaction_hash,
                        element,
                        "skipping unpaired batch transfer element: {mismatch}"
                    );
                    Effect::Skipped(mismatch.clone())
                }
            };
            effects.push(effect);
        }
        Ok(effects)
    }

    /// Move liquidity shares of `market`. Not routed through the position
    /// index, so unknown markets are tracked too.
    pub fn apply_lp_transfer(
        &self,
        rwtxn: &mut RwTxn,
        provenance: &Provenance,
        market: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> Result<Effect<()>, Error> {
        if from.is_zero() && to.is_zero() {
            return Ok(Effect::Skipped(SkipReason::ZeroAddress));
        }
        let outcome_count = self.outcome_count(rwtxn, market)?;
        let amount = Balance::from(amount.clone());
        for (holder, delta) in [(from, -amount.clone()), (to, amount)] {
            if holder.is_zero() {
                continue;
            }
            self.touch_user(rwtxn, holder, provenance)?;
            let mut holding = self.holdings.get_or_new_holding(
                rwtxn,
                market,
                holder,
                outcome_count,
            )?;
            holding.lp_shares += delta;
            self.holdings.put_holding(rwtxn, &holding)?;
        }
        Ok(Effect::Applied(()))
    }
}
