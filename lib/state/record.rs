//! Apply inbound records

use num::Zero as _;
use sneed::RwTxn;

use crate::{
    config::Config,
    math,
    oracle::ConditionalTokens,
    positions::{Derivation, PositionDeriver},
    state::{
        Error, State,
        effect::{Effect, Report, SkipReason},
        ledger::{BatchTransfer, OutcomeTransfer},
        logs::{FundingRow, ResolutionRow, TradeRow},
        markets::{Market, PositionEntry},
        sequence::SequenceTag,
    },
    types::{
        ConditionResolution, Event, FundingChange, FundingKind, MarketCreated,
        Provenance, Record, Trade, TradeKind,
    },
};

fn apply_market_created<O>(
    state: &State,
    rwtxn: &mut RwTxn,
    deriver: &PositionDeriver<'_, O>,
    provenance: &Provenance,
    created: &MarketCreated,
) -> Result<Report, Error>
where
    O: ConditionalTokens,
{
    if state.markets.try_get_market(rwtxn, &created.market)?.is_some() {
        tracing::warn!(market = %created.market, "ignoring duplicate market creation");
        return Ok(Report::skipped_one(SkipReason::DuplicateMarket(
            created.market,
        )));
    }
    let mut report = Report::default();
    let derivation = match deriver.derive(
        &created.conditional_tokens,
        &created.collateral_token,
        &created.condition_ids,
    ) {
        Ok(derivation) => derivation,
        Err(err) => {
            tracing::error!(market = %created.market, "not deriving positions: {err}");
            report
                .skipped
                .push(SkipReason::TooManyPositions { total: err.total });
            Derivation {
                slot_counts: err.slot_counts,
                ..Derivation::default()
            }
        }
    };
    report.skipped.extend(derivation.skipped.iter().map(|skipped| {
        SkipReason::PositionUnderivable {
            outcome_index: skipped.outcome_index,
        }
    }));
    for position in &derivation.positions {
        let entry = PositionEntry {
            market: created.market,
            outcome_index: position.outcome_index,
        };
        state
            .markets
            .insert_position(rwtxn, &position.position_id, entry)?;
    }
    for condition_id in &created.condition_ids {
        state
            .markets
            .add_condition_reference(rwtxn, condition_id, &created.market)?;
    }
    let market = Market {
        id: created.market,
        index: state.sequence.next(rwtxn, SequenceTag::Market)?,
        creator: created.creator,
        conditional_tokens: created.conditional_tokens,
        collateral_token: created.collateral_token,
        condition_ids: created.condition_ids.clone(),
        outcome_slot_counts: derivation.slot_counts.clone(),
        fee: created.fee.clone(),
        max_fee: created.max_fee.clone(),
        end_time: created.end_time,
        position_ids: derivation.position_ids(),
        solved: false,
        payout_numerators: None,
        collateral_volume: num::BigUint::zero(),
        created: *provenance,
    };
    state.markets.put_market(rwtxn, &market)?;
    tracing::info!(
        market = %market.id,
        conditions = market.condition_ids.len(),
        positions = market.position_ids.len(),
        skipped = derivation.skipped.len(),
        "created market"
    );
    report.applied += 1;
    Ok(report)
}

fn apply_resolution(
    state: &State,
    rwtxn: &mut RwTxn,
    provenance: &Provenance,
    resolution: &ConditionResolution,
) -> Result<Report, Error> {
    let effect = state.resolve_condition(
        rwtxn,
        provenance,
        &resolution.condition_id,
        &resolution.payout_numerators,
    )?;
    let row = ResolutionRow {
        index: state.sequence.next(rwtxn, SequenceTag::ConditionResolution)?,
        condition_id: resolution.condition_id,
        oracle: resolution.oracle,
        question_id: resolution.question_id,
        outcome_slot_count: resolution.outcome_slot_count,
        payout_numerators: resolution.payout_numerators.clone(),
        markets: match &effect {
            Effect::Applied(markets) => markets.clone(),
            Effect::Skipped(_) => Vec::new(),
        },
        provenance: *provenance,
    };
    state.logs.put_resolution(rwtxn, &row)?;
    let mut report = Report::default();
    report.record(effect);
    Ok(report)
}

fn apply_trade(
    state: &State,
    rwtxn: &mut RwTxn,
    provenance: &Provenance,
    trade: &Trade,
) -> Result<Report, Error> {
    let tag = match trade.kind {
        TradeKind::Buy => SequenceTag::Buy,
        TradeKind::Sell => SequenceTag::Sell,
    };
    let mut report = Report::applied_one();
    match state.markets.try_get_market(rwtxn, &trade.market)? {
        Some(mut market) => {
            market.collateral_volume += &trade.principal;
            state.markets.put_market(rwtxn, &market)?;
        }
        None => {
            tracing::debug!(market = %trade.market, "trade on untracked market");
            report.skipped.push(SkipReason::UnknownMarket(trade.market));
        }
    }
    // the market holds its own inventory as a holding keyed by itself
    let marginal_prices = state
        .holdings
        .try_get_holding(rwtxn, &trade.market, &trade.market)?
        .map(|pool| math::marginal_prices(&pool.balances))
        .unwrap_or_default();
    let row = TradeRow {
        index: state.sequence.next(rwtxn, tag)?,
        market: trade.market,
        kind: trade.kind,
        counterparty: trade.counterparty,
        principal: trade.principal.clone(),
        fee: trade.fee.clone(),
        outcome_index: trade.outcome_index,
        outcome_tokens: trade.outcome_tokens.clone(),
        marginal_prices,
        provenance: *provenance,
    };
    state.logs.put_trade(rwtxn, &row)?;
    Ok(report)
}

fn apply_funding(
    state: &State,
    rwtxn: &mut RwTxn,
    provenance: &Provenance,
    funding: &FundingChange,
) -> Result<Report, Error> {
    let tag = match funding.kind {
        FundingKind::Added => SequenceTag::FundingAdded,
        FundingKind::Removed => SequenceTag::FundingRemoved,
    };
    let row = FundingRow {
        index: state.sequence.next(rwtxn, tag)?,
        market: funding.market,
        kind: funding.kind,
        funder: funding.funder,
        amounts: funding.amounts.clone(),
        shares: funding.shares.clone(),
        fee_pool_remainder: funding.fee_pool_remainder.clone(),
        provenance: *provenance,
    };
    state.logs.put_funding(rwtxn, &row)?;
    Ok(Report::applied_one())
}

/// Apply one record to state. Does not commit the RwTxn.
pub fn apply<O>(
    state: &State,
    rwtxn: &mut RwTxn,
    oracle: &O,
    config: &Config,
    record: &Record,
) -> Result<Report, Error>
where
    O: ConditionalTokens,
{
    let provenance = &record.provenance;
    tracing::trace!(
        event = record.event.name(),
        block = provenance.block_number,
        transaction = %provenance.transaction_hash,
        log_index = provenance.log_index,
        "applying record"
    );
    let report = match &record.event {
        Event::MarketCreated(created) => {
            let deriver = PositionDeriver::new(oracle, config);
            apply_market_created(state, rwtxn, &deriver, provenance, created)?
        }
        Event::ConditionResolution(resolution) => {
            state.logs.put_conditional_tokens_event(rwtxn, record)?;
            apply_resolution(state, rwtxn, provenance, resolution)?
        }
        Event::TransferSingle(transfer) => {
            state.logs.put_conditional_tokens_event(rwtxn, record)?;
            let transfer = OutcomeTransfer {
                operator: transfer.operator,
                from: transfer.from,
                to: transfer.to,
                token_id: &transfer.id,
                amount: &transfer.value,
            };
            let effect = state.apply_transfer(
                rwtxn,
                config.transfer_log,
                provenance,
                0,
                transfer,
            )?;
            let mut report = Report::default();
            report.record(effect);
            report
        }
        Event::TransferBatch(batch) => {
            state.logs.put_conditional_tokens_event(rwtxn, record)?;
            let batch = BatchTransfer {
                operator: batch.operator,
                from: batch.from,
                to: batch.to,
                token_ids: &batch.ids,
                amounts: &batch.values,
            };
            let effects = state.apply_batch_transfer(
                rwtxn,
                config.transfer_log,
                provenance,
                batch,
            )?;
            let mut report = Report::default();
            for effect in effects {
                report.record(effect);
            }
            report
        }
        Event::PoolShareTransfer(transfer) => {
            let effect = state.apply_lp_transfer(
                rwtxn,
                provenance,
                &transfer.market,
                &transfer.from,
                &transfer.to,
                &transfer.amount,
            )?;
            let mut report = Report::default();
            report.record(effect);
            report
        }
        Event::Trade(trade) => apply_trade(state, rwtxn, provenance, trade)?,
        Event::FundingChange(funding) => {
            apply_funding(state, rwtxn, provenance, funding)?
        }
        Event::ConditionPreparation { .. }
        | Event::PositionSplit { .. }
        | Event::PositionsMerge { .. }
        | Event::PayoutRedemption { .. } => {
            state.logs.put_conditional_tokens_event(rwtxn, record)?;
            Report::applied_one()
        }
    };
    Ok(report)
}
