mod common;

use std::collections::HashSet;

use common::{
    MockOracle, address, condition, conditional_tokens, market_created,
    open_indexer, record, transfer,
};
use outcome_ledger::{
    CommitmentMode, Config, Indexer, config, indexer,
    positions::{
        CrossChecked, LocalHash, PositionDeriver, RemoteOracle, enumerate,
    },
    state::{PositionEntry, SkipReason},
    types::{Address, Balance},
};

#[test]
fn enumeration_covers_full_product() {
    let conditions = vec![condition(1), condition(2), condition(3)];
    let oracle = MockOracle::with_slots(&[
        (condition(1), 2),
        (condition(2), 3),
        (condition(3), 2),
    ]);
    let (_dir, mut indexer) = open_indexer(Config::default(), oracle);
    let market = address(0x10);
    let report = indexer
        .apply(&record(1, market_created(market, address(0xee), conditions)))
        .unwrap();
    assert_eq!(report.applied, 1);
    assert!(report.skipped.is_empty());

    let market_row = indexer.market(&market).unwrap().unwrap();
    assert_eq!(market_row.outcome_slot_counts, vec![2, 3, 2]);
    assert_eq!(market_row.position_ids.len(), 12);
    let distinct: HashSet<_> = market_row.position_ids.iter().collect();
    assert_eq!(distinct.len(), 12);

    for (k, position) in market_row.position_ids.iter().enumerate() {
        let entry = indexer.position(&position.to_string()).unwrap();
        assert_eq!(
            entry,
            Some(PositionEntry {
                market,
                outcome_index: k as u32,
            })
        );
        // numeric spelling drops leading zero nibbles, possibly leaving an
        // odd number of digits
        let numeric = position.to_token_id().to_str_radix(16);
        assert_eq!(indexer.position(&numeric).unwrap(), entry);
    }
}

#[test]
fn commitment_schemes_agree() {
    let conditions = [condition(4), condition(5)];
    let slot_counts = [3, 4];
    let collateral = address(0xab);
    let oracle = MockOracle::default();
    let remote = RemoteOracle {
        oracle: &oracle,
        contract: conditional_tokens(),
    };
    let cross_checked = CrossChecked { remote };

    let (local, local_skipped) =
        enumerate(&LocalHash, &collateral, &conditions, &slot_counts, 12);
    let (via_oracle, oracle_skipped) =
        enumerate(&remote, &collateral, &conditions, &slot_counts, 12);
    let (checked, checked_skipped) =
        enumerate(&cross_checked, &collateral, &conditions, &slot_counts, 12);

    assert!(local_skipped.is_empty());
    assert!(oracle_skipped.is_empty());
    assert!(checked_skipped.is_empty());
    assert_eq!(local.len(), 12);
    assert_eq!(local, via_oracle);
    assert_eq!(local, checked);
}

#[test]
fn every_mode_indexes_identical_positions() {
    let conditions = vec![condition(6), condition(7)];
    let slots = [(condition(6), 2), (condition(7), 3)];
    let mut derived = Vec::new();
    for mode in [
        CommitmentMode::Local,
        CommitmentMode::Oracle,
        CommitmentMode::CrossCheck,
    ] {
        let config = Config {
            commitment: mode,
            ..Config::default()
        };
        let (_dir, mut indexer) =
            open_indexer(config, MockOracle::with_slots(&slots));
        indexer
            .apply(&record(
                1,
                market_created(address(0x11), address(0xee), conditions.clone()),
            ))
            .unwrap();
        derived.push(indexer.market(&address(0x11)).unwrap().unwrap().position_ids);
    }
    assert_eq!(derived[0].len(), 6);
    assert_eq!(derived[0], derived[1]);
    assert_eq!(derived[0], derived[2]);
}

#[test]
fn failed_slot_count_falls_back_to_two() {
    let mut oracle = MockOracle::with_slots(&[(condition(8), 4)]);
    oracle.revert_slot_count.insert(condition(8));
    let config = Config::default();
    let deriver = PositionDeriver::new(&oracle, &config);
    let derivation = deriver
        .derive(&conditional_tokens(), &address(0xee), &[condition(8), condition(9)])
        .unwrap();
    // condition 8 reverted, condition 9 was never prepared
    assert_eq!(derivation.slot_counts, vec![2, 2]);
    assert_eq!(derivation.positions.len(), 4);
}

#[test]
fn failed_commitment_skips_only_that_combination() {
    let mut oracle = MockOracle::with_slots(&[(condition(10), 3)]);
    oracle.revert_collection.insert((condition(10), 1));
    let config = Config {
        commitment: CommitmentMode::Oracle,
        ..Config::default()
    };
    let (_dir, mut indexer) = open_indexer(config, oracle);
    let market = address(0x12);
    let report = indexer
        .apply(&record(
            1,
            market_created(market, address(0xee), vec![condition(10)]),
        ))
        .unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(
        report.skipped,
        vec![SkipReason::PositionUnderivable { outcome_index: 1 }]
    );

    let market_row = indexer.market(&market).unwrap().unwrap();
    assert_eq!(market_row.position_ids.len(), 2);
    // slot 2 keeps its enumeration index, which now lies past the end of
    // the market's two-entry position vector
    let last = market_row.position_ids[1];
    assert_eq!(
        indexer.position(&last.to_string()).unwrap().unwrap().outcome_index,
        2
    );

    let holder = address(0x99);
    let report = indexer
        .apply(&record(2, transfer(Address::ZERO, holder, &last, 10)))
        .unwrap();
    assert_eq!(
        report.skipped,
        vec![SkipReason::OutcomeIndexOutOfRange { index: 2, len: 2 }]
    );
    let holding = indexer.holding(&market, &holder).unwrap().unwrap();
    assert_eq!(holding.balances, vec![Balance::from(0), Balance::from(0)]);
}

#[test]
fn cross_check_mismatch_skips_positions() {
    let mut oracle = MockOracle::with_slots(&[(condition(11), 2)]);
    oracle.corrupt_positions = true;
    let config = Config {
        commitment: CommitmentMode::CrossCheck,
        ..Config::default()
    };
    let (_dir, mut indexer) = open_indexer(config, oracle);
    let report = indexer
        .apply(&record(
            1,
            market_created(address(0x13), address(0xee), vec![condition(11)]),
        ))
        .unwrap();
    assert_eq!(report.skipped.len(), 2);
    let market_row = indexer.market(&address(0x13)).unwrap().unwrap();
    assert!(market_row.position_ids.is_empty());
}

#[test]
fn oversized_market_is_created_without_positions() {
    let oracle = MockOracle::with_slots(&[
        (condition(12), 256),
        (condition(13), 256),
    ]);
    let (_dir, mut indexer) = open_indexer(Config::default(), oracle);
    let market = address(0x14);
    let report = indexer
        .apply(&record(
            1,
            market_created(market, address(0xee), vec![condition(12), condition(13)]),
        ))
        .unwrap();
    assert_eq!(
        report.skipped,
        vec![SkipReason::TooManyPositions { total: 65536 }]
    );
    let market_row = indexer.market(&market).unwrap().unwrap();
    assert_eq!(market_row.outcome_slot_counts, vec![256, 256]);
    assert!(market_row.position_ids.is_empty());
    // the condition still points at the market, so resolution reaches it
    assert_eq!(
        indexer.condition(&condition(12)).unwrap().unwrap().markets,
        vec![market]
    );
}

#[test]
fn duplicate_creation_is_ignored() {
    let oracle = MockOracle::with_slots(&[(condition(14), 2)]);
    let (_dir, mut indexer) = open_indexer(Config::default(), oracle);
    let market = address(0x15);
    let created = market_created(market, address(0xee), vec![condition(14)]);
    indexer.apply(&record(1, created.clone())).unwrap();
    let first = indexer.market(&market).unwrap().unwrap();
    let report = indexer.apply(&record(2, created)).unwrap();
    assert_eq!(report.skipped, vec![SkipReason::DuplicateMarket(market)]);
    assert_eq!(indexer.market(&market).unwrap().unwrap(), first);
    assert_eq!(
        indexer.condition(&condition(14)).unwrap().unwrap().markets,
        vec![market]
    );
}

#[test]
fn shared_positions_stay_with_the_first_market() {
    let oracle = MockOracle::with_slots(&[(condition(15), 2)]);
    let (_dir, mut indexer) = open_indexer(Config::default(), oracle);
    let (first, second) = (address(0x16), address(0x17));
    let holder = address(0x20);
    indexer
        .apply(&record(1, market_created(first, address(0xee), vec![condition(15)])))
        .unwrap();
    indexer
        .apply(&record(2, market_created(second, address(0xee), vec![condition(15)])))
        .unwrap();
    // same collateral and condition: identical position space
    let positions = indexer.market(&first).unwrap().unwrap().position_ids;
    assert_eq!(
        indexer.market(&second).unwrap().unwrap().position_ids,
        positions
    );
    for position in &positions {
        let entry = indexer.position(&position.to_string()).unwrap().unwrap();
        assert_eq!(entry.market, first);
    }
    assert_eq!(
        indexer.condition(&condition(15)).unwrap().unwrap().markets,
        vec![first, second]
    );

    indexer
        .apply(&record(3, transfer(Address::ZERO, holder, &positions[1], 8)))
        .unwrap();
    let holding = indexer.holding(&first, &holder).unwrap().unwrap();
    assert_eq!(holding.balances, vec![Balance::from(0), Balance::from(8)]);
    assert_eq!(indexer.holding(&second, &holder).unwrap(), None);
    assert_eq!(indexer.transfers_for(&first, &holder).unwrap().len(), 1);
    assert!(indexer.transfers_for(&second, &holder).unwrap().is_empty());
}

#[test]
fn invalid_default_slot_count_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    for count in [0, 1, 257] {
        let config = Config {
            data_dir: dir.path().to_owned(),
            default_outcome_slot_count: count,
            ..Config::default()
        };
        let res = Indexer::new(config, MockOracle::default());
        assert!(matches!(
            res,
            Err(indexer::Error::Config(config::Error::DefaultSlotCount {
                count: rejected,
            })) if rejected == count
        ));
    }
}
