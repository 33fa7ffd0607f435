use std::path::PathBuf;

use ethroot_common::{
    H256,
    types::{compute_receipts_root, compute_transactions_root},
};
use ethroot_cross_check::{
    CheckTarget, FixtureSet, ListKind, RunnerOptions,
    modules::{
        raw::{RawData, check_header_fixture, verify_raw},
        runner::{check_root_fixture, pairings, run_root_fixtures},
        types::transactions,
    },
};
use ethroot_trie::{KeyOrdering, TrieBackend};

fn fixtures() -> FixtureSet {
    let options = RunnerOptions {
        path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
        ..Default::default()
    };
    FixtureSet::load(&options).unwrap()
}

#[test]
fn shipped_fixtures_are_all_present() {
    let set = fixtures();
    assert_eq!(set.roots.len(), 9);
    assert!(set.headers.len() >= 2);
    assert_eq!(set.raw.len(), 2);
}

#[test]
fn mainnet_headers_hash_to_their_chain_values() {
    let headers = fixtures().headers;
    for (name, hash) in [
        (
            "mainnet-genesis",
            "d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3",
        ),
        (
            "mainnet-block-1",
            "88e96d4537bea4d9c05d12549907b32561d3bf31f45aae734cdc119f13406cb6",
        ),
    ] {
        let fixture = headers.iter().find(|h| h.name == name).unwrap();
        let expected = H256::from_slice(&hex::decode(hash).unwrap());
        assert_eq!(fixture.header.hash, expected, "{name}");
        assert_eq!(fixture.header.header.hash(), expected, "{name}");
    }
}

#[test]
fn generated_fixtures_are_labelled_synthetic() {
    let set = fixtures();
    let names = set
        .roots
        .iter()
        .map(|f| &f.name)
        .chain(set.raw.iter().map(|f| &f.name))
        .chain(set.headers.iter().map(|f| &f.name).filter(|n| !n.starts_with("mainnet-")));
    for name in names {
        assert!(name.starts_with("synthetic-"), "{name}");
    }
}

#[test]
fn root_fixtures_pass_every_pairing() {
    let set = fixtures();
    let summary = run_root_fixtures(&set.roots);
    assert!(summary.is_success(), "{summary}");
    assert_eq!(pairings().len(), 3);
}

#[test]
fn default_computation_matches_root_fixtures() {
    for fixture in fixtures().roots {
        let txs = transactions(&fixture.transactions);
        assert_eq!(
            compute_transactions_root(&txs).unwrap(),
            fixture.transactions_root,
            "{}",
            fixture.name
        );
        assert_eq!(
            compute_receipts_root(&fixture.receipts).unwrap(),
            fixture.receipts_root,
            "{}",
            fixture.name
        );
    }
}

#[test]
fn boundary_fixtures_cover_the_single_byte_key_limit() {
    let set = fixtures();
    let lengths: Vec<usize> = set.roots.iter().map(|f| f.transactions.len()).collect();
    for len in [127, 128, 129, 130, 300] {
        assert!(lengths.contains(&len), "missing a {len} item fixture");
    }
}

#[test]
fn header_fixtures_round_trip() {
    for fixture in fixtures().headers {
        let checks = check_header_fixture(&fixture);
        let failed: Vec<_> = checks.iter().filter(|c| !c.passed()).collect();
        assert!(failed.is_empty(), "{}: {failed:?}", fixture.name);
    }
}

#[test]
fn recorded_raw_data_verifies() {
    for fixture in fixtures().raw {
        let checks = verify_raw(&fixture, &RawData::from_fixture(&fixture));
        let failed: Vec<_> = checks.iter().filter(|c| !c.passed()).collect();
        assert!(failed.is_empty(), "{}: {failed:?}", fixture.name);
        assert!(checks.iter().any(|c| c.target
            == CheckTarget::Root {
                list: ListKind::RawReceipts,
                backend: TrieBackend::Stack,
                ordering: KeyOrdering::StackSafe,
            }));
    }
}

#[test]
fn swapped_receipts_are_caught_by_every_pairing() {
    let mut fixture = fixtures()
        .roots
        .into_iter()
        .find(|f| f.receipts.len() > 1)
        .unwrap();
    fixture.receipts.swap(0, 1);
    let failed: Vec<_> = check_root_fixture(&fixture)
        .into_iter()
        .filter(|c| !c.passed())
        .collect();
    assert_eq!(failed.len(), pairings().len());
}
