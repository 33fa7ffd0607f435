use ethroot_common::{
    H256,
    types::{ReceiptList, TransactionList},
};
use ethroot_trie::{DerivableList, KeyOrdering, TrieBackend, derive_root};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info};

use crate::modules::{
    error::CheckFailure,
    report::{Check, CheckTarget, ListKind, Summary},
    types::{RootFixture, RpcTransaction},
};

/// Every backend and ordering combination that can derive a root for any list length
pub fn pairings() -> Vec<(TrieBackend, KeyOrdering)> {
    TrieBackend::ALL
        .into_iter()
        .flat_map(|backend| {
            KeyOrdering::ALL
                .into_iter()
                .filter(move |ordering| backend.accepts(*ordering))
                .map(move |ordering| (backend, ordering))
        })
        .collect()
}

/// Derives the root of `list` with each pairing and compares it against `expected`
pub fn check_roots<L>(fixture: &str, kind: ListKind, list: &L, expected: H256) -> Vec<Check>
where
    L: DerivableList + ?Sized,
{
    pairings()
        .into_iter()
        .map(|(backend, ordering)| {
            let mut hasher = backend.new_hasher();
            let result = derive_root(list, ordering, hasher.as_mut())
                .map_err(CheckFailure::from)
                .and_then(|actual| CheckFailure::compare_hashes(expected, actual));
            let target = CheckTarget::Root {
                list: kind,
                backend,
                ordering,
            };
            Check::new(fixture, target, result)
        })
        .collect()
}

/// Compares each transaction's hash against the one reported alongside it
pub fn check_transaction_hashes(fixture: &str, transactions: &[RpcTransaction]) -> Vec<Check> {
    transactions
        .iter()
        .enumerate()
        .map(|(index, rpc_tx)| {
            let result = CheckFailure::compare_hashes(rpc_tx.hash, rpc_tx.tx.hash());
            Check::new(fixture, CheckTarget::TransactionHash(index), result)
        })
        .collect()
}

pub fn check_root_fixture(fixture: &RootFixture) -> Vec<Check> {
    debug!(
        fixture = %fixture.name,
        block = fixture.block_number,
        transactions = fixture.transactions.len(),
        receipts = fixture.receipts.len(),
        "Checking roots"
    );
    let transactions = crate::modules::types::transactions(&fixture.transactions);

    let mut checks = check_transaction_hashes(&fixture.name, &fixture.transactions);
    checks.extend(check_roots(
        &fixture.name,
        ListKind::Transactions,
        &TransactionList(&transactions),
        fixture.transactions_root,
    ));
    checks.extend(check_roots(
        &fixture.name,
        ListKind::Receipts,
        &ReceiptList(&fixture.receipts),
        fixture.receipts_root,
    ));
    Check::attach_path(&mut checks, &fixture.path);
    checks
}

/// Runs the root checks of every fixture in parallel
pub fn run_root_fixtures(fixtures: &[RootFixture]) -> Summary {
    info!(fixtures = fixtures.len(), pairings = pairings().len(), "Running root checks");
    let checks: Vec<Vec<Check>> = fixtures.par_iter().map(check_root_fixture).collect();
    Summary::new(checks.into_iter().flatten().collect())
}
