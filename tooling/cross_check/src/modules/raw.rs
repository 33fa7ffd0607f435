//! Raw-data verification.
//!
//! Compares the encodings a node serves (`debug_getRawHeader`, `debug_getRawBlock`,
//! `debug_getRawReceipts`) against locally re-encoded JSON data, decodes them, and
//! re-derives the hashes and list roots the header commits to. Each stage reports
//! on its own so a decode failure in one doesn't hide the result of another.

use ethroot_common::types::{
    Block, BlockHeader, Receipt, ReceiptList, Transaction, TransactionList, Withdrawal,
    WithdrawalList,
};
use ethroot_rlp::{decode::RLPDecode, encode::RLPEncode};
use ethroot_rpc::{BlockIdentifier, EthClient, EthClientError};
use tracing::{debug, info};

use crate::modules::{
    error::{CheckFailure, DecodeStage},
    report::{Check, CheckTarget, ListKind},
    runner::{check_roots, check_transaction_hashes},
    types::{HeaderFixture, RawFixture, transactions},
};

/// Encodings served by a node for a single block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawData {
    pub header: Vec<u8>,
    pub block: Vec<u8>,
    pub receipts: Vec<Vec<u8>>,
}

impl RawData {
    /// The encodings recorded next to the fixture when it was captured
    pub fn from_fixture(fixture: &RawFixture) -> Self {
        RawData {
            header: fixture.raw_header.to_vec(),
            block: fixture.raw_block.to_vec(),
            receipts: fixture.raw_receipts.iter().map(|r| r.to_vec()).collect(),
        }
    }
}

pub async fn fetch_raw(client: &EthClient, block: BlockIdentifier) -> Result<RawData, EthClientError> {
    info!(%block, "Fetching raw block data");
    let header = client.get_raw_header(block).await?;
    let raw_block = client.get_raw_block(block).await?;
    let receipts = client.get_raw_receipts(block).await?;
    debug!(
        header_len = header.len(),
        block_len = raw_block.len(),
        receipts = receipts.len(),
        "Fetched raw block data"
    );
    Ok(RawData {
        header,
        block: raw_block,
        receipts,
    })
}

fn decode<T: RLPDecode>(stage: DecodeStage, raw: &[u8]) -> Result<T, CheckFailure> {
    T::decode(raw).map_err(|source| CheckFailure::Decode {
        stage,
        len: raw.len(),
        source,
    })
}

fn decode_receipt(index: usize, raw: &[u8]) -> Result<Receipt, CheckFailure> {
    Receipt::decode_inner(raw).map_err(|source| CheckFailure::Decode {
        stage: DecodeStage::Receipt(index),
        len: raw.len(),
        source,
    })
}

/// Decodes a raw header, checks it against its JSON form and its hash
pub fn check_header_fixture(fixture: &HeaderFixture) -> Vec<Check> {
    let name = fixture.name.as_str();
    let local = fixture.header.header.encode_to_vec();
    let mut checks = vec![Check::new(
        name,
        CheckTarget::LocalEncoding(DecodeStage::Header),
        CheckFailure::compare_encodings(&fixture.raw, &local),
    )];

    match decode::<BlockHeader>(DecodeStage::Header, &fixture.raw) {
        Ok(header) => {
            checks.push(Check::new(
                name,
                CheckTarget::RoundTrip(DecodeStage::Header),
                CheckFailure::compare_encodings(&fixture.raw, &header.encode_to_vec()),
            ));
            checks.push(Check::new(
                name,
                CheckTarget::HeaderHash,
                CheckFailure::compare_hashes(fixture.header.hash, header.hash()),
            ));
        }
        Err(failure) => checks.push(Check::new(
            name,
            CheckTarget::RoundTrip(DecodeStage::Header),
            Err(failure),
        )),
    }
    checks
}

pub fn verify_raw(fixture: &RawFixture, raw: &RawData) -> Vec<Check> {
    let mut checks = verify_raw_header(fixture, raw);
    checks.extend(verify_raw_block(fixture, raw));
    checks.extend(verify_raw_receipts(fixture, raw));
    Check::attach_path(&mut checks, &fixture.path);
    checks
}

fn verify_raw_header(fixture: &RawFixture, raw: &RawData) -> Vec<Check> {
    let name = fixture.name.as_str();
    let local = fixture.header.header.encode_to_vec();
    let mut checks = vec![Check::new(
        name,
        CheckTarget::LocalEncoding(DecodeStage::Header),
        CheckFailure::compare_encodings(&raw.header, &local),
    )];
    let decoded = decode::<BlockHeader>(DecodeStage::Header, &raw.header)
        .and_then(|header| CheckFailure::compare_hashes(fixture.block_hash, header.hash()));
    checks.push(Check::new(name, CheckTarget::HeaderHash, decoded));
    checks
}

fn verify_raw_block(fixture: &RawFixture, raw: &RawData) -> Vec<Check> {
    let name = fixture.name.as_str();
    let block = match decode::<Block>(DecodeStage::Block, &raw.block) {
        Ok(block) => block,
        Err(failure) => {
            return vec![Check::new(
                name,
                CheckTarget::RoundTrip(DecodeStage::Block),
                Err(failure),
            )];
        }
    };

    let mut checks = vec![
        Check::new(
            name,
            CheckTarget::RoundTrip(DecodeStage::Block),
            CheckFailure::compare_encodings(&raw.block, &block.encode_to_vec()),
        ),
        Check::new(
            name,
            CheckTarget::BlockHash,
            CheckFailure::compare_hashes(fixture.block_hash, block.hash()),
        ),
    ];

    let local_txs = transactions(&fixture.transactions);
    checks.push(Check::new(
        name,
        CheckTarget::ItemCount(ListKind::Transactions),
        compare_counts(local_txs.len(), block.body.transactions.len()),
    ));
    checks.extend(compare_local_items(
        name,
        ListKind::Transactions,
        local_txs.iter().map(Transaction::encode_canonical_to_vec),
        block.body.transactions.iter().map(Transaction::encode_canonical_to_vec),
    ));
    checks.extend(check_transaction_hashes(name, &fixture.transactions));
    checks.extend(check_roots(
        name,
        ListKind::Transactions,
        &TransactionList(&block.body.transactions),
        block.header.transactions_root,
    ));

    let local_withdrawals = fixture.withdrawals.as_deref().unwrap_or_default();
    let served_withdrawals = block.body.withdrawals.as_deref().unwrap_or_default();
    checks.push(Check::new(
        name,
        CheckTarget::ItemCount(ListKind::Withdrawals),
        compare_counts(local_withdrawals.len(), served_withdrawals.len()),
    ));
    checks.extend(compare_local_items(
        name,
        ListKind::Withdrawals,
        local_withdrawals.iter().map(Withdrawal::encode_to_vec),
        served_withdrawals.iter().map(Withdrawal::encode_to_vec),
    ));

    match (&block.body.withdrawals, block.header.withdrawals_root) {
        (Some(withdrawals), Some(root)) => {
            checks.extend(check_roots(
                name,
                ListKind::Withdrawals,
                &WithdrawalList(withdrawals),
                root,
            ));
        }
        (None, None) => {}
        (withdrawals, _) => {
            // a body and header that disagree on whether withdrawals exist
            checks.push(Check::new(
                name,
                CheckTarget::ItemCount(ListKind::Withdrawals),
                Err(CheckFailure::LengthMismatch {
                    expected: usize::from(block.header.withdrawals_root.is_some()),
                    actual: usize::from(withdrawals.is_some()),
                }),
            ));
        }
    }
    checks
}

fn verify_raw_receipts(fixture: &RawFixture, raw: &RawData) -> Vec<Check> {
    let name = fixture.name.as_str();
    let receipts_root = fixture.header.header.receipts_root;
    let mut checks = vec![Check::new(
        name,
        CheckTarget::ItemCount(ListKind::Receipts),
        compare_counts(fixture.receipts.len(), raw.receipts.len()),
    )];

    let mut decoded = Vec::with_capacity(raw.receipts.len());
    for (index, encoded) in raw.receipts.iter().enumerate() {
        let stage = DecodeStage::Receipt(index);
        if let Some(local) = fixture.receipts.get(index) {
            checks.push(Check::new(
                name,
                CheckTarget::LocalEncoding(stage),
                CheckFailure::compare_encodings(encoded, &local.encode_inner()),
            ));
        }
        match decode_receipt(index, encoded) {
            Ok(receipt) => decoded.push(receipt),
            Err(failure) => checks.push(Check::new(name, CheckTarget::RoundTrip(stage), Err(failure))),
        }
    }

    checks.extend(check_roots(
        name,
        ListKind::RawReceipts,
        raw.receipts.as_slice(),
        receipts_root,
    ));
    if decoded.len() == raw.receipts.len() {
        checks.extend(check_roots(
            name,
            ListKind::Receipts,
            &ReceiptList(&decoded),
            receipts_root,
        ));
    }
    checks
}

/// Pairs up local and served item encodings by index. Extra items show up in the count check.
fn compare_local_items(
    fixture: &str,
    list: ListKind,
    local: impl Iterator<Item = Vec<u8>>,
    served: impl Iterator<Item = Vec<u8>>,
) -> Vec<Check> {
    local
        .zip(served)
        .enumerate()
        .map(|(index, (local, served))| {
            Check::new(
                fixture,
                CheckTarget::LocalItem { list, index },
                CheckFailure::compare_encodings(&served, &local),
            )
        })
        .collect()
}

fn compare_counts(expected: usize, actual: usize) -> Result<(), CheckFailure> {
    if expected == actual {
        Ok(())
    } else {
        Err(CheckFailure::LengthMismatch { expected, actual })
    }
}
