use std::path::PathBuf;

use ethroot_common::{
    Bytes, H256, serde_utils,
    types::{BlockHeader, Receipt, Transaction, Withdrawal},
};
use serde::Deserialize;

/// Transaction as returned by `eth_getBlockByNumber`, which carries its hash
#[derive(Debug, Clone, Deserialize)]
pub struct RpcTransaction {
    #[serde(flatten)]
    pub tx: Transaction,
    pub hash: H256,
}

/// Header as returned by `eth_getBlockByNumber`, which carries its hash
#[derive(Debug, Clone, Deserialize)]
pub struct RpcBlockHeader {
    pub hash: H256,
    #[serde(flatten)]
    pub header: BlockHeader,
}

/// Lists of a block along with the roots its header commits to
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootFixture {
    pub name: String,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub block_number: u64,
    pub transactions: Vec<RpcTransaction>,
    pub transactions_root: H256,
    pub receipts: Vec<Receipt>,
    pub receipts_root: H256,
    #[serde(skip)]
    pub path: PathBuf,
}

/// A header in JSON form next to its RLP encoding
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderFixture {
    pub name: String,
    pub header: RpcBlockHeader,
    #[serde(with = "serde_utils::bytes")]
    pub raw: Bytes,
}

/// A block in JSON form next to the raw encodings a node serves for it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFixture {
    pub name: String,
    pub header: RpcBlockHeader,
    pub transactions: Vec<RpcTransaction>,
    pub receipts: Vec<Receipt>,
    #[serde(default)]
    pub withdrawals: Option<Vec<Withdrawal>>,
    #[serde(with = "serde_utils::bytes")]
    pub raw_header: Bytes,
    #[serde(with = "serde_utils::bytes")]
    pub raw_block: Bytes,
    #[serde(with = "serde_utils::bytes::vec")]
    pub raw_receipts: Vec<Bytes>,
    pub block_hash: H256,
    #[serde(skip)]
    pub path: PathBuf,
}

impl RawFixture {
    pub fn block_number(&self) -> u64 {
        self.header.header.number
    }
}

pub fn transactions(txs: &[RpcTransaction]) -> Vec<Transaction> {
    txs.iter().map(|tx| tx.tx.clone()).collect()
}
