use bytes::{BufMut, Bytes};
use ethereum_types::{Address, Bloom, H256, U256};
use ethroot_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use ethroot_trie::{DerivableList, TrieBackend, TrieError, derive_root_with_backend};
use serde::{Deserialize, Serialize};

use crate::{
    serde_utils,
    types::{Receipt, Transaction, Withdrawal},
    utils::keccak,
};

pub type BlockNumber = u64;
pub type BlockHash = H256;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub body: BlockBody,
}

impl Block {
    pub fn new(header: BlockHeader, body: BlockBody) -> Block {
        Block { header, body }
    }

    pub fn hash(&self) -> BlockHash {
        self.header.hash()
    }
}

impl RLPEncode for Block {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.header)
            .encode_field(&self.body.transactions)
            .encode_field(&self.body.ommers)
            .encode_optional_field(&self.body.withdrawals)
            .finish();
    }
}

impl RLPDecode for Block {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (header, decoder) = decoder.decode_field("header")?;
        let (transactions, decoder) = decoder.decode_field("transactions")?;
        let (ommers, decoder) = decoder.decode_field("ommers")?;
        let (withdrawals, decoder) = decoder.decode_optional_field("withdrawals")?;
        let remaining = decoder.finish()?;
        let body = BlockBody {
            transactions,
            ommers,
            withdrawals,
        };
        let block = Block::new(header, body);
        Ok((block, remaining))
    }
}

/// Header part of a block on the chain.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeader {
    pub parent_hash: H256,
    #[serde(rename = "sha3Uncles")]
    pub ommers_hash: H256,
    #[serde(rename = "miner")]
    pub coinbase: Address,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub number: BlockNumber,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub gas_limit: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub gas_used: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub timestamp: u64,
    #[serde(with = "serde_utils::bytes")]
    pub extra_data: Bytes,
    #[serde(rename = "mixHash")]
    pub prev_randao: H256,
    #[serde(with = "serde_utils::u64::hex_str_padding")]
    pub nonce: u64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_utils::u64::hex_str_opt"
    )]
    pub base_fee_per_gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals_root: Option<H256>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_utils::u64::hex_str_opt"
    )]
    pub blob_gas_used: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_utils::u64::hex_str_opt"
    )]
    pub excess_blob_gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<H256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests_hash: Option<H256>,
}

impl BlockHeader {
    /// Keccak of the RLP encoded header
    pub fn hash(&self) -> BlockHash {
        keccak(self.encode_to_vec())
    }
}

impl RLPEncode for BlockHeader {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.parent_hash)
            .encode_field(&self.ommers_hash)
            .encode_field(&self.coinbase)
            .encode_field(&self.state_root)
            .encode_field(&self.transactions_root)
            .encode_field(&self.receipts_root)
            .encode_field(&self.logs_bloom)
            .encode_field(&self.difficulty)
            .encode_field(&self.number)
            .encode_field(&self.gas_limit)
            .encode_field(&self.gas_used)
            .encode_field(&self.timestamp)
            .encode_field(&self.extra_data)
            .encode_field(&self.prev_randao)
            .encode_field(&self.nonce.to_be_bytes())
            .encode_optional_field(&self.base_fee_per_gas)
            .encode_optional_field(&self.withdrawals_root)
            .encode_optional_field(&self.blob_gas_used)
            .encode_optional_field(&self.excess_blob_gas)
            .encode_optional_field(&self.parent_beacon_block_root)
            .encode_optional_field(&self.requests_hash)
            .finish();
    }
}

impl RLPDecode for BlockHeader {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (parent_hash, decoder) = decoder.decode_field("parent_hash")?;
        let (ommers_hash, decoder) = decoder.decode_field("ommers_hash")?;
        let (coinbase, decoder) = decoder.decode_field("coinbase")?;
        let (state_root, decoder) = decoder.decode_field("state_root")?;
        let (transactions_root, decoder) = decoder.decode_field("transactions_root")?;
        let (receipts_root, decoder) = decoder.decode_field("receipts_root")?;
        let (logs_bloom, decoder) = decoder.decode_field("logs_bloom")?;
        let (difficulty, decoder) = decoder.decode_field("difficulty")?;
        let (number, decoder) = decoder.decode_field("number")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (gas_used, decoder) = decoder.decode_field("gas_used")?;
        let (timestamp, decoder) = decoder.decode_field("timestamp")?;
        let (extra_data, decoder) = decoder.decode_field("extra_data")?;
        let (prev_randao, decoder) = decoder.decode_field("prev_randao")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let nonce = u64::from_be_bytes(nonce);
        let (base_fee_per_gas, decoder) = decoder.decode_optional_field("base_fee_per_gas")?;
        let (withdrawals_root, decoder) = decoder.decode_optional_field("withdrawals_root")?;
        let (blob_gas_used, decoder) = decoder.decode_optional_field("blob_gas_used")?;
        let (excess_blob_gas, decoder) = decoder.decode_optional_field("excess_blob_gas")?;
        let (parent_beacon_block_root, decoder) =
            decoder.decode_optional_field("parent_beacon_block_root")?;
        let (requests_hash, decoder) = decoder.decode_optional_field("requests_hash")?;

        Ok((
            BlockHeader {
                parent_hash,
                ommers_hash,
                coinbase,
                state_root,
                transactions_root,
                receipts_root,
                logs_bloom,
                difficulty,
                number,
                gas_limit,
                gas_used,
                timestamp,
                extra_data,
                prev_randao,
                nonce,
                base_fee_per_gas,
                withdrawals_root,
                blob_gas_used,
                excess_blob_gas,
                parent_beacon_block_root,
                requests_hash,
            },
            decoder.finish()?,
        ))
    }
}

/// The body of a block on the chain
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockBody {
    pub transactions: Vec<Transaction>,
    /// Always empty after the merge
    pub ommers: Vec<BlockHeader>,
    /// `None` before Shanghai
    pub withdrawals: Option<Vec<Withdrawal>>,
}

impl BlockBody {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Transactions as committed to by `transactions_root`
#[derive(Clone, Copy, Debug)]
pub struct TransactionList<'a>(pub &'a [Transaction]);

/// Receipts as committed to by `receipts_root`
#[derive(Clone, Copy, Debug)]
pub struct ReceiptList<'a>(pub &'a [Receipt]);

/// Withdrawals as committed to by `withdrawals_root`
#[derive(Clone, Copy, Debug)]
pub struct WithdrawalList<'a>(pub &'a [Withdrawal]);

impl DerivableList for TransactionList<'_> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn encode_index(&self, index: usize, buf: &mut Vec<u8>) {
        self.0[index].encode_canonical(buf);
    }
}

impl DerivableList for ReceiptList<'_> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn encode_index(&self, index: usize, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.0[index].encode_inner());
    }
}

impl DerivableList for WithdrawalList<'_> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn encode_index(&self, index: usize, buf: &mut Vec<u8>) {
        self.0[index].encode(buf);
    }
}

pub fn compute_transactions_root(transactions: &[Transaction]) -> Result<H256, TrieError> {
    derive_root_with_backend(&TransactionList(transactions), TrieBackend::Stack)
}

pub fn compute_receipts_root(receipts: &[Receipt]) -> Result<H256, TrieError> {
    derive_root_with_backend(&ReceiptList(receipts), TrieBackend::Stack)
}

pub fn compute_withdrawals_root(withdrawals: &[Withdrawal]) -> Result<H256, TrieError> {
    derive_root_with_backend(&WithdrawalList(withdrawals), TrieBackend::Stack)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{
        EIP1559Transaction, LegacyTransaction, Log, ReceiptStatus, TxKind, TxType,
    };
    use ethroot_trie::{EMPTY_TRIE_HASH, KeyOrdering, derive_root};
    use hex_literal::hex;

    fn mainnet_genesis_header() -> BlockHeader {
        BlockHeader {
            ommers_hash: H256(hex!(
                "1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"
            )),
            state_root: H256(hex!(
                "d7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544"
            )),
            transactions_root: *EMPTY_TRIE_HASH,
            receipts_root: *EMPTY_TRIE_HASH,
            difficulty: U256::from(0x400000000u64),
            gas_limit: 5000,
            extra_data: Bytes::from_static(&hex!(
                "11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa"
            )),
            nonce: 0x42,
            ..Default::default()
        }
    }

    fn sample_transactions(n: u64) -> Vec<Transaction> {
        (0..n)
            .map(|nonce| {
                if nonce % 3 == 0 {
                    Transaction::LegacyTransaction(LegacyTransaction {
                        nonce,
                        gas_price: U256::from(20_000_000_000u64),
                        gas: 21_000,
                        to: TxKind::Call(Address::from_low_u64_be(nonce + 1)),
                        value: U256::from(nonce * 1_000),
                        v: U256::from(37),
                        r: U256::from(nonce + 11),
                        s: U256::from(nonce + 13),
                        ..Default::default()
                    })
                } else {
                    Transaction::EIP1559Transaction(EIP1559Transaction {
                        chain_id: 1,
                        nonce,
                        max_priority_fee_per_gas: 1_000_000_000,
                        max_fee_per_gas: 50_000_000_000,
                        gas_limit: 100_000,
                        to: TxKind::Create,
                        data: Bytes::from(vec![0x60; (nonce % 70) as usize]),
                        signature_y_parity: nonce % 2 == 0,
                        signature_r: U256::from(nonce + 17),
                        signature_s: U256::from(nonce + 19),
                        ..Default::default()
                    })
                }
            })
            .collect()
    }

    #[test]
    fn mainnet_genesis_hash() {
        let header = mainnet_genesis_header();
        assert_eq!(
            header.hash(),
            H256(hex!(
                "d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3"
            ))
        );
        let encoded = header.encode_to_vec();
        assert_eq!(BlockHeader::decode(&encoded).unwrap(), header);
    }

    #[test]
    fn optional_header_fields_are_positional() {
        let mut header = mainnet_genesis_header();
        header.base_fee_per_gas = Some(7);
        header.withdrawals_root = Some(*EMPTY_TRIE_HASH);
        header.blob_gas_used = Some(0);
        header.excess_blob_gas = Some(0);
        header.parent_beacon_block_root = Some(H256::zero());
        let decoded = BlockHeader::decode(&header.encode_to_vec()).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(decoded.requests_hash, None);
    }

    #[test]
    fn block_round_trip() {
        let transactions = sample_transactions(5);
        let withdrawals = vec![Withdrawal {
            index: 1,
            validator_index: 2,
            address: Address::from_low_u64_be(3),
            amount: 4,
        }];
        let header = BlockHeader {
            transactions_root: compute_transactions_root(&transactions).unwrap(),
            withdrawals_root: Some(compute_withdrawals_root(&withdrawals).unwrap()),
            base_fee_per_gas: Some(1),
            ..mainnet_genesis_header()
        };
        let block = Block::new(
            header,
            BlockBody {
                transactions,
                ommers: vec![],
                withdrawals: Some(withdrawals),
            },
        );
        let encoded = block.encode_to_vec();
        let decoded = Block::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.header.hash());
    }

    #[test]
    fn pre_shanghai_block_has_no_withdrawals() {
        let block = Block::new(mainnet_genesis_header(), BlockBody::empty());
        let decoded = Block::decode(&block.encode_to_vec()).unwrap();
        assert_eq!(decoded.body.withdrawals, None);
    }

    #[test]
    fn empty_lists_have_empty_roots() {
        assert_eq!(compute_transactions_root(&[]).unwrap(), *EMPTY_TRIE_HASH);
        assert_eq!(compute_receipts_root(&[]).unwrap(), *EMPTY_TRIE_HASH);
        assert_eq!(compute_withdrawals_root(&[]).unwrap(), *EMPTY_TRIE_HASH);
    }

    #[test]
    fn roots_agree_across_backends() {
        let transactions = sample_transactions(200);
        let receipts: Vec<Receipt> = transactions
            .iter()
            .enumerate()
            .map(|(i, tx)| {
                Receipt::new(
                    tx.tx_type(),
                    ReceiptStatus::Succeeded(i % 5 != 0),
                    21_000 * (i as u64 + 1),
                    vec![Log {
                        address: Address::from_low_u64_be(i as u64),
                        topics: vec![H256::from_low_u64_be(i as u64)],
                        data: Bytes::new(),
                    }],
                )
            })
            .collect();
        let expected_tx_root = compute_transactions_root(&transactions).unwrap();
        let expected_receipts_root = compute_receipts_root(&receipts).unwrap();
        for backend in TrieBackend::ALL {
            for ordering in KeyOrdering::ALL.into_iter().filter(|o| backend.accepts(*o)) {
                let mut hasher = backend.new_hasher();
                assert_eq!(
                    derive_root(&TransactionList(&transactions), ordering, hasher.as_mut())
                        .unwrap(),
                    expected_tx_root
                );
                assert_eq!(
                    derive_root(&ReceiptList(&receipts), ordering, hasher.as_mut()).unwrap(),
                    expected_receipts_root
                );
            }
        }
        assert_eq!(receipts[1].tx_type, TxType::EIP1559);
    }

    #[test]
    fn transaction_items_use_the_canonical_encoding() {
        let transactions = sample_transactions(3);
        let list = TransactionList(&transactions);
        let mut buf = Vec::new();
        list.encode_index(1, &mut buf);
        // typed, so not wrapped as bytes
        assert_eq!(buf[0], 0x02);
        assert_eq!(buf, transactions[1].encode_canonical_to_vec());
    }
}
