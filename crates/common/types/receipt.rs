use bytes::{BufMut, Bytes};
use ethereum_types::{Address, Bloom, BloomInput, H256, U64};
use ethroot_rlp::{
    decode::{RLPDecode, decode_rlp_item},
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use serde::{Deserialize, Serialize};

use crate::{serde_utils, types::TxType};

/// Outcome of a transaction as committed to by its receipt.
/// Receipts before Byzantium carry the intermediate state root instead of a status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    PostState(H256),
    Succeeded(bool),
}

impl RLPEncode for ReceiptStatus {
    fn encode(&self, buf: &mut dyn BufMut) {
        match self {
            ReceiptStatus::PostState(root) => root.encode(buf),
            ReceiptStatus::Succeeded(succeeded) => succeeded.encode(buf),
        }
    }
}

impl RLPDecode for ReceiptStatus {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        // 0xa0 prefixes a 32 byte string
        if rlp.first() == Some(&0xa0) {
            let (root, rest) = H256::decode_unfinished(rlp)?;
            return Ok((ReceiptStatus::PostState(root), rest));
        }
        let (succeeded, rest) = bool::decode_unfinished(rlp)?;
        Ok((ReceiptStatus::Succeeded(succeeded), rest))
    }
}

/// Result of a transaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RpcReceipt", into = "RpcReceipt")]
pub struct Receipt {
    pub tx_type: TxType,
    pub status: ReceiptStatus,
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn new(
        tx_type: TxType,
        status: ReceiptStatus,
        cumulative_gas_used: u64,
        logs: Vec<Log>,
    ) -> Self {
        Self {
            tx_type,
            status,
            cumulative_gas_used,
            bloom: bloom_from_logs(&logs),
            logs,
        }
    }

    // Receipts have two encodings, same as transactions.
    // `encode_inner` produces the consensus encoding, which is what the receipts trie
    // commits to and what `debug_getRawReceipts` returns. The `RLPEncode` impl produces
    // the form used inside lists, where typed receipts are wrapped as RLP bytes.

    /// Encodes Receipts in the following formats:
    /// A) Legacy receipts: rlp(receipt)
    /// B) Non legacy receipts: tx_type | rlp(receipt).
    pub fn encode_inner(&self) -> Vec<u8> {
        // The bloom alone takes 256 bytes
        let mut encode_buf = Vec::with_capacity(512);
        self.encode_inner_to(&mut encode_buf);
        encode_buf
    }

    fn encode_inner_to(&self, buf: &mut dyn BufMut) {
        if self.tx_type != TxType::Legacy {
            buf.put_u8(self.tx_type as u8);
        }
        Encoder::new(buf)
            .encode_field(&self.status)
            .encode_field(&self.cumulative_gas_used)
            .encode_field(&self.bloom)
            .encode_field(&self.logs)
            .finish();
    }

    /// Decodes Receipts in the following formats:
    /// A) Legacy receipts: rlp(receipt)
    /// B) Non legacy receipts: tx_type | rlp(receipt).
    pub fn decode_inner(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let (tx_type, rlp) = match rlp.first() {
            Some(tx_type) if *tx_type < 0x7f => {
                let tx_type =
                    TxType::from_u8(*tx_type).ok_or(RLPDecodeError::UnknownType(*tx_type))?;
                (tx_type, &rlp[1..])
            }
            _ => (TxType::Legacy, rlp),
        };
        let decoder = Decoder::new(rlp)?;
        let (status, decoder) = decoder.decode_field("status")?;
        let (cumulative_gas_used, decoder) = decoder.decode_field("cumulative_gas_used")?;
        let (bloom, decoder) = decoder.decode_field("bloom")?;
        let (logs, decoder) = decoder.decode_field("logs")?;
        if !decoder.finish()?.is_empty() {
            return Err(RLPDecodeError::invalid_length_ctx("trailing bytes after receipt"));
        }

        Ok(Self {
            tx_type,
            status,
            cumulative_gas_used,
            bloom,
            logs,
        })
    }
}

pub fn bloom_from_logs(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::zero();
    for log in logs {
        bloom.accrue(BloomInput::Raw(log.address.as_bytes()));
        for topic in log.topics.iter() {
            bloom.accrue(BloomInput::Raw(topic.as_bytes()));
        }
    }
    bloom
}

impl RLPEncode for Receipt {
    /// Receipts can be encoded in the following formats:
    /// A) Legacy receipts: rlp(receipt)
    /// B) Non legacy receipts: rlp(Bytes(tx_type | rlp(receipt))).
    fn encode(&self, buf: &mut dyn BufMut) {
        match self.tx_type {
            TxType::Legacy => self.encode_inner_to(buf),
            _ => Bytes::from(self.encode_inner()).encode(buf),
        }
    }
}

impl RLPDecode for Receipt {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, rest) = decode_rlp_item(rlp)?;
        let receipt = if is_list {
            Receipt::decode_inner(&rlp[..rlp.len() - rest.len()])
        } else {
            Receipt::decode_inner(payload)
        };
        Ok((receipt.map_err(|e| e.with_context("Receipt"))?, rest))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    #[serde(rename = "type", default)]
    tx_type: TxType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<H256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<U64>,
    #[serde(with = "serde_utils::u64::hex_str")]
    cumulative_gas_used: u64,
    logs_bloom: Bloom,
    logs: Vec<Log>,
}

impl TryFrom<RpcReceipt> for Receipt {
    type Error = String;

    fn try_from(receipt: RpcReceipt) -> Result<Self, Self::Error> {
        let status = match (receipt.status, receipt.root) {
            (Some(status), _) if status <= U64::one() => {
                ReceiptStatus::Succeeded(status == U64::one())
            }
            (Some(status), _) => return Err(format!("Invalid receipt status: {status}")),
            (None, Some(root)) => ReceiptStatus::PostState(root),
            (None, None) => return Err("Receipt has neither status nor root".to_string()),
        };
        Ok(Receipt {
            tx_type: receipt.tx_type,
            status,
            cumulative_gas_used: receipt.cumulative_gas_used,
            bloom: receipt.logs_bloom,
            logs: receipt.logs,
        })
    }
}

impl From<Receipt> for RpcReceipt {
    fn from(receipt: Receipt) -> Self {
        let (root, status) = match receipt.status {
            ReceiptStatus::PostState(root) => (Some(root), None),
            ReceiptStatus::Succeeded(succeeded) => (None, Some(U64::from(succeeded as u8))),
        };
        RpcReceipt {
            tx_type: receipt.tx_type,
            root,
            status,
            cumulative_gas_used: receipt.cumulative_gas_used,
            logs_bloom: receipt.bloom,
            logs: receipt.logs,
        }
    }
}

/// Data record produced during the execution of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "serde_utils::bytes")]
    pub data: Bytes,
}

impl RLPEncode for Log {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.topics)
            .encode_field(&self.data)
            .finish();
    }
}

impl RLPDecode for Log {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (topics, decoder) = decoder.decode_field("topics")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let log = Log {
            address,
            topics,
            data,
        };
        Ok((log, decoder.finish()?))
    }
}
