use std::fmt;

use bytes::{BufMut, Bytes};
use ethereum_types::{Address, H256, U256};
use ethroot_rlp::{
    constants::RLP_NULL,
    decode::{RLPDecode, decode_rlp_item},
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error};

use crate::{serde_utils, utils::keccak};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Transaction {
    #[serde(rename = "0x0")]
    LegacyTransaction(LegacyTransaction),
    #[serde(rename = "0x1")]
    EIP2930Transaction(EIP2930Transaction),
    #[serde(rename = "0x2")]
    EIP1559Transaction(EIP1559Transaction),
    #[serde(rename = "0x3")]
    EIP4844Transaction(EIP4844Transaction),
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTransaction {
    #[serde(with = "serde_utils::u64::hex_str")]
    pub nonce: u64,
    pub gas_price: U256,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub gas: u64,
    pub to: TxKind,
    pub value: U256,
    #[serde(rename = "input", with = "serde_utils::bytes")]
    pub data: Bytes,
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EIP2930Transaction {
    #[serde(with = "serde_utils::u64::hex_str")]
    pub chain_id: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub nonce: u64,
    pub gas_price: U256,
    #[serde(rename = "gas", with = "serde_utils::u64::hex_str")]
    pub gas_limit: u64,
    pub to: TxKind,
    pub value: U256,
    #[serde(rename = "input", with = "serde_utils::bytes")]
    pub data: Bytes,
    pub access_list: Vec<AccessListEntry>,
    #[serde(rename = "yParity", with = "serde_utils::bool")]
    pub signature_y_parity: bool,
    #[serde(rename = "r")]
    pub signature_r: U256,
    #[serde(rename = "s")]
    pub signature_s: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EIP1559Transaction {
    #[serde(with = "serde_utils::u64::hex_str")]
    pub chain_id: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub nonce: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub max_priority_fee_per_gas: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub max_fee_per_gas: u64,
    #[serde(rename = "gas", with = "serde_utils::u64::hex_str")]
    pub gas_limit: u64,
    pub to: TxKind,
    pub value: U256,
    #[serde(rename = "input", with = "serde_utils::bytes")]
    pub data: Bytes,
    pub access_list: Vec<AccessListEntry>,
    #[serde(rename = "yParity", with = "serde_utils::bool")]
    pub signature_y_parity: bool,
    #[serde(rename = "r")]
    pub signature_r: U256,
    #[serde(rename = "s")]
    pub signature_s: U256,
}

/// Blob transactions can't create contracts, so `to` is always an address.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EIP4844Transaction {
    #[serde(with = "serde_utils::u64::hex_str")]
    pub chain_id: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub nonce: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub max_priority_fee_per_gas: u64,
    #[serde(with = "serde_utils::u64::hex_str")]
    pub max_fee_per_gas: u64,
    #[serde(rename = "gas", with = "serde_utils::u64::hex_str")]
    pub gas: u64,
    pub to: Address,
    pub value: U256,
    #[serde(rename = "input", with = "serde_utils::bytes")]
    pub data: Bytes,
    pub access_list: Vec<AccessListEntry>,
    pub max_fee_per_blob_gas: U256,
    pub blob_versioned_hashes: Vec<H256>,
    #[serde(rename = "yParity", with = "serde_utils::bool")]
    pub signature_y_parity: bool,
    #[serde(rename = "r")]
    pub signature_r: U256,
    #[serde(rename = "s")]
    pub signature_s: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TxType {
    #[default]
    Legacy = 0x00,
    EIP2930 = 0x01,
    EIP1559 = 0x02,
    EIP4844 = 0x03,
}

impl TxType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Legacy),
            0x01 => Some(Self::EIP2930),
            0x02 => Some(Self::EIP1559),
            0x03 => Some(Self::EIP4844),
            _ => None,
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxType::Legacy => write!(f, "Legacy"),
            TxType::EIP2930 => write!(f, "EIP2930"),
            TxType::EIP1559 => write!(f, "EIP1559"),
            TxType::EIP4844 => write!(f, "EIP4844"),
        }
    }
}

/// Serialized as the `0x` prefixed type number used by the JSON-RPC API
impl Serialize for TxType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#x}", *self as u8))
    }
}

impl<'de> Deserialize<'de> for TxType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        let tx_type = u8::from_str_radix(value.trim_start_matches("0x"), 16)
            .map_err(|_| D::Error::custom(format!("Invalid transaction type: {value}")))?;
        TxType::from_u8(tx_type)
            .ok_or_else(|| D::Error::custom(format!("Unsupported transaction type: {value}")))
    }
}

/// Destination of a transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TxKind {
    Call(Address),
    #[default]
    Create,
}

impl RLPEncode for TxKind {
    fn encode(&self, buf: &mut dyn BufMut) {
        match self {
            Self::Call(address) => address.encode(buf),
            Self::Create => buf.put_u8(RLP_NULL),
        }
    }
}

impl RLPDecode for TxKind {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let first_byte = rlp.first().ok_or(RLPDecodeError::invalid_length())?;
        if *first_byte == RLP_NULL {
            return Ok((Self::Create, &rlp[1..]));
        }
        Address::decode_unfinished(rlp).map(|(address, rest)| (Self::Call(address), rest))
    }
}

/// `null` for contract creations
impl Serialize for TxKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TxKind::Call(address) => Some(address).serialize(serializer),
            TxKind::Create => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for TxKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<Address>::deserialize(deserializer)?
            .map(TxKind::Call)
            .unwrap_or(TxKind::Create))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListEntry {
    pub address: Address,
    pub storage_keys: Vec<H256>,
}

impl RLPEncode for AccessListEntry {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.storage_keys)
            .finish();
    }
}

impl RLPDecode for AccessListEntry {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (storage_keys, decoder) = decoder.decode_field("storage_keys")?;
        Ok((
            AccessListEntry {
                address,
                storage_keys,
            },
            decoder.finish()?,
        ))
    }
}

impl RLPEncode for LegacyTransaction {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.v)
            .encode_field(&self.r)
            .encode_field(&self.s)
            .finish();
    }
}

impl RLPEncode for EIP2930Transaction {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas_limit)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.signature_y_parity)
            .encode_field(&self.signature_r)
            .encode_field(&self.signature_s)
            .finish();
    }
}

impl RLPEncode for EIP1559Transaction {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_fee_per_gas)
            .encode_field(&self.max_fee_per_gas)
            .encode_field(&self.gas_limit)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.signature_y_parity)
            .encode_field(&self.signature_r)
            .encode_field(&self.signature_s)
            .finish();
    }
}

impl RLPEncode for EIP4844Transaction {
    fn encode(&self, buf: &mut dyn BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.nonce)
            .encode_field(&self.max_priority_fee_per_gas)
            .encode_field(&self.max_fee_per_gas)
            .encode_field(&self.gas)
            .encode_field(&self.to)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.access_list)
            .encode_field(&self.max_fee_per_blob_gas)
            .encode_field(&self.blob_versioned_hashes)
            .encode_field(&self.signature_y_parity)
            .encode_field(&self.signature_r)
            .encode_field(&self.signature_s)
            .finish();
    }
}

impl RLPDecode for LegacyTransaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(LegacyTransaction, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (gas, decoder) = decoder.decode_field("gas")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (v, decoder) = decoder.decode_field("v")?;
        let (r, decoder) = decoder.decode_field("r")?;
        let (s, decoder) = decoder.decode_field("s")?;

        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas,
            to,
            value,
            data,
            v,
            r,
            s,
        };
        Ok((tx, decoder.finish()?))
    }
}

impl RLPDecode for EIP2930Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(EIP2930Transaction, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (access_list, decoder) = decoder.decode_field("access_list")?;
        let (signature_y_parity, decoder) = decoder.decode_field("signature_y_parity")?;
        let (signature_r, decoder) = decoder.decode_field("signature_r")?;
        let (signature_s, decoder) = decoder.decode_field("signature_s")?;

        let tx = EIP2930Transaction {
            chain_id,
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data,
            access_list,
            signature_y_parity,
            signature_r,
            signature_s,
        };
        Ok((tx, decoder.finish()?))
    }
}

impl RLPDecode for EIP1559Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(EIP1559Transaction, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (max_priority_fee_per_gas, decoder) =
            decoder.decode_field("max_priority_fee_per_gas")?;
        let (max_fee_per_gas, decoder) = decoder.decode_field("max_fee_per_gas")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (access_list, decoder) = decoder.decode_field("access_list")?;
        let (signature_y_parity, decoder) = decoder.decode_field("signature_y_parity")?;
        let (signature_r, decoder) = decoder.decode_field("signature_r")?;
        let (signature_s, decoder) = decoder.decode_field("signature_s")?;

        let tx = EIP1559Transaction {
            chain_id,
            nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas_limit,
            to,
            value,
            data,
            access_list,
            signature_y_parity,
            signature_r,
            signature_s,
        };
        Ok((tx, decoder.finish()?))
    }
}

impl RLPDecode for EIP4844Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(EIP4844Transaction, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (nonce, decoder) = decoder.decode_field("nonce")?;
        let (max_priority_fee_per_gas, decoder) =
            decoder.decode_field("max_priority_fee_per_gas")?;
        let (max_fee_per_gas, decoder) = decoder.decode_field("max_fee_per_gas")?;
        let (gas, decoder) = decoder.decode_field("gas")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (value, decoder) = decoder.decode_field("value")?;
        let (data, decoder) = decoder.decode_field("data")?;
        let (access_list, decoder) = decoder.decode_field("access_list")?;
        let (max_fee_per_blob_gas, decoder) = decoder.decode_field("max_fee_per_blob_gas")?;
        let (blob_versioned_hashes, decoder) = decoder.decode_field("blob_versioned_hashes")?;
        let (signature_y_parity, decoder) = decoder.decode_field("signature_y_parity")?;
        let (signature_r, decoder) = decoder.decode_field("signature_r")?;
        let (signature_s, decoder) = decoder.decode_field("signature_s")?;

        let tx = EIP4844Transaction {
            chain_id,
            nonce,
            max_priority_fee_per_gas,
            max_fee_per_gas,
            gas,
            to,
            value,
            data,
            access_list,
            max_fee_per_blob_gas,
            blob_versioned_hashes,
            signature_y_parity,
            signature_r,
            signature_s,
        };
        Ok((tx, decoder.finish()?))
    }
}

impl Transaction {
    pub fn tx_type(&self) -> TxType {
        match self {
            Transaction::LegacyTransaction(_) => TxType::Legacy,
            Transaction::EIP2930Transaction(_) => TxType::EIP2930,
            Transaction::EIP1559Transaction(_) => TxType::EIP1559,
            Transaction::EIP4844Transaction(_) => TxType::EIP4844,
        }
    }

    /// Encodes a transaction the way it is committed to in the transactions trie:
    /// A) Legacy transactions: rlp(LegacyTransaction)
    /// B) Typed transactions: tx_type | rlp(payload)
    pub fn encode_canonical(&self, buf: &mut dyn BufMut) {
        match self {
            Transaction::LegacyTransaction(t) => t.encode(buf),
            Transaction::EIP2930Transaction(t) => {
                buf.put_u8(TxType::EIP2930 as u8);
                t.encode(buf);
            }
            Transaction::EIP1559Transaction(t) => {
                buf.put_u8(TxType::EIP1559 as u8);
                t.encode(buf);
            }
            Transaction::EIP4844Transaction(t) => {
                buf.put_u8(TxType::EIP4844 as u8);
                t.encode(buf);
            }
        }
    }

    pub fn encode_canonical_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_canonical(&mut buf);
        buf
    }

    /// Decodes a transaction from its canonical encoding, see [`Transaction::encode_canonical`]
    pub fn decode_canonical(bytes: &[u8]) -> Result<Self, RLPDecodeError> {
        let first = *bytes.first().ok_or(RLPDecodeError::invalid_length())?;
        // Legacy transactions are RLP lists
        if first >= 0xc0 {
            return LegacyTransaction::decode(bytes).map(Transaction::LegacyTransaction);
        }
        let payload = &bytes[1..];
        match TxType::from_u8(first) {
            Some(TxType::EIP2930) => {
                EIP2930Transaction::decode(payload).map(Transaction::EIP2930Transaction)
            }
            Some(TxType::EIP1559) => {
                EIP1559Transaction::decode(payload).map(Transaction::EIP1559Transaction)
            }
            Some(TxType::EIP4844) => {
                EIP4844Transaction::decode(payload).map(Transaction::EIP4844Transaction)
            }
            // A zero type byte is not a valid envelope, legacy transactions carry no prefix
            Some(TxType::Legacy) | None => Err(RLPDecodeError::UnknownType(first)),
        }
    }

    pub fn hash(&self) -> H256 {
        keccak(self.encode_canonical_to_vec())
    }
}

/// Block body form: legacy transactions are inlined as lists,
/// typed transactions are wrapped in an RLP byte string
impl RLPEncode for Transaction {
    fn encode(&self, buf: &mut dyn BufMut) {
        match self {
            Transaction::LegacyTransaction(t) => t.encode(buf),
            _ => self.encode_canonical_to_vec().as_slice().encode(buf),
        }
    }
}

impl RLPDecode for Transaction {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, rest) = decode_rlp_item(rlp)?;
        if is_list {
            let (tx, rest) = LegacyTransaction::decode_unfinished(rlp)?;
            return Ok((Transaction::LegacyTransaction(tx), rest));
        }
        let tx = Transaction::decode_canonical(payload).map_err(|e| e.with_context("Transaction"))?;
        Ok((tx, rest))
    }
}
