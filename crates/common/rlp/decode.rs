use super::{
    constants::{RLP_EMPTY_LIST, RLP_NULL},
    error::RLPDecodeError,
};
use bytes::Bytes;
use ethereum_types::{Address, Bloom, H64, H160, H256, U256};

/// Max payload size accepted when decoding.
/// Nothing committed to by a block header comes close to this.
const MAX_RLP_BYTES: usize = 1024 * 1024 * 1024;

/// Trait for decoding RLP encoded slices of data.
///
/// Implementors provide [`decode_unfinished`](RLPDecode::decode_unfinished), which returns the
/// decoded value along with whatever bytes follow it. Consumers usually call
/// [`decode`](RLPDecode::decode), which additionally requires the input to be fully consumed.
pub trait RLPDecode: Sized {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError>;

    fn decode(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let (decoded, remaining) = Self::decode_unfinished(rlp)?;
        if !remaining.is_empty() {
            return Err(RLPDecodeError::invalid_length_ctx("trailing bytes after item"));
        }
        Ok(decoded)
    }
}

impl RLPDecode for bool {
    #[inline(always)]
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let first = buf.first().ok_or(RLPDecodeError::invalid_length())?;
        let value = match *first {
            RLP_NULL => false,
            0x01 => true,
            b => return Err(RLPDecodeError::MalformedBoolean(b)),
        };
        Ok((value, &buf[1..]))
    }
}

macro_rules! impl_rlp_decode_uint {
    ($($t:ty),*) => {
        $(
            impl RLPDecode for $t {
                fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
                    let (bytes, rest) = decode_bytes(rlp)?;
                    if bytes.first() == Some(&0) {
                        return Err(RLPDecodeError::malformed_data_ctx("integer with leading zeros"));
                    }
                    let padded = static_left_pad(bytes)?;
                    Ok((<$t>::from_be_bytes(padded), rest))
                }
            }
        )*
    };
}

impl_rlp_decode_uint!(u8, u16, u32, u64, usize, u128);

impl<const N: usize> RLPDecode for [u8; N] {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (decoded_bytes, rest) = decode_bytes(rlp)?;
        let value = decoded_bytes
            .try_into()
            .map_err(|_| RLPDecodeError::invalid_length_ctx("unexpected fixed-size length"))?;
        Ok((value, rest))
    }
}

impl RLPDecode for Bytes {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (decoded, rest) = decode_bytes(rlp)?;
        Ok((Bytes::copy_from_slice(decoded), rest))
    }
}

macro_rules! impl_rlp_decode_fixed_hash {
    ($($t:ident => $ctor:ident),*) => {
        $(
            impl RLPDecode for $t {
                fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
                    let (value, rest) = RLPDecode::decode_unfinished(rlp)?;
                    Ok(($ctor(value), rest))
                }
            }
        )*
    };
}

impl_rlp_decode_fixed_hash!(H64 => H64, Address => H160, H256 => H256, Bloom => Bloom);

impl RLPDecode for U256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        if bytes.first() == Some(&0) {
            return Err(RLPDecodeError::malformed_data_ctx("integer with leading zeros"));
        }
        let padded_bytes: [u8; 32] = static_left_pad(bytes)?;
        Ok((U256::from_big_endian(&padded_bytes), rest))
    }
}

impl RLPDecode for String {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (str_bytes, rest) = decode_bytes(rlp)?;
        let value = String::from_utf8(str_bytes.to_vec())
            .map_err(|_| RLPDecodeError::malformed_data_ctx("invalid utf-8"))?;
        Ok((value, rest))
    }
}

// A Vec<T> is a list of elements of the same type. Byte strings decode through
// `Bytes` or `[u8; N]` instead.
impl<T: RLPDecode> RLPDecode for Vec<T> {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, input_rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::unexpected_string());
        }

        let mut result = Vec::new();
        let mut current_slice = payload;
        while !current_slice.is_empty() {
            let (item, rest) = T::decode_unfinished(current_slice)?;
            result.push(item);
            current_slice = rest;
        }

        Ok((result, input_rest))
    }
}

impl<T1: RLPDecode, T2: RLPDecode> RLPDecode for (T1, T2) {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, input_rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::unexpected_string());
        }
        let (first, rest) = T1::decode_unfinished(payload)?;
        let (second, rest) = T2::decode_unfinished(rest)?;
        if !rest.is_empty() {
            return Err(RLPDecodeError::malformed_data_ctx("extra elements in pair"));
        }
        Ok(((first, second), input_rest))
    }
}

impl<T1: RLPDecode, T2: RLPDecode, T3: RLPDecode> RLPDecode for (T1, T2, T3) {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (is_list, payload, input_rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::unexpected_string());
        }
        let (first, rest) = T1::decode_unfinished(payload)?;
        let (second, rest) = T2::decode_unfinished(rest)?;
        let (third, rest) = T3::decode_unfinished(rest)?;
        if !rest.is_empty() {
            return Err(RLPDecodeError::malformed_data_ctx("extra elements in triple"));
        }
        Ok(((first, second, third), input_rest))
    }
}

/// Reads the prefix of the item at the start of `data`.
/// Returns whether it is a list, the offset where the payload starts, and the payload length.
fn decode_prefix(data: &[u8]) -> Result<(bool, usize, usize), RLPDecodeError> {
    let first_byte = *data.first().ok_or(RLPDecodeError::invalid_length())?;

    let (is_list, header_len, payload_len) = match first_byte {
        0..=0x7f => return Ok((false, 0, 1)),
        0x80..=0xb7 => (false, 1, (first_byte - RLP_NULL) as usize),
        0xb8..=0xbf | 0xf8..=0xff => {
            let is_list = first_byte >= 0xf8;
            let length_of_length = (first_byte - if is_list { 0xf7 } else { 0xb7 }) as usize;
            let length_bytes = data
                .get(1..length_of_length + 1)
                .ok_or(RLPDecodeError::invalid_length_ctx("truncated length prefix"))?;
            if length_bytes.first() == Some(&0) {
                return Err(RLPDecodeError::malformed_data_ctx("length prefix with leading zeros"));
            }
            let length = usize::from_be_bytes(static_left_pad(length_bytes)?);
            (is_list, 1 + length_of_length, length)
        }
        RLP_EMPTY_LIST..=0xf7 => (true, 1, (first_byte - RLP_EMPTY_LIST) as usize),
    };

    if payload_len > MAX_RLP_BYTES || data.len() < header_len + payload_len {
        return Err(RLPDecodeError::invalid_length_ctx("payload exceeds input"));
    }
    Ok((is_list, header_len, payload_len))
}

/// Decodes an RLP item from a slice of bytes.
/// It returns a 3-element tuple with the following elements:
/// - A boolean indicating if the item is a list or not.
/// - The payload of the item, without its prefix.
/// - The remaining bytes after the item.
pub fn decode_rlp_item(data: &[u8]) -> Result<(bool, &[u8], &[u8]), RLPDecodeError> {
    let (is_list, offset, len) = decode_prefix(data)?;
    Ok((is_list, &data[offset..offset + len], &data[offset + len..]))
}

/// Splits an RLP item in two: the item including its prefix, and the bytes following it.
pub fn get_item_with_prefix(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let (_, offset, len) = decode_prefix(data)?;
    Ok(data.split_at(offset + len))
}

/// Whether the item is a byte string long enough to need a length-of-length prefix.
/// Typed transactions and receipts are wrapped this way inside block bodies.
pub fn is_encoded_as_bytes(rlp: &[u8]) -> Result<bool, RLPDecodeError> {
    let prefix = rlp.first().ok_or(RLPDecodeError::malformed_data())?;
    Ok((0xb8..=0xbf).contains(prefix))
}

/// Receives an RLP bytes item (prefix between 0xb8 and 0xbf) and returns its payload
pub fn get_rlp_bytes_item_payload(rlp: &[u8]) -> Result<&[u8], RLPDecodeError> {
    let (payload, rest) = decode_bytes(rlp)?;
    if !rest.is_empty() {
        return Err(RLPDecodeError::invalid_length_ctx("trailing bytes after item"));
    }
    Ok(payload)
}

/// Decodes the payload of an RLP string item.
/// Returns the payload and the bytes following the item.
pub fn decode_bytes(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let (is_list, payload, rest) = decode_rlp_item(data)?;
    if is_list {
        return Err(RLPDecodeError::unexpected_list());
    }
    Ok((payload, rest))
}

/// Pads a slice of bytes with zeros on the left to make it a fixed size slice.
/// Fails if the data is longer than `N`.
#[inline]
pub fn static_left_pad<const N: usize>(data: &[u8]) -> Result<[u8; N], RLPDecodeError> {
    let mut result = [0; N];

    if data.is_empty() {
        return Ok(result);
    }
    if data.len() > N {
        return Err(RLPDecodeError::invalid_length_ctx("integer too large"));
    }

    let data_start_index = N.saturating_sub(data.len());
    result
        .get_mut(data_start_index..)
        .ok_or(RLPDecodeError::invalid_length())?
        .copy_from_slice(data);
    Ok(result)
}
