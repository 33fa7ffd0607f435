use bytes::{BufMut, Bytes};
use ethereum_types::{Address, Bloom, H64, H256, U256};

use super::constants::{RLP_EMPTY_LIST, RLP_NULL};

/// Encodes a value into a freshly allocated buffer.
/// For encoding into an existing buffer use [`RLPEncode::encode`].
pub fn encode<T: RLPEncode>(value: T) -> Vec<u8> {
    let mut buf = Vec::new();
    value.encode(&mut buf);
    buf
}

/// Big-endian representation of `value` without leading zeros.
/// Zero yields an empty slice.
#[inline]
fn trimmed_be(value: &[u8]) -> &[u8] {
    let start = value.iter().position(|&b| b != 0).unwrap_or(value.len());
    &value[start..]
}

/// Length of an RLP item (string or list) whose payload is `payload_len` bytes long,
/// prefix included.
#[inline]
pub const fn list_length(payload_len: usize) -> usize {
    if payload_len < 56 {
        1 + payload_len
    } else {
        let be_len = payload_len.ilog2() / 8 + 1;
        1 + be_len as usize + payload_len
    }
}

/// Length of the RLP encoding of a byte string given its length and first byte.
#[inline]
pub const fn bytes_length(bytes_len: usize, first_byte: u8) -> usize {
    if bytes_len == 1 && first_byte < RLP_NULL {
        return 1;
    }
    list_length(bytes_len)
}

/// Writes a prefix for an item with a payload of `payload_len` bytes.
/// `short_offset` is 0x80 for strings and 0xc0 for lists.
#[inline]
fn encode_prefix(payload_len: usize, short_offset: u8, buf: &mut dyn BufMut) {
    if payload_len < 56 {
        buf.put_u8(short_offset + payload_len as u8);
    } else {
        let len_bytes = payload_len.to_be_bytes();
        let len_be = trimmed_be(&len_bytes);
        buf.put_u8(short_offset + 55 + len_be.len() as u8);
        buf.put_slice(len_be);
    }
}

/// Writes the list header for a payload of `total_len` bytes.
#[inline]
pub fn encode_length(total_len: usize, buf: &mut dyn BufMut) {
    encode_prefix(total_len, RLP_EMPTY_LIST, buf)
}

/// `BufMut` that only counts the bytes written to it.
#[derive(Debug, Clone, Copy, Default)]
struct ByteCounter {
    count: usize,
}

unsafe impl BufMut for ByteCounter {
    fn remaining_mut(&self) -> usize {
        usize::MAX - self.count
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        self.count += cnt;
    }

    fn chunk_mut(&mut self) -> &mut bytes::buf::UninitSlice {
        unreachable!("every writing method used by the encoders is overridden")
    }

    fn put<T: bytes::buf::Buf>(&mut self, src: T)
    where
        Self: Sized,
    {
        self.count += src.remaining();
    }

    fn put_u8(&mut self, _n: u8) {
        self.count += 1;
    }

    fn put_bytes(&mut self, _val: u8, cnt: usize) {
        self.count += cnt;
    }

    fn put_slice(&mut self, src: &[u8]) {
        self.count += src.len()
    }
}

pub trait RLPEncode {
    fn encode(&self, buf: &mut dyn BufMut);

    fn length(&self) -> usize {
        let mut counter = ByteCounter::default();
        self.encode(&mut counter);
        counter.count
    }

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        buf
    }
}

impl<T: RLPEncode + ?Sized> RLPEncode for &T {
    fn encode(&self, buf: &mut dyn BufMut) {
        (**self).encode(buf)
    }

    fn length(&self) -> usize {
        (**self).length()
    }
}

impl RLPEncode for bool {
    #[inline(always)]
    fn encode(&self, buf: &mut dyn BufMut) {
        buf.put_u8(if *self { 0x01 } else { RLP_NULL });
    }

    #[inline(always)]
    fn length(&self) -> usize {
        1
    }
}

impl RLPEncode for [u8] {
    #[inline(always)]
    fn encode(&self, buf: &mut dyn BufMut) {
        if self.len() == 1 && self[0] < RLP_NULL {
            buf.put_u8(self[0]);
        } else {
            encode_prefix(self.len(), RLP_NULL, buf);
            buf.put_slice(self);
        }
    }

    #[inline]
    fn length(&self) -> usize {
        match self.first() {
            Some(first) => bytes_length(self.len(), *first),
            None => 1,
        }
    }
}

// unsigned integers are encoded as their minimal big-endian byte string
macro_rules! impl_rlp_encode_uint {
    ($($t:ty),*) => {
        $(
            impl RLPEncode for $t {
                #[inline]
                fn encode(&self, buf: &mut dyn BufMut) {
                    trimmed_be(&self.to_be_bytes()).encode(buf)
                }

                #[inline]
                fn length(&self) -> usize {
                    if *self < 0x80 {
                        return 1;
                    }
                    let significant = (<$t>::BITS - self.leading_zeros()).div_ceil(8);
                    1 + significant as usize
                }
            }
        )*
    };
}

impl_rlp_encode_uint!(u8, u16, u32, u64, usize, u128);

impl RLPEncode for U256 {
    fn encode(&self, buf: &mut dyn BufMut) {
        trimmed_be(&self.to_big_endian()).encode(buf)
    }

    fn length(&self) -> usize {
        if *self < U256::from(0x80) {
            return 1;
        }
        1 + self.bits().div_ceil(8)
    }
}

impl<const N: usize> RLPEncode for [u8; N] {
    #[inline]
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_slice().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        self.as_slice().length()
    }
}

impl RLPEncode for str {
    #[inline]
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        self.as_bytes().length()
    }
}

impl RLPEncode for String {
    #[inline]
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_bytes().encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        self.as_bytes().length()
    }
}

impl RLPEncode for Bytes {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.as_ref().encode(buf)
    }

    fn length(&self) -> usize {
        self.as_ref().length()
    }
}

impl<T: RLPEncode> RLPEncode for Vec<T> {
    #[inline(always)]
    fn encode(&self, buf: &mut dyn BufMut) {
        let payload_len: usize = self.iter().map(RLPEncode::length).sum();
        encode_length(payload_len, buf);
        for item in self {
            item.encode(buf);
        }
    }

    #[inline]
    fn length(&self) -> usize {
        list_length(self.iter().map(RLPEncode::length).sum())
    }
}

impl<S: RLPEncode, T: RLPEncode> RLPEncode for (S, T) {
    fn encode(&self, buf: &mut dyn BufMut) {
        super::structs::Encoder::new(buf)
            .encode_field(&self.0)
            .encode_field(&self.1)
            .finish();
    }

    #[inline]
    fn length(&self) -> usize {
        list_length(self.0.length() + self.1.length())
    }
}

impl<S: RLPEncode, T: RLPEncode, U: RLPEncode> RLPEncode for (S, T, U) {
    fn encode(&self, buf: &mut dyn BufMut) {
        super::structs::Encoder::new(buf)
            .encode_field(&self.0)
            .encode_field(&self.1)
            .encode_field(&self.2)
            .finish();
    }

    #[inline]
    fn length(&self) -> usize {
        list_length(self.0.length() + self.1.length() + self.2.length())
    }
}

// fixed-size hashes are plain byte strings
macro_rules! impl_rlp_encode_fixed_hash {
    ($($t:ty),*) => {
        $(
            impl RLPEncode for $t {
                fn encode(&self, buf: &mut dyn BufMut) {
                    self.as_bytes().encode(buf)
                }

                #[inline]
                fn length(&self) -> usize {
                    self.as_bytes().length()
                }
            }
        )*
    };
}

impl_rlp_encode_fixed_hash!(H64, Address, H256);

impl RLPEncode for Bloom {
    fn encode(&self, buf: &mut dyn BufMut) {
        self.0.encode(buf)
    }

    #[inline]
    fn length(&self) -> usize {
        self.0.length()
    }
}

/// Types whose canonical encoding is not a plain RLP item, such as typed
/// transactions (`type || rlp(payload)`).
pub trait PayloadRLPEncode {
    fn encode_payload(&self, buf: &mut dyn BufMut);

    fn encode_payload_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_payload(&mut buf);
        buf
    }
}

#[cfg(test)]
mod tests {
    use ethereum_types::{Address, U256};
    use hex_literal::hex;

    use crate::constants::{RLP_EMPTY_LIST, RLP_NULL};

    use super::RLPEncode;

    #[test]
    fn can_encode_booleans() {
        assert_eq!(true.encode_to_vec(), vec![0x01]);
        assert_eq!(false.encode_to_vec(), vec![RLP_NULL]);
    }

    #[test]
    fn can_encode_u64() {
        let cases: [(u64, &[u8]); 6] = [
            (0, &[RLP_NULL]),
            (1, &[0x01]),
            (0x7f, &[0x7f]),
            (0x80, &[RLP_NULL + 1, 0x80]),
            (0x0400, &[RLP_NULL + 2, 0x04, 0x00]),
            (u64::MAX, &hex!("88ffffffffffffffff")),
        ];
        for (value, expected) in cases {
            let encoded = value.encode_to_vec();
            assert_eq!(encoded, expected, "encoding of {value}");
            assert_eq!(encoded.len(), value.length(), "length of {value}");
        }
    }

    #[test]
    fn integer_lengths_match_encoding() {
        for n in 0u64..=70_000 {
            assert_eq!(n.encode_to_vec().len(), n.length(), "u64 length mismatch at {n}");
        }
        for n in 0u8..=u8::MAX {
            assert_eq!(n.encode_to_vec().len(), n.length(), "u8 length mismatch at {n}");
        }
    }

    #[test]
    fn can_encode_usize_and_u8_like_u64() {
        for n in [0usize, 1, 127, 128, 255, 256, 65_535, 1 << 40] {
            assert_eq!(n.encode_to_vec(), (n as u64).encode_to_vec());
        }
        assert_eq!(0x90u8.encode_to_vec(), vec![RLP_NULL + 1, 0x90]);
    }

    #[test]
    fn can_encode_u256() {
        assert_eq!(U256::zero().encode_to_vec(), vec![RLP_NULL]);
        assert_eq!(U256::from(0x7f).encode_to_vec(), vec![0x7f]);
        assert_eq!(U256::from(0x0100).encode_to_vec(), vec![0x82, 0x01, 0x00]);
        let max = U256::MAX;
        let encoded = max.encode_to_vec();
        assert_eq!(encoded.len(), 33);
        assert_eq!(encoded[0], 0xa0);
        assert_eq!(encoded.len(), max.length());
    }

    #[test]
    fn can_encode_bytes() {
        assert_eq!([0x00u8].encode_to_vec(), vec![0x00]);
        assert_eq!([0x0fu8].encode_to_vec(), vec![0x0f]);
        assert_eq!([0x04u8, 0x00].encode_to_vec(), vec![RLP_NULL + 2, 0x04, 0x00]);

        let long = [0xaau8; 60];
        let encoded = long.encode_to_vec();
        assert_eq!(&encoded[..2], &[0xb8, 60]);
        assert_eq!(encoded.len(), long.length());
    }

    #[test]
    fn can_encode_strings() {
        assert_eq!("dog".encode_to_vec(), vec![RLP_NULL + 3, b'd', b'o', b'g']);
        assert_eq!("".encode_to_vec(), vec![RLP_NULL]);
    }

    #[test]
    fn can_encode_lists_of_str() {
        let message = vec!["cat", "dog"];
        let encoded = message.encode_to_vec();
        assert_eq!(encoded, vec![0xc8, 0x83, b'c', b'a', b't', 0x83, b'd', b'o', b'g']);
        assert_eq!(encoded.len(), message.length());

        let empty: Vec<&str> = vec![];
        assert_eq!(empty.encode_to_vec(), vec![RLP_EMPTY_LIST]);
    }

    #[test]
    fn can_encode_long_list() {
        let message = vec![U256::MAX; 3];
        let encoded = message.encode_to_vec();
        // 3 * 33 = 99 bytes of payload needs a long list header
        assert_eq!(&encoded[..2], &[0xf8, 99]);
        assert_eq!(encoded.len(), message.length());
    }

    #[test]
    fn can_encode_address() {
        let address = Address::from(hex!("ef2d6d194084c2de36e0dabfce45d046b37d1106"));
        let encoded = address.encode_to_vec();
        assert_eq!(encoded, hex!("94ef2d6d194084c2de36e0dabfce45d046b37d1106"));
    }

    #[test]
    fn can_encode_tuples() {
        let encoded = (1u8, "dog").encode_to_vec();
        assert_eq!(encoded, vec![0xc5, 0x01, 0x83, b'd', b'o', b'g']);
        assert_eq!(encoded.len(), (1u8, "dog").length());
    }
}
