use ethereum_types::H256;
use sha3::{Digest, Keccak256};

pub fn keccak(data: impl AsRef<[u8]>) -> H256 {
    H256(Keccak256::digest(data.as_ref()).into())
}

/// Decodes a hex string with an optional `0x` prefix
pub fn decode_hex(hex: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(hex.strip_prefix("0x").unwrap_or(hex))
}
