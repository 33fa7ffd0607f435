use bytes::BufMut;
use ethereum_types::H256;
use ethroot_rlp::{constants::RLP_NULL, encode::RLPEncode};
use sha3::{Digest, Keccak256};

/// Reference to a node as seen by its parent.
///
/// Nodes whose encoding is shorter than 32 bytes are embedded in the parent as they are,
/// everything else is referenced by the keccak of its encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeHash {
    Hashed(H256),
    Inline(([u8; 31], u8)),
}

impl NodeHash {
    /// Builds the reference for an already encoded node
    pub fn from_encoded_raw(encoded: &[u8]) -> NodeHash {
        if encoded.len() >= 32 {
            NodeHash::Hashed(keccak(encoded))
        } else {
            let mut buffer = [0u8; 31];
            buffer[..encoded.len()].copy_from_slice(encoded);
            NodeHash::Inline((buffer, encoded.len() as u8))
        }
    }

    /// Hash used when the node is the root of the trie.
    /// Roots are always hashed, even when their encoding is short.
    pub fn finalize(self) -> H256 {
        match self {
            NodeHash::Inline(_) => keccak(self.as_ref()),
            NodeHash::Hashed(hash) => hash,
        }
    }

    /// Whether the reference points to a node.
    /// The default reference (an empty inline) marks an empty branch slot.
    pub fn is_valid(&self) -> bool {
        !matches!(self, NodeHash::Inline((_, 0)))
    }
}

impl AsRef<[u8]> for NodeHash {
    fn as_ref(&self) -> &[u8] {
        match self {
            NodeHash::Inline((data, len)) => &data[..*len as usize],
            NodeHash::Hashed(hash) => hash.as_bytes(),
        }
    }
}

impl Default for NodeHash {
    fn default() -> Self {
        NodeHash::Inline(([0; 31], 0))
    }
}

impl From<H256> for NodeHash {
    fn from(value: H256) -> Self {
        NodeHash::Hashed(value)
    }
}

// Hashes are embedded as 32 byte strings, inline nodes as their raw encoding
impl RLPEncode for NodeHash {
    fn encode(&self, buf: &mut dyn BufMut) {
        match self {
            NodeHash::Hashed(hash) => hash.encode(buf),
            NodeHash::Inline((_, 0)) => buf.put_u8(RLP_NULL),
            NodeHash::Inline((encoded, len)) => buf.put_slice(&encoded[..*len as usize]),
        }
    }

    fn length(&self) -> usize {
        match self {
            NodeHash::Hashed(_) => 33,
            NodeHash::Inline((_, 0)) => 1,
            NodeHash::Inline((_, len)) => *len as usize,
        }
    }
}

pub(crate) fn keccak(data: &[u8]) -> H256 {
    H256::from_slice(Keccak256::new().chain_update(data).finalize().as_slice())
}
