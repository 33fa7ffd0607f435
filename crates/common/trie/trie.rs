pub mod derive;
pub mod error;
pub mod hasher;
mod nibbles;
mod node;
mod node_hash;
mod rlp;
mod stack_trie;

use ethereum_types::H256;
use ethroot_rlp::constants::RLP_NULL;
use sha3::{Digest, Keccak256};

pub use self::derive::{DerivableList, KeyOrdering, derive_root, derive_root_with_backend, index_key};
pub use self::error::TrieError;
pub use self::hasher::{TrieBackend, TrieHasher};
pub use self::nibbles::Nibbles;
pub use self::stack_trie::StackTrie;
pub use self::{node::Node, node_hash::NodeHash};

use self::node::{LeafNode, NodeRef};

use lazy_static::lazy_static;

lazy_static! {
    // Hash value for an empty trie, equal to keccak(RLP_NULL)
    pub static ref EMPTY_TRIE_HASH: H256 = H256::from_slice(
        Keccak256::new()
            .chain_update([RLP_NULL])
            .finalize()
            .as_slice(),
    );
}

/// RLP-encoded trie path
pub type PathRLP = Vec<u8>;
/// RLP-encoded trie value
pub type ValueRLP = Vec<u8>;
/// RLP-encoded trie node
pub type NodeRLP = Vec<u8>;

/// In-memory Ethereum Compatible Merkle Patricia Trie.
///
/// Accepts insertions in any order and keeps every node alive until dropped,
/// so memory grows with the total size of the inserted keys and values.
#[derive(Debug, Default, Clone)]
pub struct Trie {
    root: NodeRef,
}

impl Trie {
    /// Creates an empty trie
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve an RLP-encoded value from the trie given its RLP-encoded path.
    pub fn get(&self, path: &PathRLP) -> Result<Option<ValueRLP>, TrieError> {
        match self.root.get_node()? {
            Some(root_node) => root_node.get(Nibbles::from_bytes(path)),
            None => Ok(None),
        }
    }

    /// Insert an RLP-encoded value into the trie.
    /// Inserting an existing path replaces its value.
    pub fn insert(&mut self, path: PathRLP, value: ValueRLP) -> Result<(), TrieError> {
        let path = Nibbles::from_bytes(&path);
        let root = std::mem::take(&mut self.root);
        let root_node = match root.into_node()? {
            // If the trie is not empty, call the root node's insertion logic
            Some(root_node) => root_node.insert(path, value)?,
            // If the trie is empty, just add a leaf.
            None => LeafNode::new(path, value).into(),
        };
        self.root = root_node.into();
        Ok(())
    }

    /// Return the hash of the trie's root node.
    /// Returns keccak(RLP_NULL) if the trie is empty
    pub fn hash(&self) -> H256 {
        if self.root.is_valid() {
            self.root.compute_hash().finalize()
        } else {
            *EMPTY_TRIE_HASH
        }
    }

    /// Drops every node
    pub fn clear(&mut self) {
        self.root = NodeRef::default();
    }
}
