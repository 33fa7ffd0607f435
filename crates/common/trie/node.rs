mod branch;
mod extension;
mod leaf;

use std::sync::{Arc, OnceLock};

pub use branch::BranchNode;
use ethroot_rlp::encode::RLPEncode;
pub use extension::ExtensionNode;
pub use leaf::LeafNode;

use crate::{ValueRLP, error::TrieError, nibbles::Nibbles, node_hash::NodeHash};

/// A reference to a node.
#[derive(Clone, Debug)]
pub enum NodeRef {
    /// The node is embedded within the reference, its hash computed on demand.
    Node(Arc<Node>, OnceLock<NodeHash>),
    /// Only the hash of the node is known.
    /// The stack trie keeps finished subtries this way.
    Hash(NodeHash),
}

impl NodeRef {
    pub fn is_valid(&self) -> bool {
        match self {
            NodeRef::Node(_, _) => true,
            NodeRef::Hash(hash) => hash.is_valid(),
        }
    }

    pub fn compute_hash(&self) -> NodeHash {
        match self {
            NodeRef::Node(node, hash) => *hash.get_or_init(|| node.compute_hash()),
            NodeRef::Hash(hash) => *hash,
        }
    }

    pub fn get_node(&self) -> Result<Option<&Node>, TrieError> {
        match self {
            NodeRef::Node(node, _) => Ok(Some(node.as_ref())),
            NodeRef::Hash(hash) if hash.is_valid() => Err(TrieError::InconsistentTree),
            NodeRef::Hash(_) => Ok(None),
        }
    }

    /// Takes the referenced node out, leaving nothing cached behind.
    /// Fails if only the hash of the node is known.
    pub fn into_node(self) -> Result<Option<Node>, TrieError> {
        match self {
            NodeRef::Node(node, _) => Ok(Some(Arc::unwrap_or_clone(node))),
            NodeRef::Hash(hash) if hash.is_valid() => Err(TrieError::InconsistentTree),
            NodeRef::Hash(_) => Ok(None),
        }
    }
}

impl Default for NodeRef {
    fn default() -> Self {
        Self::Hash(NodeHash::default())
    }
}

impl From<Node> for NodeRef {
    fn from(value: Node) -> Self {
        Self::Node(Arc::new(value), OnceLock::new())
    }
}

impl From<NodeHash> for NodeRef {
    fn from(value: NodeHash) -> Self {
        Self::Hash(value)
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.compute_hash() == other.compute_hash()
    }
}

/// A Node in an Ethereum Compatible Patricia Merkle Trie
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Branch(Box<BranchNode>),
    Extension(ExtensionNode),
    Leaf(LeafNode),
}

impl From<Box<BranchNode>> for Node {
    fn from(val: Box<BranchNode>) -> Self {
        Node::Branch(val)
    }
}

impl From<BranchNode> for Node {
    fn from(val: BranchNode) -> Self {
        Node::Branch(Box::new(val))
    }
}

impl From<ExtensionNode> for Node {
    fn from(val: ExtensionNode) -> Self {
        Node::Extension(val)
    }
}

impl From<LeafNode> for Node {
    fn from(val: LeafNode) -> Self {
        Node::Leaf(val)
    }
}

impl Node {
    /// Retrieves a value from the subtrie originating from this node given its path
    pub fn get(&self, path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        match self {
            Node::Branch(n) => n.get(path),
            Node::Extension(n) => n.get(path),
            Node::Leaf(n) => Ok(n.get(path)),
        }
    }

    /// Inserts a value into the subtrie originating from this node and returns the new root of the subtrie
    pub fn insert(self, path: Nibbles, value: ValueRLP) -> Result<Node, TrieError> {
        match self {
            Node::Branch(n) => n.insert(path, value),
            Node::Extension(n) => n.insert(path, value),
            Node::Leaf(n) => Ok(n.insert(path, value)),
        }
    }

    /// Computes the reference the parent of this node embeds
    pub fn compute_hash(&self) -> NodeHash {
        NodeHash::from_encoded_raw(&self.encode_to_vec())
    }
}
