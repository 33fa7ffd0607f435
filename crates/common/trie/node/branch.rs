use crate::{ValueRLP, error::TrieError, nibbles::Nibbles, node_hash::NodeHash};

use super::{LeafNode, Node, NodeRef};

/// Branch Node of an Ethereum Compatible Patricia Merkle Trie
/// Contains the node's value and the hash of its children nodes
#[derive(Debug, Clone, PartialEq)]
pub struct BranchNode {
    pub choices: [NodeRef; 16],
    pub value: ValueRLP,
}

impl Default for BranchNode {
    fn default() -> Self {
        Self::new(Self::EMPTY_CHOICES)
    }
}

impl BranchNode {
    /// Empty choice array for more convenient node-building
    pub const EMPTY_CHOICES: [NodeRef; 16] = [const { NodeRef::Hash(NodeHash::Inline(([0; 31], 0))) }; 16];

    /// Creates a new branch node given its children, without any stored value
    pub const fn new(choices: [NodeRef; 16]) -> Self {
        Self {
            choices,
            value: Vec::new(),
        }
    }

    /// Creates a new branch node given its children and value
    pub const fn new_with_value(choices: [NodeRef; 16], value: ValueRLP) -> Self {
        Self { choices, value }
    }

    /// Amount of occupied child slots
    pub fn child_count(&self) -> usize {
        self.choices.iter().filter(|child| child.is_valid()).count()
    }

    pub fn get(&self, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        match path.next_choice() {
            Some(choice) => match self.choices[choice].get_node()? {
                Some(child) => child.get(path),
                None => Ok(None),
            },
            None => Ok((!self.value.is_empty()).then(|| self.value.clone())),
        }
    }

    /// Inserts a value into the subtrie originating from this node and returns the new root of the subtrie
    pub fn insert(mut self, mut path: Nibbles, value: ValueRLP) -> Result<Node, TrieError> {
        match path.next_choice() {
            Some(choice) => {
                let child = std::mem::take(&mut self.choices[choice]);
                self.choices[choice] = match child.into_node()? {
                    Some(child) => child.insert(path, value)?.into(),
                    None => Node::from(LeafNode::new(path, value)).into(),
                };
            }
            None => self.value = value,
        }
        Ok(self.into())
    }
}
