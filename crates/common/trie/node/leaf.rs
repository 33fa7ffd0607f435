use crate::{ValueRLP, nibbles::Nibbles, node::BranchNode};

use super::{ExtensionNode, Node};

/// Leaf Node of an Ethereum Compatible Patricia Merkle Trie
/// Contains the node's value and the remaining part of its path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeafNode {
    pub partial: Nibbles,
    pub value: ValueRLP,
}

impl LeafNode {
    pub fn new(partial: Nibbles, value: ValueRLP) -> Self {
        Self { partial, value }
    }

    pub fn get(&self, path: Nibbles) -> Option<ValueRLP> {
        (self.partial == path).then(|| self.value.clone())
    }

    /// Stores the value under `path`, splitting the leaf when the paths diverge
    pub fn insert(mut self, path: Nibbles, value: ValueRLP) -> Node {
        if self.partial == path {
            self.value = value;
            return self.into();
        }

        // Paths end with the leaf flag, so they differ before either runs out
        let match_index = path.count_prefix(&self.partial);
        let self_choice = self.partial.at(match_index);
        let new_choice = path.at(match_index);
        self.partial = self.partial.offset(match_index + 1);

        let mut choices = BranchNode::EMPTY_CHOICES;
        let branch_node = if self_choice == 16 {
            // self ends here, its value moves to the branch
            let new_leaf = LeafNode::new(path.offset(match_index + 1), value);
            choices[new_choice] = Node::from(new_leaf).into();
            BranchNode::new_with_value(choices, self.value)
        } else if new_choice == 16 {
            choices[self_choice] = Node::from(self).into();
            BranchNode::new_with_value(choices, value)
        } else {
            let new_leaf = LeafNode::new(path.offset(match_index + 1), value);
            choices[new_choice] = Node::from(new_leaf).into();
            choices[self_choice] = Node::from(self).into();
            BranchNode::new(choices)
        };

        if match_index == 0 {
            branch_node.into()
        } else {
            ExtensionNode::new(path.slice(0, match_index), Node::from(branch_node).into()).into()
        }
    }
}
