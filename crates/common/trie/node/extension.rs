use crate::{ValueRLP, error::TrieError, nibbles::Nibbles};

use super::{BranchNode, Node, NodeRef};

/// Extension Node of an Ethereum Compatible Patricia Merkle Trie
/// Contains the node's prefix and its child node
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionNode {
    pub prefix: Nibbles,
    pub child: NodeRef,
}

impl ExtensionNode {
    pub const fn new(prefix: Nibbles, child: NodeRef) -> Self {
        Self { prefix, child }
    }

    pub fn get(&self, mut path: Nibbles) -> Result<Option<ValueRLP>, TrieError> {
        if !path.skip_prefix(&self.prefix) {
            return Ok(None);
        }
        match self.child.get_node()? {
            Some(child) => child.get(path),
            None => Ok(None),
        }
    }

    /// Inserts a value into the subtrie originating from this node and returns the new root of the subtrie
    pub fn insert(mut self, path: Nibbles, value: ValueRLP) -> Result<Node, TrieError> {
        let match_index = path.count_prefix(&self.prefix);

        if match_index == self.prefix.len() {
            // the whole prefix matches, keep descending
            let child = self.child.into_node()?.ok_or(TrieError::InconsistentTree)?;
            self.child = child.insert(path.offset(match_index), value)?.into();
            Ok(self.into())
        } else if match_index == 0 {
            // split at the first nibble, the remaining prefix hangs from a new branch
            let branch_choice = self.prefix.at(0);
            let remainder = if self.prefix.len() == 1 {
                self.child
            } else {
                Node::from(ExtensionNode::new(self.prefix.offset(1), self.child)).into()
            };
            let mut choices = BranchNode::EMPTY_CHOICES;
            choices[branch_choice] = remainder;
            BranchNode::new(choices).insert(path, value)
        } else {
            let shortened = ExtensionNode::new(self.prefix.offset(match_index), self.child);
            let new_child = shortened.insert(path.offset(match_index), value)?;
            self.prefix = self.prefix.slice(0, match_index);
            self.child = new_child.into();
            Ok(self.into())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::LeafNode;

    fn sample() -> ExtensionNode {
        let mut choices = BranchNode::EMPTY_CHOICES;
        choices[0] = Node::from(LeafNode::new(Nibbles::from_hex(vec![16]), vec![0x00])).into();
        choices[1] = Node::from(LeafNode::new(Nibbles::from_hex(vec![16]), vec![0x01])).into();
        ExtensionNode::new(Nibbles::from_hex(vec![0]), Node::from(BranchNode::new(choices)).into())
    }

    #[test]
    fn get_some() {
        let node = sample();
        assert_eq!(node.get(Nibbles::from_bytes(&[0x00])).unwrap(), Some(vec![0x00]));
        assert_eq!(node.get(Nibbles::from_bytes(&[0x01])).unwrap(), Some(vec![0x01]));
        assert_eq!(node.get(Nibbles::from_bytes(&[0x02])).unwrap(), None);
        assert_eq!(node.get(Nibbles::from_bytes(&[0x10])).unwrap(), None);
    }

    #[test]
    fn insert_passes_through() {
        let node = sample().insert(Nibbles::from_bytes(&[0x02]), vec![0x02]).unwrap();
        let Node::Extension(extension) = node else {
            panic!("expected an extension");
        };
        assert_eq!(extension.get(Nibbles::from_bytes(&[0x02])).unwrap(), Some(vec![0x02]));
    }

    #[test]
    fn insert_splits_at_first_nibble() {
        let node = sample().insert(Nibbles::from_bytes(&[0x10]), vec![0x10]).unwrap();
        let Node::Branch(branch) = node else {
            panic!("expected a branch");
        };
        assert_eq!(branch.child_count(), 2);
        assert_eq!(branch.get(Nibbles::from_bytes(&[0x01])).unwrap(), Some(vec![0x01]));
        assert_eq!(branch.get(Nibbles::from_bytes(&[0x10])).unwrap(), Some(vec![0x10]));
    }
}
