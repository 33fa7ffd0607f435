use ethereum_types::H256;
use tracing::trace;

use crate::{
    EMPTY_TRIE_HASH, TrieError, ValueRLP,
    nibbles::Nibbles,
    node::{BranchNode, ExtensionNode, LeafNode, Node},
};

/// A branch that may still receive children, along with its full path.
/// Every element of the stack is the parent of the element above it.
#[derive(Debug, Default, Clone)]
struct StackElement {
    path: Nibbles,
    element: BranchNode,
}

// A single instance lives at a time, its size doesn't matter
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
enum CenterSideElement {
    Branch { node: BranchNode },
    Leaf { value: ValueRLP },
}

/// The element being placed, with its full path.
/// It hangs from the current parent unless the next key proves otherwise.
#[derive(Debug, Clone)]
struct CenterSide {
    path: Nibbles,
    element: CenterSideElement,
}

impl CenterSide {
    fn from_value(path: Nibbles, value: ValueRLP) -> CenterSide {
        CenterSide {
            path,
            element: CenterSideElement::Leaf { value },
        }
    }

    fn from_stack_element(element: StackElement) -> CenterSide {
        CenterSide {
            path: element.path,
            element: CenterSideElement::Branch {
                node: element.element,
            },
        }
    }
}

/// Checks if `this` lies below the stack element
fn is_child(this: &Nibbles, other: &StackElement) -> bool {
    this.count_prefix(&other.path) == other.path.len()
}

/// Creates an empty branch at the point where `current_node` and `closest_nibbles` diverge
fn create_parent(current_node: &CenterSide, closest_nibbles: &Nibbles) -> StackElement {
    let new_parent_nibbles = current_node
        .path
        .slice(0, current_node.path.count_prefix(closest_nibbles));
    StackElement {
        path: new_parent_nibbles,
        element: BranchNode::default(),
    }
}

/// Hashes `current_node` into its slot of `parent_element`, wrapping it in an extension
/// when it sits deeper than the slot. Children of the root are kept whole in `root_child`
/// so the root can be collapsed at the end.
fn add_current_to_parent(
    current_node: CenterSide,
    parent_element: &mut StackElement,
    root_child: &mut Option<Node>,
) -> Result<(), TrieError> {
    let mut path = current_node.path;
    path.skip_prefix(&parent_element.path);
    let index = path
        .next_choice()
        .ok_or_else(|| TrieError::TrieStackEmpty(parent_element.path.to_bytes()))?;

    let node: Node = match current_node.element {
        CenterSideElement::Branch { node } if path.is_empty() => node.into(),
        CenterSideElement::Branch { node } => {
            ExtensionNode::new(path, Node::from(node).compute_hash().into()).into()
        }
        CenterSideElement::Leaf { value } => LeafNode::new(path, value).into(),
    };

    parent_element.element.choices[index] = node.compute_hash().into();
    if parent_element.path.is_empty() {
        *root_child = Some(node);
    }
    Ok(())
}

/// Incremental hasher that keeps only the open path to the last inserted key.
///
/// Keys must arrive in strictly ascending byte order and no key may be a prefix of the
/// next one. Anything else fails with [`TrieError::UnsortedKey`] or
/// [`TrieError::PrefixKey`], since finished subtries are already reduced to hashes.
/// Values are owned by the trie until [`StackTrie::hash`] is called.
#[derive(Debug, Default)]
pub struct StackTrie {
    // Parents of `parent`, root first
    stack: Vec<StackElement>,
    parent: StackElement,
    // Last inserted key, placed once the following key (or the end) is known
    current: Option<CenterSide>,
    last_key: Vec<u8>,
    root_child: Option<Node>,
    root_hash: Option<H256>,
}

impl StackTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every pending node so the trie can be reused
    pub fn reset(&mut self) {
        self.stack.clear();
        self.parent = StackElement::default();
        self.current = None;
        self.last_key.clear();
        self.root_child = None;
        self.root_hash = None;
    }

    /// Amount of branches currently open, the root excluded
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn update(&mut self, key: &[u8], value: ValueRLP) -> Result<(), TrieError> {
        if self.root_hash.is_some() {
            return Err(TrieError::AlreadyHashed);
        }
        if key.is_empty() {
            return Err(TrieError::EmptyKey);
        }
        if self.current.is_some() {
            if key <= self.last_key.as_slice() {
                return Err(TrieError::UnsortedKey {
                    previous: self.last_key.clone(),
                    current: key.to_vec(),
                });
            }
            if key.starts_with(&self.last_key) {
                return Err(TrieError::PrefixKey {
                    prefix: self.last_key.clone(),
                    key: key.to_vec(),
                });
            }
        }

        let next_path = Nibbles::from_bytes(key);
        if let Some(current) = self.current.take() {
            self.place(current, &next_path)?;
        }
        self.current = Some(CenterSide::from_value(next_path, value));
        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        Ok(())
    }

    /// Hangs `current` from the right branch now that the following key is known
    fn place(&mut self, mut current: CenterSide, next_path: &Nibbles) -> Result<(), TrieError> {
        // The current parent can't hold the next key, so nothing else will ever
        // be added below it: close it and move one level up
        while !is_child(next_path, &self.parent) {
            add_current_to_parent(current, &mut self.parent, &mut self.root_child)?;
            let grandparent = self
                .stack
                .pop()
                .ok_or_else(|| TrieError::TrieStackEmpty(next_path.to_bytes()))?;
            let finished = std::mem::replace(&mut self.parent, grandparent);
            current = CenterSide::from_stack_element(finished);
        }

        // Ex: parent=[05] current=[0567] next=[0589]
        // current and next are siblings below the current parent
        if current.path.count_prefix(&self.parent.path) == current.path.count_prefix(next_path) {
            add_current_to_parent(current, &mut self.parent, &mut self.root_child)
        } else {
            // Ex: parent=[05] current=[0567] next=[0569]
            // a new branch at [056] holds both of them
            let mut element = create_parent(&current, next_path);
            add_current_to_parent(current, &mut element, &mut self.root_child)?;
            let parent = std::mem::replace(&mut self.parent, element);
            self.stack.push(parent);
            trace!(depth = self.stack.len(), "stack trie opened a branch");
            Ok(())
        }
    }

    /// Closes every open branch and returns the root.
    /// The result is cached until the next [`StackTrie::reset`].
    pub fn hash(&mut self) -> Result<H256, TrieError> {
        if let Some(hash) = self.root_hash {
            return Ok(hash);
        }
        let Some(current) = self.current.take() else {
            self.root_hash = Some(*EMPTY_TRIE_HASH);
            return Ok(*EMPTY_TRIE_HASH);
        };

        // Every element on the stack is a child of the one below it
        add_current_to_parent(current, &mut self.parent, &mut self.root_child)?;
        while let Some(mut grandparent) = self.stack.pop() {
            let finished = std::mem::take(&mut self.parent);
            add_current_to_parent(
                CenterSide::from_stack_element(finished),
                &mut grandparent,
                &mut self.root_child,
            )?;
            self.parent = grandparent;
        }

        let root = std::mem::take(&mut self.parent).element;
        let hash = if root.child_count() == 1 {
            // A root branch with a single child is folded into that child
            let index = root
                .choices
                .iter()
                .position(|choice| choice.is_valid())
                .ok_or(TrieError::InconsistentTree)? as u8;
            let node: Node = match self.root_child.take().ok_or(TrieError::InconsistentTree)? {
                Node::Branch(branch) => ExtensionNode::new(
                    Nibbles::from_hex(vec![index]),
                    Node::from(branch).compute_hash().into(),
                )
                .into(),
                Node::Extension(mut extension) => {
                    extension.prefix.prepend(index);
                    extension.into()
                }
                Node::Leaf(mut leaf) => {
                    leaf.partial.prepend(index);
                    leaf.into()
                }
            };
            node.compute_hash().finalize()
        } else {
            Node::from(root).compute_hash().finalize()
        };

        self.root_hash = Some(hash);
        Ok(hash)
    }
}
