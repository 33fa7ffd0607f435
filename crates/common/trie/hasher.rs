use std::{fmt, str::FromStr};

use ethereum_types::H256;

use crate::{KeyOrdering, StackTrie, Trie, TrieError, ValueRLP};

/// Common interface of the incremental root hashers.
///
/// A hasher goes through `reset`, any amount of `update` calls and a final `hash`.
/// Values are taken by value: a hasher may keep them until `hash` is called,
/// so callers reusing a scratch buffer must hand over a copy.
pub trait TrieHasher {
    fn reset(&mut self);
    fn update(&mut self, key: &[u8], value: ValueRLP) -> Result<(), TrieError>;
    fn hash(&mut self) -> Result<H256, TrieError>;
}

impl TrieHasher for Trie {
    fn reset(&mut self) {
        self.clear();
    }

    fn update(&mut self, key: &[u8], value: ValueRLP) -> Result<(), TrieError> {
        self.insert(key.to_vec(), value)
    }

    fn hash(&mut self) -> Result<H256, TrieError> {
        Ok(Trie::hash(self))
    }
}

impl TrieHasher for StackTrie {
    fn reset(&mut self) {
        StackTrie::reset(self);
    }

    fn update(&mut self, key: &[u8], value: ValueRLP) -> Result<(), TrieError> {
        StackTrie::update(self, key, value)
    }

    fn hash(&mut self) -> Result<H256, TrieError> {
        StackTrie::hash(self)
    }
}

/// Selects which hasher implementation backs a derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrieBackend {
    /// [`Trie`], any key order
    InMemory,
    /// [`StackTrie`], strictly ascending keys only
    Stack,
}

impl TrieBackend {
    pub const ALL: [TrieBackend; 2] = [TrieBackend::InMemory, TrieBackend::Stack];

    pub fn new_hasher(self) -> Box<dyn TrieHasher + Send> {
        match self {
            TrieBackend::InMemory => Box::new(Trie::new()),
            TrieBackend::Stack => Box::new(StackTrie::new()),
        }
    }

    /// Whether keys produced by `ordering` can be fed to this backend for any list length
    pub fn accepts(self, ordering: KeyOrdering) -> bool {
        match self {
            TrieBackend::InMemory => true,
            TrieBackend::Stack => ordering == KeyOrdering::StackSafe,
        }
    }

    /// The ordering this backend is normally paired with
    pub fn ordering(self) -> KeyOrdering {
        match self {
            TrieBackend::InMemory => KeyOrdering::Sequential,
            TrieBackend::Stack => KeyOrdering::StackSafe,
        }
    }
}

impl fmt::Display for TrieBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrieBackend::InMemory => write!(f, "in-memory"),
            TrieBackend::Stack => write!(f, "stack"),
        }
    }
}

impl FromStr for TrieBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-memory" | "memory" => Ok(TrieBackend::InMemory),
            "stack" => Ok(TrieBackend::Stack),
            other => Err(format!("unknown trie backend: {other}")),
        }
    }
}
