//! Root derivation for ordered lists.
//!
//! Item `i` of a list is stored under the RLP encoding of `i`. Those keys don't sort
//! numerically: `0` encodes to `0x80`, which lands between `127` (`0x7f`) and
//! `128` (`0x8180`). Hashers that need ascending keys must receive the items in
//! [`KeyOrdering::StackSafe`] order.

use std::{fmt, str::FromStr};

use ethereum_types::H256;
use ethroot_rlp::encode::RLPEncode;
use tracing::debug;

use crate::{TrieBackend, TrieError, TrieHasher};

/// Canonical trie key of a list position
pub fn index_key(index: usize) -> Vec<u8> {
    (index as u64).encode_to_vec()
}

/// Order in which list positions are handed to a hasher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyOrdering {
    /// `0, 1, ..., n-1`
    Sequential,
    /// `1, ..., min(n-1, 127), 0, 128, ..., n-1`, the ascending order of the encoded keys
    StackSafe,
}

impl KeyOrdering {
    pub const ALL: [KeyOrdering; 2] = [KeyOrdering::Sequential, KeyOrdering::StackSafe];

    /// Positions of a list of `len` items in the order they must be inserted
    pub fn indices(self, len: usize) -> impl Iterator<Item = usize> {
        let (head, zero, tail) = match self {
            KeyOrdering::Sequential => (0..len, 0..0, 0..0),
            KeyOrdering::StackSafe => (1..len.min(0x80), 0..len.min(1), 0x80..len),
        };
        head.chain(zero).chain(tail)
    }
}

impl fmt::Display for KeyOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOrdering::Sequential => write!(f, "sequential"),
            KeyOrdering::StackSafe => write!(f, "stack-safe"),
        }
    }
}

impl FromStr for KeyOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(KeyOrdering::Sequential),
            "stack-safe" => Ok(KeyOrdering::StackSafe),
            other => Err(format!("unknown key ordering: {other}")),
        }
    }
}

/// An ordered list whose root can be derived
pub trait DerivableList {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the canonical encoding of the item at `index` to `buf`.
    /// The encoding may depend on the item kind, but never on the surrounding items.
    fn encode_index(&self, index: usize, buf: &mut Vec<u8>);
}

/// Items that are already in their canonical encoding
impl<T: AsRef<[u8]>> DerivableList for [T] {
    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn encode_index(&self, index: usize, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self[index].as_ref());
    }
}

/// Computes the root of `list` feeding `hasher` in the given order.
///
/// The hasher is reset first. Pairing [`KeyOrdering::Sequential`] with a backend that
/// needs sorted keys fails with [`TrieError::UnsortedKey`] as soon as a second item is inserted.
pub fn derive_root<L, H>(list: &L, ordering: KeyOrdering, hasher: &mut H) -> Result<H256, TrieError>
where
    L: DerivableList + ?Sized,
    H: TrieHasher + ?Sized,
{
    hasher.reset();
    let mut key_buf = Vec::with_capacity(9);
    let mut value_buf = Vec::new();
    for index in ordering.indices(list.len()) {
        key_buf.clear();
        (index as u64).encode(&mut key_buf);
        value_buf.clear();
        list.encode_index(index, &mut value_buf);
        // The scratch buffer is overwritten by the next item
        hasher.update(&key_buf, value_buf.clone())?;
    }
    let root = hasher.hash()?;
    debug!(items = list.len(), %ordering, ?root, "Derived list root");
    Ok(root)
}

/// Computes the root of `list` with a fresh hasher of the given backend and its usual ordering
pub fn derive_root_with_backend<L>(list: &L, backend: TrieBackend) -> Result<H256, TrieError>
where
    L: DerivableList + ?Sized,
{
    let mut hasher = backend.new_hasher();
    derive_root(list, backend.ordering(), hasher.as_mut())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{EMPTY_TRIE_HASH, StackTrie, Trie};
    use proptest::prelude::*;

    struct Encoded(Vec<Vec<u8>>);

    impl DerivableList for Encoded {
        fn len(&self) -> usize {
            self.0.len()
        }

        fn encode_index(&self, index: usize, buf: &mut Vec<u8>) {
            buf.extend_from_slice(&self.0[index]);
        }
    }

    fn items(n: usize) -> Encoded {
        Encoded(
            (0..n)
                .map(|i| {
                    // vary sizes so both inline and hashed nodes show up
                    let mut item = (i as u64).encode_to_vec();
                    item.resize(1 + i % 40, 0xab);
                    item
                })
                .collect(),
        )
    }

    #[test]
    fn index_key_encoding() {
        assert_eq!(index_key(0), vec![0x80]);
        assert_eq!(index_key(1), vec![0x01]);
        assert_eq!(index_key(127), vec![0x7f]);
        assert_eq!(index_key(128), vec![0x81, 0x80]);
        assert_eq!(index_key(255), vec![0x81, 0xff]);
        assert_eq!(index_key(256), vec![0x82, 0x01, 0x00]);
        assert_eq!(index_key(0x01_0000), vec![0x83, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn stack_safe_order_for_130_items() {
        let expected: Vec<usize> = (1..=127).chain([0, 128, 129]).collect();
        assert_eq!(
            KeyOrdering::StackSafe.indices(130).collect::<Vec<_>>(),
            expected
        );
    }

    #[test]
    fn small_lengths() {
        let stack_safe = |n| KeyOrdering::StackSafe.indices(n).collect::<Vec<_>>();
        assert!(stack_safe(0).is_empty());
        assert!(KeyOrdering::Sequential.indices(0).next().is_none());
        assert_eq!(stack_safe(1), vec![0]);
        assert_eq!(stack_safe(2), vec![1, 0]);
        assert_eq!(stack_safe(3), vec![1, 2, 0]);
        assert_eq!(stack_safe(128).last(), Some(&0));
        assert_eq!(stack_safe(129)[126..], [127, 0, 128]);
        assert_eq!(
            KeyOrdering::Sequential.indices(4).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[test]
    fn empty_list_root() {
        let list = Encoded(vec![]);
        assert_eq!(
            derive_root(&list, KeyOrdering::Sequential, &mut Trie::new()).unwrap(),
            *EMPTY_TRIE_HASH
        );
        assert_eq!(
            derive_root(&list, KeyOrdering::StackSafe, &mut StackTrie::new()).unwrap(),
            *EMPTY_TRIE_HASH
        );
    }

    #[test]
    fn three_items_fed_in_both_orders() {
        let list = Encoded(vec![b"E0".to_vec(), b"E1".to_vec(), b"E2".to_vec()]);
        assert_eq!(
            KeyOrdering::StackSafe.indices(3).collect::<Vec<_>>(),
            vec![1, 2, 0]
        );

        let mut trie = Trie::new();
        for (i, item) in list.0.iter().enumerate() {
            trie.insert(index_key(i), item.clone()).unwrap();
        }
        let mut stack = StackTrie::new();
        for i in [1, 2, 0] {
            stack.update(&index_key(i), list.0[i].clone()).unwrap();
        }
        let expected = trie.hash();
        assert_eq!(stack.hash().unwrap(), expected);

        assert_eq!(
            derive_root(&list, KeyOrdering::Sequential, &mut Trie::new()).unwrap(),
            expected
        );
        assert_eq!(
            derive_root(&list, KeyOrdering::StackSafe, &mut StackTrie::new()).unwrap(),
            expected
        );
    }

    #[test]
    fn pre_encoded_items_match_custom_list() {
        let list = items(140);
        let raw: &[Vec<u8>] = &list.0;
        for backend in TrieBackend::ALL {
            assert_eq!(
                derive_root_with_backend(raw, backend).unwrap(),
                derive_root_with_backend(&list, backend).unwrap()
            );
        }
    }

    #[test]
    fn stack_backend_rejects_sequential_order() {
        let err = derive_root(&items(3), KeyOrdering::Sequential, &mut StackTrie::new())
            .unwrap_err();
        assert!(matches!(
            err,
            TrieError::UnsortedKey { ref previous, ref current } if previous == &[0x80] && current == &[0x01]
        ));

        let mut stack = StackTrie::new();
        stack.update(&index_key(2), vec![0x02]).unwrap();
        assert!(matches!(
            stack.update(&index_key(1), vec![0x01]),
            Err(TrieError::UnsortedKey { .. })
        ));
    }

    #[test]
    fn single_item_fits_every_pairing() {
        let list = items(1);
        let expected = derive_root_with_backend(&list, TrieBackend::InMemory).unwrap();
        for ordering in KeyOrdering::ALL {
            for backend in TrieBackend::ALL {
                let mut hasher = backend.new_hasher();
                assert_eq!(derive_root(&list, ordering, hasher.as_mut()).unwrap(), expected);
            }
        }
    }

    #[test]
    fn hasher_is_reset_between_derivations() {
        let mut stack = StackTrie::new();
        let first = derive_root(&items(200), KeyOrdering::StackSafe, &mut stack).unwrap();
        let second = derive_root(&items(200), KeyOrdering::StackSafe, &mut stack).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn backends_agree_across_the_boundaries() {
        for n in [0, 1, 2, 15, 16, 17, 126, 127, 128, 129, 130, 255, 256, 257, 300, 1000] {
            let list = items(n);
            assert_eq!(
                derive_root_with_backend(&list, TrieBackend::InMemory).unwrap(),
                derive_root_with_backend(&list, TrieBackend::Stack).unwrap(),
                "length {n}"
            );
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn stack_safe_keys_are_strictly_ascending(n in 0usize..70_000) {
            let keys: Vec<Vec<u8>> = KeyOrdering::StackSafe.indices(n).map(index_key).collect();
            prop_assert_eq!(keys.len(), n);
            prop_assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
        }

        #[test]
        fn stack_safe_is_a_permutation(n in 0usize..2_000) {
            let mut indices: Vec<usize> = KeyOrdering::StackSafe.indices(n).collect();
            indices.sort_unstable();
            prop_assert_eq!(indices, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn in_memory_root_ignores_ordering(n in 0usize..400) {
            let list = items(n);
            let sequential = derive_root(&list, KeyOrdering::Sequential, &mut Trie::new()).unwrap();
            let stack_safe = derive_root(&list, KeyOrdering::StackSafe, &mut Trie::new()).unwrap();
            prop_assert_eq!(sequential, stack_safe);
        }
    }
}
