use std::sync::Arc;

use cita_trie::{MemoryDB as CitaMemoryDB, PatriciaTrie as CitaPatriciaTrie, Trie as CitaTrie};
use ethroot_common::H256;
use ethroot_trie::{
    DerivableList, EMPTY_TRIE_HASH, KeyOrdering, StackTrie, Trie, TrieBackend, TrieError, TrieHasher,
    derive_root, derive_root_with_backend, index_key,
};
use hasher::HasherKeccak;
use proptest::{collection::vec, prelude::any, proptest};

fn cita_new_trie() -> CitaPatriciaTrie<CitaMemoryDB, HasherKeccak> {
    CitaPatriciaTrie::new(
        Arc::new(CitaMemoryDB::new(false)),
        Arc::new(HasherKeccak::new()),
    )
}

fn cita_list_root(items: &[Vec<u8>]) -> H256 {
    let mut trie = cita_new_trie();
    for (index, item) in items.iter().enumerate() {
        trie.insert(index_key(index), item.clone()).unwrap();
    }
    H256::from_slice(&trie.root().unwrap())
}

/// Items whose encoding is `prefix || index`, sized to straddle the inline node threshold
fn items(len: usize, size: usize) -> Vec<Vec<u8>> {
    (0..len)
        .map(|index| {
            let mut item = vec![0xab; size];
            item.extend_from_slice(&(index as u64).to_be_bytes());
            item
        })
        .collect()
}

#[test]
fn empty_list_has_the_empty_root() {
    let empty: &[Vec<u8>] = &[];
    for backend in TrieBackend::ALL {
        assert_eq!(derive_root_with_backend(empty, backend).unwrap(), *EMPTY_TRIE_HASH);
    }
}

#[test]
fn every_pairing_matches_reference_trie_across_the_boundary() {
    for len in [1, 2, 126, 127, 128, 129, 130, 256, 300] {
        for size in [1, 20, 40] {
            let list = items(len, size);
            let expected = cita_list_root(&list);
            for backend in TrieBackend::ALL {
                for ordering in KeyOrdering::ALL.into_iter().filter(|o| backend.accepts(*o)) {
                    let mut hasher = backend.new_hasher();
                    let root = derive_root(list.as_slice(), ordering, hasher.as_mut()).unwrap();
                    assert_eq!(root, expected, "len {len} size {size} {backend} {ordering}");
                }
            }
        }
    }
}

#[test]
fn three_items_fed_in_each_order_agree() {
    let encodings = [b"first".to_vec(), b"second".to_vec(), b"third".to_vec()];

    let mut in_memory = Trie::new();
    for index in [0, 1, 2] {
        in_memory.update(&index_key(index), encodings[index].clone()).unwrap();
    }
    let mut stack = StackTrie::new();
    for index in [1, 2, 0] {
        stack.update(&index_key(index), encodings[index].clone()).unwrap();
    }

    let root = TrieHasher::hash(&mut in_memory).unwrap();
    assert_eq!(root, TrieHasher::hash(&mut stack).unwrap());
    assert_eq!(root, cita_list_root(&encodings));
}

#[test]
fn hashers_are_reusable_after_reset() {
    let mut stack = StackTrie::new();
    let mut in_memory = Trie::new();
    let first = items(140, 33);
    let second = items(3, 1);
    derive_root(first.as_slice(), KeyOrdering::StackSafe, &mut stack).unwrap();
    derive_root(first.as_slice(), KeyOrdering::Sequential, &mut in_memory).unwrap();

    let expected = cita_list_root(&second);
    assert_eq!(
        derive_root(second.as_slice(), KeyOrdering::StackSafe, &mut stack).unwrap(),
        expected
    );
    assert_eq!(
        derive_root(second.as_slice(), KeyOrdering::Sequential, &mut in_memory).unwrap(),
        expected
    );
}

#[test]
fn stack_trie_rejects_sequential_order_past_one_item() {
    let list = items(2, 4);
    let err = derive_root(list.as_slice(), KeyOrdering::Sequential, &mut StackTrie::new())
        .unwrap_err();
    assert!(matches!(err, TrieError::UnsortedKey { .. }));
    assert!(!TrieBackend::Stack.accepts(KeyOrdering::Sequential));

    // a single item has nothing to be out of order with
    let single = items(1, 4);
    assert_eq!(
        derive_root(single.as_slice(), KeyOrdering::Sequential, &mut StackTrie::new()).unwrap(),
        cita_list_root(&single)
    );
}

/// A list encoding its items lazily, as block data does
struct Counter(usize);

impl DerivableList for Counter {
    fn len(&self) -> usize {
        self.0
    }

    fn encode_index(&self, index: usize, buf: &mut Vec<u8>) {
        buf.extend_from_slice(format!("item number {index}").as_bytes());
    }
}

#[test]
fn custom_lists_derive_like_their_encodings() {
    let counter = Counter(200);
    let encoded: Vec<Vec<u8>> = (0..200)
        .map(|index| format!("item number {index}").into_bytes())
        .collect();
    let expected = cita_list_root(&encoded);
    for backend in TrieBackend::ALL {
        assert_eq!(derive_root_with_backend(&counter, backend).unwrap(), expected);
    }
}

proptest! {
    #[test]
    fn proptest_backends_agree_with_reference(list in vec(vec(any::<u8>(), 1..64), 0..300)) {
        let expected = cita_list_root(&list);
        for backend in TrieBackend::ALL {
            assert_eq!(derive_root_with_backend(list.as_slice(), backend).unwrap(), expected);
        }
    }
}
