use ethroot_trie::{KeyOrdering, TrieBackend, index_key};
use proptest::proptest;

#[test]
fn index_keys_use_canonical_integer_encoding() {
    assert_eq!(index_key(0), vec![0x80]);
    assert_eq!(index_key(1), vec![0x01]);
    assert_eq!(index_key(127), vec![0x7f]);
    assert_eq!(index_key(128), vec![0x81, 0x80]);
    assert_eq!(index_key(255), vec![0x81, 0xff]);
    assert_eq!(index_key(256), vec![0x82, 0x01, 0x00]);
    assert_eq!(index_key(65_536), vec![0x83, 0x01, 0x00, 0x00]);
}

#[test]
fn stack_safe_order_around_the_single_byte_boundary() {
    let order = |len| KeyOrdering::StackSafe.indices(len).collect::<Vec<_>>();
    assert_eq!(order(0), Vec::<usize>::new());
    assert_eq!(order(1), vec![0]);
    assert_eq!(order(3), vec![1, 2, 0]);

    let at_127 = order(127);
    assert_eq!(at_127.first(), Some(&1));
    assert_eq!(at_127.last(), Some(&0));

    let expected_130: Vec<usize> = (1..=127).chain([0, 128, 129]).collect();
    assert_eq!(order(130), expected_130);
}

#[test]
fn sequential_order_is_positional() {
    assert_eq!(
        KeyOrdering::Sequential.indices(4).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
}

#[test]
fn backends_and_orderings_parse_from_their_names() {
    for backend in TrieBackend::ALL {
        assert_eq!(backend.to_string().parse::<TrieBackend>(), Ok(backend));
    }
    for ordering in KeyOrdering::ALL {
        assert_eq!(ordering.to_string().parse::<KeyOrdering>(), Ok(ordering));
    }
    assert!("btree".parse::<TrieBackend>().is_err());
}

proptest! {
    #[test]
    fn stack_safe_keys_are_strictly_ascending(len in 0usize..1_000) {
        let keys: Vec<Vec<u8>> = KeyOrdering::StackSafe.indices(len).map(index_key).collect();
        assert_eq!(keys.len(), len);
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn both_orderings_visit_every_index_once(len in 0usize..1_000) {
        for ordering in KeyOrdering::ALL {
            let mut indices: Vec<usize> = ordering.indices(len).collect();
            indices.sort_unstable();
            assert_eq!(indices, (0..len).collect::<Vec<_>>());
        }
    }
}
