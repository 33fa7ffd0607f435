mod trie {
    mod derive_tests;
    mod index_key_tests;
}
mod cross_check {
    mod fixture_tests;
}
