use ethroot_rlp::error::RLPDecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    #[error(transparent)]
    RLPDecode(#[from] RLPDecodeError),
    #[error("Inconsistent internal tree structure")]
    InconsistentTree,
    #[error("Keys must be inserted in strictly ascending order: got 0x{} after 0x{}", hex::encode(.current), hex::encode(.previous))]
    UnsortedKey { previous: Vec<u8>, current: Vec<u8> },
    #[error("Key 0x{} is a prefix of the next key 0x{}", hex::encode(.prefix), hex::encode(.key))]
    PrefixKey { prefix: Vec<u8>, key: Vec<u8> },
    #[error("Empty keys are not supported by the stack trie")]
    EmptyKey,
    #[error("Trie already hashed, reset it before inserting more keys")]
    AlreadyHashed,
    #[error("Stack trie popped past its root while placing 0x{}", hex::encode(.0))]
    TrieStackEmpty(Vec<u8>),
}
