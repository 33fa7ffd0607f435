use std::{fmt, path::PathBuf};

use ethroot_common::H256;
use ethroot_rlp::error::RLPDecodeError;
use ethroot_rpc::EthClientError;
use ethroot_trie::TrieError;

/// Errors that prevent checks from running at all
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse fixture {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to fetch raw data: {0}")]
    Rpc(#[from] EthClientError),
}

/// Which decoder rejected an externally supplied encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Header,
    Block,
    Receipt(usize),
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeStage::Header => write!(f, "header"),
            DecodeStage::Block => write!(f, "block"),
            DecodeStage::Receipt(index) => write!(f, "receipt #{index}"),
        }
    }
}

/// Why a single check did not pass
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckFailure {
    #[error("expected {expected:#x}, got {actual:#x}")]
    HashMismatch { expected: H256, actual: H256 },
    #[error(
        "encodings differ at byte {offset} (expected {expected_len} bytes, got {actual_len} bytes)"
    )]
    EncodingMismatch {
        offset: usize,
        expected_len: usize,
        actual_len: usize,
    },
    #[error("failed to decode {stage} from {len} raw bytes: {source}")]
    Decode {
        stage: DecodeStage,
        len: usize,
        source: RLPDecodeError,
    },
    #[error("expected {expected} items, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("derivation failed: {0}")]
    Trie(String),
}

impl From<TrieError> for CheckFailure {
    fn from(err: TrieError) -> Self {
        CheckFailure::Trie(err.to_string())
    }
}

impl CheckFailure {
    pub fn compare_hashes(expected: H256, actual: H256) -> Result<(), CheckFailure> {
        if expected == actual {
            Ok(())
        } else {
            Err(CheckFailure::HashMismatch { expected, actual })
        }
    }

    pub fn compare_encodings(expected: &[u8], actual: &[u8]) -> Result<(), CheckFailure> {
        if expected == actual {
            return Ok(());
        }
        let offset = expected
            .iter()
            .zip(actual)
            .position(|(a, b)| a != b)
            .unwrap_or(expected.len().min(actual.len()));
        Err(CheckFailure::EncodingMismatch {
            offset,
            expected_len: expected.len(),
            actual_len: actual.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_mismatch_points_at_first_difference() {
        assert_eq!(CheckFailure::compare_encodings(&[1, 2, 3], &[1, 2, 3]), Ok(()));
        assert_eq!(
            CheckFailure::compare_encodings(&[1, 2, 3], &[1, 9, 3]),
            Err(CheckFailure::EncodingMismatch {
                offset: 1,
                expected_len: 3,
                actual_len: 3
            })
        );
        assert_eq!(
            CheckFailure::compare_encodings(&[1, 2], &[1, 2, 3]),
            Err(CheckFailure::EncodingMismatch {
                offset: 2,
                expected_len: 2,
                actual_len: 3
            })
        );
    }

    #[test]
    fn hash_mismatch_message_shows_both_values() {
        let err = CheckFailure::compare_hashes(H256::zero(), H256::repeat_byte(0xff)).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("expected 0x0000"));
        assert!(message.ends_with("ffff"));
    }
}
