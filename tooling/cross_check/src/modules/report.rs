use std::{
    fmt,
    path::{Path, PathBuf},
};

use ethroot_trie::{KeyOrdering, TrieBackend};
use tracing::{error, info};

use crate::modules::error::{CheckFailure, DecodeStage};

/// Ordered list committed to by a block header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Transactions,
    Receipts,
    RawReceipts,
    Withdrawals,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Transactions => write!(f, "transactions"),
            ListKind::Receipts => write!(f, "receipts"),
            ListKind::RawReceipts => write!(f, "raw receipts"),
            ListKind::Withdrawals => write!(f, "withdrawals"),
        }
    }
}

/// What a check compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckTarget {
    Root {
        list: ListKind,
        backend: TrieBackend,
        ordering: KeyOrdering,
    },
    TransactionHash(usize),
    HeaderHash,
    BlockHash,
    /// The local JSON copy encodes to the raw bytes
    LocalEncoding(DecodeStage),
    /// One item of the local JSON copy encodes like the item the node served
    LocalItem { list: ListKind, index: usize },
    /// Decoding then re-encoding the raw bytes gives them back
    RoundTrip(DecodeStage),
    ItemCount(ListKind),
}

impl fmt::Display for CheckTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckTarget::Root {
                list,
                backend,
                ordering,
            } => write!(f, "{list} root [{backend} / {ordering}]"),
            CheckTarget::TransactionHash(index) => write!(f, "transaction #{index} hash"),
            CheckTarget::HeaderHash => write!(f, "header hash"),
            CheckTarget::BlockHash => write!(f, "block hash"),
            CheckTarget::LocalEncoding(stage) => write!(f, "{stage} local encoding"),
            CheckTarget::LocalItem { list, index } => write!(f, "{list} #{index} local encoding"),
            CheckTarget::RoundTrip(stage) => write!(f, "{stage} round trip"),
            CheckTarget::ItemCount(list) => write!(f, "{list} count"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub fixture: String,
    /// File the fixture was loaded from, when it came from disk
    pub path: Option<PathBuf>,
    pub target: CheckTarget,
    pub result: Result<(), CheckFailure>,
}

impl Check {
    pub fn new(
        fixture: impl Into<String>,
        target: CheckTarget,
        result: Result<(), CheckFailure>,
    ) -> Self {
        Check {
            fixture: fixture.into(),
            path: None,
            target,
            result,
        }
    }

    /// Tags each check with the file its fixture was read from. Empty paths are ignored.
    pub fn attach_path(checks: &mut [Check], path: &Path) {
        if path.as_os_str().is_empty() {
            return;
        }
        for check in checks {
            check.path = Some(path.to_path_buf());
        }
    }

    pub fn passed(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(()) => write!(f, "[{}] {}: ok", self.fixture, self.target),
            Err(failure) => {
                write!(f, "[{}] {}: {failure}", self.fixture, self.target)?;
                match &self.path {
                    Some(path) => write!(f, " ({})", path.display()),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Outcome of a run across all fixtures
#[derive(Debug, Default)]
pub struct Summary {
    pub checks: Vec<Check>,
}

impl Summary {
    pub fn new(checks: Vec<Check>) -> Self {
        Summary { checks }
    }

    pub fn extend(&mut self, checks: impl IntoIterator<Item = Check>) {
        self.checks.extend(checks);
    }

    pub fn passed(&self) -> usize {
        self.checks.iter().filter(|check| check.passed()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|check| !check.passed())
    }

    pub fn is_success(&self) -> bool {
        self.checks.iter().all(Check::passed)
    }

    /// Logs every failed check and a final count
    pub fn log(&self) {
        for check in self.failures() {
            error!(fixture = %check.fixture, path = ?check.path, target = %check.target, "{}", check);
        }
        info!(
            total = self.checks.len(),
            passed = self.passed(),
            failed = self.checks.len() - self.passed(),
            "Cross-check finished"
        );
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in &self.checks {
            writeln!(f, "{check}")?;
        }
        write!(
            f,
            "{} checks, {} passed, {} failed",
            self.checks.len(),
            self.passed(),
            self.checks.len() - self.passed()
        )
    }
}
