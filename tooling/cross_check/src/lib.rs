//! Cross-validation of the root derivation against known-good block data.
//!
//! Two modes are supported:
//! - root fixtures: every backend and key ordering pairing derives the roots of a
//!   block's transactions and receipts, which must match what its header commits to.
//! - raw data: RLP encoded headers, blocks and receipts (as served by the
//!   `debug_getRaw*` methods) are decoded, re-encoded and hashed, and compared
//!   against a local JSON copy of the same block.

pub mod modules;

pub use modules::{
    error::{CheckFailure, DecodeStage, RunnerError},
    parser::{FixtureSet, RunnerOptions},
    report::{Check, CheckTarget, ListKind, Summary},
};
