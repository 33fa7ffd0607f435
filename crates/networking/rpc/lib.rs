//! JSON-RPC client used to fetch raw encoded chain data from a node.

pub mod clients;
pub mod rpc_types;
pub mod types;

pub use clients::{EthClient, EthClientError, RpcRequestError};
pub use types::block_identifier::{BlockIdentifier, BlockTag};
