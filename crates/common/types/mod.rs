mod block;
mod receipt;
mod transaction;
mod withdrawal;

pub use block::*;
pub use receipt::*;
pub use transaction::*;
pub use withdrawal::*;
