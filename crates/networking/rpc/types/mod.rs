pub mod block_identifier;
