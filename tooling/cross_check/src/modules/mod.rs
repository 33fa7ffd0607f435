pub mod error;
pub mod parser;
pub mod raw;
pub mod report;
pub mod runner;
pub mod types;
