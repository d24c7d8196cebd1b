//! Database schema and shared queries

pub mod init;
pub mod vocabulary;

pub use init::*;
pub use vocabulary::*;
