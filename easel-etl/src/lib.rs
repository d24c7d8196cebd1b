//! easel-etl library
//!
//! Batch pipeline that turns three independently keyed catalog sources into
//! one episode graph:
//!
//! 1. [`source`] reads delimited tables and free-text lines
//! 2. [`records`] validates raw rows into typed per-source records
//! 3. [`reconcile`] merges the records under the normalized title key
//! 4. [`loader`] persists dated episodes, vocabularies and links in one transaction
//!
//! [`batch::run_batch`] drives all four and returns a [`batch::BatchReport`].

pub mod batch;
pub mod diagnostics;
pub mod error;
pub mod loader;
pub mod reconcile;
pub mod records;
pub mod source;

pub use crate::error::{EtlError, EtlResult};
