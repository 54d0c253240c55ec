//! Multithreaded prefix-free parsing.
//!
//! A text is cut into overlapping words wherever the Karp-Rabin fingerprint
//! of the last `w` bytes is divisible by `p`. Each thread scans its own byte
//! range and counts words in a sharded dictionary; afterwards the dictionary
//! is sorted and the parse rewritten as dictionary ranks.

#![allow(clippy::len_without_is_empty, clippy::doc_lazy_continuation)]

/// Use mimalloc as the global allocator.
/// Every new dictionary word is a small allocation made under a shard lock,
/// from many threads at once; mimalloc's thread-local caches keep that cheap.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod common;
pub mod dict;
pub mod error;
pub mod finish;
pub mod krhash;
pub mod parse;

pub use error::PfpError;
pub use finish::{RunSummary, run};
pub use parse::ParseConfig;
