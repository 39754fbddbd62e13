//! PSEO Knowledge Base - persistent competitor profiles
//!
//! A single JSON document maps competitor names to nested profiles. Every
//! write is a serialized read-merge-write: incoming values win, nested maps
//! merge recursively, and facts missing from an update are kept.

pub mod merge;
pub mod store;

pub use merge::*;
pub use store::*;
