//! # Atelier VFS
//!
//! In-memory implementations of the engine's two external storage
//! contracts: the project virtual file system and the checkpoint service.
//! The real studio keeps projects in browser storage; these backends serve
//! the engine's tests and hosts that embed the engine with map-backed
//! projects.

pub mod checkpoints;
pub mod in_memory;

pub use checkpoints::InMemoryCheckpoints;
pub use in_memory::InMemoryVfs;
