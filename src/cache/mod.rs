//! Durable dependency cache
//!
//! A cache root holds copies of configured build directories plus a manifest
//! recording which directories were saved and under which toolchain.
//!
//! # Layout
//!
//! | Path | Contents |
//! |------|----------|
//! | `depstash.json` | Manifest (directories, signature, save time) |
//! | `dirs/<rel>` | Stored copy of configured directory `<rel>` |
//! | `dirs/**/.depstash-staging-*` | Copy in progress, swept on open |
//!
//! A restore under a different toolchain signature discards the root
//! entirely, so stored trees never outlive the toolchain that built them.

pub mod descriptor;
pub mod engine;
pub mod signature;
pub mod store;
pub mod sync;

pub use descriptor::{resolve_directories, DirectorySource, Resolution};
pub use engine::{CacheEngine, Phase, RestoreOutcome, RestoreReport, SaveReport};
pub use signature::{compute_signature, BinarySignature};
pub use store::{CacheManifest, CacheStore};
pub use sync::{sync_directory, SyncOutcome, SyncStats};
