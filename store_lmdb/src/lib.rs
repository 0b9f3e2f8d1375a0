//! LMDB storage backend for the nyx wallet engine.
//!
//! Implements the `nyx-store` traits using the `heed` LMDB bindings. Each
//! logical [`nyx_store::Table`] maps to one LMDB database within a single
//! environment, so a write transaction spans every table atomically.

pub mod environment;
pub mod error;
pub mod migration;
pub mod read;
pub mod write_batch;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
pub use read::ReadSnapshot;
pub use write_batch::WriteBatch;
