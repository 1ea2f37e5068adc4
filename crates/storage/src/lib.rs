//! Object storage for input units and augmented output.

pub mod config;
pub mod fs;
pub mod health;
pub mod memory;
pub mod store;
pub mod writer;

pub use config::*;
pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use store::*;
pub use writer::OutputWriter;
