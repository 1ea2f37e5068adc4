//! Cache-aside layer mapping (company, title) to a seniority level.

pub mod client;
pub mod config;
pub mod entry;
pub mod health;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use client::*;
pub use config::*;
pub use entry::CacheEntry;
pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;
pub use store::*;
