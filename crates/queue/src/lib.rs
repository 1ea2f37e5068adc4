//! Message queues between the watcher and the batch processor.
//!
//! Delivery is at-least-once: a received message stays pending until it is
//! acknowledged, and becomes visible again once its visibility timeout
//! lapses.

pub mod config;
pub mod health;
pub mod memory;
pub mod message;
pub mod queue;
pub mod redis_stream;

pub use config::*;
pub use memory::MemoryQueue;
pub use message::*;
pub use queue::*;
pub use redis_stream::RedisStreamQueue;
