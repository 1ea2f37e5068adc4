//! Background workers for the seniority augmenter.
//!
//! - Processor (input unit → resolved, augmented, written batches)
//! - Intake worker (intake queue → processor → acknowledge)
//! - Watcher (storage notifications → intake queue)
//! - Scheduler (loop supervision, metrics log, health probes)

pub mod config;
pub mod consumer;
pub mod processor;
pub mod scheduler;
pub mod watcher;

pub use config::*;
pub use consumer::*;
pub use processor::*;
pub use scheduler::*;
pub use watcher::Watcher;
