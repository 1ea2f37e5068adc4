//! Core types for the seniority augmentation service.

pub mod augment;
pub mod error;
pub mod limits;
pub mod pair;
pub mod record;
pub mod seniority;

pub use augment::{augment, Augmentation};
pub use error::{Error, Result};
pub use pair::*;
pub use record::*;
pub use seniority::*;
