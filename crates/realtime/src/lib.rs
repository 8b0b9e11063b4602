//! # Realtime Core
//!
//! Error taxonomy and provider seams shared by the bus trip crates.

mod error;
mod provider;

pub use crate::error::*;
pub use crate::provider::*;
