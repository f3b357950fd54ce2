//! Schema module - configuration and identity types shared by the codec.

mod config;
mod identity;

pub use config::*;
pub use identity::*;
