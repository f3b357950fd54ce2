//! Codec module - byte cursor, frame/layer codec and ADPCM audio codec.

pub mod adpcm;
mod cursor;
mod frame;
mod layer;
pub mod mix;

pub use adpcm::ChannelState;
pub use cursor::*;
pub use frame::*;
pub use layer::*;
