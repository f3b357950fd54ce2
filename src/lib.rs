//! PPM - reader and writer for the handheld flip-note animation format.
//!
//! A PPM file holds up to a few thousand two-layer 256x192 monochrome
//! frames, delta-encoded against each other, plus an optional 4-bit ADPCM
//! soundtrack with three sound effects.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `codec`: byte cursor, row and frame codec, ADPCM and PCM mixing
//! - `container`: file layout, parallel parse, serialization, signing hooks
//! - `schema`: configuration, author identifiers, filenames and timestamps
//!
//! # Example
//!
//! ```rust,no_run
//! use ppm_format::{AudioConfig, Container};
//!
//! let parsed = Container::open("animation.ppm")?;
//! if !parsed.is_signed() {
//!     eprintln!("warning: file is unsigned");
//! }
//! let container = parsed.into_container();
//!
//! let first = &container.frames[0];
//! println!(
//!     "{} frames, first has {} pixels set",
//!     container.frame_count(),
//!     first.layer1().count_set()
//! );
//!
//! let pcm = container.master_pcm(&AudioConfig::default())?;
//! println!("{:.2}s of audio, {} samples", container.duration(), pcm.len());
//! # Ok::<(), ppm_format::PpmError>(())
//! ```

pub mod codec;
pub mod container;
pub mod error;
pub mod schema;

// Re-export commonly used types
pub use codec::{Frame, Layer, LineEncoding, PaperColor, PenColor};
pub use container::{
    AudioTrack, Container, ContainerBuilder, NoKeySigner, Parsed, SigningProvider,
    verify_signature,
};
pub use error::{
    FormatError, PpmError, Result, UnknownTrackError, UnsignedFileWarning, ValidationError,
};
pub use schema::{AudioConfig, CodecConfig, Filename, Identifier, ParseConfig, Timestamp};
