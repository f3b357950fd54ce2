//! PPM animation container parsing and writing.
//!
//! # File Format
//!
//! All integers are little-endian.
//!
//! ```text
//! Header (0x6A0 bytes):
//!   Magic: "PARA" (4 bytes)
//!   Animation size: u32, audio size: u32
//!   Frame count - 1: u16
//!   Format version: u16, locked: u16, thumbnail frame: u16
//!   Root, parent, current author names: 3 x 11 UTF-16 units
//!   Parent id: u64, current id: u64
//!   Parent filename, current filename: 2 x 18 bytes
//!   Root id: u64
//!   Root fragment: 8 bytes
//!   Timestamp: u32 (seconds since 2000-01-01)
//!   Reserved: 2 bytes
//!   Thumbnail: 1536 bytes
//!
//! Animation section (animation size bytes, from 0x6A0):
//!   Offset table size: u16
//!   Reserved: 4 bytes
//!   Animation flags: u16
//!   Offset table: table size / 4 x u32, relative to the first frame
//!   Frame data (variable), zero padded to 4 bytes
//!
//! Audio section (only when audio size > 0):
//!   Sound effect flags: frame count bytes, zero padded to 4 bytes
//!   Track sizes: 4 x u32 (BGM, SE1, SE2, SE3)
//!   Frame speed, BGM recording speed: 2 x u8 (stored as 8 - speed)
//!   Reserved: 14 bytes
//!   Tracks: 4-bit ADPCM, sizes as above
//!
//! Signature (absent on unsigned files):
//!   Signature: 128 bytes
//!   Padding: 16 bytes
//! ```

mod audio;
mod builder;
mod format;
mod reader;
mod signing;
mod writer;

pub use builder::ContainerBuilder;
pub use format::*;
pub use signing::{NoKeySigner, Signature, SigningProvider, signed_region, verify_signature};

use crate::codec::Frame;
use crate::error::UnsignedFileWarning;

/// Audio section contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    /// One byte per frame: 1, 2 and 4 fire SE1, SE2 and SE3.
    pub sound_effect_flags: Vec<u8>,
    /// Playback speed index into [`SPEED_TABLE`].
    pub frame_speed: u8,
    /// Playback speed at which the BGM was recorded.
    pub bgm_speed: u8,
    /// Raw ADPCM tracks indexed by [`AudioTrack`].
    pub tracks: [Vec<u8>; 4],
}

impl Default for Audio {
    fn default() -> Self {
        Self {
            sound_effect_flags: Vec::new(),
            frame_speed: DEFAULT_FRAME_SPEED,
            bgm_speed: DEFAULT_FRAME_SPEED,
            tracks: Default::default(),
        }
    }
}

impl Audio {
    /// Total encoded size of all tracks.
    pub fn size(&self) -> usize {
        self.tracks.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// A decoded animation.
///
/// Frames are held fully reconstructed; delta encoding happens only when
/// the container is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub header: Header,
    pub frames: Vec<Frame>,
    pub audio: Audio,
    pub signature: Option<Signature>,
}

/// Result of a successful parse.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub container: Container,
    /// Set when the audio section is not followed by a signature.
    pub warning: Option<UnsignedFileWarning>,
}

impl Parsed {
    pub fn into_container(self) -> Container {
        self.container
    }

    pub fn is_signed(&self) -> bool {
        self.warning.is_none()
    }
}

impl Container {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Playback rate, if the stored speed is in the table.
    pub fn framerate(&self) -> Option<f32> {
        speed_to_framerate(self.audio.frame_speed)
    }

    /// Rate at which the BGM was recorded, if known.
    pub fn bgm_rate(&self) -> Option<f32> {
        speed_to_framerate(self.audio.bgm_speed)
    }

    /// Per-frame sound effect flags, if there is exactly one per frame.
    pub fn effective_sound_effect_flags(&self) -> Option<&[u8]> {
        let flags = &self.audio.sound_effect_flags;
        (flags.len() == self.frames.len()).then_some(flags.as_slice())
    }

    /// Speed value for `framerate`, if the console supports it.
    pub fn frame_speed_for(framerate: f32) -> Option<u8> {
        framerate_to_speed(framerate)
    }
}
