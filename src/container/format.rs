//! Header layout, section constants and audio track identifiers.

use std::fmt;

use crate::codec::{ByteReader, ByteWriter};
use crate::error::{FormatError, PpmError, UnknownTrackError};
use crate::schema::{FILENAME_SIZE, Filename, Identifier, NAME_UNITS, Timestamp};

/// Magic bytes identifying a PPM file.
pub const MAGIC: &[u8; 4] = b"PARA";

/// End of the fixed header; animation and audio offsets are relative to it.
pub const HEADER_END: usize = 0x6A0;

/// Start of the frame offset table.
pub const FRAME_TABLE_START: usize = 0x6A8;

/// Bytes between `HEADER_END` and the first offset entry, as counted in the
/// animation size.
pub const ANIMATION_PREAMBLE: usize = FRAME_TABLE_START - HEADER_END;

/// Absolute frame position produced by a known memory-corruption pattern.
pub const CORRUPTED_OFFSET: u64 = 0xFF9D_06AF;

pub const THUMBNAIL_SIZE: usize = 1536;

pub const SIGNATURE_SIZE: usize = 128;

/// Zero padding after the signature.
pub const SIGNATURE_PADDING: usize = 16;

/// Reserved bytes after the two speed bytes in the audio header.
pub const AUDIO_RESERVED: usize = 14;

/// Format version written by the console.
pub const FORMAT_VERSION: u16 = 0x24;

/// Animation flags written by the console.
pub const DEFAULT_ANIMATION_FLAGS: u16 = 0x43;

/// Largest frame count whose offset table size fits in a u16.
pub const MAX_FRAMES: usize = u16::MAX as usize / 4;

/// Frames per second for frame speeds 0 through 8.
pub const SPEED_TABLE: [f32; 9] = [30.0, 0.5, 1.0, 2.0, 4.0, 6.0, 12.0, 20.0, 30.0];

/// Speed applied when none is given; plays at 30 frames per second.
pub const DEFAULT_FRAME_SPEED: u8 = 8;

/// Frame rate of a decoded speed value, if it is in the table.
pub fn speed_to_framerate(speed: u8) -> Option<f32> {
    SPEED_TABLE.get(speed as usize).copied()
}

/// Speed value (1..=8) for a frame rate, if the console supports it.
pub fn framerate_to_speed(framerate: f32) -> Option<u8> {
    (1..SPEED_TABLE.len())
        .find(|&speed| SPEED_TABLE[speed] == framerate)
        .map(|speed| speed as u8)
}

/// Audio track selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AudioTrack {
    Bgm = 0,
    Se1 = 1,
    Se2 = 2,
    Se3 = 3,
}

impl AudioTrack {
    pub const ALL: [AudioTrack; 4] = [
        AudioTrack::Bgm,
        AudioTrack::Se1,
        AudioTrack::Se2,
        AudioTrack::Se3,
    ];

    /// Sound effect flag value that fires this track, `None` for BGM.
    pub fn effect_flag(self) -> Option<u8> {
        match self {
            AudioTrack::Bgm => None,
            AudioTrack::Se1 => Some(1),
            AudioTrack::Se2 => Some(2),
            AudioTrack::Se3 => Some(4),
        }
    }
}

impl fmt::Display for AudioTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioTrack::Bgm => "BGM",
            AudioTrack::Se1 => "SE1",
            AudioTrack::Se2 => "SE2",
            AudioTrack::Se3 => "SE3",
        })
    }
}

impl TryFrom<u8> for AudioTrack {
    type Error = UnknownTrackError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(AudioTrack::Bgm),
            1 => Ok(AudioTrack::Se1),
            2 => Ok(AudioTrack::Se2),
            3 => Ok(AudioTrack::Se3),
            _ => Err(UnknownTrackError(v)),
        }
    }
}

/// Fixed header fields from the magic through the animation flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Bytes from `HEADER_END` to the audio section.
    pub animation_size: u32,
    /// Sum of the four track sizes.
    pub audio_size: u32,
    /// Actual number of frames (stored as one less).
    pub frame_count: usize,
    pub format_version: u16,
    pub locked: bool,
    pub thumbnail_index: u16,
    pub root_author: Identifier,
    pub parent_author: Identifier,
    pub current_author: Identifier,
    pub parent_filename: Filename,
    pub current_filename: Filename,
    pub root_fragment: [u8; 8],
    pub timestamp: Timestamp,
    pub thumbnail: Box<[u8; THUMBNAIL_SIZE]>,
    /// Offset table size in bytes.
    pub offset_table_size: u16,
    pub animation_flags: u16,
}

impl Header {
    /// Read the header; leaves the reader at `FRAME_TABLE_START`.
    pub fn read(r: &mut ByteReader<'_>) -> Result<Self, PpmError> {
        let magic = r.read_array::<4>()?;
        if &magic != MAGIC {
            return Err(FormatError::InvalidMagic(magic).into());
        }

        let animation_size = r.read_u32()?;
        let audio_size = r.read_u32()?;
        let frame_count = usize::from(r.read_u16()?) + 1;
        let format_version = r.read_u16()?;
        let locked = r.read_u16()? != 0;
        let thumbnail_index = r.read_u16()?;

        let root_name = r.read_utf16(NAME_UNITS)?;
        let parent_name = r.read_utf16(NAME_UNITS)?;
        let current_name = r.read_utf16(NAME_UNITS)?;
        let parent_id = r.read_u64()?;
        let current_id = r.read_u64()?;
        let parent_filename = Filename::from_bytes(r.read_bytes(FILENAME_SIZE)?)?;
        let current_filename = Filename::from_bytes(r.read_bytes(FILENAME_SIZE)?)?;
        let root_id = r.read_u64()?;

        let root_fragment = r.read_array::<8>()?;
        let timestamp = Timestamp::new(r.read_u32()?);
        r.skip(2)?;
        let thumbnail = Box::new(r.read_array::<THUMBNAIL_SIZE>()?);

        let offset_table_size = r.read_u16()?;
        r.skip(4)?;
        let animation_flags = r.read_u16()?;

        Ok(Self {
            animation_size,
            audio_size,
            frame_count,
            format_version,
            locked,
            thumbnail_index,
            root_author: Identifier::new(root_name, root_id)?,
            parent_author: Identifier::new(parent_name, parent_id)?,
            current_author: Identifier::new(current_name, current_id)?,
            parent_filename,
            current_filename,
            root_fragment,
            timestamp,
            thumbnail,
            offset_table_size,
            animation_flags,
        })
    }

    /// Write the header through the animation flags.
    pub fn write(&self, w: &mut ByteWriter) -> Result<(), FormatError> {
        if !(1..=MAX_FRAMES).contains(&self.frame_count) {
            return Err(FormatError::InvalidFrameCount(self.frame_count));
        }

        w.write_bytes(MAGIC);
        w.write_u32(self.animation_size);
        w.write_u32(self.audio_size);
        w.write_u16((self.frame_count - 1) as u16);
        w.write_u16(self.format_version);
        w.write_u16(u16::from(self.locked));
        w.write_u16(self.thumbnail_index);

        w.write_utf16(self.root_author.name(), NAME_UNITS);
        w.write_utf16(self.parent_author.name(), NAME_UNITS);
        w.write_utf16(self.current_author.name(), NAME_UNITS);
        w.write_u64(self.parent_author.id());
        w.write_u64(self.current_author.id());
        w.write_bytes(self.parent_filename.as_bytes());
        w.write_bytes(self.current_filename.as_bytes());
        w.write_u64(self.root_author.id());

        w.write_bytes(&self.root_fragment);
        w.write_u32(self.timestamp.seconds);
        w.write_zeros(2);
        w.write_bytes(&self.thumbnail[..]);

        w.write_u16(self.offset_table_size);
        w.write_zeros(4);
        w.write_u16(self.animation_flags);
        Ok(())
    }
}
