//! Error types for PPM parsing, writing and audio access.

use crate::schema::ConfigError;

/// Structural problems in a PPM byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Invalid PPM magic bytes: expected \"PARA\", got {0:02X?}")]
    InvalidMagic([u8; 4]),

    #[error("Unexpected end of data: needed {wanted} bytes at offset {offset}, buffer is {len} bytes")]
    UnexpectedEof {
        offset: usize,
        wanted: usize,
        len: usize,
    },

    #[error("Frame offset table size {0} is not a multiple of 4")]
    MisalignedOffsetTable(u16),

    #[error("Frame offset table holds {entries} entries for {frames} frames")]
    OffsetTableMismatch { entries: usize, frames: usize },

    #[error("Frame {frame} offset {offset:#X} matches a known corruption pattern")]
    CorruptedOffset { frame: usize, offset: u64 },

    #[error("Frame {frame} byte range {start}..{end} exceeds data size {len}")]
    FrameOutOfRange {
        frame: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Unexpected {remaining} trailing bytes at offset {offset}")]
    TrailingBytes { offset: usize, remaining: usize },

    #[error("Cannot store {0} frames (expected 1..={max})", max = crate::container::MAX_FRAMES)]
    InvalidFrameCount(usize),
}

/// Rejected identifier, name or filename values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Author name must not be empty")]
    EmptyAuthorName,

    #[error("Author id must be non-zero")]
    ZeroAuthorId,

    #[error("Author name exceeds 11 UTF-16 code units ({0})")]
    NameTooLong(usize),

    #[error("Invalid filename length: {0}")]
    FilenameLength(usize),

    #[error("Invalid filename format: {0}")]
    FilenamePattern(String),
}

/// Request for an audio track outside BGM, SE1, SE2 and SE3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unknown audio track: {0}")]
pub struct UnknownTrackError(pub u8);

/// Non-fatal: the audio section is present but no signature follows it.
///
/// The container is complete; the console will refuse to play it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("PPM file is unsigned")]
pub struct UnsignedFileWarning;

/// Crate-level error.
#[derive(Debug, thiserror::Error)]
pub enum PpmError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    UnknownTrack(#[from] UnknownTrackError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[cfg(not(target_arch = "wasm32"))]
    #[error("Failed to build decode worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PpmError>;
