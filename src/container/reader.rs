//! Container parsing.
//!
//! Frames are decoded from their own byte ranges on a worker pool scoped to
//! the call. Collecting the pool's results is the barrier after which the
//! frames are reconstructed in index order.

use std::ops::Range;
use std::path::Path;

use log::{debug, trace, warn};
#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use super::format::*;
use super::{Audio, Container, Parsed};
use crate::codec::{ByteReader, Frame};
use crate::error::{FormatError, Result, UnsignedFileWarning};
use crate::schema::ParseConfig;

impl Container {
    /// Parse a PPM file with default settings.
    pub fn parse(bytes: &[u8]) -> Result<Parsed> {
        Self::parse_with(bytes, &ParseConfig::default())
    }

    pub fn parse_with(bytes: &[u8], config: &ParseConfig) -> Result<Parsed> {
        let mut r = ByteReader::new(bytes);
        let header = Header::read(&mut r)?;
        debug!(
            "PPM header: {} frames, animation {} bytes, audio {} bytes",
            header.frame_count, header.animation_size, header.audio_size
        );

        let offsets = read_offset_table(&mut r, &header)?;
        let data_start = r.position();
        let section_end = HEADER_END + header.animation_size as usize;
        let ranges = frame_ranges(
            &offsets,
            header.frame_count,
            data_start,
            section_end,
            bytes.len(),
        )?;

        let mut frames = decode_frames(bytes, &ranges, config)?;
        for (i, frame) in frames.iter_mut().enumerate() {
            frame.animation_index = offsets
                .iter()
                .position(|&o| o == offsets[i])
                .unwrap_or(i);
        }
        reconstruct(&mut frames);

        let mut container = Container {
            header,
            frames,
            audio: Audio::default(),
            signature: None,
        };

        if container.header.audio_size == 0 {
            debug!("No audio section");
            return Ok(Parsed {
                container,
                warning: None,
            });
        }

        r.seek(section_end)?;
        container.audio = read_audio(&mut r, container.frames.len())?;

        if r.remaining() == 0 {
            warn!("PPM file is unsigned and will not play on the console");
            return Ok(Parsed {
                container,
                warning: Some(UnsignedFileWarning),
            });
        }

        container.signature = Some(r.read_array::<SIGNATURE_SIZE>()?);
        r.skip(SIGNATURE_PADDING)?;
        if r.remaining() != 0 {
            return Err(FormatError::TrailingBytes {
                offset: r.position(),
                remaining: r.remaining(),
            }
            .into());
        }

        Ok(Parsed {
            container,
            warning: None,
        })
    }

    /// Read and parse a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Parsed> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }
}

/// Read the offset table. Accepts one trailing entry beyond the frame count.
fn read_offset_table(r: &mut ByteReader<'_>, header: &Header) -> Result<Vec<u32>> {
    let table_size = header.offset_table_size;
    if table_size % 4 != 0 {
        return Err(FormatError::MisalignedOffsetTable(table_size).into());
    }
    let entries = usize::from(table_size / 4);
    if entries != header.frame_count && entries != header.frame_count + 1 {
        return Err(FormatError::OffsetTableMismatch {
            entries,
            frames: header.frame_count,
        }
        .into());
    }

    let offsets = (0..entries)
        .map(|_| r.read_u32())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!("Offset table: {} entries", entries);
    Ok(offsets)
}

/// Byte range of each frame.
///
/// A frame runs to the next larger offset in the table, or to the end of the
/// animation section.
fn frame_ranges(
    offsets: &[u32],
    frame_count: usize,
    data_start: usize,
    section_end: usize,
    len: usize,
) -> Result<Vec<Range<usize>>> {
    let mut sorted = offsets.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges = Vec::with_capacity(frame_count);
    for (frame, &offset) in offsets.iter().take(frame_count).enumerate() {
        let absolute = data_start as u64 + u64::from(offset);
        if absolute == CORRUPTED_OFFSET {
            return Err(FormatError::CorruptedOffset {
                frame,
                offset: absolute,
            }
            .into());
        }

        let start = absolute as usize;
        let end = match sorted.iter().find(|&&o| o > offset) {
            Some(&next) => data_start + next as usize,
            None => section_end,
        };
        if start >= end || end > len {
            return Err(FormatError::FrameOutOfRange {
                frame,
                start,
                end,
                len,
            }
            .into());
        }
        trace!("Frame {}: {} bytes at {:#X}", frame, end - start, start);
        ranges.push(start..end);
    }
    Ok(ranges)
}

#[cfg(not(target_arch = "wasm32"))]
fn decode_frames(
    bytes: &[u8],
    ranges: &[Range<usize>],
    config: &ParseConfig,
) -> Result<Vec<Frame>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build()?;
    debug!(
        "Decoding {} frames on {} workers",
        ranges.len(),
        pool.current_num_threads()
    );

    let frames = pool.install(|| {
        ranges
            .par_iter()
            .map(|range| Frame::decode(&bytes[range.clone()]))
            .collect::<std::result::Result<Vec<_>, FormatError>>()
    })?;
    Ok(frames)
}

#[cfg(target_arch = "wasm32")]
fn decode_frames(
    bytes: &[u8],
    ranges: &[Range<usize>],
    _config: &ParseConfig,
) -> Result<Vec<Frame>> {
    let frames = ranges
        .iter()
        .map(|range| Frame::decode(&bytes[range.clone()]))
        .collect::<std::result::Result<Vec<_>, FormatError>>()?;
    Ok(frames)
}

/// Apply each frame's delta onto its already reconstructed predecessor.
fn reconstruct(frames: &mut [Frame]) {
    for i in 1..frames.len() {
        let (done, rest) = frames.split_at_mut(i);
        rest[0].overwrite(&done[i - 1]);
    }
}

fn read_audio(r: &mut ByteReader<'_>, frame_count: usize) -> Result<Audio> {
    let sound_effect_flags = r.read_bytes(frame_count)?.to_vec();
    r.align(4)?;

    let mut sizes = [0usize; 4];
    for size in &mut sizes {
        *size = r.read_u32()? as usize;
    }

    let frame_speed = 8u8.wrapping_sub(r.read_u8()?);
    let bgm_speed = 8u8.wrapping_sub(r.read_u8()?);
    if speed_to_framerate(frame_speed).is_none() {
        warn!("Unknown frame speed {}", frame_speed);
    }
    if speed_to_framerate(bgm_speed).is_none() {
        warn!("Unknown BGM speed {}", bgm_speed);
    }
    r.skip(AUDIO_RESERVED)?;

    let mut tracks: [Vec<u8>; 4] = Default::default();
    for (track, &size) in tracks.iter_mut().zip(&sizes) {
        *track = r.read_bytes(size)?.to_vec();
    }
    debug!(
        "Audio tracks: BGM {} SE1 {} SE2 {} SE3 {} bytes",
        sizes[0], sizes[1], sizes[2], sizes[3]
    );

    Ok(Audio {
        sound_effect_flags,
        frame_speed,
        bgm_speed,
        tracks,
    })
}
