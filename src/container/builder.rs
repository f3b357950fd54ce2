//! Authoring new containers.

use super::format::*;
use super::{Audio, Container};
use crate::codec::{Frame, adpcm};
use crate::error::Result;
use crate::schema::{Filename, Identifier, Timestamp};

/// Builder for a new single-author container.
///
/// ```rust
/// use ppm_format::{AudioTrack, Container, ContainerBuilder, Frame, Identifier, NoKeySigner};
///
/// let author = Identifier::new("Artist", 0x1234_5678).unwrap();
/// let mut frame = Frame::default();
/// frame.layer1_mut().set(10, 20, true);
///
/// let container = ContainerBuilder::new(author)
///     .frame(frame)
///     .track_from_pcm(AudioTrack::Bgm, &[0, 100, 200, 300])
///     .build()
///     .unwrap();
/// let bytes = container.to_bytes(&NoKeySigner).unwrap();
/// assert_eq!(Container::parse(&bytes).unwrap().container.frames.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    author: Identifier,
    frames: Vec<Frame>,
    audio: Audio,
    locked: bool,
    thumbnail: Box<[u8; THUMBNAIL_SIZE]>,
    thumbnail_index: u16,
    timestamp: Option<Timestamp>,
}

impl ContainerBuilder {
    pub fn new(author: Identifier) -> Self {
        Self {
            author,
            frames: Vec::new(),
            audio: Audio::default(),
            locked: false,
            thumbnail: Box::new([0u8; THUMBNAIL_SIZE]),
            thumbnail_index: 0,
            timestamp: None,
        }
    }

    /// Append an absolute frame.
    pub fn frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn frames(mut self, frames: impl IntoIterator<Item = Frame>) -> Self {
        self.frames.extend(frames);
        self
    }

    /// Set a track from raw ADPCM bytes.
    pub fn track(mut self, track: AudioTrack, adpcm: Vec<u8>) -> Self {
        self.audio.tracks[track as usize] = adpcm;
        self
    }

    /// Set a track from 8192 Hz PCM.
    pub fn track_from_pcm(self, track: AudioTrack, pcm: &[i16]) -> Self {
        self.track(track, adpcm::encode(pcm))
    }

    /// Per-frame sound effect flags; ignored unless one per frame.
    pub fn sound_effect_flags(mut self, flags: Vec<u8>) -> Self {
        self.audio.sound_effect_flags = flags;
        self
    }

    /// Playback speed (see [`SPEED_TABLE`]).
    pub fn frame_speed(mut self, speed: u8) -> Self {
        self.audio.frame_speed = speed;
        self
    }

    /// Speed at which the BGM was recorded.
    pub fn bgm_speed(mut self, speed: u8) -> Self {
        self.audio.bgm_speed = speed;
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Raw 64x48 thumbnail and the frame it was taken from.
    pub fn thumbnail(mut self, thumbnail: Box<[u8; THUMBNAIL_SIZE]>, frame: u16) -> Self {
        self.thumbnail = thumbnail;
        self.thumbnail_index = frame;
        self
    }

    /// Creation time; defaults to now.
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Result<Container> {
        let timestamp = self.timestamp.unwrap_or_else(Timestamp::now);
        let filename = derive_filename(self.author.id(), timestamp)?;

        let header = Header {
            animation_size: 0,
            audio_size: 0,
            frame_count: self.frames.len(),
            format_version: FORMAT_VERSION,
            locked: self.locked,
            thumbnail_index: self.thumbnail_index,
            root_author: self.author.clone(),
            parent_author: self.author.clone(),
            current_author: self.author,
            parent_filename: filename,
            current_filename: filename,
            root_fragment: root_fragment(&filename),
            timestamp,
            thumbnail: self.thumbnail,
            offset_table_size: 0,
            animation_flags: DEFAULT_ANIMATION_FLAGS,
        };

        let mut container = Container {
            header,
            frames: self.frames,
            audio: self.audio,
            signature: None,
        };
        container.refresh_sizes()?;
        Ok(container)
    }
}

/// Filename for a new file: MAC fragment from the low three id bytes, a
/// hex session string from the id and creation time, zero edits.
fn derive_filename(author_id: u64, timestamp: Timestamp) -> Result<Filename> {
    let id = author_id.to_le_bytes();
    let mac = [id[2], id[1], id[0]];
    let session = format!("{:05X}{:08X}", (author_id >> 24) & 0xF_FFFF, timestamp.seconds);
    Ok(Filename::from_parts(mac, &session, 0)?)
}

/// MAC fragment followed by the first ten session characters packed as hex.
fn root_fragment(filename: &Filename) -> [u8; 8] {
    let mut fragment = [0u8; 8];
    fragment[..3].copy_from_slice(&filename.mac_fragment());
    let session = filename.session();
    for (i, byte) in fragment[3..].iter_mut().enumerate() {
        *byte = session
            .get(2 * i..2 * i + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .unwrap_or(0);
    }
    fragment
}
