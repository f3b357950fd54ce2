//! Container serialization.

use std::path::Path;

use log::debug;
#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use super::Container;
use super::format::*;
use super::signing::SigningProvider;
use crate::codec::{ByteWriter, Frame};
use crate::error::{FormatError, Result};

/// Stored bytes of each frame: the first as a keyframe, the rest as deltas
/// against their predecessor.
#[cfg(not(target_arch = "wasm32"))]
fn encode_frames(frames: &[Frame]) -> Vec<Vec<u8>> {
    frames
        .par_iter()
        .enumerate()
        .map(|(i, frame)| frame.encode_after(i.checked_sub(1).map(|p| &frames[p])))
        .collect()
}

#[cfg(target_arch = "wasm32")]
fn encode_frames(frames: &[Frame]) -> Vec<Vec<u8>> {
    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| frame.encode_after(i.checked_sub(1).map(|p| &frames[p])))
        .collect()
}

/// Animation section size: preamble, offset table and frame data, padded to 4.
fn animation_size(encoded: &[Vec<u8>]) -> usize {
    let frames: usize = encoded.iter().map(Vec::len).sum();
    (ANIMATION_PREAMBLE + 4 * encoded.len() + frames).next_multiple_of(4)
}

/// Audio header bytes after the flags: track sizes, speeds, reserved.
const AUDIO_HEADER_SIZE: usize = 4 * 4 + 2 + AUDIO_RESERVED;

fn check_frame_count(count: usize) -> Result<()> {
    if (1..=MAX_FRAMES).contains(&count) {
        Ok(())
    } else {
        Err(FormatError::InvalidFrameCount(count).into())
    }
}

impl Container {
    fn apply_sizes(&self, header: &mut Header, encoded: &[Vec<u8>]) {
        header.frame_count = encoded.len();
        header.offset_table_size = (4 * encoded.len()) as u16;
        header.animation_size = animation_size(encoded) as u32;
        header.audio_size = self.audio.size() as u32;
    }

    /// Recompute the size fields of the header from the frames and tracks.
    pub fn refresh_sizes(&mut self) -> Result<()> {
        check_frame_count(self.frames.len())?;
        let encoded = encode_frames(&self.frames);
        let mut header = self.header.clone();
        self.apply_sizes(&mut header, &encoded);
        self.header = header;
        Ok(())
    }

    /// Serialize, signing the result with `signer`.
    pub fn to_bytes(&self, signer: &dyn SigningProvider) -> Result<Vec<u8>> {
        let count = self.frames.len();
        check_frame_count(count)?;
        let encoded = encode_frames(&self.frames);
        let mut header = self.header.clone();
        self.apply_sizes(&mut header, &encoded);

        let total = HEADER_END
            + header.animation_size as usize
            + count.next_multiple_of(4)
            + AUDIO_HEADER_SIZE
            + header.audio_size as usize
            + SIGNATURE_SIZE
            + SIGNATURE_PADDING;
        let mut w = ByteWriter::with_capacity(total);
        header.write(&mut w)?;

        let mut offset = 0u32;
        for frame in &encoded {
            w.write_u32(offset);
            offset += frame.len() as u32;
        }
        for frame in &encoded {
            w.write_bytes(frame);
        }
        w.pad_to(4);
        debug!(
            "Wrote {} frames, animation section {} bytes",
            count, header.animation_size
        );

        match self.effective_sound_effect_flags() {
            Some(flags) => w.write_bytes(flags),
            None => w.write_zeros(count),
        }
        w.pad_to(4);

        for track in &self.audio.tracks {
            w.write_u32(track.len() as u32);
        }
        w.write_u8(8u8.wrapping_sub(self.audio.frame_speed));
        w.write_u8(8u8.wrapping_sub(self.audio.bgm_speed));
        w.write_zeros(AUDIO_RESERVED);
        for track in &self.audio.tracks {
            w.write_bytes(track);
        }

        let signature = signer.sign(w.as_slice())?;
        w.write_bytes(&signature);
        w.write_zeros(SIGNATURE_PADDING);
        debug!("Serialized PPM: {} bytes", w.position());

        Ok(w.into_inner())
    }

    /// Serialize and write to `path`.
    pub fn save<P: AsRef<Path>>(&self, path: P, signer: &dyn SigningProvider) -> Result<()> {
        let bytes = self.to_bytes(signer)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PaperColor, PenColor};
    use crate::container::{AudioTrack, ContainerBuilder, NoKeySigner, verify_signature};
    use crate::error::PpmError;
    use crate::schema::Identifier;
    use tempfile::tempdir;

    fn author() -> Identifier {
        Identifier::new("Writer", 0x0011_2233_4455_6677).unwrap()
    }

    fn drawing(seed: usize) -> Frame {
        let mut frame = Frame::new(PaperColor::Black, PenColor::Red, PenColor::Inverted);
        for i in 0..40 {
            frame.layer1_mut().set((seed * 7 + i * 5) % 256, (seed + i * 3) % 192, true);
            frame.layer2_mut().set((i * 11) % 256, (seed * 2 + i) % 192, true);
        }
        frame
    }

    #[test]
    fn test_layout_sizes() {
        let container = ContainerBuilder::new(author())
            .frames((0..3).map(drawing))
            .track(AudioTrack::Bgm, vec![0x12; 5])
            .track(AudioTrack::Se2, vec![0x34; 3])
            .build()
            .unwrap();
        let bytes = container.to_bytes(&NoKeySigner).unwrap();

        let animation_size = u32::from_le_bytes(bytes[4..8].try_into().unwrap()) as usize;
        let audio_size = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        assert_eq!(animation_size % 4, 0);
        assert_eq!(audio_size, 8);
        assert_eq!(u16::from_le_bytes([bytes[12], bytes[13]]), 2);
        assert_eq!(u16::from_le_bytes([bytes[HEADER_END], bytes[HEADER_END + 1]]), 12);

        // Flags (3) pad to 4, then 16 bytes of sizes, 2 speeds, 14 reserved.
        let audio_start = HEADER_END + animation_size;
        let sizes = audio_start + 4;
        assert_eq!(&bytes[sizes..sizes + 4], &5u32.to_le_bytes());
        assert_eq!(&bytes[sizes + 8..sizes + 12], &3u32.to_le_bytes());
        assert_eq!(bytes[sizes + 16], 0, "speed 8 is stored as 0");
        let tracks = sizes + 16 + 2 + AUDIO_RESERVED;
        assert_eq!(&bytes[tracks..tracks + 5], &[0x12; 5]);
        assert_eq!(&bytes[tracks + 5..tracks + 8], &[0x34; 3]);
        assert_eq!(bytes.len(), tracks + 8 + SIGNATURE_SIZE + SIGNATURE_PADDING);
        assert!(bytes[tracks + 8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_first_frame_forced_keyframe() {
        let container = ContainerBuilder::new(author())
            .frames((0..2).map(drawing))
            .build()
            .unwrap();
        assert!(!container.frames[0].is_keyframe());
        let bytes = container.to_bytes(&NoKeySigner).unwrap();
        let first_frame = FRAME_TABLE_START + 2 * 4;
        assert_ne!(bytes[first_frame] & 0x80, 0);
    }

    #[test]
    fn test_round_trip_with_audio_and_translation() {
        let mut frames: Vec<Frame> = (0..4).map(drawing).collect();
        frames[2].set_translation(-5, 3);
        frames[3].set_translation(17, -9);
        frames[3].set_paper(PaperColor::White);

        let container = ContainerBuilder::new(author())
            .frames(frames.clone())
            .track(AudioTrack::Bgm, vec![0x77; 9])
            .track(AudioTrack::Se3, vec![0x01; 2])
            .sound_effect_flags(vec![0, 4, 0, 1])
            .frame_speed(6)
            .bgm_speed(4)
            .locked(true)
            .build()
            .unwrap();

        let bytes = container.to_bytes(&NoKeySigner).unwrap();
        let parsed = Container::parse(&bytes).unwrap();
        assert!(parsed.is_signed());
        let parsed = parsed.into_container();

        assert_eq!(parsed.header.frame_count, 4);
        assert!(parsed.header.locked);
        assert_eq!(parsed.audio, container.audio);
        assert_eq!(parsed.framerate(), Some(12.0));
        assert_eq!(parsed.bgm_rate(), Some(4.0));
        assert_eq!(parsed.signature, Some([0u8; SIGNATURE_SIZE]));
        for (i, (got, want)) in parsed.frames.iter().zip(&frames).enumerate() {
            assert_eq!(got.layers(), want.layers(), "frame {}", i);
            assert_eq!(got.translation(), want.translation());
            assert_eq!(got.paper(), want.paper());
        }

        // Writing the parsed container reproduces the same bytes.
        assert_eq!(parsed.to_bytes(&NoKeySigner).unwrap(), bytes);
    }

    #[test]
    fn test_mismatched_effect_flags_written_as_zero() {
        let container = ContainerBuilder::new(author())
            .frames((0..2).map(drawing))
            .track(AudioTrack::Se1, vec![0x10; 4])
            .sound_effect_flags(vec![1, 1, 1])
            .build()
            .unwrap();
        let parsed = Container::parse(&container.to_bytes(&NoKeySigner).unwrap())
            .unwrap()
            .into_container();
        assert_eq!(parsed.audio.sound_effect_flags, vec![0, 0]);
    }

    #[test]
    fn test_empty_container_rejected() {
        let mut container = ContainerBuilder::new(author())
            .frame(drawing(0))
            .build()
            .unwrap();
        container.frames.clear();
        assert!(matches!(
            container.to_bytes(&NoKeySigner),
            Err(PpmError::Format(FormatError::InvalidFrameCount(0)))
        ));
    }

    #[test]
    fn test_signature_covers_body() {
        struct XorSigner;
        impl SigningProvider for XorSigner {
            fn sign(&self, data: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
                let mut sig = [0u8; SIGNATURE_SIZE];
                for (i, &b) in data.iter().enumerate() {
                    sig[i % SIGNATURE_SIZE] ^= b;
                }
                Ok(sig)
            }
            fn verify(&self, data: &[u8], signature: &[u8; SIGNATURE_SIZE]) -> bool {
                self.sign(data).map(|s| &s == signature).unwrap_or(false)
            }
        }

        let container = ContainerBuilder::new(author())
            .frames((0..2).map(drawing))
            .track(AudioTrack::Bgm, vec![0xAB; 6])
            .build()
            .unwrap();
        let mut bytes = container.to_bytes(&XorSigner).unwrap();
        assert!(verify_signature(&bytes, &XorSigner));
        bytes[0x20] ^= 0xFF;
        assert!(!verify_signature(&bytes, &XorSigner));
    }

    #[test]
    fn test_signing_failure_propagates() {
        struct FailingSigner;
        impl SigningProvider for FailingSigner {
            fn sign(&self, _data: &[u8]) -> Result<[u8; SIGNATURE_SIZE]> {
                Err(PpmError::Signing("no key".into()))
            }
            fn verify(&self, _data: &[u8], _signature: &[u8; SIGNATURE_SIZE]) -> bool {
                false
            }
        }

        let container = ContainerBuilder::new(author())
            .frame(drawing(1))
            .build()
            .unwrap();
        assert!(matches!(
            container.to_bytes(&FailingSigner),
            Err(PpmError::Signing(_))
        ));
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("roundtrip.ppm");

        let container = ContainerBuilder::new(author())
            .frames((0..3).map(drawing))
            .track(AudioTrack::Bgm, vec![0x42; 32])
            .build()
            .unwrap();
        container.save(&path, &NoKeySigner).unwrap();

        let opened = Container::open(&path).unwrap().into_container();
        assert_eq!(opened.header.current_author, container.header.current_author);
        assert_eq!(opened.header.current_filename, container.header.current_filename);
        assert_eq!(opened.frames.len(), 3);
        assert_eq!(opened.audio.tracks[0], vec![0x42; 32]);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Container::open(dir.path().join("missing.ppm")),
            Err(PpmError::Io(_))
        ));
    }
}
