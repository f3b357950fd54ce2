//! Frames: header byte, translation, two layers, and delta reconstruction.
//!
//! Non-keyframes are stored as a pattern that is XORed onto the previous
//! frame after shifting the previous frame by the stored translation. The
//! same operation turns an absolute frame back into its stored pattern, so
//! [`Frame::overwrite`] and [`Frame::delta_from`] are exact inverses.

use std::fmt;

use super::cursor::{ByteReader, ByteWriter};
use super::layer::{ENCODING_TABLE_SIZE, HEIGHT, Layer, PenColor, ROW_BYTES, Row};
use crate::error::FormatError;

/// Header bit marking a frame stored as an absolute bitmap.
pub const KEYFRAME_BIT: u8 = 0x80;
/// Header bits announcing that two translation bytes follow.
pub const TRANSLATE_BITS: u8 = 0x60;

/// Background colour of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PaperColor {
    #[default]
    Black = 0,
    White = 1,
}

impl fmt::Display for PaperColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PaperColor::Black => "Black",
            PaperColor::White => "White",
        })
    }
}

/// XOR `src`, shifted right by `shift` pixels, into `dst`.
///
/// Negative shifts move left. Bits shifted in from outside the row are zero.
/// Each destination byte combines two adjacent source bytes: the low-order
/// bits of one moved up by the sub-byte remainder, and the high-order bits
/// of its left neighbour moved down.
pub fn xor_translated_row(dst: &mut Row, src: &Row, shift: i32) {
    let whole = shift.div_euclid(8);
    let bits = shift.rem_euclid(8) as u32;
    let fetch = |i: i32| -> u8 {
        if (0..ROW_BYTES as i32).contains(&i) {
            src[i as usize]
        } else {
            0
        }
    };

    for (k, byte) in dst.iter_mut().enumerate() {
        let hi = k as i32 - whole;
        let mut v = fetch(hi) << bits;
        if bits != 0 {
            v |= fetch(hi - 1) >> (8 - bits);
        }
        *byte ^= v;
    }
}

/// XOR `src` translated by `(dx, dy)` into `dst`, row by row.
///
/// Destination rows whose source row falls outside the layer are untouched.
fn xor_translated_layer(dst: &mut Layer, src: &Layer, dx: i8, dy: i8) {
    for y in 0..HEIGHT {
        let sy = y as i32 - i32::from(dy);
        if !(0..HEIGHT as i32).contains(&sy) {
            continue;
        }
        xor_translated_row(dst.row_mut(y), src.row(sy as usize), i32::from(dx));
    }
}

/// A single animation frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    keyframe: bool,
    paper: PaperColor,
    translate_flags: u8,
    translate_x: i8,
    translate_y: i8,
    layers: [Layer; 2],
    /// First offset-table index that points at this frame's data.
    pub animation_index: usize,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(PaperColor::White, PenColor::Inverted, PenColor::Inverted)
    }
}

impl Frame {
    /// Blank non-keyframe without translation.
    pub fn new(paper: PaperColor, pen1: PenColor, pen2: PenColor) -> Self {
        Self {
            keyframe: false,
            paper,
            translate_flags: 0,
            translate_x: 0,
            translate_y: 0,
            layers: [Layer::new(pen1), Layer::new(pen2)],
            animation_index: 0,
        }
    }

    fn from_header(header: u8) -> Self {
        Self {
            keyframe: header & KEYFRAME_BIT != 0,
            paper: if header & 0x1 != 0 {
                PaperColor::White
            } else {
                PaperColor::Black
            },
            translate_flags: header & TRANSLATE_BITS,
            translate_x: 0,
            translate_y: 0,
            layers: [
                Layer::new(PenColor::from_bits(header >> 1)),
                Layer::new(PenColor::from_bits(header >> 3)),
            ],
            animation_index: 0,
        }
    }

    /// Packed header byte.
    pub fn header(&self) -> u8 {
        let mut header = self.paper as u8;
        header |= (self.layers[0].pen() as u8) << 1;
        header |= (self.layers[1].pen() as u8) << 3;
        header |= self.translate_flags & TRANSLATE_BITS;
        if self.keyframe {
            header |= KEYFRAME_BIT;
        }
        header
    }

    pub fn is_keyframe(&self) -> bool {
        self.keyframe
    }

    pub fn set_keyframe(&mut self, keyframe: bool) {
        self.keyframe = keyframe;
    }

    pub fn paper(&self) -> PaperColor {
        self.paper
    }

    pub fn set_paper(&mut self, paper: PaperColor) {
        self.paper = paper;
    }

    /// Translation `(x, y)` applied to the previous frame.
    pub fn translation(&self) -> (i8, i8) {
        (self.translate_x, self.translate_y)
    }

    /// Set the translation; a non-zero offset is flagged in the header.
    pub fn set_translation(&mut self, x: i8, y: i8) {
        self.translate_x = x;
        self.translate_y = y;
        self.translate_flags = if x != 0 || y != 0 { 0x20 } else { 0 };
    }

    pub fn layer1(&self) -> &Layer {
        &self.layers[0]
    }

    pub fn layer2(&self) -> &Layer {
        &self.layers[1]
    }

    pub fn layer1_mut(&mut self) -> &mut Layer {
        &mut self.layers[0]
    }

    pub fn layer2_mut(&mut self) -> &mut Layer {
        &mut self.layers[1]
    }

    pub fn layers(&self) -> &[Layer; 2] {
        &self.layers
    }

    /// Decode the stored (not yet reconstructed) frame at the start of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut reader = ByteReader::new(bytes);
        Self::read(&mut reader)
    }

    /// Decode a stored frame at the reader's position.
    pub fn read(reader: &mut ByteReader<'_>) -> Result<Self, FormatError> {
        let header = reader.read_u8()?;
        let mut frame = Self::from_header(header);

        if header & TRANSLATE_BITS != 0 {
            frame.translate_x = reader.read_i8()?;
            frame.translate_y = reader.read_i8()?;
        }

        for layer in &mut frame.layers {
            layer.read_encoding_table(reader)?;
        }
        for layer in &mut frame.layers {
            layer.read_rows(reader)?;
        }

        Ok(frame)
    }

    /// Serialize the bitmaps as they are, choosing fresh row encodings.
    pub fn to_bytes(&self) -> Vec<u8> {
        let tables: [[u8; ENCODING_TABLE_SIZE]; 2] = [
            self.layers[0].chosen_encoding_table(),
            self.layers[1].chosen_encoding_table(),
        ];

        let mut out = ByteWriter::with_capacity(1 + 2 + 2 * ENCODING_TABLE_SIZE);
        let header = self.header();
        out.write_u8(header);
        if header & TRANSLATE_BITS != 0 {
            out.write_u8(self.translate_x as u8);
            out.write_u8(self.translate_y as u8);
        }
        out.write_bytes(&tables[0]);
        out.write_bytes(&tables[1]);
        self.layers[0].write_rows(&tables[0], &mut out);
        self.layers[1].write_rows(&tables[1], &mut out);
        out.into_inner()
    }

    /// Reconstruct this frame from its stored pattern and the previous,
    /// already reconstructed frame. Keyframes are left as-is.
    pub fn overwrite(&mut self, prev: &Frame) {
        if self.keyframe {
            return;
        }
        let (dx, dy) = (self.translate_x, self.translate_y);
        for (dst, src) in self.layers.iter_mut().zip(prev.layers.iter()) {
            xor_translated_layer(dst, src, dx, dy);
        }
    }

    /// Stored pattern of this absolute frame relative to `prev`.
    ///
    /// Keyframes are returned unchanged.
    pub fn delta_from(&self, prev: &Frame) -> Frame {
        let mut stored = self.clone();
        stored.overwrite(prev);
        stored
    }

    /// Bytes of this absolute frame as stored after `prev`.
    ///
    /// Without a previous frame the frame is written as a keyframe.
    pub fn encode_after(&self, prev: Option<&Frame>) -> Vec<u8> {
        match prev {
            Some(prev) if !self.keyframe => self.delta_from(prev).to_bytes(),
            Some(_) => self.to_bytes(),
            None => {
                let mut key = self.clone();
                key.keyframe = true;
                key.to_bytes()
            }
        }
    }
}
