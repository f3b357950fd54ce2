//! Layer bitmaps and per-row line encoding.
//!
//! A layer is a 256x192 1-bit bitmap stored as 192 rows of 32 bytes. Pixel
//! `(x, y)` lives at bit `x % 8` (LSB first) of byte `x / 8` in row `y`.
//! Each row is stored with one of four [`LineEncoding`]s, recorded two bits
//! per row in a 48-byte table.

use std::fmt;

use super::cursor::{ByteReader, ByteWriter};
use crate::error::FormatError;

/// Layer width in pixels.
pub const WIDTH: usize = 256;
/// Layer height in pixels.
pub const HEIGHT: usize = 192;
/// Bytes per bitmap row.
pub const ROW_BYTES: usize = WIDTH / 8;
/// Bitmap size in bytes.
pub const BITMAP_SIZE: usize = ROW_BYTES * HEIGHT;
/// Size of the per-row encoding table.
pub const ENCODING_TABLE_SIZE: usize = HEIGHT / 4;

/// One bitmap row.
pub type Row = [u8; ROW_BYTES];

/// Row compression scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LineEncoding {
    /// Entirely zero; nothing stored.
    Skip = 0,
    /// Presence mask of non-zero bytes, then those bytes.
    Coded = 1,
    /// Presence mask of non-0xFF bytes, then those bytes.
    InvertedCoded = 2,
    /// All 32 bytes stored as-is.
    Raw = 3,
}

impl LineEncoding {
    /// Decode a 2-bit table value.
    #[inline]
    pub fn from_bits(v: u8) -> Self {
        match v & 0x3 {
            0 => LineEncoding::Skip,
            1 => LineEncoding::Coded,
            2 => LineEncoding::InvertedCoded,
            _ => LineEncoding::Raw,
        }
    }
}

impl fmt::Display for LineEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LineEncoding::Skip => "Skip",
            LineEncoding::Coded => "Coded",
            LineEncoding::InvertedCoded => "InvertedCoded",
            LineEncoding::Raw => "Raw",
        })
    }
}

/// Pen colour selector of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum PenColor {
    /// Raw value 0. Never written by the console; renders like `Inverted`.
    None = 0,
    /// Opposite of the paper colour.
    #[default]
    Inverted = 1,
    Red = 2,
    Blue = 3,
}

impl PenColor {
    #[inline]
    pub fn from_bits(v: u8) -> Self {
        match v & 0x3 {
            0 => PenColor::None,
            1 => PenColor::Inverted,
            2 => PenColor::Red,
            _ => PenColor::Blue,
        }
    }
}

impl fmt::Display for PenColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PenColor::None => "None",
            PenColor::Inverted => "Inverted",
            PenColor::Red => "Red",
            PenColor::Blue => "Blue",
        })
    }
}

/// Pick the encoding for a row.
///
/// With `z` zero bytes and `f` 0xFF bytes: all zero is `Skip`; no zero and
/// exactly one 0xFF is `Raw`; `z > f` is `Coded`; everything else, including
/// the `z == f == 0` case, is `InvertedCoded`.
pub fn choose_encoding(row: &Row) -> LineEncoding {
    let zeros = row.iter().filter(|&&b| b == 0x00).count();
    let ones = row.iter().filter(|&&b| b == 0xFF).count();

    if zeros == ROW_BYTES {
        LineEncoding::Skip
    } else if zeros == 0 && ones == 1 {
        LineEncoding::Raw
    } else if zeros > ones {
        LineEncoding::Coded
    } else {
        LineEncoding::InvertedCoded
    }
}

/// Decode one row from `reader` into `row`.
///
/// `Skip` leaves `row` untouched; callers pass a zeroed row.
pub fn decode_row(
    reader: &mut ByteReader<'_>,
    encoding: LineEncoding,
    row: &mut Row,
) -> Result<(), FormatError> {
    match encoding {
        LineEncoding::Skip => {}
        LineEncoding::Coded | LineEncoding::InvertedCoded => {
            row.fill(if encoding == LineEncoding::Coded {
                0x00
            } else {
                0xFF
            });
            let mut mask = reader.read_u32_be()?;
            let mut column = 0;
            while mask != 0 {
                if mask & 0x8000_0000 != 0 {
                    row[column] = reader.read_u8()?;
                }
                mask <<= 1;
                column += 1;
            }
        }
        LineEncoding::Raw => row.copy_from_slice(reader.read_bytes(ROW_BYTES)?),
    }
    Ok(())
}

/// Encode one row with the given encoding.
pub fn encode_row(encoding: LineEncoding, row: &Row, out: &mut ByteWriter) {
    let filler = match encoding {
        LineEncoding::Skip => return,
        LineEncoding::Raw => {
            out.write_bytes(row);
            return;
        }
        LineEncoding::Coded => 0x00,
        LineEncoding::InvertedCoded => 0xFF,
    };

    let mut mask = 0u32;
    for (i, &b) in row.iter().enumerate() {
        if b != filler {
            mask |= 1 << (31 - i);
        }
    }
    out.write_bytes(&mask.to_be_bytes());
    for &b in row.iter().filter(|&&b| b != filler) {
        out.write_u8(b);
    }
}

/// One of the two bitmaps making up a frame.
///
/// Equality compares pen and pixels; the encoding table is a serialization
/// detail and is ignored.
#[derive(Clone)]
pub struct Layer {
    pen: PenColor,
    encodings: [u8; ENCODING_TABLE_SIZE],
    rows: Box<[Row; HEIGHT]>,
}

impl Default for Layer {
    fn default() -> Self {
        Self::new(PenColor::default())
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.pen == other.pen && self.rows == other.rows
    }
}

impl Eq for Layer {}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("pen", &self.pen)
            .field("set_pixels", &self.count_set())
            .finish()
    }
}

impl Layer {
    /// Blank layer.
    pub fn new(pen: PenColor) -> Self {
        Self {
            pen,
            encodings: [0; ENCODING_TABLE_SIZE],
            rows: Box::new([[0; ROW_BYTES]; HEIGHT]),
        }
    }

    /// Build a layer from a raw 6144-byte bitmap.
    pub fn from_bitmap(pen: PenColor, bitmap: &[u8]) -> Result<Self, FormatError> {
        if bitmap.len() != BITMAP_SIZE {
            return Err(FormatError::UnexpectedEof {
                offset: 0,
                wanted: BITMAP_SIZE,
                len: bitmap.len(),
            });
        }
        let mut layer = Self::new(pen);
        layer.bitmap_mut().copy_from_slice(bitmap);
        layer.refresh_encodings();
        Ok(layer)
    }

    pub fn pen(&self) -> PenColor {
        self.pen
    }

    pub fn set_pen(&mut self, pen: PenColor) {
        self.pen = pen;
    }

    /// Read pixel `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.rows[y][x >> 3] & (1 << (x & 7)) != 0
    }

    /// Write pixel `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        let byte = &mut self.rows[y][x >> 3];
        if value {
            *byte |= 1 << (x & 7);
        } else {
            *byte &= !(1 << (x & 7));
        }
    }

    /// Number of set pixels.
    pub fn count_set(&self) -> u32 {
        self.bitmap().iter().map(|b| b.count_ones()).sum()
    }

    #[inline]
    pub fn row(&self, y: usize) -> &Row {
        &self.rows[y]
    }

    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut Row {
        &mut self.rows[y]
    }

    pub fn rows(&self) -> &[Row; HEIGHT] {
        &self.rows
    }

    /// Flat 6144-byte view of the bitmap.
    pub fn bitmap(&self) -> &[u8] {
        self.rows.as_flattened()
    }

    pub fn bitmap_mut(&mut self) -> &mut [u8] {
        self.rows.as_flattened_mut()
    }

    /// Raw 48-byte line encoding table.
    pub fn encoding_table(&self) -> &[u8; ENCODING_TABLE_SIZE] {
        &self.encodings
    }

    pub fn line_encoding(&self, y: usize) -> LineEncoding {
        LineEncoding::from_bits(self.encodings[y >> 2] >> ((y & 0x3) << 1))
    }

    pub fn set_line_encoding(&mut self, y: usize, encoding: LineEncoding) {
        let shift = (y & 0x3) << 1;
        let b = &mut self.encodings[y >> 2];
        *b = (*b & !(0x3 << shift)) | ((encoding as u8) << shift);
    }

    /// Recompute every row's encoding from the current bitmap.
    pub fn refresh_encodings(&mut self) {
        for y in 0..HEIGHT {
            let encoding = choose_encoding(&self.rows[y]);
            self.set_line_encoding(y, encoding);
        }
    }

    /// Read the encoding table.
    pub(crate) fn read_encoding_table(
        &mut self,
        reader: &mut ByteReader<'_>,
    ) -> Result<(), FormatError> {
        self.encodings = reader.read_array()?;
        Ok(())
    }

    /// Decode all rows using the current encoding table.
    pub(crate) fn read_rows(&mut self, reader: &mut ByteReader<'_>) -> Result<(), FormatError> {
        for y in 0..HEIGHT {
            let encoding = self.line_encoding(y);
            decode_row(reader, encoding, &mut self.rows[y])?;
        }
        Ok(())
    }

    /// Encoding table chosen from the current bitmap, without storing it.
    pub fn chosen_encoding_table(&self) -> [u8; ENCODING_TABLE_SIZE] {
        let mut table = [0u8; ENCODING_TABLE_SIZE];
        for (y, row) in self.rows.iter().enumerate() {
            table[y >> 2] |= (choose_encoding(row) as u8) << ((y & 0x3) << 1);
        }
        table
    }

    /// Encode all rows with the encodings packed in `table`.
    pub(crate) fn write_rows(&self, table: &[u8; ENCODING_TABLE_SIZE], out: &mut ByteWriter) {
        for (y, row) in self.rows.iter().enumerate() {
            let encoding = LineEncoding::from_bits(table[y >> 2] >> ((y & 0x3) << 1));
            encode_row(encoding, row, out);
        }
    }

    /// XOR every row with the matching row of `other`.
    #[cfg(test)]
    pub(crate) fn xor_with(&mut self, other: &Layer) {
        for (dst, src) in self.bitmap_mut().iter_mut().zip(other.bitmap()) {
            *dst ^= src;
        }
    }
}
