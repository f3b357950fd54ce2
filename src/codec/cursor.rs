//! Bounds-checked byte cursor over an in-memory PPM buffer.

use crate::error::FormatError;

/// Seekable little-endian reader over a borrowed byte slice.
///
/// Every read is bounds-checked and reports the failing offset.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total buffer length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute offset. Seeking to the end is allowed.
    pub fn seek(&mut self, pos: usize) -> Result<(), FormatError> {
        if pos > self.data.len() {
            return Err(self.eof_at(pos, 0));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<(), FormatError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Advance to the next multiple of `alignment` (absolute offset).
    pub fn align(&mut self, alignment: usize) -> Result<(), FormatError> {
        let pad = (alignment - self.pos % alignment) % alignment;
        self.skip(pad)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], FormatError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| self.eof_at(self.pos, n))?;
        let data = self.data;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.read_array::<1>()?[0])
    }

    #[inline]
    pub fn read_i8(&mut self) -> Result<i8, FormatError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, FormatError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Big-endian 32-bit read (row presence masks are stored MSB first).
    pub fn read_u32_be(&mut self) -> Result<u32, FormatError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Little-endian unsigned read of `width` bytes (1..=8).
    pub fn read_uint(&mut self, width: usize) -> Result<u64, FormatError> {
        debug_assert!((1..=8).contains(&width));
        let bytes = self.read_bytes(width.min(8))?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }

    /// Read `units` UTF-16LE code units, stopping the string at the first NUL.
    pub fn read_utf16(&mut self, units: usize) -> Result<String, FormatError> {
        let bytes = self.read_bytes(units * 2)?;
        let chars: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&u| u != 0)
            .collect();
        Ok(String::from_utf16_lossy(&chars))
    }

    fn eof_at(&self, offset: usize, wanted: usize) -> FormatError {
        FormatError::UnexpectedEof {
            offset,
            wanted,
            len: self.data.len(),
        }
    }
}

/// Growable little-endian writer.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Zero-pad up to the next multiple of `alignment`.
    pub fn pad_to(&mut self, alignment: usize) {
        let pad = (alignment - self.buf.len() % alignment) % alignment;
        self.write_zeros(pad);
    }

    #[inline]
    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    /// Overwrite a previously written u32 at `offset`.
    pub fn patch_u32(&mut self, offset: usize, v: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Write `units` UTF-16LE code units, NUL padded.
    ///
    /// Callers validate the length; longer text is truncated.
    pub fn write_utf16(&mut self, text: &str, units: usize) {
        let mut written = 0;
        for unit in text.encode_utf16().take(units) {
            self.write_u16(unit);
            written += 1;
        }
        self.write_zeros((units - written) * 2);
    }
}
