use crate::error::{Error, Result};
use object::endian::{Endian, Endianness};

/// Forward-only reader over a borrowed buffer. Every read is bounds-checked
/// and fails with [`Error::Truncated`] naming `what` was being read.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endianness,
    what: &'static str,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8], pos: usize, endian: Endianness, what: &'static str) -> Self {
        Self { data, pos, endian, what }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = match self.pos.checked_add(len) {
            Some(end) if end <= self.data.len() => end,
            _ => return Err(self.truncated(len)),
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(self.endian.read_u16_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(self.endian.read_u32_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(self.endian.read_u64_bytes(self.array()?))
    }

    /// Reads a pointer-sized field: u64 for 64-bit layouts, zero-extended u32 otherwise.
    pub fn word(&mut self, is_64: bool) -> Result<u64> {
        if is_64 { self.u64() } else { self.u32().map(u64::from) }
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    fn truncated(&self, needed: usize) -> Error {
        Error::Truncated {
            what: self.what,
            offset: self.pos as u64,
            needed: needed as u64,
            available: self.data.len().saturating_sub(self.pos) as u64,
        }
    }
}

/// Borrows `len` bytes at `offset`, failing with [`Error::Truncated`] when the
/// range (including any overflow of `offset + len`) leaves the buffer.
pub fn slice_at<'a>(data: &'a [u8], offset: u64, len: u64, what: &'static str) -> Result<&'a [u8]> {
    let truncated = || Error::Truncated {
        what,
        offset,
        needed: len,
        available: (data.len() as u64).saturating_sub(offset),
    };
    let end = offset.checked_add(len).ok_or_else(truncated)?;
    if end > data.len() as u64 {
        return Err(truncated());
    }
    Ok(&data[offset as usize..end as usize])
}

/// Converts a fixed-width, NUL-padded name field for display. The field is
/// not required to be NUL-terminated when it uses its full width.
pub fn fixed_name(raw: &[u8]) -> String {
    let len = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..len]).into_owned()
}
