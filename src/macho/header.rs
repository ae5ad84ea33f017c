use super::consts::*;
use super::cursor::{Cursor, slice_at};
use crate::error::{Error, Result};
use object::Endianness;
use object::endian::{BigEndian, Endian};
use serde::Serialize;

/// What the first four bytes of a buffer say it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Thin,
    Fat,
    Invalid,
}

fn leading_magic(data: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let b = data.get(offset..end)?;
    Some(BigEndian.read_u32_bytes([b[0], b[1], b[2], b[3]]))
}

/// Maps a big-endian-read magic to (is_64, byte order) for thin images.
fn thin_magic(magic: u32) -> Option<(bool, Endianness)> {
    match magic {
        MH_MAGIC => Some((false, Endianness::Big)),
        MH_CIGAM => Some((false, Endianness::Little)),
        MH_MAGIC_64 => Some((true, Endianness::Big)),
        MH_CIGAM_64 => Some((true, Endianness::Little)),
        _ => None,
    }
}

fn fat_magic(magic: u32) -> Option<(bool, Endianness)> {
    match magic {
        FAT_MAGIC => Some((false, Endianness::Big)),
        FAT_CIGAM => Some((false, Endianness::Little)),
        FAT_MAGIC_64 => Some((true, Endianness::Big)),
        FAT_CIGAM_64 => Some((true, Endianness::Little)),
        _ => None,
    }
}

/// Classifies a buffer by its leading magic number.
///
/// Fails with [`Error::Format`] when fewer than four bytes are available.
pub fn classify(data: &[u8]) -> Result<Kind> {
    let magic = leading_magic(data, 0).ok_or_else(|| {
        Error::Format(format!("{} bytes is too short to hold a magic number", data.len()))
    })?;
    if fat_magic(magic).is_some() {
        Ok(Kind::Fat)
    } else if thin_magic(magic).is_some() {
        Ok(Kind::Thin)
    } else {
        Ok(Kind::Invalid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatHeader {
    /// Magic normalized to the declared byte order (`FAT_MAGIC` or `FAT_MAGIC_64`).
    pub magic: u32,
    pub endian: Endianness,
    /// Whether entries use the 64-bit `fat_arch_64` layout.
    pub is_64: bool,
    pub nfat_arch: u32,
}

impl FatHeader {
    pub fn entry_size(&self) -> usize {
        if self.is_64 { FAT_ARCH_64_SIZE } else { FAT_ARCH_SIZE }
    }
}

/// One slice of a fat container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatArch {
    pub cputype: u32,
    pub cpusubtype: u32,
    pub offset: u64,
    pub size: u64,
    /// Alignment as a power-of-two exponent.
    pub align: u32,
}

impl FatArch {
    pub fn cpu_name(&self) -> &'static str {
        cpu_type_name(self.cputype)
    }

    /// Borrows the thin image this entry points at.
    pub fn slice<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        slice_at(data, self.offset, self.size, "fat architecture slice")
    }
}

pub fn parse_container(data: &[u8]) -> Result<FatHeader> {
    let mut cursor = Cursor::new(data, 0, Endianness::Big, "fat header");
    let raw = cursor.u32()?;
    let (is_64, endian) = fat_magic(raw)
        .ok_or_else(|| Error::Format(format!("magic {:#010x} is not a fat magic", raw)))?;
    let mut cursor = Cursor::new(data, 4, endian, "fat header");
    let nfat_arch = cursor.u32()?;
    Ok(FatHeader {
        magic: if is_64 { FAT_MAGIC_64 } else { FAT_MAGIC },
        endian,
        is_64,
        nfat_arch,
    })
}

/// Reads entry `index` of the architecture table without checking that the
/// slice it describes lies inside `data`.
pub fn read_architecture(fat: &FatHeader, data: &[u8], index: u32) -> Result<FatArch> {
    let start = (index as usize)
        .checked_mul(fat.entry_size())
        .and_then(|off| off.checked_add(FAT_HEADER_SIZE))
        .unwrap_or(usize::MAX);
    let mut cursor = Cursor::new(data, start, fat.endian, "fat architecture table");

    let cputype = cursor.u32()?;
    let cpusubtype = cursor.u32()?;
    let offset = cursor.word(fat.is_64)?;
    let size = cursor.word(fat.is_64)?;
    let align = cursor.u32()?;
    if fat.is_64 {
        cursor.skip(4)?;
    }

    Ok(FatArch { cputype, cpusubtype, offset, size, align })
}

/// Reads exactly `nfat_arch` entries following the fat header.
///
/// Every returned entry satisfies `offset + size <= data.len()`; any entry that
/// does not, or a table running past the buffer, is a [`Error::Truncated`].
pub fn list_architectures(fat: &FatHeader, data: &[u8]) -> Result<Vec<FatArch>> {
    let room = data.len().saturating_sub(FAT_HEADER_SIZE) / fat.entry_size();
    let mut archs = Vec::with_capacity((fat.nfat_arch as usize).min(room));

    for index in 0..fat.nfat_arch {
        let arch = read_architecture(fat, data, index)?;
        arch.slice(data)?;
        archs.push(arch);
    }

    Ok(archs)
}

/// Fixed header of a thin image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachHeader {
    /// Absolute offset of the header within the buffer it was parsed from.
    pub offset: u64,
    /// Magic normalized to the declared byte order (`MH_MAGIC` or `MH_MAGIC_64`).
    pub magic: u32,
    pub is_64: bool,
    pub endian: Endianness,
    pub cputype: u32,
    pub cpusubtype: u32,
    pub filetype: u32,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
}

impl MachHeader {
    pub fn size(&self) -> usize {
        if self.is_64 { MACH_HEADER_64_SIZE } else { MACH_HEADER_SIZE }
    }

    /// Absolute offset of the first load command.
    pub fn commands_offset(&self) -> u64 {
        self.offset + self.size() as u64
    }

    pub fn magic_description(&self) -> &'static str {
        match (self.is_64, self.endian) {
            (false, Endianness::Little) => "32-bit, little-endian",
            (true, Endianness::Little) => "64-bit, little-endian",
            (false, Endianness::Big) => "32-bit, big-endian",
            (true, Endianness::Big) => "64-bit, big-endian",
        }
    }

    pub fn cpu_name(&self) -> &'static str {
        cpu_type_name(self.cputype)
    }

    pub fn file_type_name(&self) -> &'static str {
        file_type_name(self.filetype)
    }
}

pub fn parse_image_header(data: &[u8], offset: u64) -> Result<MachHeader> {
    let start = usize::try_from(offset).map_err(|_| Error::Truncated {
        what: "mach header",
        offset,
        needed: MACH_HEADER_SIZE as u64,
        available: 0,
    })?;
    let raw = Cursor::new(data, start, Endianness::Big, "mach header").u32()?;
    let (is_64, endian) = thin_magic(raw).ok_or_else(|| {
        Error::Format(format!("magic {:#010x} at offset {:#x} is not a Mach-O magic", raw, offset))
    })?;

    let size = if is_64 { MACH_HEADER_64_SIZE } else { MACH_HEADER_SIZE };
    // Check the whole fixed header up front so a short buffer fails as one unit.
    slice_at(data, offset, size as u64, "mach header")?;

    let mut cursor = Cursor::new(data, start + 4, endian, "mach header");
    let header = MachHeader {
        offset,
        magic: if is_64 { MH_MAGIC_64 } else { MH_MAGIC },
        is_64,
        endian,
        cputype: cursor.u32()?,
        cpusubtype: cursor.u32()?,
        filetype: cursor.u32()?,
        ncmds: cursor.u32()?,
        sizeofcmds: cursor.u32()?,
        flags: cursor.u32()?,
    };

    tracing::debug!(
        offset,
        cpu = header.cpu_name(),
        ncmds = header.ncmds,
        sizeofcmds = header.sizeofcmds,
        "parsed mach header"
    );

    Ok(header)
}
