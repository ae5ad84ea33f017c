use super::commands::SymtabCommand;
use super::consts::*;
use super::cursor::{Cursor, slice_at};
use super::header::MachHeader;
use crate::error::Result;
use std::borrow::Cow;

/// One `nlist` / `nlist_64` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub index: u32,
    /// Byte offset of the name in the string table.
    pub strx: u32,
    pub n_type: u8,
    pub sect: u8,
    pub desc: u16,
    pub value: u64,
}

impl Symbol {
    pub fn is_stab(&self) -> bool {
        self.n_type & N_STAB != 0
    }

    pub fn is_external(&self) -> bool {
        self.n_type & N_EXT != 0
    }

    /// Single-letter type code: `U`ndefined, `A`bsolute, `S`ection,
    /// `P`rebound undefined, `I`ndirect. External symbols use lower case.
    pub fn type_char(&self) -> char {
        let c = match self.n_type & N_TYPE {
            N_UNDF => 'U',
            N_ABS => 'A',
            N_SECT => 'S',
            N_PBUD => 'P',
            N_INDR => 'I',
            _ => '?',
        };
        if self.is_external() { c.to_ascii_lowercase() } else { c }
    }

    pub fn weak_description(&self) -> Option<&'static str> {
        if self.desc & N_WEAK_DEF != 0 {
            Some("weak def")
        } else if self.desc & N_WEAK_REF != 0 {
            Some("weak ref")
        } else {
            None
        }
    }
}

/// Borrowed view of a string table.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn empty() -> Self {
        Self { data: &[] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw bytes of the string starting at `strx`, without its terminator.
    ///
    /// Offset 0 means "no name"; offsets past the table resolve to an empty
    /// name instead of failing.
    pub fn get(&self, strx: u32) -> &'a [u8] {
        let start = strx as usize;
        if start == 0 || start >= self.data.len() {
            return &[];
        }
        let tail = &self.data[start..];
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        &tail[..len]
    }

    pub fn name(&self, strx: u32) -> Cow<'a, str> {
        String::from_utf8_lossy(self.get(strx))
    }

    /// Every non-empty string with its offset, in table order.
    pub fn entries(&self) -> StringEntries<'a> {
        StringEntries { data: self.data, pos: 0 }
    }
}

pub struct StringEntries<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for StringEntries<'a> {
    type Item = (u32, Cow<'a, str>);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.data.len() && self.data[self.pos] == 0 {
            self.pos += 1;
        }
        if self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let tail = &self.data[start..];
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        self.pos = start + len + 1;
        Some((start as u32, String::from_utf8_lossy(&tail[..len])))
    }
}

/// Reads all `nsyms` entries. `symoff` is relative to the start of the image.
pub fn read_symbol_table(
    symtab: &SymtabCommand,
    header: &MachHeader,
    data: &[u8],
) -> Result<Vec<Symbol>> {
    let entry: u64 = if header.is_64 { NLIST_64_SIZE as u64 } else { NLIST_SIZE as u64 };
    let table = slice_at(
        data,
        header.offset + u64::from(symtab.symoff),
        u64::from(symtab.nsyms) * entry,
        "symbol table",
    )?;

    let mut c = Cursor::new(table, 0, header.endian, "symbol table");
    let mut symbols = Vec::with_capacity(symtab.nsyms as usize);
    for index in 0..symtab.nsyms {
        symbols.push(Symbol {
            index,
            strx: c.u32()?,
            n_type: c.u8()?,
            sect: c.u8()?,
            desc: c.u16()?,
            value: c.word(header.is_64)?,
        });
    }

    tracing::debug!(nsyms = symtab.nsyms, symoff = symtab.symoff, "read symbol table");
    Ok(symbols)
}

/// Borrows the string table. `stroff` is relative to the start of the image.
pub fn read_string_table<'a>(
    symtab: &SymtabCommand,
    header: &MachHeader,
    data: &'a [u8],
) -> Result<StringTable<'a>> {
    let bytes = slice_at(
        data,
        header.offset + u64::from(symtab.stroff),
        u64::from(symtab.strsize),
        "string table",
    )?;
    Ok(StringTable::new(bytes))
}
