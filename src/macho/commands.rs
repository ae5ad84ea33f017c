use super::consts::*;
use super::cursor::{Cursor, fixed_name, slice_at};
use super::header::MachHeader;
use crate::error::{Error, Result};
use object::Endianness;

/// The `(cmd, cmdsize)` pair every load command starts with, plus where it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    /// Position of the command in the load command stream, starting at 0.
    pub index: u32,
    /// Absolute offset of the command in the buffer.
    pub offset: u64,
    pub cmd: u32,
    pub cmdsize: u32,
}

impl CommandHeader {
    pub fn name(&self) -> &'static str {
        command_name(self.cmd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentCommand {
    pub header: CommandHeader,
    pub is_64: bool,
    pub endian: Endianness,
    pub segname: [u8; 16],
    pub vmaddr: u64,
    pub vmsize: u64,
    pub fileoff: u64,
    pub filesize: u64,
    pub maxprot: u32,
    pub initprot: u32,
    pub nsects: u32,
    pub flags: u32,
}

impl SegmentCommand {
    pub fn name(&self) -> String {
        fixed_name(&self.segname)
    }

    fn fixed_size(&self) -> usize {
        if self.is_64 { SEGMENT_COMMAND_64_SIZE } else { SEGMENT_COMMAND_SIZE }
    }

    fn section_size(&self) -> usize {
        if self.is_64 { SECTION_64_SIZE } else { SECTION_SIZE }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub sectname: [u8; 16],
    pub segname: [u8; 16],
    pub addr: u64,
    pub size: u64,
    pub offset: u32,
    /// Alignment as a power-of-two exponent.
    pub align: u32,
    pub reloff: u32,
    pub nreloc: u32,
    pub flags: u32,
    pub reserved1: u32,
    pub reserved2: u32,
    /// Only present in the 64-bit layout; zero otherwise.
    pub reserved3: u32,
}

impl Section {
    pub fn name(&self) -> String {
        fixed_name(&self.sectname)
    }

    pub fn segment_name(&self) -> String {
        fixed_name(&self.segname)
    }

    pub fn section_type(&self) -> u32 {
        self.flags & SECTION_TYPE
    }

    pub fn attributes(&self) -> u32 {
        self.flags & SECTION_ATTRIBUTES
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymtabCommand {
    pub header: CommandHeader,
    pub symoff: u32,
    pub nsyms: u32,
    pub stroff: u32,
    pub strsize: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UuidCommand {
    pub header: CommandHeader,
    pub uuid: [u8; 16],
}

impl UuidCommand {
    /// Canonical 8-4-4-4-12 upper-case rendering.
    pub fn to_uuid_string(&self) -> String {
        let hex: Vec<String> = self.uuid.iter().map(|b| format!("{:02X}", b)).collect();
        format!(
            "{}-{}-{}-{}-{}",
            hex[0..4].concat(),
            hex[4..6].concat(),
            hex[6..8].concat(),
            hex[8..10].concat(),
            hex[10..16].concat()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPointCommand {
    pub header: CommandHeader,
    pub entryoff: u64,
    pub stacksize: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DylibCommand<'a> {
    pub header: CommandHeader,
    pub name: &'a [u8],
    pub timestamp: u32,
    pub current_version: u32,
    pub compatibility_version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DylinkerCommand<'a> {
    pub header: CommandHeader,
    pub name: &'a [u8],
}

/// A decoded load command. Kinds without a dedicated decoder are surfaced as
/// `Opaque` and skipped using their declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadCommand<'a> {
    Segment(SegmentCommand),
    Symtab(SymtabCommand),
    Uuid(UuidCommand),
    EntryPoint(EntryPointCommand),
    Dylib(DylibCommand<'a>),
    Dylinker(DylinkerCommand<'a>),
    Opaque(CommandHeader),
}

impl LoadCommand<'_> {
    pub fn header(&self) -> &CommandHeader {
        match self {
            LoadCommand::Segment(c) => &c.header,
            LoadCommand::Symtab(c) => &c.header,
            LoadCommand::Uuid(c) => &c.header,
            LoadCommand::EntryPoint(c) => &c.header,
            LoadCommand::Dylib(c) => &c.header,
            LoadCommand::Dylinker(c) => &c.header,
            LoadCommand::Opaque(h) => h,
        }
    }
}

/// Formats a packed `xxxx.yy.zz` dylib version.
pub fn format_version(v: u32) -> String {
    format!("{}.{}.{}", v >> 16, (v >> 8) & 0xff, v & 0xff)
}

/// Forward-only walk over the load commands of one image.
///
/// Yields exactly `ncmds` commands on a well-formed image. After the first
/// error the iterator is exhausted.
pub struct LoadCommands<'a> {
    data: &'a [u8],
    header: MachHeader,
    cursor: u64,
    end: u64,
    index: u32,
    done: bool,
}

pub fn load_commands<'a>(header: &MachHeader, data: &'a [u8]) -> LoadCommands<'a> {
    let start = header.commands_offset();
    LoadCommands {
        data,
        header: *header,
        cursor: start,
        end: start + u64::from(header.sizeofcmds),
        index: 0,
        done: false,
    }
}

impl<'a> LoadCommands<'a> {
    fn corrupt(&self, offset: u64, reason: String) -> Error {
        Error::CorruptRecord { index: self.index, offset, reason }
    }

    fn read_one(&mut self) -> Result<LoadCommand<'a>> {
        let offset = self.cursor;
        let len = self.data.len() as u64;

        if offset + LOAD_COMMAND_HEADER_SIZE as u64 > self.end {
            return Err(self.corrupt(
                offset,
                format!(
                    "command header runs past the {} bytes declared for load commands",
                    self.header.sizeofcmds
                ),
            ));
        }
        if offset + LOAD_COMMAND_HEADER_SIZE as u64 > len {
            return Err(self.corrupt(
                offset,
                format!("command header runs past end of buffer ({} bytes)", len),
            ));
        }

        let mut cursor = Cursor::new(self.data, offset as usize, self.header.endian, "load command");
        let cmd = cursor.u32()?;
        let cmdsize = cursor.u32()?;

        let min = min_command_size(cmd);
        if (cmdsize as usize) < min {
            return Err(self.corrupt(
                offset,
                format!(
                    "cmdsize {} is below the {} byte minimum for {} ({:#x})",
                    cmdsize,
                    min,
                    command_name(cmd),
                    cmd
                ),
            ));
        }
        let record_end = offset + u64::from(cmdsize);
        if record_end > len {
            return Err(self.corrupt(
                offset,
                format!("cmdsize {} runs past end of buffer ({} bytes)", cmdsize, len),
            ));
        }
        if record_end > self.end {
            return Err(self.corrupt(
                offset,
                format!(
                    "cmdsize {} runs past the {} bytes declared for load commands",
                    cmdsize, self.header.sizeofcmds
                ),
            ));
        }

        let header = CommandHeader { index: self.index, offset, cmd, cmdsize };
        let record = slice_at(self.data, offset, u64::from(cmdsize), "load command")?;
        let command = self.decode(header, record)?;

        tracing::debug!(index = self.index, offset, cmd = header.name(), cmdsize, "load command");
        self.cursor = record_end;
        Ok(command)
    }

    fn decode(&self, header: CommandHeader, record: &'a [u8]) -> Result<LoadCommand<'a>> {
        let endian = self.header.endian;
        let mut c = Cursor::new(record, LOAD_COMMAND_HEADER_SIZE, endian, "load command");

        let command = match header.cmd {
            LC_SEGMENT | LC_SEGMENT_64 => {
                let is_64 = header.cmd == LC_SEGMENT_64;
                LoadCommand::Segment(SegmentCommand {
                    header,
                    is_64,
                    endian,
                    segname: c.array()?,
                    vmaddr: c.word(is_64)?,
                    vmsize: c.word(is_64)?,
                    fileoff: c.word(is_64)?,
                    filesize: c.word(is_64)?,
                    maxprot: c.u32()?,
                    initprot: c.u32()?,
                    nsects: c.u32()?,
                    flags: c.u32()?,
                })
            }
            LC_SYMTAB => LoadCommand::Symtab(SymtabCommand {
                header,
                symoff: c.u32()?,
                nsyms: c.u32()?,
                stroff: c.u32()?,
                strsize: c.u32()?,
            }),
            LC_UUID => LoadCommand::Uuid(UuidCommand { header, uuid: c.array()? }),
            LC_MAIN => LoadCommand::EntryPoint(EntryPointCommand {
                header,
                entryoff: c.u64()?,
                stacksize: c.u64()?,
            }),
            LC_ID_DYLIB | LC_LOAD_DYLIB | LC_LOAD_WEAK_DYLIB | LC_REEXPORT_DYLIB => {
                let name_offset = c.u32()?;
                LoadCommand::Dylib(DylibCommand {
                    header,
                    timestamp: c.u32()?,
                    current_version: c.u32()?,
                    compatibility_version: c.u32()?,
                    name: self.lc_str(&header, record, name_offset, DYLIB_COMMAND_SIZE)?,
                })
            }
            LC_LOAD_DYLINKER | LC_ID_DYLINKER => {
                let name_offset = c.u32()?;
                LoadCommand::Dylinker(DylinkerCommand {
                    header,
                    name: self.lc_str(&header, record, name_offset, DYLINKER_COMMAND_SIZE)?,
                })
            }
            _ => LoadCommand::Opaque(header),
        };

        Ok(command)
    }

    /// Resolves an `lc_str` offset to the NUL-terminated bytes it points at
    /// inside the command itself.
    fn lc_str(
        &self,
        header: &CommandHeader,
        record: &'a [u8],
        name_offset: u32,
        fixed_size: usize,
    ) -> Result<&'a [u8]> {
        let start = name_offset as usize;
        if start < fixed_size || start > record.len() {
            return Err(self.corrupt(
                header.offset,
                format!(
                    "name offset {} lies outside the {} byte {} command",
                    name_offset,
                    header.cmdsize,
                    header.name()
                ),
            ));
        }
        let tail = &record[start..];
        let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        Ok(&tail[..len])
    }
}

impl<'a> Iterator for LoadCommands<'a> {
    type Item = Result<LoadCommand<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if self.index == self.header.ncmds {
            self.done = true;
            let consumed = self.cursor - self.header.commands_offset();
            if consumed != u64::from(self.header.sizeofcmds) {
                return Some(Err(self.corrupt(
                    self.cursor,
                    format!(
                        "{} load commands occupy {} bytes but the header declares {}",
                        self.header.ncmds, consumed, self.header.sizeofcmds
                    ),
                )));
            }
            return None;
        }

        match self.read_one() {
            Ok(command) => {
                self.index += 1;
                Some(Ok(command))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Reads the `nsects` section headers packed right after a segment command.
pub fn read_sections(segment: &SegmentCommand, data: &[u8]) -> Result<Vec<Section>> {
    let fixed = segment.fixed_size() as u64;
    let entry = segment.section_size() as u64;
    let table_len = u64::from(segment.nsects) * entry;
    let start = segment.header.offset + fixed;

    let table = slice_at(data, start, table_len, "section headers")?;
    if fixed + table_len > u64::from(segment.header.cmdsize) {
        return Err(Error::CorruptRecord {
            index: segment.header.index,
            offset: segment.header.offset,
            reason: format!(
                "{} sections need {} bytes but segment {} has cmdsize {}",
                segment.nsects,
                fixed + table_len,
                segment.name(),
                segment.header.cmdsize
            ),
        });
    }

    let is_64 = segment.is_64;
    let mut c = Cursor::new(table, 0, segment.endian, "section header");
    let mut sections = Vec::with_capacity(segment.nsects as usize);
    for _ in 0..segment.nsects {
        sections.push(Section {
            sectname: c.array()?,
            segname: c.array()?,
            addr: c.word(is_64)?,
            size: c.word(is_64)?,
            offset: c.u32()?,
            align: c.u32()?,
            reloff: c.u32()?,
            nreloc: c.u32()?,
            flags: c.u32()?,
            reserved1: c.u32()?,
            reserved2: c.u32()?,
            reserved3: if is_64 { c.u32()? } else { 0 },
        });
    }

    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macho::header::parse_image_header;

    fn name16(s: &str) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..s.len()].copy_from_slice(s.as_bytes());
        out
    }

    fn push32(v: &mut Vec<u8>, x: u32) {
        v.extend_from_slice(&x.to_le_bytes());
    }

    fn push64(v: &mut Vec<u8>, x: u64) {
        v.extend_from_slice(&x.to_le_bytes());
    }

    fn image(commands: &[Vec<u8>]) -> Vec<u8> {
        let sizeofcmds: usize = commands.iter().map(Vec::len).sum();
        let mut v = Vec::new();
        for word in [MH_MAGIC_64, CPU_TYPE_ARM64, 0, MH_EXECUTE] {
            push32(&mut v, word);
        }
        push32(&mut v, commands.len() as u32);
        push32(&mut v, sizeofcmds as u32);
        push32(&mut v, 0);
        push32(&mut v, 0);
        for c in commands {
            v.extend_from_slice(c);
        }
        v
    }

    fn segment64(name: &str, sections: &[(&str, u64, u64)]) -> Vec<u8> {
        let mut v = Vec::new();
        push32(&mut v, LC_SEGMENT_64);
        push32(&mut v, (SEGMENT_COMMAND_64_SIZE + sections.len() * SECTION_64_SIZE) as u32);
        v.extend_from_slice(&name16(name));
        push64(&mut v, 0x1_0000_0000);
        push64(&mut v, 0x4000);
        push64(&mut v, 0);
        push64(&mut v, 0x4000);
        push32(&mut v, 5);
        push32(&mut v, 5);
        push32(&mut v, sections.len() as u32);
        push32(&mut v, 0);
        for &(sect, addr, size) in sections {
            v.extend_from_slice(&name16(sect));
            v.extend_from_slice(&name16(name));
            push64(&mut v, addr);
            push64(&mut v, size);
            push32(&mut v, 0x100);
            push32(&mut v, 4);
            push32(&mut v, 0);
            push32(&mut v, 0);
            push32(&mut v, 0x8000_0400);
            push32(&mut v, 0);
            push32(&mut v, 0);
            push32(&mut v, 0);
        }
        v
    }

    fn opaque(cmd: u32, cmdsize: u32) -> Vec<u8> {
        let mut v = Vec::new();
        push32(&mut v, cmd);
        push32(&mut v, cmdsize);
        v.resize(cmdsize.max(8) as usize, 0);
        v
    }

    #[test]
    fn test_walk_counts_and_sizes() {
        let data = image(&[segment64("__TEXT", &[]), opaque(LC_DYSYMTAB, 80), opaque(0x7777, 16)]);
        let header = parse_image_header(&data, 0).unwrap();
        let commands: Vec<_> = load_commands(&header, &data).collect::<Result<_>>().unwrap();
        assert_eq!(commands.len(), 3);
        let total: u32 = commands.iter().map(|c| c.header().cmdsize).sum();
        assert_eq!(total, header.sizeofcmds);
        assert!(matches!(commands[2], LoadCommand::Opaque(h) if h.cmd == 0x7777 && h.cmdsize == 16));
        assert_eq!(commands[1].header().name(), "DYSYMTAB");
        assert_eq!(commands[1].header().offset, 32 + 72);
    }

    #[test]
    fn test_zero_cmdsize_is_corrupt() {
        let mut cmd = opaque(0x7777, 8);
        cmd[4..8].copy_from_slice(&0u32.to_le_bytes());
        let data = image(&[cmd]);
        let header = parse_image_header(&data, 0).unwrap();
        let results: Vec<_> = load_commands(&header, &data).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::CorruptRecord { index: 0, .. })));
    }

    #[test]
    fn test_below_minimum_for_kind_is_corrupt() {
        let mut seg = segment64("__DATA", &[]);
        seg[4..8].copy_from_slice(&56u32.to_le_bytes());
        let data = image(&[seg]);
        let header = parse_image_header(&data, 0).unwrap();
        let first = load_commands(&header, &data).next().unwrap();
        match first {
            Err(Error::CorruptRecord { reason, .. }) => assert!(reason.contains("minimum")),
            other => panic!("expected corrupt record, got {:?}", other),
        }
    }

    #[test]
    fn test_record_past_declared_region_is_corrupt() {
        let mut data = image(&[opaque(0x7777, 16)]);
        // Shrink sizeofcmds below the command's size.
        data[20..24].copy_from_slice(&12u32.to_le_bytes());
        let header = parse_image_header(&data, 0).unwrap();
        let results: Vec<_> = load_commands(&header, &data).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::CorruptRecord { .. })));
    }

    #[test]
    fn test_record_past_buffer_is_corrupt() {
        let data = image(&[opaque(0x7777, 64)]);
        let header = parse_image_header(&data, 0).unwrap();
        let results: Vec<_> = load_commands(&header, &data[..60]).collect();
        assert!(matches!(results[0], Err(Error::CorruptRecord { .. })));
    }

    #[test]
    fn test_size_mismatch_reported_after_last_command() {
        let mut data = image(&[opaque(0x7777, 16)]);
        data[20..24].copy_from_slice(&24u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        let header = parse_image_header(&data, 0).unwrap();
        let results: Vec<_> = load_commands(&header, &data).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::CorruptRecord { index: 1, .. })));
    }

    #[test]
    fn test_segment_and_sections() {
        let data = image(&[segment64(
            "__TEXT",
            &[("__text", 0x1_0000_1000, 0x200), ("__cstring", 0x1_0000_1200, 0x40)],
        )]);
        let header = parse_image_header(&data, 0).unwrap();
        let command = load_commands(&header, &data).next().unwrap().unwrap();
        let LoadCommand::Segment(segment) = command else {
            panic!("expected a segment, got {:?}", command);
        };
        assert_eq!(segment.name(), "__TEXT");
        assert_eq!(segment.vmaddr, 0x1_0000_0000);
        assert_eq!(segment.nsects, 2);

        let sections = read_sections(&segment, &data).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name(), "__text");
        assert_eq!(sections[0].segment_name(), "__TEXT");
        assert_eq!(sections[1].addr, 0x1_0000_1200);
        assert_eq!(sections[1].size, 0x40);
        assert_eq!(sections[0].align, 4);
        assert_eq!(sections[0].section_type(), 0);
        assert_eq!(sections[0].attributes(), 0x8000_0400);
    }

    #[test]
    fn test_sections_past_buffer_are_truncated() {
        let data = image(&[segment64("__TEXT", &[("__text", 0, 0)])]);
        let header = parse_image_header(&data, 0).unwrap();
        let Some(Ok(LoadCommand::Segment(segment))) = load_commands(&header, &data).next() else {
            panic!("expected a segment");
        };
        let short = &data[..data.len() - 1];
        assert!(matches!(read_sections(&segment, short), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_sections_overflowing_cmdsize_are_corrupt() {
        let mut seg = segment64("__TEXT", &[]);
        // Claim one section without room for it in the command.
        seg[64..68].copy_from_slice(&1u32.to_le_bytes());
        let mut data = image(&[seg]);
        data.extend_from_slice(&[0u8; SECTION_64_SIZE]);
        let header = parse_image_header(&data, 0).unwrap();
        let Some(Ok(LoadCommand::Segment(segment))) = load_commands(&header, &data).next() else {
            panic!("expected a segment");
        };
        assert!(matches!(read_sections(&segment, &data), Err(Error::CorruptRecord { .. })));
    }

    #[test]
    fn test_dylib_and_uuid() {
        let mut dylib = Vec::new();
        push32(&mut dylib, LC_LOAD_DYLIB);
        push32(&mut dylib, 56);
        push32(&mut dylib, 24);
        push32(&mut dylib, 2);
        push32(&mut dylib, 0x0505_0100);
        push32(&mut dylib, 0x0001_0000);
        dylib.extend_from_slice(b"/usr/lib/libSystem.B.dylib\0");
        dylib.resize(56, 0);

        let mut uuid = Vec::new();
        push32(&mut uuid, LC_UUID);
        push32(&mut uuid, 24);
        uuid.extend(0u8..16);

        let data = image(&[dylib, uuid]);
        let header = parse_image_header(&data, 0).unwrap();
        let commands: Vec<_> = load_commands(&header, &data).collect::<Result<_>>().unwrap();

        let LoadCommand::Dylib(d) = commands[0] else { panic!("expected dylib") };
        assert_eq!(d.name, b"/usr/lib/libSystem.B.dylib");
        assert_eq!(format_version(d.current_version), "1285.1.0");
        assert_eq!(format_version(d.compatibility_version), "1.0.0");

        let LoadCommand::Uuid(u) = commands[1] else { panic!("expected uuid") };
        assert_eq!(u.to_uuid_string(), "00010203-0405-0607-0809-0A0B0C0D0E0F");
    }

    #[test]
    fn test_dylinker_name_offset_out_of_range() {
        let mut cmd = Vec::new();
        push32(&mut cmd, LC_LOAD_DYLINKER);
        push32(&mut cmd, 16);
        push32(&mut cmd, 200);
        push32(&mut cmd, 0);
        let data = image(&[cmd]);
        let header = parse_image_header(&data, 0).unwrap();
        let first = load_commands(&header, &data).next().unwrap();
        assert!(matches!(first, Err(Error::CorruptRecord { .. })));
    }
}
