use crate::macho::{
    Endianness, FatArch, FatHeader, Kind, LoadCommand, MachHeader, Section, SegmentCommand, Symbol,
    SymtabCommand, consts, fixed_name, format_version,
};
use serde::{Serialize, Serializer};

fn serialize_endian<S: Serializer>(endian: &Endianness, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(match endian {
        Endianness::Little => "little",
        Endianness::Big => "big",
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub kind: Kind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat: Option<FatReport>,
    pub images: Vec<ImageReport>,
}

impl Report {
    pub fn has_diagnostics(&self) -> bool {
        self.images.iter().any(|i| !i.diagnostics.is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FatReport {
    pub magic: u32,
    #[serde(serialize_with = "serialize_endian")]
    pub endian: Endianness,
    pub nfat_arch: u32,
    pub architectures: Vec<ArchReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchReport {
    /// Position in the fat architecture table.
    pub index: usize,
    pub cputype: u32,
    pub cpu_name: &'static str,
    pub cpusubtype: u32,
    pub offset: u64,
    pub size: u64,
    pub align: u32,
}

/// Everything decoded from one thin image, plus what failed along the way.
#[derive(Debug, Clone, Serialize)]
pub struct ImageReport {
    /// Index into the fat architecture table, when the image came from one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch_index: Option<usize>,
    /// Offset of the image within the file.
    pub offset: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub load_commands: Vec<CommandReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symtab: Option<SymtabReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<SymbolReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub strings: Vec<StringEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl ImageReport {
    pub fn new(arch_index: Option<usize>, offset: u64) -> Self {
        Self {
            arch_index,
            offset,
            header: None,
            load_commands: Vec::new(),
            segments: Vec::new(),
            symtab: None,
            symbols: Vec::new(),
            strings: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn cpu_name(&self) -> Option<&'static str> {
        self.header.as_ref().map(|h| h.cpu_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderReport {
    pub magic: u32,
    pub description: &'static str,
    pub is_64: bool,
    #[serde(serialize_with = "serialize_endian")]
    pub endian: Endianness,
    pub cputype: u32,
    pub cpu_name: &'static str,
    pub cpusubtype: u32,
    pub filetype: u32,
    pub filetype_name: &'static str,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandReport {
    pub index: u32,
    pub offset: u64,
    pub cmd: u32,
    pub name: &'static str,
    pub cmdsize: u32,
    pub detail: CommandDetail,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandDetail {
    Segment {
        segname: String,
        vmaddr: u64,
        vmsize: u64,
        fileoff: u64,
        filesize: u64,
        nsects: u32,
    },
    Symtab {
        symoff: u32,
        nsyms: u32,
        stroff: u32,
        strsize: u32,
    },
    Uuid {
        uuid: String,
    },
    EntryPoint {
        entryoff: u64,
        stacksize: u64,
    },
    Dylib {
        name: String,
        current_version: String,
        compatibility_version: String,
    },
    Dylinker {
        name: String,
    },
    Opaque,
}

#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    pub name: String,
    pub vmaddr: u64,
    pub vmsize: u64,
    pub fileoff: u64,
    pub filesize: u64,
    pub maxprot: u32,
    pub initprot: u32,
    pub protection: String,
    pub nsects: u32,
    pub flags: u32,
    pub sections: Vec<SectionReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub sectname: String,
    pub segname: String,
    pub addr: u64,
    pub size: u64,
    pub offset: u32,
    pub align: u32,
    pub reloff: u32,
    pub nreloc: u32,
    pub flags: u32,
    pub section_type: u32,
    pub attributes: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymtabReport {
    pub symoff: u32,
    pub nsyms: u32,
    pub stroff: u32,
    pub strsize: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub index: u32,
    pub name: String,
    pub strx: u32,
    pub type_char: char,
    pub n_type: u8,
    pub sect: u8,
    pub desc: u16,
    pub value: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weak: Option<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stab: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StringEntry {
    pub offset: u32,
    pub value: String,
}

/// A sub-structure that could not be decoded.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub structure: String,
    pub kind: &'static str,
    pub message: String,
}

impl From<&FatHeader> for FatReport {
    fn from(fat: &FatHeader) -> Self {
        Self {
            magic: fat.magic,
            endian: fat.endian,
            nfat_arch: fat.nfat_arch,
            architectures: Vec::new(),
        }
    }
}

impl ArchReport {
    pub fn new(index: usize, arch: &FatArch) -> Self {
        Self {
            index,
            cputype: arch.cputype,
            cpu_name: arch.cpu_name(),
            cpusubtype: arch.cpusubtype,
            offset: arch.offset,
            size: arch.size,
            align: arch.align,
        }
    }
}

impl From<&MachHeader> for HeaderReport {
    fn from(h: &MachHeader) -> Self {
        Self {
            magic: h.magic,
            description: h.magic_description(),
            is_64: h.is_64,
            endian: h.endian,
            cputype: h.cputype,
            cpu_name: h.cpu_name(),
            cpusubtype: h.cpusubtype,
            filetype: h.filetype,
            filetype_name: h.file_type_name(),
            ncmds: h.ncmds,
            sizeofcmds: h.sizeofcmds,
            flags: h.flags,
        }
    }
}

impl From<&LoadCommand<'_>> for CommandReport {
    fn from(command: &LoadCommand<'_>) -> Self {
        let header = command.header();
        let detail = match command {
            LoadCommand::Segment(s) => CommandDetail::Segment {
                segname: s.name(),
                vmaddr: s.vmaddr,
                vmsize: s.vmsize,
                fileoff: s.fileoff,
                filesize: s.filesize,
                nsects: s.nsects,
            },
            LoadCommand::Symtab(s) => CommandDetail::Symtab {
                symoff: s.symoff,
                nsyms: s.nsyms,
                stroff: s.stroff,
                strsize: s.strsize,
            },
            LoadCommand::Uuid(u) => CommandDetail::Uuid { uuid: u.to_uuid_string() },
            LoadCommand::EntryPoint(e) => {
                CommandDetail::EntryPoint { entryoff: e.entryoff, stacksize: e.stacksize }
            }
            LoadCommand::Dylib(d) => CommandDetail::Dylib {
                name: String::from_utf8_lossy(d.name).into_owned(),
                current_version: format_version(d.current_version),
                compatibility_version: format_version(d.compatibility_version),
            },
            LoadCommand::Dylinker(d) => {
                CommandDetail::Dylinker { name: String::from_utf8_lossy(d.name).into_owned() }
            }
            LoadCommand::Opaque(_) => CommandDetail::Opaque,
        };

        Self {
            index: header.index,
            offset: header.offset,
            cmd: header.cmd,
            name: header.name(),
            cmdsize: header.cmdsize,
            detail,
        }
    }
}

impl SegmentReport {
    pub fn new(segment: &SegmentCommand, sections: &[Section]) -> Self {
        Self {
            name: segment.name(),
            vmaddr: segment.vmaddr,
            vmsize: segment.vmsize,
            fileoff: segment.fileoff,
            filesize: segment.filesize,
            maxprot: segment.maxprot,
            initprot: segment.initprot,
            protection: consts::protection_string(segment.initprot),
            nsects: segment.nsects,
            flags: segment.flags,
            sections: sections.iter().map(SectionReport::from).collect(),
        }
    }
}

impl From<&Section> for SectionReport {
    fn from(s: &Section) -> Self {
        Self {
            sectname: fixed_name(&s.sectname),
            segname: fixed_name(&s.segname),
            addr: s.addr,
            size: s.size,
            offset: s.offset,
            align: s.align,
            reloff: s.reloff,
            nreloc: s.nreloc,
            flags: s.flags,
            section_type: s.section_type(),
            attributes: s.attributes(),
        }
    }
}

impl From<&SymtabCommand> for SymtabReport {
    fn from(s: &SymtabCommand) -> Self {
        Self { symoff: s.symoff, nsyms: s.nsyms, stroff: s.stroff, strsize: s.strsize }
    }
}

impl SymbolReport {
    pub fn new(symbol: &Symbol, name: String) -> Self {
        Self {
            index: symbol.index,
            name,
            strx: symbol.strx,
            type_char: symbol.type_char(),
            n_type: symbol.n_type,
            sect: symbol.sect,
            desc: symbol.desc,
            value: symbol.value,
            weak: symbol.weak_description(),
            stab: symbol.is_stab(),
        }
    }
}
