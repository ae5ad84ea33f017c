//! On-disk constants of the Mach-O and fat (universal) formats.
//!
//! Values come from `object::macho`; record sizes are taken from its
//! `#[repr(C)]` layouts. Magics are given as they appear when the first four
//! bytes of the file are read big-endian.

pub use object::macho::{
    CPU_ARCH_ABI64, CPU_ARCH_ABI64_32, CPU_TYPE_ARM, CPU_TYPE_ARM64, CPU_TYPE_ARM64_32,
    CPU_TYPE_POWERPC, CPU_TYPE_POWERPC64, CPU_TYPE_X86, CPU_TYPE_X86_64, FAT_CIGAM, FAT_CIGAM_64,
    FAT_MAGIC, FAT_MAGIC_64, LC_BUILD_VERSION, LC_CODE_SIGNATURE, LC_DATA_IN_CODE,
    LC_DYLD_CHAINED_FIXUPS, LC_DYLD_ENVIRONMENT, LC_DYLD_EXPORTS_TRIE, LC_DYLD_INFO,
    LC_DYLD_INFO_ONLY, LC_DYLIB_CODE_SIGN_DRS, LC_DYSYMTAB, LC_ENCRYPTION_INFO,
    LC_ENCRYPTION_INFO_64, LC_FUNCTION_STARTS, LC_ID_DYLIB, LC_ID_DYLINKER, LC_LINKER_OPTION,
    LC_LOAD_DYLIB, LC_LOAD_DYLINKER, LC_LOAD_WEAK_DYLIB, LC_MAIN, LC_REEXPORT_DYLIB,
    LC_REQ_DYLD, LC_RPATH, LC_SEGMENT, LC_SEGMENT_64, LC_SEGMENT_SPLIT_INFO, LC_SOURCE_VERSION,
    LC_SYMTAB, LC_THREAD, LC_UNIXTHREAD, LC_UUID, LC_VERSION_MIN_IPHONEOS,
    LC_VERSION_MIN_MACOSX, MH_BUNDLE, MH_CIGAM, MH_CIGAM_64, MH_CORE, MH_DSYM, MH_DYLIB,
    MH_DYLIB_STUB, MH_DYLINKER, MH_EXECUTE, MH_FILESET, MH_FVMLIB, MH_KEXT_BUNDLE, MH_MAGIC,
    MH_MAGIC_64, MH_OBJECT, MH_PRELOAD, N_ABS, N_EXT, N_INDR, N_PBUD, N_PEXT, N_SECT, N_STAB,
    N_TYPE, N_UNDF, N_WEAK_DEF, N_WEAK_REF, SECTION_ATTRIBUTES, SECTION_TYPE, VM_PROT_EXECUTE,
    VM_PROT_READ, VM_PROT_WRITE,
};

use object::Endianness;
use object::macho;
use std::mem::size_of;

pub const FAT_HEADER_SIZE: usize = size_of::<macho::FatHeader>();
pub const FAT_ARCH_SIZE: usize = size_of::<macho::FatArch32>();
pub const FAT_ARCH_64_SIZE: usize = size_of::<macho::FatArch64>();

pub const MACH_HEADER_SIZE: usize = size_of::<macho::MachHeader32<Endianness>>();
pub const MACH_HEADER_64_SIZE: usize = size_of::<macho::MachHeader64<Endianness>>();

pub const LOAD_COMMAND_HEADER_SIZE: usize = size_of::<macho::LoadCommand<Endianness>>();
pub const SEGMENT_COMMAND_SIZE: usize = size_of::<macho::SegmentCommand32<Endianness>>();
pub const SEGMENT_COMMAND_64_SIZE: usize = size_of::<macho::SegmentCommand64<Endianness>>();
pub const SECTION_SIZE: usize = size_of::<macho::Section32<Endianness>>();
pub const SECTION_64_SIZE: usize = size_of::<macho::Section64<Endianness>>();
pub const SYMTAB_COMMAND_SIZE: usize = size_of::<macho::SymtabCommand<Endianness>>();
pub const UUID_COMMAND_SIZE: usize = size_of::<macho::UuidCommand<Endianness>>();
pub const ENTRY_POINT_COMMAND_SIZE: usize = size_of::<macho::EntryPointCommand<Endianness>>();
pub const DYLIB_COMMAND_SIZE: usize = size_of::<macho::DylibCommand<Endianness>>();
pub const DYLINKER_COMMAND_SIZE: usize = size_of::<macho::DylinkerCommand<Endianness>>();

pub const NLIST_SIZE: usize = size_of::<macho::Nlist32<Endianness>>();
pub const NLIST_64_SIZE: usize = size_of::<macho::Nlist64<Endianness>>();

/// Human-readable CPU type, as used by `--arch` and the report.
pub fn cpu_type_name(cputype: u32) -> &'static str {
    match cputype {
        CPU_TYPE_X86 => "x86",
        CPU_TYPE_X86_64 => "x86_64",
        CPU_TYPE_ARM => "arm",
        CPU_TYPE_ARM64 => "arm64",
        CPU_TYPE_ARM64_32 => "arm64_32",
        CPU_TYPE_POWERPC => "powerpc",
        CPU_TYPE_POWERPC64 => "powerpc64",
        _ => "other",
    }
}

pub fn file_type_name(filetype: u32) -> &'static str {
    match filetype {
        MH_OBJECT => "Object file",
        MH_EXECUTE => "Executable",
        MH_FVMLIB => "Fixed VM library",
        MH_CORE => "Core dump",
        MH_PRELOAD => "Preloaded executable",
        MH_DYLIB => "Dynamic library",
        MH_DYLINKER => "Dynamic linker",
        MH_BUNDLE => "Bundle",
        MH_DYLIB_STUB => "Dynamic library stub",
        MH_DSYM => "Debug symbols",
        MH_KEXT_BUNDLE => "Kernel extension",
        MH_FILESET => "File set",
        _ => "other",
    }
}

pub fn command_name(cmd: u32) -> &'static str {
    match cmd {
        LC_SEGMENT => "SEGMENT",
        LC_SYMTAB => "SYMTAB",
        LC_THREAD => "THREAD",
        LC_UNIXTHREAD => "UNIXTHREAD",
        LC_DYSYMTAB => "DYSYMTAB",
        LC_LOAD_DYLIB => "LOAD_DYLIB",
        LC_ID_DYLIB => "ID_DYLIB",
        LC_LOAD_DYLINKER => "LOAD_DYLINKER",
        LC_ID_DYLINKER => "ID_DYLINKER",
        LC_LOAD_WEAK_DYLIB => "LOAD_WEAK_DYLIB",
        LC_SEGMENT_64 => "SEGMENT_64",
        LC_UUID => "UUID",
        LC_RPATH => "RPATH",
        LC_CODE_SIGNATURE => "CODE_SIGNATURE",
        LC_SEGMENT_SPLIT_INFO => "SEGMENT_SPLIT_INFO",
        LC_REEXPORT_DYLIB => "REEXPORT_DYLIB",
        LC_ENCRYPTION_INFO => "ENCRYPTION_INFO",
        LC_DYLD_INFO => "DYLD_INFO",
        LC_DYLD_INFO_ONLY => "DYLD_INFO_ONLY",
        LC_VERSION_MIN_MACOSX => "VERSION_MIN_MACOSX",
        LC_VERSION_MIN_IPHONEOS => "VERSION_MIN_IPHONEOS",
        LC_FUNCTION_STARTS => "FUNCTION_STARTS",
        LC_DYLD_ENVIRONMENT => "DYLD_ENVIRONMENT",
        LC_MAIN => "MAIN",
        LC_DATA_IN_CODE => "DATA_IN_CODE",
        LC_SOURCE_VERSION => "SOURCE_VERSION",
        LC_DYLIB_CODE_SIGN_DRS => "DYLIB_CODE_SIGN_DRS",
        LC_ENCRYPTION_INFO_64 => "ENCRYPTION_INFO_64",
        LC_LINKER_OPTION => "LINKER_OPTION",
        LC_BUILD_VERSION => "BUILD_VERSION",
        LC_DYLD_EXPORTS_TRIE => "DYLD_EXPORTS_TRIE",
        LC_DYLD_CHAINED_FIXUPS => "DYLD_CHAINED_FIXUPS",
        _ => "other",
    }
}

/// Smallest legal `cmdsize` for a load command of the given kind.
///
/// Unknown kinds only need room for the `(cmd, cmdsize)` pair, which keeps the
/// walk strictly advancing.
pub fn min_command_size(cmd: u32) -> usize {
    match cmd {
        LC_SEGMENT => SEGMENT_COMMAND_SIZE,
        LC_SEGMENT_64 => SEGMENT_COMMAND_64_SIZE,
        LC_SYMTAB => SYMTAB_COMMAND_SIZE,
        LC_UUID => UUID_COMMAND_SIZE,
        LC_MAIN => ENTRY_POINT_COMMAND_SIZE,
        LC_ID_DYLIB | LC_LOAD_DYLIB | LC_LOAD_WEAK_DYLIB | LC_REEXPORT_DYLIB => DYLIB_COMMAND_SIZE,
        LC_LOAD_DYLINKER | LC_ID_DYLINKER => DYLINKER_COMMAND_SIZE,
        _ => LOAD_COMMAND_HEADER_SIZE,
    }
}

/// Renders VM protection bits as `rwx`, dashes for missing bits.
pub fn protection_string(prot: u32) -> String {
    let mut s = String::with_capacity(3);
    s.push(if prot & VM_PROT_READ != 0 { 'r' } else { '-' });
    s.push(if prot & VM_PROT_WRITE != 0 { 'w' } else { '-' });
    s.push(if prot & VM_PROT_EXECUTE != 0 { 'x' } else { '-' });
    s
}
