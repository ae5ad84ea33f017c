//! Bounds-checked reader for Mach-O images and fat containers.
//!
//! Everything here borrows from the caller's buffer; nothing is copied except
//! small fixed-width fields. Each entry point is independent, so callers can
//! keep results already decoded when a later structure turns out to be broken.

pub mod consts;
mod commands;
mod cursor;
mod header;
mod symbols;

pub use commands::{
    CommandHeader, DylibCommand, DylinkerCommand, EntryPointCommand, LoadCommand, LoadCommands,
    Section, SegmentCommand, SymtabCommand, UuidCommand, format_version, load_commands,
    read_sections,
};
pub use cursor::fixed_name;
pub use object::Endianness;
pub use header::{
    FatArch, FatHeader, Kind, MachHeader, classify, list_architectures, parse_container,
    parse_image_header, read_architecture,
};
pub use symbols::{StringEntries, StringTable, Symbol, read_string_table, read_symbol_table};
