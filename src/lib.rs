pub mod cli;
pub mod error;
pub mod inspect;
pub mod loader;
pub mod logging;
pub mod macho;
pub mod output;
pub mod types;

pub use cli::{Cli, Commands, OutputFormat};
pub use error::{Error, Result};
pub use inspect::{inspect_buffer, inspect_image};
pub use loader::BinaryData;
pub use output::{JsonFormatter, TableFormatter};
pub use types::{
    ArchReport, CommandDetail, CommandReport, Diagnostic, FatReport, HeaderReport, ImageReport,
    Report, SectionReport, SegmentReport, StringEntry, SymbolReport, SymtabReport,
};
