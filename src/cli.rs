use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "macho-inspect")]
#[command(
    author,
    version,
    about = "Inspect Mach-O headers, fat slices, load commands, sections and symbols"
)]
#[command(
    long_about = "macho-inspect maps a Mach-O or universal (fat) binary read-only and decodes \
its layout: the fat architecture table, each image's header, the load command stream, \
segments with their sections, and the symbol table with names resolved from the string \
table.\n\n\
Examples:\n  macho-inspect inspect /bin/ls\n  macho-inspect symbols ./a.out --filter '_main*'"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show headers, load commands, segments and sections
    Inspect {
        /// Path to the Mach-O or fat binary
        #[arg(value_name = "BINARY")]
        binary: PathBuf,

        /// Output format (table, json)
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,

        /// Only show fat slices for this architecture (e.g. x86_64, arm64)
        #[arg(short, long)]
        arch: Option<String>,

        /// Omit the per-segment section listing
        #[arg(long)]
        no_sections: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Dump the symbol table with resolved names
    Symbols {
        /// Path to the Mach-O or fat binary
        #[arg(value_name = "BINARY")]
        binary: PathBuf,

        /// Output format (table, json)
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,

        /// Only show fat slices for this architecture (e.g. x86_64, arm64)
        #[arg(short, long)]
        arch: Option<String>,

        /// Only show symbols whose name matches this glob
        #[arg(short, long)]
        filter: Option<String>,

        /// Also dump the string table contents
        #[arg(long)]
        strings: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}
