use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a Mach-O image: {0}")]
    Format(String),

    #[error(
        "Truncated {what}: need {needed} bytes at offset {offset:#x}, only {available} available"
    )]
    Truncated { what: &'static str, offset: u64, needed: u64, available: u64 },

    #[error("Corrupt load command #{index} at offset {offset:#x}: {reason}")]
    CorruptRecord { index: u32, offset: u64, reason: String },
}

impl Error {
    /// Short category name, used when reporting diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Format(_) => "format",
            Error::Truncated { .. } => "truncated",
            Error::CorruptRecord { .. } => "corrupt-record",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
