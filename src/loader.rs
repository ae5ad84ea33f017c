use crate::error::Result;
use crate::inspect::inspect_buffer;
use crate::types::Report;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A read-only mapping of one file. The mapping is released when this value
/// is dropped, on every exit path.
pub struct BinaryData {
    pub mmap: Mmap,
}

impl BinaryData {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: The file is opened read-only and we keep the mmap alive
        // for the lifetime of BinaryData.
        let mmap = unsafe { Mmap::map(&file)? };
        tracing::debug!(path = %path.display(), len = mmap.len(), "mapped file");
        Ok(Self { mmap })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn inspect(&self) -> Result<Report> {
        inspect_buffer(self.bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::io::Write;

    #[test]
    fn test_load_missing_file() {
        let result = BinaryData::load(Path::new("/nonexistent/definitely/not/here"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_load_and_classify_garbage() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"not a mach-o file").expect("write");
        file.flush().expect("flush");

        let binary = BinaryData::load(file.path()).expect("load");
        assert_eq!(binary.bytes().len(), 17);
        assert!(matches!(binary.inspect(), Err(Error::Format(_))));
    }
}
