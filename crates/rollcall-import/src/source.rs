use crate::Result;
use std::fs;
use std::path::PathBuf;

/// Where a raw export comes from. The parser only ever sees the fetched
/// text, so retrieval stays swappable.
pub trait ExportSource {
    fn source_name(&self) -> &'static str;
    fn fetch_export(&self) -> Result<String>;
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExportSource for FileSource {
    fn source_name(&self) -> &'static str {
        "file"
    }

    fn fetch_export(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }
}
