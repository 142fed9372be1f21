use serde::{Deserialize, Serialize};

/// One entry of a project directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_directory: bool,
}

/// A file received from an upload, addressed relative to the project directory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub relative_path: String,
    pub contents: Vec<u8>,
}

impl UploadedFile {
    pub fn new(relative_path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            contents: contents.into(),
        }
    }
}
