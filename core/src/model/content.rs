use serde::{Deserialize, Serialize};

/// Content supplied by a caller when creating or versioning a document.
///
/// Bytes are held fully in memory; there is no streaming path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Content {
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Content {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Content {
            file_name: None,
            mime_type: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[must_use]
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
