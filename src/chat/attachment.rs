//! Files staged for the next submission.

use std::path::Path;

use crate::error::{Error, Result};

/// A file picked by the user and held in memory until it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    content_type: String,
    content: Vec<u8>,
}

impl Attachment {
    /// Create an attachment from raw bytes, guessing the MIME type from the name.
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let content_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();
        Self {
            name,
            content_type,
            content: content.into(),
        }
    }

    /// Read a file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .map_err(|source| Error::Attachment {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(name, content))
    }

    /// File name sent with the multipart part.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Ordered set of staged attachments.
///
/// Staging appends and removal is positional, so relative order always
/// matches the order in which files were picked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentSet {
    files: Vec<Attachment>,
}

impl AttachmentSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append newly selected files. Returns how many were added.
    pub fn stage(&mut self, files: impl IntoIterator<Item = Attachment>) -> usize {
        let before = self.files.len();
        self.files.extend(files);
        self.files.len() - before
    }

    /// Remove the file at `index`, or do nothing if it is out of range.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.files.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Attachment] {
        &self.files
    }

    /// Total bytes across all staged files.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.files.iter().map(Attachment::size).sum()
    }
}

impl<'a> IntoIterator for &'a AttachmentSet {
    type Item = &'a Attachment;
    type IntoIter = std::slice::Iter<'a, Attachment>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
