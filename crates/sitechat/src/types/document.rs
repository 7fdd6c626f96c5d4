//! Document and chunk types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata key holding the page URL or file path a document came from
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the bare file name
pub const FILE_NAME_KEY: &str = "file_name";
/// Metadata key holding the detected file type
pub const FILE_TYPE_KEY: &str = "file_type";

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Excel spreadsheet (.xlsx)
    Xlsx,
    /// CSV file
    Csv,
    /// Markdown file
    Markdown,
    /// Plain text file
    Txt,
    /// HTML document
    Html,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "pptx" => Self::Pptx,
            "xlsx" => Self::Xlsx,
            "csv" => Self::Csv,
            "md" | "markdown" => Self::Markdown,
            "txt" | "text" => Self::Txt,
            "html" | "htm" => Self::Html,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path or file name
    pub fn from_path(path: &std::path::Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Short lowercase name, used as metadata value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Markdown => "markdown",
            Self::Txt => "txt",
            Self::Html => "html",
            Self::Unknown => "unknown",
        }
    }
}

/// A unit of text plus metadata, produced by a loader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Extracted text
    pub text: String,
    /// Free-form metadata; `source` is always present for loaded documents
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with no metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    /// Builder-style metadata insert
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The `source` metadata value, if any
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// A chunk of text from a document, as stored in a vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Chunk index within document
    pub chunk_index: u32,
    /// Metadata copied from the parent document
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a chunk for `document` at position `chunk_index`
    pub fn new(document: &Document, content: String, chunk_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id: document.id,
            content,
            chunk_index,
            metadata: document.metadata.clone(),
            embedding: Vec::new(),
        }
    }

    /// The `source` metadata value, if any
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// A chunk returned by a similarity search
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity with the query
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_extension("PDF"), FileType::Pdf);
        assert_eq!(FileType::from_extension("htm"), FileType::Html);
        assert_eq!(FileType::from_path(Path::new("guides/intro.md")), FileType::Markdown);
        assert_eq!(FileType::from_path(Path::new("archive.tar.gz")), FileType::Unknown);
        assert_eq!(FileType::from_path(Path::new("README")), FileType::Unknown);
        assert!(!FileType::Unknown.is_supported());
    }

    #[test]
    fn test_chunk_inherits_metadata() {
        let doc = Document::new("hello").with_metadata(SOURCE_KEY, "https://example.com/a");
        let chunk = Chunk::new(&doc, "hello".to_string(), 0);
        assert_eq!(chunk.document_id, doc.id);
        assert_eq!(chunk.source(), Some("https://example.com/a"));
    }
}
