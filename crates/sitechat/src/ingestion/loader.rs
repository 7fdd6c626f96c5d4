//! Local file loading

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::parser::FileParser;
use crate::error::{Error, Result};
use crate::types::document::{FILE_NAME_KEY, FILE_TYPE_KEY};
use crate::types::{Document, FileType, SOURCE_KEY};

/// Loads documents from files under a data directory
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    data_dir: PathBuf,
    recursive: bool,
}

impl DocumentLoader {
    /// Create a loader rooted at `data_dir`
    pub fn new(data_dir: impl Into<PathBuf>, recursive: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            recursive,
        }
    }

    /// Resolve a directory against the data directory unless it is absolute
    pub fn resolve_dir(&self, directory: &str) -> PathBuf {
        let path = Path::new(directory);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Load the named files from `directory`, or every supported file in it
    /// when `file_names` is `None`.
    ///
    /// Explicit names are all checked before anything is read, so a single
    /// missing, unsupported or out-of-directory file fails the whole call.
    pub fn load_from_files(
        &self,
        file_names: Option<&[String]>,
        directory: &str,
    ) -> Result<Vec<Document>> {
        let dir = self.resolve_dir(directory);

        match file_names {
            Some(names) => {
                let paths = names
                    .iter()
                    .map(|name| {
                        let path = Path::new(name);
                        if path.is_absolute() {
                            path.to_path_buf()
                        } else {
                            dir.join(path)
                        }
                    })
                    .collect::<Vec<_>>();

                let root = dir
                    .canonicalize()
                    .map_err(|_| Error::NotFound(dir.display().to_string()))?;

                for path in &paths {
                    if !path.is_file() {
                        return Err(Error::NotFound(path.display().to_string()));
                    }
                    let resolved = path.canonicalize()?;
                    if !resolved.starts_with(&root) {
                        return Err(Error::InvalidArgument(format!(
                            "{} is outside {}",
                            path.display(),
                            dir.display()
                        )));
                    }
                    if !FileType::from_path(path).is_supported() {
                        return Err(Error::UnsupportedFileType(path.display().to_string()));
                    }
                }

                paths.iter().map(|p| Self::load_file(p)).collect()
            }
            None => {
                if !dir.is_dir() {
                    return Err(Error::NotFound(dir.display().to_string()));
                }
                self.load_dir(&dir)
            }
        }
    }

    /// Load the source files of a collection (`data_dir/<name>`).
    ///
    /// A collection without a source directory has no documents.
    pub fn load_collection_sources(&self, collection_name: &str) -> Result<Vec<Document>> {
        let dir = self.resolve_dir(collection_name);
        if !dir.is_dir() {
            tracing::warn!(
                "No source directory {} for collection '{}', building an empty index",
                dir.display(),
                collection_name
            );
            return Ok(Vec::new());
        }
        self.load_dir(&dir)
    }

    fn load_dir(&self, dir: &Path) -> Result<Vec<Document>> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name()));

        let mut documents = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !FileType::from_path(path).is_supported() {
                tracing::debug!("Skipping unsupported file {}", path.display());
                continue;
            }

            match Self::load_file(path) {
                Ok(doc) => documents.push(doc),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }

        tracing::info!("Loaded {} documents from {}", documents.len(), dir.display());
        Ok(documents)
    }

    fn load_file(path: &Path) -> Result<Document> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let data = std::fs::read(path)?;
        let parsed = FileParser::parse(&file_name, &data)?;

        tracing::debug!(
            "Parsed {} ({}, {} sections, {} bytes of text)",
            path.display(),
            parsed.file_type.as_str(),
            parsed.sections,
            parsed.text.len()
        );

        Ok(Document::new(parsed.text)
            .with_metadata(SOURCE_KEY, path.display().to_string())
            .with_metadata(FILE_NAME_KEY, file_name)
            .with_metadata(FILE_TYPE_KEY, parsed.file_type.as_str()))
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}
