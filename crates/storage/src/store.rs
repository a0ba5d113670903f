use finsort_core::{Categories, CategoryEntries, CategoryError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Malformed category file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize categories: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error(transparent)]
    Category(#[from] CategoryError),
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Category mapping backed by a JSON file. Every successful mutation is
/// written through before the call returns.
#[derive(Debug)]
pub struct CategoryStore {
    path: PathBuf,
    categories: Categories,
}

impl CategoryStore {
    /// Reads the store at `path`. A missing file yields the default mapping;
    /// a file that exists but does not parse is an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No category file at {}, starting empty", path.display());
                return Ok(Self::in_memory(path, Categories::default()));
            }
            Err(e) => return Err(StorageError::io(&path, e)),
        };

        let CategoryEntries(entries) =
            serde_json::from_str(&data).map_err(|source| StorageError::Parse {
                path: path.clone(),
                source,
            })?;
        let (categories, discarded) = Categories::from_entries(entries);
        if !discarded.is_empty() {
            tracing::warn!(
                "Dropped {} keyword(s) that were blank or had no usable category: {:?}",
                discarded.len(),
                discarded
            );
        }
        tracing::info!(
            "Loaded {} categories from {}",
            categories.len(),
            path.display()
        );
        Ok(Self::in_memory(path, categories))
    }

    /// Wraps an existing mapping without touching the filesystem.
    pub fn in_memory(path: impl Into<PathBuf>, categories: Categories) -> Self {
        CategoryStore {
            path: path.into(),
            categories,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn categories(&self) -> &Categories {
        &self.categories
    }

    pub fn create_category(&mut self, name: &str) -> Result<(), StorageError> {
        self.mutate(|c| c.create(name))?;
        tracing::info!("Created category '{}'", name.trim());
        Ok(())
    }

    pub fn remove_category(&mut self, name: &str) -> Result<(), StorageError> {
        let removed = self.mutate(|c| c.remove(name))?;
        tracing::info!(
            "Removed category '{}' ({} keywords)",
            removed.name,
            removed.keywords.len()
        );
        Ok(())
    }

    /// Learns `text` as a keyword of `category`. Returns `false` without
    /// writing when the normalized keyword is already known.
    pub fn add_keyword(&mut self, category: &str, text: &str) -> Result<bool, StorageError> {
        let mut next = self.categories.clone();
        if !next.add_keyword(category, text)? {
            return Ok(false);
        }
        self.commit(next)?;
        tracing::debug!("Learned keyword for '{category}'");
        Ok(true)
    }

    /// Writes the whole mapping. The file is staged next to the target and
    /// renamed over it, so readers see either the old or the new content.
    pub fn save(&self) -> Result<(), StorageError> {
        write_atomic(&self.path, &self.categories)
    }

    fn mutate<T>(
        &mut self,
        op: impl FnOnce(&mut Categories) -> Result<T, CategoryError>,
    ) -> Result<T, StorageError> {
        let mut next = self.categories.clone();
        let out = op(&mut next)?;
        self.commit(next)?;
        Ok(out)
    }

    // The in-memory mapping only changes once the new content is on disk.
    fn commit(&mut self, next: Categories) -> Result<(), StorageError> {
        write_atomic(&self.path, &next)?;
        self.categories = next;
        Ok(())
    }
}

fn write_atomic(path: &Path, categories: &Categories) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(categories).map_err(StorageError::Serialize)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))?;
    tracing::debug!("Saved categories to {}", path.display());
    Ok(())
}
