//! Persists generated brochures and their metadata as files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Local;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::{debug, info};

use crate::generator::GenerationMetadata;
use crate::language::Language;
use crate::text::sanitize_filename;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg_attr(test, automock)]
pub trait Persistence: Send + Sync {
    fn save_brochure(
        &self,
        content: &str,
        company_name: &str,
        language: Language,
    ) -> Result<PathBuf, StorageError>;

    fn save_metadata(
        &self,
        metadata: &GenerationMetadata,
        company_name: &str,
    ) -> Result<PathBuf, StorageError>;

    /// Removes files older than `days`, or every file when `None`. Returns
    /// how many were removed.
    fn cleanup_older_than(&self, days: Option<u32>) -> Result<usize, StorageError>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    output_dir: PathBuf,
}

impl FileStore {
    /// Creates the output directory if needed.
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| StorageError::io(&output_dir, e))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn timestamp() -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }

    fn write(&self, filename: String, contents: &str) -> Result<PathBuf, StorageError> {
        let path = self.output_dir.join(filename);
        fs::write(&path, contents).map_err(|e| StorageError::io(&path, e))?;
        Ok(path)
    }

    /// Saved brochures, newest first, optionally limited to one company.
    pub fn list_brochures(&self, company_name: Option<&str>) -> Result<Vec<PathBuf>, StorageError> {
        let prefix = company_name.map(|name| format!("{}_brochure_", sanitize_filename(name)));
        let entries =
            fs::read_dir(&self.output_dir).map_err(|e| StorageError::io(&self.output_dir, e))?;

        let mut brochures = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.output_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_brochure = name.ends_with(".md")
                && match &prefix {
                    Some(prefix) => name.starts_with(prefix.as_str()),
                    None => name.contains("_brochure"),
                };
            if !is_brochure {
                continue;
            }

            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .map_err(|e| StorageError::io(&entry.path(), e))?;
            brochures.push((modified, entry.path()));
        }

        brochures.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(brochures.into_iter().map(|(_, path)| path).collect())
    }

    pub fn load_brochure(&self, path: &Path) -> Result<String, StorageError> {
        fs::read_to_string(path).map_err(|e| StorageError::io(path, e))
    }
}

impl Persistence for FileStore {
    fn save_brochure(
        &self,
        content: &str,
        company_name: &str,
        language: Language,
    ) -> Result<PathBuf, StorageError> {
        let company = sanitize_filename(company_name);
        let language_segment = if language.is_default() {
            String::new()
        } else {
            format!("_{}", language.code())
        };
        let filename = format!(
            "{company}_brochure{language_segment}_{}.md",
            Self::timestamp()
        );

        let path = self.write(filename, content)?;
        info!(path = %path.display(), "Brochure saved");
        Ok(path)
    }

    fn save_metadata(
        &self,
        metadata: &GenerationMetadata,
        company_name: &str,
    ) -> Result<PathBuf, StorageError> {
        let filename = format!(
            "{}_metadata_{}.json",
            sanitize_filename(company_name),
            Self::timestamp()
        );
        let json = serde_json::to_string_pretty(metadata)?;

        let path = self.write(filename, &json)?;
        debug!(path = %path.display(), "Metadata saved");
        Ok(path)
    }

    fn cleanup_older_than(&self, days: Option<u32>) -> Result<usize, StorageError> {
        let cutoff = days.map(|d| {
            SystemTime::now()
                .checked_sub(Duration::from_secs(u64::from(d) * SECONDS_PER_DAY))
                .unwrap_or(SystemTime::UNIX_EPOCH)
        });

        let entries =
            fs::read_dir(&self.output_dir).map_err(|e| StorageError::io(&self.output_dir, e))?;
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.output_dir, e))?;
            let path = entry.path();
            let metadata = entry.metadata().map_err(|e| StorageError::io(&path, e))?;
            if !metadata.is_file() {
                continue;
            }

            if let Some(cutoff) = cutoff {
                let modified = metadata.modified().map_err(|e| StorageError::io(&path, e))?;
                if modified >= cutoff {
                    continue;
                }
            }

            fs::remove_file(&path).map_err(|e| StorageError::io(&path, e))?;
            removed += 1;
        }

        info!(removed, "Cleaned up output files");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("brochures")).unwrap();
        (dir, store)
    }

    fn file_name(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    #[test]
    fn test_save_brochure_names_file_by_company_and_language() {
        let (_dir, store) = store();

        let english = store
            .save_brochure("# Acme", "Acme: Robots/Inc", Language::En)
            .unwrap();
        let name = file_name(&english);
        assert!(name.starts_with("Acme_ Robots_Inc_brochure_"), "{name}");
        assert!(name.ends_with(".md"));
        assert_eq!(store.load_brochure(&english).unwrap(), "# Acme");

        let german = store.save_brochure("# Acme", "Acme", Language::De).unwrap();
        assert!(file_name(&german).starts_with("Acme_brochure_de_"));
    }

    #[test]
    fn test_list_brochures_filters_by_company() {
        let (_dir, store) = store();
        store.save_brochure("a", "Acme", Language::En).unwrap();
        store.save_brochure("b", "Globex", Language::En).unwrap();
        fs::write(store.output_dir().join("notes.txt"), "x").unwrap();

        assert_eq!(store.list_brochures(None).unwrap().len(), 2);
        let acme = store.list_brochures(Some("Acme")).unwrap();
        assert_eq!(acme.len(), 1);
        assert_eq!(store.load_brochure(&acme[0]).unwrap(), "a");
    }

    #[test]
    fn test_cleanup_removes_only_old_files() {
        let (_dir, store) = store();
        let old = store.output_dir().join("old_brochure_20200101_000000.md");
        fs::write(&old, "old").unwrap();
        let forty_days_ago = SystemTime::now() - Duration::from_secs(40 * SECONDS_PER_DAY);
        File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(forty_days_ago)
            .unwrap();
        let fresh = store.save_brochure("new", "Acme", Language::En).unwrap();

        assert_eq!(store.cleanup_older_than(Some(30)).unwrap(), 1);
        assert!(!old.exists());
        assert!(fresh.exists());

        assert_eq!(store.cleanup_older_than(None).unwrap(), 1);
        assert!(!fresh.exists());
    }

    #[test]
    fn test_load_missing_brochure_is_io_error() {
        let (_dir, store) = store();
        let err = store
            .load_brochure(&store.output_dir().join("missing.md"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}
