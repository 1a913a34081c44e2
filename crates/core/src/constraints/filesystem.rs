//! Filesystem predicates (`file-exists`, `dir-exists`, `has-permissions`,
//! `is-file-type`).
//!
//! All I/O goes through the [`FileSystem`] trait so the checks can run against
//! the real disk ([`OsFileSystem`]) or an in-memory tree
//! ([`MemoryFileSystem`]).

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use super::mime;

/// Bytes read from the head of a file for content sniffing.
pub const SNIFF_LENGTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub is_dir: bool,
    /// Permission bits (`0o777` mask).
    pub mode: u32,
}

/// Read-only view of a filesystem used by path predicates.
pub trait FileSystem: Send + Sync {
    fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;

    /// Reads at most `limit` bytes from the start of the file.
    fn read_head(&self, path: &Path, limit: usize) -> io::Result<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let metadata = std::fs::metadata(path)?;

        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            metadata.permissions().mode() & 0o777
        };
        #[cfg(not(unix))]
        let mode = if metadata.permissions().readonly() {
            0o444
        } else {
            0o666
        };

        Ok(FileMetadata {
            is_dir: metadata.is_dir(),
            mode,
        })
    }

    fn read_head(&self, path: &Path, limit: usize) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(limit);
        File::open(path)?
            .take(u64::try_from(limit).unwrap_or(u64::MAX))
            .read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Dir { mode: u32 },
    File { contents: Vec<u8>, mode: u32 },
}

/// In-memory filesystem for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    entries: HashMap<PathBuf, MemoryEntry>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `path` and every missing ancestor.
    pub fn create_dir_all(&mut self, path: impl AsRef<Path>, mode: u32) {
        for ancestor in path.as_ref().ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            self.entries
                .entry(ancestor.to_path_buf())
                .or_insert(MemoryEntry::Dir { mode });
        }
    }

    pub fn write_file(&mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>, mode: u32) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent, 0o755);
        }
        self.entries.insert(
            path.to_path_buf(),
            MemoryEntry::File {
                contents: contents.into(),
                mode,
            },
        );
    }

    pub fn set_permissions(&mut self, path: impl AsRef<Path>, new_mode: u32) -> io::Result<()> {
        match self.entries.get_mut(path.as_ref()) {
            Some(MemoryEntry::Dir { mode }) | Some(MemoryEntry::File { mode, .. }) => {
                *mode = new_mode;
                Ok(())
            }
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        match self.entries.get(path) {
            Some(MemoryEntry::Dir { mode }) => Ok(FileMetadata {
                is_dir: true,
                mode: *mode,
            }),
            Some(MemoryEntry::File { mode, .. }) => Ok(FileMetadata {
                is_dir: false,
                mode: *mode,
            }),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }

    fn read_head(&self, path: &Path, limit: usize) -> io::Result<Vec<u8>> {
        match self.entries.get(path) {
            Some(MemoryEntry::File { contents, .. }) => {
                Ok(contents.iter().take(limit).copied().collect())
            }
            Some(MemoryEntry::Dir { .. }) => Err(io::Error::new(
                io::ErrorKind::Other,
                "is a directory",
            )),
            None => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}

#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("Value is not a directory: {0}")]
    NotADirectory(String),

    #[error("File does not exist: {0}")]
    Missing(String),

    #[error("Path is a directory, not a file: {0}")]
    IsADirectory(String),

    #[error("Cannot check file permissions of {path}: {source}")]
    Metadata { path: String, source: io::Error },

    #[error("File has incorrect permissions. Want: {want:04o}, Got: {got:04o}")]
    Permissions { want: u32, got: u32 },

    #[error("Cannot read file {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("File is not of type {expected} (detected: {detected})")]
    ContentType { expected: String, detected: String },

    #[error("File has no extension: {0}")]
    NoExtension(String),

    #[error(
        "File extension {extension} doesn't match content type (detected: {detected}, expected: {expected})"
    )]
    ExtensionMismatch {
        extension: String,
        detected: String,
        expected: String,
    },

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),
}

/// The path predicates present on one constraint node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathPredicates {
    pub file_exists: bool,
    pub dir_exists: bool,
    pub permissions: Option<u32>,
    /// A bare extension (`png`, `.png`) or a MIME type (`image/png`).
    pub file_type: Option<String>,
}

impl PathPredicates {
    pub fn is_empty(&self) -> bool {
        !self.file_exists && !self.dir_exists && self.permissions.is_none() && self.file_type.is_none()
    }

    /// Runs the predicates against `path` in a fixed order: directory,
    /// existence, permissions, then content type.
    pub fn check(&self, fs: &dyn FileSystem, path: &str) -> Result<(), FilesystemError> {
        let target = Path::new(path);
        debug!("Checking path predicates {self:?} on `{path}`");

        if self.dir_exists {
            match fs.metadata(target) {
                Ok(metadata) if metadata.is_dir => {}
                _ => return Err(FilesystemError::NotADirectory(path.to_string())),
            }
        }

        if self.file_exists {
            match fs.metadata(target) {
                Ok(metadata) if metadata.is_dir => {
                    return Err(FilesystemError::IsADirectory(path.to_string()))
                }
                Ok(_) => {}
                Err(_) => return Err(FilesystemError::Missing(path.to_string())),
            }
        }

        if let Some(want) = self.permissions {
            let metadata = fs
                .metadata(target)
                .map_err(|source| FilesystemError::Metadata {
                    path: path.to_string(),
                    source,
                })?;
            let got = metadata.mode & 0o7777;
            if got != want {
                return Err(FilesystemError::Permissions { want, got });
            }
        }

        if let Some(expected) = &self.file_type {
            check_file_type(fs, target, expected)?;
        }

        Ok(())
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
}

fn check_file_type(fs: &dyn FileSystem, path: &Path, expected: &str) -> Result<(), FilesystemError> {
    let display = path.display().to_string();
    let head = fs
        .read_head(path, SNIFF_LENGTH)
        .map_err(|source| FilesystemError::Read {
            path: display.clone(),
            source,
        })?;
    let detected = mime::sniff(&head);
    let detected_lower = detected.to_ascii_lowercase();

    if expected.contains('/') {
        let expected_lower = expected.to_ascii_lowercase();
        let mut effective = detected_lower.clone();

        if detected == mime::OCTET_STREAM {
            if let Some(by_extension) = extension_of(path).and_then(|ext| mime::for_extension(&ext)) {
                effective = by_extension.to_string();
            }
        }

        if !effective.starts_with(&expected_lower) {
            return Err(FilesystemError::ContentType {
                expected: expected.to_string(),
                detected: detected.to_string(),
            });
        }
        return Ok(());
    }

    let wanted_extension = if expected.starts_with('.') {
        expected.to_ascii_lowercase()
    } else {
        format!(".{}", expected.to_ascii_lowercase())
    };

    let expected_mime = mime::for_extension(&wanted_extension)
        .ok_or_else(|| FilesystemError::UnknownFileType(expected.to_string()))?;

    let extension = extension_of(path).ok_or_else(|| FilesystemError::NoExtension(display))?;
    let actual_mime = mime::for_extension(&extension);

    let content_matches = detected_lower.starts_with(expected_mime)
        || detected == mime::OCTET_STREAM
        || (detected_lower.starts_with("text/plain") && mime::is_textual(expected_mime));

    if actual_mime != Some(expected_mime) || !content_matches {
        return Err(FilesystemError::ExtensionMismatch {
            extension,
            detected: detected.to_string(),
            expected: expected_mime.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn fixture() -> MemoryFileSystem {
        let mut fs = MemoryFileSystem::new();
        fs.create_dir_all("/data/dir", 0o755);
        fs.write_file("/data/notes.txt", "plain notes", 0o644);
        fs.write_file("/data/image.png", PNG, 0o600);
        fs.write_file("/data/fake.png", "not an image", 0o644);
        fs.write_file("/data/blob.zip", vec![0u8, 1, 2, 3, 0xff], 0o644);
        fs.write_file("/data/noext", "text", 0o644);
        fs
    }

    fn predicates() -> PathPredicates {
        PathPredicates::default()
    }

    #[test]
    fn test_dir_exists() {
        let fs = fixture();
        let check = PathPredicates {
            dir_exists: true,
            ..predicates()
        };
        assert!(check.check(&fs, "/data/dir").is_ok());
        assert!(matches!(
            check.check(&fs, "/data/notes.txt"),
            Err(FilesystemError::NotADirectory(_))
        ));
        assert!(check.check(&fs, "/nowhere").is_err());
    }

    #[test]
    fn test_file_exists_rejects_missing_and_directories() {
        let fs = fixture();
        let check = PathPredicates {
            file_exists: true,
            ..predicates()
        };
        assert!(check.check(&fs, "/data/notes.txt").is_ok());
        assert!(matches!(
            check.check(&fs, "/data/missing.txt"),
            Err(FilesystemError::Missing(_))
        ));
        assert!(matches!(
            check.check(&fs, "/data/dir"),
            Err(FilesystemError::IsADirectory(_))
        ));
    }

    #[test]
    fn test_permissions() {
        let mut fs = fixture();
        let check = PathPredicates {
            permissions: Some(0o644),
            ..predicates()
        };
        assert!(check.check(&fs, "/data/notes.txt").is_ok());

        let error = check.check(&fs, "/data/image.png").unwrap_err();
        assert_eq!(
            error.to_string(),
            "File has incorrect permissions. Want: 0644, Got: 0600"
        );

        fs.set_permissions("/data/image.png", 0o644).unwrap();
        assert!(check.check(&fs, "/data/image.png").is_ok());
    }

    #[test]
    fn test_file_type_by_extension() {
        let fs = fixture();
        let png = PathPredicates {
            file_type: Some("png".to_string()),
            ..predicates()
        };
        assert!(png.check(&fs, "/data/image.png").is_ok());
        assert!(matches!(
            png.check(&fs, "/data/fake.png"),
            Err(FilesystemError::ExtensionMismatch { .. })
        ));
        assert!(matches!(
            png.check(&fs, "/data/notes.txt"),
            Err(FilesystemError::ExtensionMismatch { .. })
        ));
        assert!(matches!(
            png.check(&fs, "/data/noext"),
            Err(FilesystemError::NoExtension(_))
        ));

        let text = PathPredicates {
            file_type: Some(".txt".to_string()),
            ..predicates()
        };
        assert!(text.check(&fs, "/data/notes.txt").is_ok());
    }

    #[test]
    fn test_file_type_by_mime() {
        let fs = fixture();
        let image = PathPredicates {
            file_type: Some("image/png".to_string()),
            ..predicates()
        };
        assert!(image.check(&fs, "/data/image.png").is_ok());
        assert!(matches!(
            image.check(&fs, "/data/notes.txt"),
            Err(FilesystemError::ContentType { .. })
        ));

        let text = PathPredicates {
            file_type: Some("text/plain".to_string()),
            ..predicates()
        };
        assert!(text.check(&fs, "/data/noext").is_ok());
    }

    #[test]
    fn test_octet_stream_trusts_extension() {
        let fs = fixture();
        let zip = PathPredicates {
            file_type: Some("application/zip".to_string()),
            ..predicates()
        };
        assert!(zip.check(&fs, "/data/blob.zip").is_ok());
    }

    #[test]
    fn test_unknown_file_type() {
        let fs = fixture();
        let check = PathPredicates {
            file_type: Some("weird".to_string()),
            ..predicates()
        };
        assert!(matches!(
            check.check(&fs, "/data/notes.txt"),
            Err(FilesystemError::UnknownFileType(_))
        ));
    }

    #[test]
    fn test_os_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.txt");
        std::fs::write(&file, "hello").unwrap();

        let fs = OsFileSystem;
        let exists = PathPredicates {
            file_exists: true,
            file_type: Some("txt".to_string()),
            ..predicates()
        };
        assert!(exists.check(&fs, file.to_str().unwrap()).is_ok());

        let is_dir = PathPredicates {
            dir_exists: true,
            ..predicates()
        };
        assert!(is_dir.check(&fs, dir.path().to_str().unwrap()).is_ok());
        assert!(exists
            .check(&fs, dir.path().join("missing.txt").to_str().unwrap())
            .is_err());
    }
}
