//! Note file store contract and filesystem implementation.
//!
//! # Responsibility
//! - Read, create, overwrite, delete and enumerate raw note files.
//! - Map uids to `<root>/<uid>.md` paths.
//!
//! # Invariants
//! - Only valid uids ever become file names (no separators, no dots).
//! - `create_raw` never overwrites; `write_raw` never creates.
//! - `list_raw` is sorted by file name so corpus order is reproducible.

use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::model::note::is_valid_uid;

const NOTE_EXTENSION: &str = "md";

pub type RepoResult<T> = Result<T, RepoError>;

/// File store error.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying filesystem failure.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// No file backs the uid.
    NotFound(String),
    /// A file for the uid already exists.
    Conflict(String),
    /// Uid cannot be used as a file name.
    InvalidUid(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
            Self::NotFound(uid) => write!(f, "note not found: {uid}"),
            Self::Conflict(uid) => write!(f, "note file already exists: {uid}"),
            Self::InvalidUid(uid) => write!(f, "invalid note uid: `{uid}`"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// One raw file returned by `list_raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNoteFile {
    /// File stem; equals the frontmatter uid for well-formed files.
    pub stem: String,
    pub path: PathBuf,
    pub raw: String,
}

/// Raw note persistence contract.
pub trait NoteRepository {
    /// Reads the file text backing `uid`.
    fn read_raw(&self, uid: &str) -> RepoResult<String>;
    fn exists(&self, uid: &str) -> RepoResult<bool>;
    /// Writes a new file; fails with `Conflict` if one exists.
    fn create_raw(&self, uid: &str, raw: &str) -> RepoResult<()>;
    /// Replaces an existing file; fails with `NotFound` otherwise.
    fn write_raw(&self, uid: &str, raw: &str) -> RepoResult<()>;
    fn delete(&self, uid: &str) -> RepoResult<()>;
    /// Every note file in the store.
    fn list_raw(&self) -> RepoResult<Vec<RawNoteFile>>;
}

/// Directory of `<uid>.md` files.
#[derive(Debug, Clone)]
pub struct FsNoteRepository {
    root: PathBuf,
}

impl FsNoteRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, uid: &str) -> RepoResult<PathBuf> {
        if !is_valid_uid(uid) {
            return Err(RepoError::InvalidUid(uid.to_string()));
        }
        Ok(self.root.join(format!("{uid}.{NOTE_EXTENSION}")))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RepoError {
    RepoError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl NoteRepository for FsNoteRepository {
    fn read_raw(&self, uid: &str) -> RepoResult<String> {
        let path = self.path_for(uid)?;
        fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => RepoError::NotFound(uid.to_string()),
            _ => io_error(&path, err),
        })
    }

    fn exists(&self, uid: &str) -> RepoResult<bool> {
        Ok(self.path_for(uid)?.is_file())
    }

    fn create_raw(&self, uid: &str, raw: &str) -> RepoResult<()> {
        let path = self.path_for(uid)?;
        fs::create_dir_all(&self.root).map_err(|err| io_error(&self.root, err))?;
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| match err.kind() {
                ErrorKind::AlreadyExists => RepoError::Conflict(uid.to_string()),
                _ => io_error(&path, err),
            })?;
        file.write_all(raw.as_bytes())
            .map_err(|err| io_error(&path, err))?;
        debug!("event=note_file_create module=repo status=ok uid={uid}");
        Ok(())
    }

    fn write_raw(&self, uid: &str, raw: &str) -> RepoResult<()> {
        let path = self.path_for(uid)?;
        if !path.is_file() {
            return Err(RepoError::NotFound(uid.to_string()));
        }
        fs::write(&path, raw).map_err(|err| io_error(&path, err))?;
        debug!("event=note_file_write module=repo status=ok uid={uid}");
        Ok(())
    }

    fn delete(&self, uid: &str) -> RepoResult<()> {
        let path = self.path_for(uid)?;
        fs::remove_file(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => RepoError::NotFound(uid.to_string()),
            _ => io_error(&path, err),
        })?;
        debug!("event=note_file_delete module=repo status=ok uid={uid}");
        Ok(())
    }

    fn list_raw(&self) -> RepoResult<Vec<RawNoteFile>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(
                    "event=note_store_list module=repo status=missing_root root={}",
                    self.root.display()
                );
                return Ok(Vec::new());
            }
            Err(err) => return Err(io_error(&self.root, err)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| io_error(&self.root, err))?;
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|ext| ext.to_str()) != Some(NOTE_EXTENSION)
            {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path).map_err(|err| io_error(&path, err))?;
            files.push(RawNoteFile {
                stem: stem.to_string(),
                path: path.clone(),
                raw,
            });
        }
        files.sort_by(|left, right| left.path.cmp(&right.path));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::{FsNoteRepository, NoteRepository, RepoError};

    #[test]
    fn create_then_write_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsNoteRepository::new(dir.path().join("notes"));

        assert!(matches!(repo.write_raw("abc", "x"), Err(RepoError::NotFound(_))));
        repo.create_raw("abc", "one").unwrap();
        assert!(matches!(repo.create_raw("abc", "two"), Err(RepoError::Conflict(_))));
        repo.write_raw("abc", "two").unwrap();
        assert_eq!(repo.read_raw("abc").unwrap(), "two");

        repo.delete("abc").unwrap();
        assert!(!repo.exists("abc").unwrap());
        assert!(matches!(repo.read_raw("abc"), Err(RepoError::NotFound(_))));
    }

    #[test]
    fn uids_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsNoteRepository::new(dir.path());
        assert!(matches!(
            repo.read_raw("../etc/passwd"),
            Err(RepoError::InvalidUid(_))
        ));
    }

    #[test]
    fn listing_skips_other_files_and_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsNoteRepository::new(dir.path());
        repo.create_raw("b", "B").unwrap();
        repo.create_raw("a", "A").unwrap();
        std::fs::write(dir.path().join("readme.txt"), "skip").unwrap();

        let stems: Vec<_> = repo.list_raw().unwrap().into_iter().map(|f| f.stem).collect();
        assert_eq!(stems, vec!["a".to_string(), "b".to_string()]);

        let missing = FsNoteRepository::new(dir.path().join("nope"));
        assert!(missing.list_raw().unwrap().is_empty());
    }
}
