//! Corpus abstraction — size-known input file with positioned chunk reads

use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// The input file. Immutable for the pipeline's lifetime and shared
/// read-only by all reader workers through independently positioned
/// handles, so no locking is involved.
#[derive(Debug, Clone)]
pub struct Corpus {
    path: PathBuf,
    size: u64,
}

impl Corpus {
    /// Stat the file and capture its byte size. Fails before any worker
    /// starts if the path is missing or not a regular file.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let meta = std::fs::metadata(&path)?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }
        Ok(Self {
            size: meta.len(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Corpus size in bytes. Offsets past this value terminate readers.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Open a private handle for one reader worker.
    pub fn handle(&self) -> io::Result<CorpusHandle> {
        Ok(CorpusHandle {
            file: File::open(&self.path)?,
        })
    }
}

/// A per-worker file handle with its own cursor.
#[derive(Debug)]
pub struct CorpusHandle {
    file: File,
}

impl CorpusHandle {
    /// Seek to `offset` and hand back a fresh buffered reader for one
    /// chunk scan. Buffered state never carries across chunks.
    pub fn reader_at(&mut self, offset: u64) -> io::Result<BufReader<&File>> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(BufReader::new(&self.file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    #[test]
    fn open_reports_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.txt");
        std::fs::write(&path, b"hello world").unwrap();
        let corpus = Corpus::open(&path).unwrap();
        assert_eq!(corpus.size(), 11);
        assert_eq!(corpus.path(), path);
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(Corpus::open(dir.path().join("nope.txt")).is_err());
    }

    #[test]
    fn open_directory_fails() {
        let dir = TempDir::new().unwrap();
        let err = Corpus::open(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn reader_at_positions_cursor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.txt");
        std::fs::write(&path, b"abcdef").unwrap();
        let corpus = Corpus::open(&path).unwrap();
        let mut handle = corpus.handle().unwrap();

        let mut buf = String::new();
        handle.reader_at(3).unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "def");

        // Re-seeking the same handle starts over.
        buf.clear();
        handle.reader_at(0).unwrap().read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "abcdef");
    }
}
