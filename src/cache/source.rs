//! Cache file access: memory-mapped with a buffered fallback.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::util::{Error, Result};

/// Read-only bytes of a cache file.
pub enum CacheSource {
    /// Memory-mapped file
    Mmap(Mmap),
    /// Whole file read into memory
    Buffer(Vec<u8>),
}

impl CacheSource {
    /// Open `path`, mapping it when `use_mmap` is set and the file is non-empty.
    pub fn open(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let metadata = file.metadata()?;
        if !metadata.is_file() {
            return Err(Error::NotAFile(path.to_path_buf()));
        }
        let size = metadata.len();

        if use_mmap && size > 0 {
            // Safety: the map is read-only and dropped before the caller can
            // rewrite the file through this library.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            debug!("mapped {} ({size} bytes)", path.display());
            Ok(Self::Mmap(mmap))
        } else {
            let mut buf = Vec::with_capacity(size as usize);
            file.read_to_end(&mut buf)?;
            debug!("read {} ({} bytes)", path.display(), buf.len());
            Ok(Self::Buffer(buf))
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Mmap(m) => m,
            Self::Buffer(b) => b,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_both_modes() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"(VERSION:2)").unwrap();
        f.flush().unwrap();

        for use_mmap in [true, false] {
            let src = CacheSource::open(f.path(), use_mmap).unwrap();
            assert_eq!(src.as_bytes(), b"(VERSION:2)");
            assert_eq!(matches!(src, CacheSource::Mmap(_)), use_mmap);
        }
    }

    #[test]
    fn test_empty_file_is_buffered() {
        let f = tempfile::NamedTempFile::new().unwrap();
        let src = CacheSource::open(f.path(), true).unwrap();
        assert!(src.is_empty());
        assert!(matches!(src, CacheSource::Buffer(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let res = CacheSource::open(dir.path().join("nope.cache"), true);
        assert!(matches!(res, Err(Error::FileNotFound(_))));
    }
}
