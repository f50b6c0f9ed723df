// src/engine/io.rs
//
// I/O operations: memory-mapped input files, atomic writes for export output

use crate::error::CanvasError;
use memmap2::Mmap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

type IoResult<T> = std::result::Result<T, CanvasError>;

/// A read-only memory map of an input file, decoded without copying into the heap.
#[derive(Debug)]
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    pub fn open(path: &Path) -> IoResult<Self> {
        let display = path.to_string_lossy().to_string();
        let file = File::open(path).map_err(|e| CanvasError::file_read_failed(display.clone(), e))?;

        // Safety: the file is assumed not to be modified externally while mapped.
        // If it is, decoding may fail or the OS may raise SIGBUS.
        let mmap = unsafe { Mmap::map(&file).map_err(|e| CanvasError::mmap_failed(display, e))? };
        Ok(Self { mmap })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }
}

/// Atomically write `data` to `path`.
///
/// Writes to a temp file in the target directory and renames it into place,
/// so readers never observe a half-written export. The temp file is removed
/// on failure.
pub fn write_atomic(path: &Path, data: &[u8]) -> IoResult<()> {
    use tempfile::NamedTempFile;

    let display = path.to_string_lossy().to_string();
    let output_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    // Same directory as the target so rename() never crosses filesystems
    let mut temp_file = NamedTempFile::new_in(output_dir)
        .map_err(|e| CanvasError::file_write_failed(output_dir.to_string_lossy().to_string(), e))?;

    temp_file
        .write_all(data)
        .and_then(|_| temp_file.as_file().sync_all())
        .map_err(|e| CanvasError::file_write_failed(display.clone(), e))?;

    temp_file
        .persist(path)
        .map_err(|e| CanvasError::file_write_failed(display, e.error))?;

    tracing::debug!(path = %path.display(), bytes = data.len(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_then_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_atomic(&path, b"hello").unwrap();

        let mapped = MappedFile::open(&path).unwrap();
        assert_eq!(mapped.as_bytes(), b"hello");
    }

    #[test]
    fn test_map_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, b"").unwrap();
        assert!(MappedFile::open(&path).unwrap().as_bytes().is_empty());
    }

    #[test]
    fn test_write_atomic_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_map_missing_file_is_read_error() {
        let err = MappedFile::open(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, CanvasError::FileReadFailed { .. }));
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let err = write_atomic(Path::new("/definitely/not/here/out.png"), b"x").unwrap_err();
        assert!(matches!(err, CanvasError::FileWriteFailed { .. }));
    }
}
