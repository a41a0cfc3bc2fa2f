use super::Backend;
use crate::{Error::FileError, Result};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A file backend that memory-maps a photon file on disk.
///
/// Photon files range from a few megabytes to a few hundred; mapping them lets the reader
/// follow the stored addresses without an upfront copy of the whole file. The parsed model
/// copies every section it keeps, so the mapping only lives for the duration of a parse.
///
/// # Examples
///
/// ```rust,ignore
/// use photonfile::file::{Backend, Physical};
///
/// let physical = Physical::new("model.photon")?;
/// let magic = physical.data_slice(0, 4)?;
/// println!("magic {:02x?}, {} bytes", magic, physical.len());
/// # Ok::<(), photonfile::Error>(())
/// ```
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// # Arguments
    /// * `path` - Path to the photon file on disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path)?;

        // The mapping is read-only and dropped before any write to the same path.
        let mmap = unsafe { Mmap::map(&file) }.map_err(FileError)?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn physical() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x19, 0x00, 0xFD, 0x12, 0x01, 0x00, 0x00, 0x00])
            .unwrap();
        file.flush().unwrap();

        let physical = Physical::new(file.path()).unwrap();

        assert_eq!(physical.len(), 8);
        assert_eq!(physical.data_slice(0, 4).unwrap(), &[0x19, 0x00, 0xFD, 0x12]);
        assert!(physical.data_slice(6, 4).is_err());
        assert!(physical.data_slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn invalid_file_path() {
        let result = Physical::new("/nonexistent/path/to/file.photon");
        match result.unwrap_err() {
            FileError(io_error) => {
                assert_eq!(io_error.kind(), std::io::ErrorKind::NotFound);
            }
            _ => panic!("Expected FileError"),
        }
    }
}
