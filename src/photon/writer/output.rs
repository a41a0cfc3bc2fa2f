//! Random-access output for photon file generation.
//!
//! This module provides the [`crate::photon::writer::output::Output`] type that the layout
//! planner writes into. The output is allocated once at the planned size, which allows the
//! fixup pass to seek back and patch address fields.
//!
//! # Atomic Operations
//!
//! File-backed output is written to a uniquely named temporary file next to the target path and
//! renamed into place by [`Output::finalize`]. An output dropped without being finalized removes
//! its temporary file, so a failed write never leaves a partial file at the target path.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use crate::photon::writer::output::Output;
//!
//! let mut output = Output::create("model.photon", 4096)?;
//! output.write_at(0, &[0x19, 0x00, 0xFD, 0x12])?;
//! output.finalize()?;
//! ```

use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};
use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Internal backing storage for output data.
enum OutputBacking {
    /// Memory-mapped temporary file.
    File {
        /// The memory mapping of the temporary file
        mmap: MmapMut,
        /// The temporary file being written; removed when dropped
        file: NamedTempFile,
        /// The final destination
        target_path: PathBuf,
    },
    /// In-memory buffer.
    Memory {
        /// The data buffer
        data: Vec<u8>,
    },
}

/// A fixed-size output, backed by a memory-mapped file or an in-memory buffer.
pub struct Output {
    backing: OutputBacking,
}

impl Output {
    /// Creates a file-backed output of `size` bytes destined for `target_path`.
    ///
    /// The data is written to a uniquely named temporary file in the target's directory.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the temporary file cannot be created, sized or
    /// mapped.
    pub fn create<P: AsRef<Path>>(target_path: P, size: u64) -> Result<Self> {
        let target_path = target_path.as_ref().to_path_buf();
        let directory = match target_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let name = target_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file = tempfile::Builder::new()
            .prefix(&format!(".{name}."))
            .suffix(".tmp")
            .tempfile_in(directory)?;
        file.as_file().set_len(size)?;

        // The file is exclusively owned by this output until finalize.
        let mmap = unsafe { MmapOptions::new().map_mut(file.as_file()) }?;

        Ok(Output {
            backing: OutputBacking::File {
                mmap,
                file,
                target_path,
            },
        })
    }

    /// Creates an in-memory output of `size` zero bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::FormatOverflow`] if the size does not fit the address space.
    pub fn create_in_memory(size: u64) -> Result<Self> {
        let size = usize::try_from(size).map_err(|_| Error::FormatOverflow {
            what: "output size".to_string(),
            value: size,
        })?;

        Ok(Output {
            backing: OutputBacking::Memory {
                data: vec![0u8; size],
            },
        })
    }

    /// The entire buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match &self.backing {
            OutputBacking::File { mmap, .. } => &mmap[..],
            OutputBacking::Memory { data } => &data[..],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.backing {
            OutputBacking::File { mmap, .. } => &mut mmap[..],
            OutputBacking::Memory { data } => &mut data[..],
        }
    }

    /// Total size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.as_slice().len()
    }

    /// Bounds-checked mutable range of the buffer.
    fn range_mut(&mut self, offset: u64, len: usize) -> Result<&mut [u8]> {
        let size = self.size();
        let start = usize::try_from(offset).ok().filter(|&start| start <= size);
        let Some(end) = start.and_then(|start| start.checked_add(len)) else {
            return Err(Error::IntegrityError(format!(
                "write at {offset} starts past the planned size of {size} bytes"
            )));
        };
        if end > size {
            return Err(Error::IntegrityError(format!(
                "write of {len} bytes at {offset} exceeds the planned size of {size} bytes"
            )));
        }

        let start = end - len;
        Ok(&mut self.as_mut_slice()[start..end])
    }

    /// Writes `data` at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the write would exceed the planned size.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.range_mut(offset, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// Fills `size` bytes at `offset` with zeros.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the region would exceed the planned size.
    pub fn zero_range(&mut self, offset: u64, size: u64) -> Result<()> {
        let len = usize::try_from(size).map_err(|_| {
            Error::IntegrityError(format!("zero range of {size} bytes is not addressable"))
        })?;
        self.range_mut(offset, len)?.fill(0);
        Ok(())
    }

    /// Flushes the file and moves it to the target path.
    ///
    /// # Errors
    /// - [`crate::Error::FileError`] if flushing or renaming fails
    /// - [`crate::Error::NotSupported`] for an in-memory output, use [`Output::into_vec`]
    pub fn finalize(self) -> Result<()> {
        match self.backing {
            OutputBacking::File {
                mmap,
                file,
                target_path,
            } => {
                mmap.flush()?;
                drop(mmap);
                file.persist(&target_path)
                    .map_err(|error| Error::FileError(error.error))?;
                Ok(())
            }
            OutputBacking::Memory { .. } => Err(Error::NotSupported(
                "in-memory output cannot be finalized to a file".to_string(),
            )),
        }
    }

    /// Consumes the output and returns its bytes.
    ///
    /// For in-memory output this moves the buffer without copying. A file-backed output is
    /// copied out and its temporary file removed.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        match self.backing {
            OutputBacking::Memory { data } => data,
            OutputBacking::File { mmap, .. } => mmap[..].to_vec(),
        }
    }
}
