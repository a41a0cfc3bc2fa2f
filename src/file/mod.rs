//! Input sources and low-level binary access.
//!
//! The photon reader works on a single contiguous byte slice. This module abstracts where
//! that slice comes from and provides the primitives used to walk it.
//!
//! # Key Components
//!
//! - [`crate::file::Backend`] - Trait for different data sources (disk files, memory buffers)
//! - [`crate::file::Physical`] - Memory-mapped file backend for disk access
//! - [`crate::file::Memory`] - In-memory buffer backend
//! - [`crate::file::parser::Parser`] - Bounds-checked cursor used by the reader
//! - [`crate::file::io`] - Little-endian primitive conversions
//!
//! # Examples
//!
//! ```rust,no_run
//! use photonfile::file::{Backend, Physical};
//!
//! let input = Physical::new("model.photon")?;
//! println!("{} bytes", input.len());
//! # Ok::<(), photonfile::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

pub use memory::Memory;
pub use physical::Physical;

use crate::{Error::OutOfBounds, Result};

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of photon data, allowing for both in-memory and
/// on-disk representations. All implementations must be thread-safe.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `true` if the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Arguments
    ///
    /// * `offset` - The starting offset within the data.
    /// * `len` - The length of the slice in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        let data = self.data();
        if offset_end > data.len() {
            return Err(OutOfBounds);
        }

        Ok(&data[offset..offset_end])
    }
}
