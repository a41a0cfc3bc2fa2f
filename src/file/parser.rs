//! Cursor based, bounds-checked byte parser.
//!
//! This module provides the [`crate::file::parser::Parser`] type that the photon reader uses to
//! walk the fixed header and to follow the addresses stored in it. Every operation validates
//! that the requested bytes exist before touching them, so truncated or corrupt inputs surface
//! as [`crate::Error::OutOfBounds`] instead of panics.
//!
//! # Examples
//!
//! ```rust
//! use photonfile::Parser;
//!
//! let data = [0x19, 0x00, 0xFD, 0x12, 0x02, 0x00, 0x00, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! let magic = parser.read_bytes(4)?;
//! let version: i32 = parser.read_le()?;
//! assert_eq!(magic, &[0x19, 0x00, 0xFD, 0x12]);
//! assert_eq!(version, 2);
//! # Ok::<(), photonfile::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, PhotonIO},
    Error::OutOfBounds,
    Result,
};

/// A cursor over a borrowed byte slice.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move the current position to the specified index.
    ///
    /// Seeking to exactly `len()` is allowed; it is where an empty trailing section starts.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if position is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if advancing by step would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        self.position = self.calc_end_position(step)?;
        Ok(())
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of bytes left after the current position.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length.
    pub fn read_le<T: PhotonIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `length` raw bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the buffer.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self.calc_end_position(length)?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Borrow `length` bytes at an absolute `offset` without moving the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range leaves the buffer.
    pub fn slice_at(&self, offset: usize, length: usize) -> Result<&'a [u8]> {
        let Some(end) = offset.checked_add(length) else {
            return Err(OutOfBounds);
        };
        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..end])
    }

    fn calc_end_position(&self, length: usize) -> Result<usize> {
        let end = self.position.checked_add(length).ok_or(OutOfBounds)?;

        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(end)
    }
}
