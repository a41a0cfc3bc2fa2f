//! Preview thumbnails.
//!
//! Each file carries two previews, shown by the printer and slicer UIs. A preview is a 32 byte
//! header followed by its payload:
//!
//! ```text
//! 0x00  resolution x (i32)
//! 0x04  resolution y (i32)
//! 0x08  payload address (i32)
//! 0x0C  payload length (i32)
//! 0x10  16 reserved bytes
//! ```
//!
//! The payload is kept as opaque bytes. The declared resolution is informational and is not
//! checked against the payload.

use strum::Display;

use crate::{file::parser::Parser, Result};

/// Size of a preview header.
pub const PREVIEW_HEADER_SIZE: usize = 32;

/// Reserved bytes at the end of a preview header.
pub(crate) const PREVIEW_RESERVED_SIZE: usize = 16;

/// The two preview slots, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PreviewKind {
    /// High-resolution preview
    High,
    /// Low-resolution preview
    Low,
}

/// A preview thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreviewImage {
    /// Declared width
    pub resolution_x: i32,
    /// Declared height
    pub resolution_y: i32,
    /// Raw payload; its length is written as the payload length field
    pub data: Vec<u8>,
}

impl PreviewImage {
    /// Creates a preview from its declared size and payload.
    #[must_use]
    pub fn new(resolution_x: i32, resolution_y: i32, data: Vec<u8>) -> Self {
        PreviewImage {
            resolution_x,
            resolution_y,
            data,
        }
    }

    /// Reads the preview whose header starts at `offset`.
    ///
    /// # Errors
    /// - [`crate::Error::Malformed`] for a negative payload address or length
    /// - [`crate::Error::OutOfBounds`] if the header or payload lies outside the buffer
    pub fn parse(parser: &mut Parser, offset: usize) -> Result<Self> {
        parser.seek(offset)?;

        let resolution_x = parser.read_le()?;
        let resolution_y = parser.read_le()?;
        let data_address: i32 = parser.read_le()?;
        let data_length: i32 = parser.read_le()?;
        parser.advance_by(PREVIEW_RESERVED_SIZE)?;

        let (Ok(data_address), Ok(data_length)) =
            (usize::try_from(data_address), usize::try_from(data_length))
        else {
            return Err(malformed_error!(
                "Preview at {} has payload address {} and length {}",
                offset,
                data_address,
                data_length
            ));
        };

        let data = parser.slice_at(data_address, data_length)?.to_vec();
        Ok(PreviewImage {
            resolution_x,
            resolution_y,
            data,
        })
    }

    /// Bytes occupied on disk by header and payload.
    #[must_use]
    pub fn size(&self) -> usize {
        PREVIEW_HEADER_SIZE + self.data.len()
    }
}
