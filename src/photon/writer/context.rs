//! Write context and address bookkeeping for photon file generation.
//!
//! [`WriteContext`] carries the output, the sequential write position and the
//! [`AddressTable`] of forward references collected while the sections are streamed out.
//!
//! # Architecture
//!
//! The generation process has three phases:
//!
//! 1. **Plan**: The total size is computed up front and the output is allocated once
//! 2. **Write**: All sections are streamed sequentially; every address field whose target is not
//!    yet known is written as a zero placeholder and recorded in the [`AddressTable`], and every
//!    section records its resolved offset when its first byte is written
//! 3. **Fixup**: Placeholders are overwritten with the resolved offsets
//!    (see [`crate::photon::writer::fixups`])
//!
//! # Example
//!
//! ```rust,ignore
//! let mut ctx = WriteContext::new(Output::create_in_memory(size)?);
//!
//! ctx.write_placeholder(SectionId::LayerTable)?;
//! // ... more content ...
//! ctx.resolve_here(SectionId::LayerTable);
//! ctx.write(&table)?;
//!
//! apply_all_fixups(&mut ctx)?;
//! ```

use std::collections::HashMap;

use strum::Display;

use crate::{
    file::io::PhotonIO,
    photon::writer::output::Output,
    Error, Result,
};

/// Sections of a photon file that are referenced by an address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SectionId {
    /// High-res preview header, referenced from the file header
    #[strum(to_string = "high-res preview")]
    PreviewHigh,
    /// High-res preview payload, referenced from its preview header
    #[strum(to_string = "high-res preview payload")]
    PreviewHighData,
    /// Low-res preview header, referenced from the file header
    #[strum(to_string = "low-res preview")]
    PreviewLow,
    /// Low-res preview payload, referenced from its preview header
    #[strum(to_string = "low-res preview payload")]
    PreviewLowData,
    /// Print properties block (version 2)
    #[strum(to_string = "properties")]
    Properties,
    /// Layer table
    #[strum(to_string = "layer table")]
    LayerTable,
    /// Mask payload of one sublayer
    #[strum(to_string = "payload of layer {layer} level {level}")]
    Payload {
        /// Layer index in print order
        layer: usize,
        /// Anti-aliasing level
        level: usize,
    },
}

/// An address field written as a placeholder, patched during the fixup pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderFixup {
    /// File offset where the 4 byte field was written.
    pub file_offset: u64,
    /// The section whose offset belongs in the field.
    pub section: SectionId,
}

/// Transient mapping from sections to placeholder sites and resolved offsets.
///
/// Only exists while a file is being written.
#[derive(Debug, Default)]
pub struct AddressTable {
    placeholders: Vec<PlaceholderFixup>,
    resolved: HashMap<SectionId, u64>,
    lengths: HashMap<SectionId, usize>,
}

impl AddressTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        AddressTable::default()
    }

    /// Records a placeholder site for `section`.
    pub fn add_placeholder(&mut self, section: SectionId, file_offset: u64) {
        self.placeholders.push(PlaceholderFixup {
            file_offset,
            section,
        });
    }

    /// Records the offset at which `section` was written.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the section was already resolved.
    pub fn resolve(&mut self, section: SectionId, offset: u64) -> Result<()> {
        if let Some(previous) = self.resolved.insert(section, offset) {
            return Err(Error::IntegrityError(format!(
                "{section} resolved twice, at {previous} and {offset}"
            )));
        }
        Ok(())
    }

    /// Resolved offset of `section`, if written.
    #[must_use]
    pub fn resolved(&self, section: SectionId) -> Option<u64> {
        self.resolved.get(&section).copied()
    }

    /// Records the length that was written into the length field of `section`.
    pub fn record_length(&mut self, section: SectionId, length: usize) {
        self.lengths.insert(section, length);
    }

    /// Length recorded for `section`.
    #[must_use]
    pub fn recorded_length(&self, section: SectionId) -> Option<usize> {
        self.lengths.get(&section).copied()
    }

    /// All placeholder sites in write order.
    #[must_use]
    pub fn placeholders(&self) -> &[PlaceholderFixup] {
        &self.placeholders
    }
}

/// Unified write context for photon file generation.
pub struct WriteContext {
    /// Random-access output of the planned size.
    pub output: Output,

    /// Current sequential write position.
    pub position: u64,

    /// Placeholder sites and resolved section offsets.
    pub addresses: AddressTable,
}

impl WriteContext {
    /// Creates a context writing from offset 0 of `output`.
    #[must_use]
    pub fn new(output: Output) -> Self {
        WriteContext {
            output,
            position: 0,
            addresses: AddressTable::new(),
        }
    }

    /// Returns the current write position.
    #[must_use]
    pub fn pos(&self) -> u64 {
        self.position
    }

    /// Writes bytes at the current position and advances.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the write leaves the planned output.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.output.write_at(self.position, data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    /// Writes a little-endian primitive at the current position and advances.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the write leaves the planned output.
    pub fn write_le<T: PhotonIO>(&mut self, value: T) -> Result<()> {
        self.write(value.to_le_bytes().as_ref())
    }

    /// Writes `count` zero bytes for a reserved span.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the span leaves the planned output.
    pub fn write_zeros(&mut self, count: usize) -> Result<()> {
        self.output.zero_range(self.position, count as u64)?;
        self.position += count as u64;
        Ok(())
    }

    /// Writes a zero `i32` placeholder for the address of `section` and records its site.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the write leaves the planned output.
    pub fn write_placeholder(&mut self, section: SectionId) -> Result<()> {
        self.addresses.add_placeholder(section, self.position);
        self.write_le(0_i32)
    }

    /// Records the current position as the offset of `section`.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the section was already resolved.
    pub fn resolve_here(&mut self, section: SectionId) -> Result<()> {
        self.addresses.resolve(section, self.position)
    }

    /// Writes bytes at `offset` without changing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the write leaves the planned output.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        self.output.write_at(offset, data)
    }

    /// Writes a little-endian `i32` at `offset` without changing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::IntegrityError`] if the write leaves the planned output.
    pub fn write_i32_at(&mut self, offset: u64, value: i32) -> Result<()> {
        self.write_at(offset, &value.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_names() {
        assert_eq!(SectionId::LayerTable.to_string(), "layer table");
        assert_eq!(
            SectionId::Payload { layer: 3, level: 1 }.to_string(),
            "payload of layer 3 level 1"
        );
    }

    #[test]
    fn address_table() {
        let mut table = AddressTable::new();
        table.add_placeholder(SectionId::LayerTable, 64);
        table.resolve(SectionId::LayerTable, 200).unwrap();
        table.record_length(SectionId::Payload { layer: 0, level: 0 }, 12);

        assert_eq!(table.resolved(SectionId::LayerTable), Some(200));
        assert_eq!(table.resolved(SectionId::Properties), None);
        assert_eq!(
            table.recorded_length(SectionId::Payload { layer: 0, level: 0 }),
            Some(12)
        );
        assert_eq!(
            table.placeholders(),
            &[PlaceholderFixup {
                file_offset: 64,
                section: SectionId::LayerTable
            }]
        );
        assert!(matches!(
            table.resolve(SectionId::LayerTable, 300),
            Err(Error::IntegrityError(_))
        ));
    }

    #[test]
    fn sequential_writes() {
        let mut ctx = WriteContext::new(Output::create_in_memory(16).unwrap());

        ctx.write(&[0xAA, 0xBB]).unwrap();
        ctx.write_placeholder(SectionId::Properties).unwrap();
        ctx.write_le(0.05_f32).unwrap();
        ctx.write_zeros(2).unwrap();
        ctx.resolve_here(SectionId::Properties).unwrap();
        ctx.write_i32_at(2, 12).unwrap();

        assert_eq!(ctx.pos(), 12);
        assert_eq!(ctx.addresses.resolved(SectionId::Properties), Some(12));
        assert_eq!(
            &ctx.output.as_slice()[..12],
            &[0xAA, 0xBB, 12, 0, 0, 0, 0xCD, 0xCC, 0x4C, 0x3D, 0, 0]
        );

        assert!(ctx.write(&[0u8; 5]).is_err());
    }
}
