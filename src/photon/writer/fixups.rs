//! Backpatch pass for photon file generation.
//!
//! After every section has been streamed out, each placeholder recorded in the
//! [`crate::photon::writer::context::AddressTable`] is overwritten with the resolved offset of its
//! section.
//!
//! ```text
//! ┌─────────────────┐
//! │  Write Phase    │ ── Streams sections, records placeholder sites and offsets
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │  Fixup Phase    │ ── Patches every placeholder with its resolved offset
//! │  (this module)  │
//! └─────────────────┘
//! ```

use log::trace;

use crate::{
    photon::writer::context::WriteContext,
    Error, Result,
};

/// Converts a size or offset into the signed 32-bit value stored on disk.
///
/// # Errors
/// Returns [`crate::Error::FormatOverflow`] if `value` exceeds `i32::MAX`.
pub fn to_i32(value: u64, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::FormatOverflow {
        what: what.to_string(),
        value,
    })
}

/// Applies all placeholder fixups.
///
/// Returns the number of patched fields.
///
/// # Errors
/// - [`crate::Error::IntegrityError`] if a placeholder references a section that was never
///   written, or a resolved offset lies outside the output
/// - [`crate::Error::FormatOverflow`] if a resolved offset does not fit the 32-bit field
pub fn apply_all_fixups(ctx: &mut WriteContext) -> Result<usize> {
    let placeholders = ctx.addresses.placeholders().to_vec();
    let output_size = ctx.output.size() as u64;

    for fixup in &placeholders {
        let Some(offset) = ctx.addresses.resolved(fixup.section) else {
            return Err(Error::IntegrityError(format!(
                "{} referenced at {} was never written",
                fixup.section, fixup.file_offset
            )));
        };

        // An empty trailing section may start exactly at the end of the file.
        if offset > output_size {
            return Err(Error::IntegrityError(format!(
                "{} resolved to {} past the end of the {} byte output",
                fixup.section, offset, output_size
            )));
        }

        let value = to_i32(offset, &format!("offset of {}", fixup.section))?;
        ctx.write_i32_at(fixup.file_offset, value)?;

        trace!(
            "Patched {} at {:#x} -> {:#x}",
            fixup.section,
            fixup.file_offset,
            offset
        );
    }

    Ok(placeholders.len())
}
