//! Layout planner: serializes a [`crate::PhotonFile`] into its on-disk form.
//!
//! The file is written in a single sequential pass followed by a backpatch pass:
//!
//! 1. The total size is planned and the [`output::Output`] allocated once
//! 2. Sections are emitted in canonical order: header, high-res preview, low-res preview,
//!    properties (version 2), layer table, payloads. Address fields are written as placeholders
//!    and every section records its offset as it is written
//! 3. [`fixups::apply_all_fixups`] patches every placeholder with the resolved offset
//!
//! The layer table and the payload stream use opposite orders, which the printer firmware
//! relies on:
//!
//! ```text
//! layer table (level-major)        payloads (layer-major)
//! ┌───────────────────────┐        ┌───────────────────────┐
//! │ layer 0, level 0      │        │ layer 0, level 0      │
//! │ layer 1, level 0      │        │ layer 0, level 1      │
//! │ ...                   │        │ ...                   │
//! │ layer 0, level 1      │        │ layer 1, level 0      │
//! │ layer 1, level 1      │        │ layer 1, level 1      │
//! └───────────────────────┘        └───────────────────────┘
//! ```
//!
//! Each level stores cumulative layer heights. The running height restarts for every level:
//! the first layer stores its own thickness and each later layer adds its thickness to the
//! previous stored value.
//!
//! Writing is single threaded. On failure no output is produced; file output goes through a
//! temporary file that only replaces the target once every fixup has been applied.

pub mod context;
pub mod fixups;
pub mod output;

use std::path::Path;

use log::debug;

use crate::{
    photon::{
        header::{
            FileHeader, BED_RESERVED_SIZE, EXTENDED_RESERVED_SIZE, HEADER_TAIL_SIZE,
            PROPERTIES_SIZE,
        },
        layer::{LayerStore, LAYER_ENTRY_RESERVED_SIZE, LAYER_ENTRY_SIZE},
        preview::{PreviewImage, PreviewKind, PREVIEW_RESERVED_SIZE},
        PhotonFile,
    },
    Error, Result,
};

use context::{SectionId, WriteContext};
use fixups::{apply_all_fixups, to_i32};
use output::Output;

/// Computes the exact size of the serialized file.
#[must_use]
pub fn planned_size(photon: &PhotonFile) -> u64 {
    let header = photon.header();
    let layers = photon.layers();

    let sections = header.size()
        + photon.preview(PreviewKind::High).size()
        + photon.preview(PreviewKind::Low).size()
        + if header.extended().is_some() {
            PROPERTIES_SIZE
        } else {
            0
        };
    let table = layers.len() as u64 * layers.anti_aliasing_level() as u64 * LAYER_ENTRY_SIZE as u64;
    let payloads: u64 = layers
        .iter()
        .flat_map(|layer| layer.sublayers())
        .map(|sublayer| sublayer.data_len() as u64)
        .sum();

    sections as u64 + table + payloads
}

/// Checks that every offset of a file of `size` bytes fits the 32-bit address fields.
///
/// # Errors
/// Returns [`crate::Error::FormatOverflow`] for files larger than `i32::MAX` bytes.
fn addressable_size(size: u64) -> Result<u64> {
    to_i32(size, "file size")?;
    Ok(size)
}

/// Serializes `photon` into a byte vector.
///
/// # Errors
/// See [`write_into`]; the size is checked before anything is allocated.
pub fn to_bytes(photon: &PhotonFile) -> Result<Vec<u8>> {
    let output = Output::create_in_memory(addressable_size(planned_size(photon))?)?;
    Ok(write_into(photon, output)?.into_vec())
}

/// Serializes `photon` to `path`, replacing it only once the file is complete.
///
/// # Errors
/// See [`write_into`]; additionally [`crate::Error::FileError`] for filesystem failures.
pub fn write_to_file(photon: &PhotonFile, path: &Path) -> Result<()> {
    let output = Output::create(path, addressable_size(planned_size(photon))?)?;
    write_into(photon, output)?.finalize()
}

/// Streams all sections into `output` and applies the fixups.
///
/// # Errors
/// - [`crate::Error::FormatOverflow`] if an offset, length or count exceeds its 32-bit field
/// - [`crate::Error::IntegrityError`] if the written bytes disagree with the planned layout
pub fn write_into(photon: &PhotonFile, output: Output) -> Result<Output> {
    let header = photon.header();
    let layers = photon.layers();
    check_consistency(header, layers)?;

    let planned = output.size() as u64;
    let mut ctx = WriteContext::new(output);

    write_header(&mut ctx, header, layers.len())?;
    write_preview(&mut ctx, PreviewKind::High, photon.preview(PreviewKind::High))?;
    write_preview(&mut ctx, PreviewKind::Low, photon.preview(PreviewKind::Low))?;
    if let Some(properties) = header.properties() {
        ctx.resolve_here(SectionId::Properties)?;
        ctx.write(&properties.to_bytes())?;
    }
    write_layer_table(&mut ctx, layers)?;
    write_payloads(&mut ctx, layers)?;

    if ctx.pos() != planned {
        return Err(Error::IntegrityError(format!(
            "wrote {} bytes, planned {}",
            ctx.pos(),
            planned
        )));
    }

    let patched = apply_all_fixups(&mut ctx)?;
    debug!(
        "Wrote photon file: {} bytes, {} layers, {} fixups",
        ctx.pos(),
        layers.len(),
        patched
    );

    Ok(ctx.output)
}

fn check_consistency(header: &FileHeader, layers: &LayerStore) -> Result<()> {
    if header.anti_aliasing_level() as usize != layers.anti_aliasing_level() {
        return Err(Error::IntegrityError(format!(
            "header anti-aliasing level {} differs from layer store level {}",
            header.anti_aliasing_level(),
            layers.anti_aliasing_level()
        )));
    }
    if header.resolution() != layers.resolution() {
        return Err(Error::IntegrityError(format!(
            "header resolution {} differs from layer store resolution {}",
            header.resolution(),
            layers.resolution()
        )));
    }
    Ok(())
}

fn write_header(ctx: &mut WriteContext, header: &FileHeader, layer_count: usize) -> Result<()> {
    ctx.write(&header.magic)?;
    ctx.write_le(header.version())?;
    for value in [header.bed_x, header.bed_y, header.bed_z] {
        ctx.write_le(value)?;
    }
    ctx.write_zeros(BED_RESERVED_SIZE)?;

    for value in [
        header.layer_height,
        header.exposure,
        header.exposure_bottom,
        header.off_time,
    ] {
        ctx.write_le(value)?;
    }
    ctx.write_le(header.bottom_layers)?;

    let resolution = header.resolution();
    ctx.write_le(to_i32(u64::from(resolution.width), "resolution x")?)?;
    ctx.write_le(to_i32(u64::from(resolution.height), "resolution y")?)?;

    ctx.write_placeholder(SectionId::PreviewHigh)?;
    ctx.write_placeholder(SectionId::LayerTable)?;
    ctx.write_le(to_i32(layer_count as u64, "layer count")?)?;
    ctx.write_placeholder(SectionId::PreviewLow)?;

    match header.extended() {
        Some(extended) => {
            ctx.write_le(extended.print_time)?;
            ctx.write_le(header.projection_type)?;
            ctx.write_placeholder(SectionId::Properties)?;
            ctx.write_le(PROPERTIES_SIZE as i32)?;
            ctx.write_le(to_i32(
                u64::from(extended.anti_aliasing_level()),
                "anti-aliasing level",
            )?)?;
            ctx.write_le(extended.light_pwm)?;
            ctx.write_le(extended.light_pwm_bottom)?;
            ctx.write_zeros(EXTENDED_RESERVED_SIZE)?;
        }
        None => {
            ctx.write_zeros(4)?;
            ctx.write_le(header.projection_type)?;
            ctx.write_zeros(HEADER_TAIL_SIZE - 4)?;
        }
    }

    Ok(())
}

fn write_preview(ctx: &mut WriteContext, kind: PreviewKind, preview: &PreviewImage) -> Result<()> {
    let (header_section, data_section) = match kind {
        PreviewKind::High => (SectionId::PreviewHigh, SectionId::PreviewHighData),
        PreviewKind::Low => (SectionId::PreviewLow, SectionId::PreviewLowData),
    };

    ctx.resolve_here(header_section)?;
    ctx.write_le(preview.resolution_x)?;
    ctx.write_le(preview.resolution_y)?;
    ctx.write_placeholder(data_section)?;
    ctx.write_le(to_i32(
        preview.data.len() as u64,
        &format!("{kind} preview length"),
    )?)?;
    ctx.write_zeros(PREVIEW_RESERVED_SIZE)?;

    ctx.resolve_here(data_section)?;
    ctx.write(&preview.data)
}

fn write_layer_table(ctx: &mut WriteContext, layers: &LayerStore) -> Result<()> {
    ctx.resolve_here(SectionId::LayerTable)?;
    if layers.is_empty() {
        return Ok(());
    }

    for level in 0..layers.anti_aliasing_level() {
        let mut height: Option<f32> = None;

        for (index, layer) in layers.iter().enumerate() {
            let section = SectionId::Payload {
                layer: index,
                level,
            };
            let sublayer = layer.sublayer(level).ok_or_else(|| {
                Error::IntegrityError(format!("{section} is missing from the layer store"))
            })?;

            let cumulative = height.map_or(sublayer.layer_thickness, |previous| {
                previous + sublayer.layer_thickness
            });
            height = Some(cumulative);

            ctx.write_le(cumulative)?;
            ctx.write_le(sublayer.exposure_time)?;
            ctx.write_le(sublayer.off_time)?;
            ctx.write_placeholder(section)?;
            ctx.write_le(to_i32(
                sublayer.data_len() as u64,
                &format!("length of {section}"),
            )?)?;
            ctx.addresses.record_length(section, sublayer.data_len());
            ctx.write_zeros(LAYER_ENTRY_RESERVED_SIZE)?;
        }
    }

    Ok(())
}

fn write_payloads(ctx: &mut WriteContext, layers: &LayerStore) -> Result<()> {
    for (index, layer) in layers.iter().enumerate() {
        for (level, sublayer) in layer.sublayers().iter().enumerate() {
            let section = SectionId::Payload {
                layer: index,
                level,
            };

            ctx.resolve_here(section)?;
            let start = ctx.pos();
            ctx.write(sublayer.data())?;
            let written = (ctx.pos() - start) as usize;

            match ctx.addresses.recorded_length(section) {
                Some(recorded) if recorded == written => {}
                recorded => {
                    return Err(Error::IntegrityError(format!(
                        "{section}: table records {recorded:?} bytes, wrote {written}"
                    )));
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        photon::{config::PhotonDefaults, layer::LayerParams},
        rle::{PixelGrid, Resolution},
        test::{rle_mask, FileBuilder},
    };

    fn small_defaults(version: i32, level: u32) -> PhotonDefaults {
        PhotonDefaults {
            version,
            anti_aliasing_level: level,
            resolution: Resolution::new(10, 10),
            print_time: 3600,
            preview_high: PreviewImage::new(4, 2, vec![0x11; 16]),
            preview_low: PreviewImage::new(2, 1, vec![0x22; 4]),
            properties: crate::photon::header::PrintProperties {
                volume_ml: 1.5,
                weight_g: 2.0,
                cost_dollars: 0.25,
                ..Default::default()
            },
            ..PhotonDefaults::default()
        }
    }

    #[test]
    fn empty_file_layout() {
        let photon = PhotonFile::new(small_defaults(2, 1));
        let data = to_bytes(&photon).unwrap();

        let expected = FileBuilder::new(2, 1).resolution(10, 10).build();
        assert_eq!(data.len() as u64, planned_size(&photon));
        assert_eq!(data, expected);
    }

    #[test]
    fn empty_file_with_many_levels() {
        let photon = PhotonFile::new(small_defaults(2, 16));
        let data = to_bytes(&photon).unwrap();

        assert_eq!(data, FileBuilder::new(2, 16).resolution(10, 10).build());
        assert_eq!(PhotonFile::from_mem(data).unwrap(), photon);
    }

    #[test]
    fn matches_independent_layout() {
        for (version, level) in [(1, 1), (2, 1), (2, 3)] {
            let mut photon = PhotonFile::new(small_defaults(version, level));
            for index in 0..4 {
                let images = (0..level as usize)
                    .map(|sub| rle_mask(10, 10, index * 10 + sub).into())
                    .collect();
                photon.append_layer(images, LayerParams::new()).unwrap();
            }

            let expected = FileBuilder::new(version, level as i32)
                .resolution(10, 10)
                .uniform_layers(4, |index, sub| rle_mask(10, 10, index * 10 + sub))
                .build();

            assert_eq!(to_bytes(&photon).unwrap(), expected, "version {version}");
        }
    }

    #[test]
    fn cumulative_height_restarts_per_level() {
        let mut photon = PhotonFile::new(small_defaults(2, 2));
        for thickness in [0.05_f32, 0.1, 0.025] {
            let images = vec![
                PixelGrid::new(Resolution::new(10, 10)).into(),
                PixelGrid::new(Resolution::new(10, 10)).into(),
            ];
            photon
                .append_layer(images, LayerParams::new().with_thickness(thickness))
                .unwrap();
        }

        let data = to_bytes(&photon).unwrap();
        let table = 112 + 48 + 36 + 60;
        let height_at = |entry: usize| {
            let offset = table + entry * LAYER_ENTRY_SIZE;
            f32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
        };

        for level in 0..2 {
            assert_eq!(height_at(level * 3), 0.05);
            assert_eq!(height_at(level * 3 + 1), 0.05_f32 + 0.1_f32);
            assert_eq!(height_at(level * 3 + 2), 0.05_f32 + 0.1_f32 + 0.025_f32);
        }
    }

    #[test]
    fn rejects_inconsistent_store() {
        let mut photon = PhotonFile::new(small_defaults(2, 1));
        photon.layers.reconfigure(Resolution::new(10, 10), 2).unwrap();

        assert!(matches!(to_bytes(&photon), Err(Error::IntegrityError(_))));
    }

    #[test]
    fn failed_file_write_keeps_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("model.photon");
        std::fs::write(&target, b"previous").unwrap();

        let mut photon = PhotonFile::new(small_defaults(2, 1));
        photon.layers.reconfigure(Resolution::new(10, 10), 2).unwrap();
        assert!(write_to_file(&photon, &target).is_err());

        assert_eq!(std::fs::read(&target).unwrap(), b"previous");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn oversized_file_is_rejected_up_front() {
        let limit = i32::MAX as u64;
        assert_eq!(addressable_size(limit).unwrap(), limit);
        assert!(matches!(
            addressable_size(limit + 1),
            Err(Error::FormatOverflow { value, .. }) if value == limit + 1
        ));

        let photon = PhotonFile::new(small_defaults(2, 1));
        assert!(addressable_size(planned_size(&photon)).is_ok());
    }
}
