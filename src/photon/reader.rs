//! Parsing a photon file into the model.
//!
//! The reader follows the addresses stored in the header: both previews, the properties block
//! (version 2), then the layer table and each referenced payload. Every address and length is
//! checked against the input before it is used.
//!
//! The layer table is level-major: all layers of level 0, then all layers of level 1, and so
//! on. Within each level the table stores cumulative heights, which are turned back into
//! per-layer thicknesses here.

use log::{debug, warn};

use crate::{
    file::parser::Parser,
    photon::{
        header::{FileHeader, PrintProperties, SectionAddresses, PROPERTIES_SIZE},
        layer::{Layer, LayerStore, SubLayer, LAYER_ENTRY_RESERVED_SIZE, LAYER_ENTRY_SIZE},
        preview::PreviewImage,
    },
    Error, Result,
};

/// Everything a photon file contains.
pub(crate) struct ParsedFile {
    pub header: FileHeader,
    pub preview_high: PreviewImage,
    pub preview_low: PreviewImage,
    pub layers: LayerStore,
}

/// Converts a stored `i32` address or count into a `usize`.
fn to_usize(value: i32, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| malformed_error!("Negative {} - {}", what, value))
}

/// Parses a complete photon file.
pub(crate) fn parse(data: &[u8]) -> Result<ParsedFile> {
    let mut parser = Parser::new(data);

    let (mut header, addresses) = FileHeader::parse(&mut parser)?;

    let preview_high = PreviewImage::parse(
        &mut parser,
        to_usize(addresses.preview_high, "high-res preview address")?,
    )?;
    let preview_low = PreviewImage::parse(
        &mut parser,
        to_usize(addresses.preview_low, "low-res preview address")?,
    )?;

    if let Some(properties) = header.properties_mut() {
        *properties = parse_properties(&mut parser, &addresses)?;
    }

    let layers = parse_layers(&mut parser, &header, &addresses)?;

    debug!(
        "Parsed photon file: version {}, {} layers, anti-aliasing level {}, resolution {}",
        header.version(),
        layers.len(),
        layers.anti_aliasing_level(),
        layers.resolution()
    );

    Ok(ParsedFile {
        header,
        preview_high,
        preview_low,
        layers,
    })
}

fn parse_properties(parser: &mut Parser, addresses: &SectionAddresses) -> Result<PrintProperties> {
    if addresses.properties_len != PROPERTIES_SIZE as i32 {
        warn!(
            "Properties block declares {} bytes, reading {}",
            addresses.properties_len, PROPERTIES_SIZE
        );
    }

    parser.seek(to_usize(addresses.properties, "properties address")?)?;
    PrintProperties::parse(parser)
}

/// One layer table entry as stored.
struct LayerEntry {
    cumulative_height: f32,
    exposure_time: f32,
    off_time: f32,
    address: usize,
    length: usize,
}

impl LayerEntry {
    fn parse(parser: &mut Parser) -> Result<Self> {
        let cumulative_height = parser.read_le()?;
        let exposure_time = parser.read_le()?;
        let off_time = parser.read_le()?;
        let address = to_usize(parser.read_le()?, "layer payload address")?;
        let length = to_usize(parser.read_le()?, "layer payload length")?;
        parser.advance_by(LAYER_ENTRY_RESERVED_SIZE)?;

        Ok(LayerEntry {
            cumulative_height,
            exposure_time,
            off_time,
            address,
            length,
        })
    }
}

fn parse_layers(
    parser: &mut Parser,
    header: &FileHeader,
    addresses: &SectionAddresses,
) -> Result<LayerStore> {
    let layer_count = to_usize(addresses.layer_count, "layer count")?;
    let level_count = header.anti_aliasing_level() as usize;

    let entry_count = layer_count
        .checked_mul(level_count)
        .ok_or_else(|| malformed_error!("Layer table of {} x {} entries", layer_count, level_count))?;
    let table_size = entry_count
        .checked_mul(LAYER_ENTRY_SIZE)
        .ok_or(Error::OutOfBounds)?;

    parser.seek(to_usize(addresses.layer_table, "layer table address")?)?;
    if table_size > parser.remaining() {
        return Err(Error::OutOfBounds);
    }

    if layer_count == 0 {
        return Ok(LayerStore::new(header.resolution(), level_count));
    }

    let mut sublayers: Vec<Vec<SubLayer>> = (0..layer_count)
        .map(|_| Vec::with_capacity(level_count))
        .collect();

    for _level in 0..level_count {
        let mut previous_height: Option<f32> = None;

        for layer_sublayers in &mut sublayers {
            let entry = LayerEntry::parse(parser)?;

            let thickness = match previous_height {
                Some(previous) => entry.cumulative_height - previous,
                None => header.layer_height,
            };
            previous_height = Some(entry.cumulative_height);

            let data = parser.slice_at(entry.address, entry.length)?.to_vec();
            layer_sublayers.push(SubLayer::new(
                data,
                thickness,
                entry.exposure_time,
                entry.off_time,
            ));
        }
    }

    let layers = sublayers.into_iter().map(Layer::from_sublayers).collect();
    LayerStore::from_layers(header.resolution(), level_count, layers)
}
