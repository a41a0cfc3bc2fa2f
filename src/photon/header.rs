//! Header and print parameter model.
//!
//! The fixed header at offset 0 carries the global print parameters and the addresses of every
//! other section. Files with `version > 1` extend it with a tail that adds anti-aliasing,
//! light PWM and a pointer to a [`PrintProperties`] block.
//!
//! ```text
//! offset  size  field
//! 0x00    4     magic
//! 0x04    4     version
//! 0x08    12    bed x / y / z (f32)
//! 0x14    12    reserved
//! 0x20    16    layer height, exposure, bottom exposure, off time (f32)
//! 0x30    4     bottom layers
//! 0x34    8     resolution x / y
//! 0x3C    4     high-res preview address
//! 0x40    4     layer table address
//! 0x44    4     layer count
//! 0x48    4     low-res preview address
//! 0x4C    4     print time (version > 1, reserved otherwise)
//! 0x50    4     projection type
//! 0x54    28    version > 1: properties address / length, anti-aliasing level,
//!               light PWM, bottom light PWM (i16), 12 reserved
//!               otherwise: 24 reserved
//! ```
//!
//! The model is a faithful carrier: apart from the anti-aliasing level, no field is range
//! checked. Reserved spans are not kept and
//! are written back as zeros.

use strum::{Display, FromRepr};

use crate::{
    file::parser::Parser,
    photon::config::PhotonDefaults,
    rle::Resolution,
    Error, Result,
};

/// Magic tag found at the start of files produced by the common slicers.
pub const PHOTON_MAGIC: [u8; 4] = [0x19, 0x00, 0xFD, 0x12];

/// Size of the header fields shared by every version.
pub const HEADER_COMMON_SIZE: usize = 84;

/// Size of the tail following the common fields, for every version.
pub const HEADER_TAIL_SIZE: usize = 28;

/// Size of the print properties block.
pub const PROPERTIES_SIZE: usize = 60;

/// Highest anti-aliasing level a header may declare.
pub const MAX_ANTI_ALIASING_LEVEL: u32 = 16;

/// Size of the reserved span following the bed dimensions.
pub(crate) const BED_RESERVED_SIZE: usize = 12;

/// Reserved bytes closing the tail of an extended header.
pub(crate) const EXTENDED_RESERVED_SIZE: usize = 12;

/// Projection mode of the light engine, as stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, Display)]
#[repr(i32)]
pub enum ProjectionType {
    /// Direct cast through the LCD
    Cast = 0,
    /// Mirrored LCD projection
    LcdMirror = 1,
}

/// Physical machine and resin parameters, present in files with `version > 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintProperties {
    /// Lift distance after a bottom layer (mm)
    pub bottom_lift_distance: f32,
    /// Lift speed after a bottom layer (mm/min)
    pub bottom_lift_speed: f32,
    /// Lift distance after a normal layer (mm)
    pub lifting_distance: f32,
    /// Lift speed after a normal layer (mm/min)
    pub lifting_speed: f32,
    /// Retract speed (mm/min)
    pub retract_speed: f32,
    /// Estimated resin volume (ml)
    pub volume_ml: f32,
    /// Estimated resin weight (g)
    pub weight_g: f32,
    /// Estimated resin cost
    pub cost_dollars: f32,
    /// Light off delay for bottom layers (s)
    pub bottom_light_off_delay: f32,
    /// Light off delay for normal layers (s)
    pub light_off_delay: f32,
    /// Bottom layer count override
    pub bottom_layer_count: i32,
    /// Reserved slot 1
    pub p1: f32,
    /// Reserved slot 2
    pub p2: f32,
    /// Reserved slot 3
    pub p3: f32,
    /// Reserved slot 4
    pub p4: f32,
}

impl Default for PrintProperties {
    fn default() -> Self {
        PrintProperties {
            bottom_lift_distance: 5.0,
            bottom_lift_speed: 300.0,
            lifting_distance: 5.0,
            lifting_speed: 300.0,
            retract_speed: 300.0,
            volume_ml: 0.0,
            weight_g: 0.0,
            cost_dollars: 0.0,
            bottom_light_off_delay: 0.0,
            light_off_delay: 0.0,
            bottom_layer_count: 6,
            p1: 0.0,
            p2: 0.0,
            p3: 0.0,
            p4: 0.0,
        }
    }
}

impl PrintProperties {
    /// Reads the 60 byte properties block at the parser position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the block is truncated.
    pub fn parse(parser: &mut Parser) -> Result<Self> {
        Ok(PrintProperties {
            bottom_lift_distance: parser.read_le()?,
            bottom_lift_speed: parser.read_le()?,
            lifting_distance: parser.read_le()?,
            lifting_speed: parser.read_le()?,
            retract_speed: parser.read_le()?,
            volume_ml: parser.read_le()?,
            weight_g: parser.read_le()?,
            cost_dollars: parser.read_le()?,
            bottom_light_off_delay: parser.read_le()?,
            light_off_delay: parser.read_le()?,
            bottom_layer_count: parser.read_le()?,
            p1: parser.read_le()?,
            p2: parser.read_le()?,
            p3: parser.read_le()?,
            p4: parser.read_le()?,
        })
    }

    /// Serializes the block into its 60 byte on-disk form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let floats_head = [
            self.bottom_lift_distance,
            self.bottom_lift_speed,
            self.lifting_distance,
            self.lifting_speed,
            self.retract_speed,
            self.volume_ml,
            self.weight_g,
            self.cost_dollars,
            self.bottom_light_off_delay,
            self.light_off_delay,
        ];

        let mut bytes = Vec::with_capacity(PROPERTIES_SIZE);
        for value in floats_head {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes.extend_from_slice(&self.bottom_layer_count.to_le_bytes());
        for value in [self.p1, self.p2, self.p3, self.p4] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }
}

/// Fields that only exist when `version > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedHeader {
    /// Estimated print time in seconds
    pub print_time: i32,
    /// Light PWM for normal layers
    pub light_pwm: i16,
    /// Light PWM for bottom layers
    pub light_pwm_bottom: i16,
    /// Machine and resin parameters
    pub properties: PrintProperties,
    pub(crate) anti_aliasing_level: u32,
}

impl ExtendedHeader {
    /// Anti-aliasing level (sublayers per layer), always at least 1.
    #[must_use]
    pub fn anti_aliasing_level(&self) -> u32 {
        self.anti_aliasing_level
    }
}

impl Default for ExtendedHeader {
    fn default() -> Self {
        ExtendedHeader {
            print_time: 0,
            light_pwm: 255,
            light_pwm_bottom: 255,
            properties: PrintProperties::default(),
            anti_aliasing_level: 1,
        }
    }
}

/// Section addresses and counts read from the header.
///
/// They describe where the rest of the file lives and are recomputed from scratch on every write,
/// so they are not part of [`FileHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionAddresses {
    /// Offset of the high-res preview header
    pub preview_high: i32,
    /// Offset of the layer table
    pub layer_table: i32,
    /// Number of layers
    pub layer_count: i32,
    /// Offset of the low-res preview header
    pub preview_low: i32,
    /// Offset of the properties block (`version > 1`)
    pub properties: i32,
    /// Length of the properties block (`version > 1`)
    pub properties_len: i32,
    /// Anti-aliasing level as stored (`version > 1`, 1 otherwise)
    pub anti_aliasing_level: i32,
}

/// Global per-layer defaults, taken from the header when a layer is added.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDefaults {
    /// Nominal layer height (mm)
    pub layer_height: f32,
    /// Exposure for normal layers (s)
    pub exposure: f32,
    /// Exposure for bottom layers (s)
    pub exposure_bottom: f32,
    /// Light off time between layers (s)
    pub off_time: f32,
    /// Number of bottom layers
    pub bottom_layers: i32,
}

impl LayerDefaults {
    /// Exposure a new layer at `index` gets when none is supplied.
    #[must_use]
    pub fn exposure_for(&self, index: usize) -> f32 {
        if (index as i64) < i64::from(self.bottom_layers) {
            self.exposure_bottom
        } else {
            self.exposure
        }
    }
}

/// The photon file header.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    /// Magic tag, preserved verbatim
    pub magic: [u8; 4],
    /// Bed size along x (mm)
    pub bed_x: f32,
    /// Bed size along y (mm)
    pub bed_y: f32,
    /// Bed height (mm)
    pub bed_z: f32,
    /// Nominal layer height (mm)
    pub layer_height: f32,
    /// Default exposure (s)
    pub exposure: f32,
    /// Default exposure for bottom layers (s)
    pub exposure_bottom: f32,
    /// Default light off time (s)
    pub off_time: f32,
    /// Number of bottom layers
    pub bottom_layers: i32,
    /// Raw projection type, see [`FileHeader::projection`]
    pub projection_type: i32,
    version: i32,
    resolution: Resolution,
    extended: Option<ExtendedHeader>,
}

impl FileHeader {
    /// Builds a header from a default configuration.
    #[must_use]
    pub fn from_defaults(defaults: &PhotonDefaults) -> Self {
        let extended = (defaults.version > 1).then(|| ExtendedHeader {
            print_time: defaults.print_time,
            light_pwm: defaults.light_pwm,
            light_pwm_bottom: defaults.light_pwm_bottom,
            properties: defaults.properties,
            anti_aliasing_level: defaults
                .anti_aliasing_level
                .clamp(1, MAX_ANTI_ALIASING_LEVEL),
        });

        FileHeader {
            magic: defaults.magic,
            bed_x: defaults.bed_x,
            bed_y: defaults.bed_y,
            bed_z: defaults.bed_z,
            layer_height: defaults.layer_height,
            exposure: defaults.exposure,
            exposure_bottom: defaults.exposure_bottom,
            off_time: defaults.off_time,
            bottom_layers: defaults.bottom_layers,
            projection_type: defaults.projection_type,
            version: defaults.version,
            resolution: defaults.resolution,
            extended,
        }
    }

    /// Reads the header at offset 0.
    ///
    /// Returns the header model together with the section addresses it references.
    ///
    /// # Errors
    /// - [`crate::Error::OutOfBounds`] if the buffer is shorter than the header
    /// - [`crate::Error::Malformed`] for a negative resolution or an anti-aliasing level below 1
    pub fn parse(parser: &mut Parser) -> Result<(Self, SectionAddresses)> {
        parser.seek(0)?;

        let mut magic = [0u8; 4];
        magic.copy_from_slice(parser.read_bytes(4)?);
        let version: i32 = parser.read_le()?;
        let bed_x = parser.read_le()?;
        let bed_y = parser.read_le()?;
        let bed_z = parser.read_le()?;
        parser.advance_by(BED_RESERVED_SIZE)?;

        let layer_height = parser.read_le()?;
        let exposure = parser.read_le()?;
        let exposure_bottom = parser.read_le()?;
        let off_time = parser.read_le()?;
        let bottom_layers = parser.read_le()?;
        let resolution_x: i32 = parser.read_le()?;
        let resolution_y: i32 = parser.read_le()?;

        let mut addresses = SectionAddresses {
            preview_high: parser.read_le()?,
            layer_table: parser.read_le()?,
            layer_count: parser.read_le()?,
            preview_low: parser.read_le()?,
            anti_aliasing_level: 1,
            ..SectionAddresses::default()
        };

        let print_time: i32 = parser.read_le()?;
        let projection_type = parser.read_le()?;

        let extended = if version > 1 {
            addresses.properties = parser.read_le()?;
            addresses.properties_len = parser.read_le()?;
            addresses.anti_aliasing_level = parser.read_le()?;
            let light_pwm = parser.read_le()?;
            let light_pwm_bottom = parser.read_le()?;
            parser.advance_by(EXTENDED_RESERVED_SIZE)?;

            let anti_aliasing_level = u32::try_from(addresses.anti_aliasing_level)
                .ok()
                .filter(|level| (1..=MAX_ANTI_ALIASING_LEVEL).contains(level))
                .ok_or_else(|| {
                    malformed_error!(
                        "Anti-aliasing level {} outside 1..={}",
                        addresses.anti_aliasing_level,
                        MAX_ANTI_ALIASING_LEVEL
                    )
                })?;

            Some(ExtendedHeader {
                print_time,
                light_pwm,
                light_pwm_bottom,
                properties: PrintProperties::default(),
                anti_aliasing_level,
            })
        } else {
            parser.advance_by(HEADER_TAIL_SIZE - 4)?;
            None
        };

        let (Ok(width), Ok(height)) = (u32::try_from(resolution_x), u32::try_from(resolution_y))
        else {
            return Err(malformed_error!(
                "Negative resolution {}x{}",
                resolution_x,
                resolution_y
            ));
        };

        let header = FileHeader {
            magic,
            bed_x,
            bed_y,
            bed_z,
            layer_height,
            exposure,
            exposure_bottom,
            off_time,
            bottom_layers,
            projection_type,
            version,
            resolution: Resolution::new(width, height),
            extended,
        };

        Ok((header, addresses))
    }

    /// Format version.
    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Changes the format version.
    ///
    /// Moving above 1 adds the extended fields with their defaults; moving to 1 or below drops
    /// them.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] when dropping the extended fields would lose an
    /// anti-aliasing level above 1.
    pub fn set_version(&mut self, version: i32) -> Result<()> {
        if version > 1 {
            if self.extended.is_none() {
                self.extended = Some(ExtendedHeader::default());
            }
        } else if let Some(extended) = &self.extended {
            if extended.anti_aliasing_level > 1 {
                return Err(Error::NotSupported(format!(
                    "version {version} cannot store anti-aliasing level {}",
                    extended.anti_aliasing_level
                )));
            }
            self.extended = None;
        }

        self.version = version;
        Ok(())
    }

    /// Pixel resolution of the layer masks.
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub(crate) fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    /// Anti-aliasing level; 1 for files without the extended header.
    #[must_use]
    pub fn anti_aliasing_level(&self) -> u32 {
        self.extended
            .as_ref()
            .map_or(1, ExtendedHeader::anti_aliasing_level)
    }

    pub(crate) fn set_anti_aliasing_level(&mut self, level: u32) -> Result<()> {
        if !(1..=MAX_ANTI_ALIASING_LEVEL).contains(&level) {
            return Err(Error::NotSupported(format!(
                "anti-aliasing level {level} outside 1..={MAX_ANTI_ALIASING_LEVEL}"
            )));
        }

        match &mut self.extended {
            Some(extended) => {
                extended.anti_aliasing_level = level;
                Ok(())
            }
            None if level == 1 => Ok(()),
            None => Err(Error::NotSupported(format!(
                "version {} does not support anti-aliasing",
                self.version
            ))),
        }
    }

    /// Extended fields, present iff `version > 1`.
    #[must_use]
    pub fn extended(&self) -> Option<&ExtendedHeader> {
        self.extended.as_ref()
    }

    /// Mutable access to the extended fields.
    pub fn extended_mut(&mut self) -> Option<&mut ExtendedHeader> {
        self.extended.as_mut()
    }

    /// Print properties block, present iff `version > 1`.
    #[must_use]
    pub fn properties(&self) -> Option<&PrintProperties> {
        self.extended.as_ref().map(|extended| &extended.properties)
    }

    /// Mutable access to the print properties block.
    pub fn properties_mut(&mut self) -> Option<&mut PrintProperties> {
        self.extended
            .as_mut()
            .map(|extended| &mut extended.properties)
    }

    /// Decoded projection type, `None` for values this crate does not know.
    #[must_use]
    pub fn projection(&self) -> Option<ProjectionType> {
        ProjectionType::from_repr(self.projection_type)
    }

    /// Size of the header on disk for the current version.
    #[must_use]
    pub fn size(&self) -> usize {
        HEADER_COMMON_SIZE + HEADER_TAIL_SIZE - if self.extended.is_some() { 0 } else { 4 }
    }

    /// Snapshot of the values used to fill in omitted layer parameters.
    #[must_use]
    pub fn layer_defaults(&self) -> LayerDefaults {
        LayerDefaults {
            layer_height: self.layer_height,
            exposure: self.exposure,
            exposure_bottom: self.exposure_bottom,
            off_time: self.off_time,
            bottom_layers: self.bottom_layers,
        }
    }
}
