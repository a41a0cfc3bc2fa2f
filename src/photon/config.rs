//! Template configuration for new files.
//!
//! A fresh [`crate::PhotonFile`] is built from a [`PhotonDefaults`] value instead of a packaged
//! template file. The default matches the original Anycubic Photon with a version 2 header.

use crate::{
    photon::{header::PrintProperties, header::PHOTON_MAGIC, preview::PreviewImage},
    rle::Resolution,
};

/// Header values and previews used by [`crate::PhotonFile::new`].
///
/// # Examples
///
/// ```rust
/// use photonfile::{PhotonDefaults, PhotonFile, Resolution};
///
/// let photon = PhotonFile::new(PhotonDefaults {
///     resolution: Resolution::new(2560, 1620),
///     anti_aliasing_level: 4,
///     ..PhotonDefaults::default()
/// });
/// assert_eq!(photon.anti_aliasing_level(), 4);
/// assert_eq!(photon.layer_count(), 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PhotonDefaults {
    /// Magic tag written at offset 0.
    pub magic: [u8; 4],

    /// Format version. Versions above 1 carry anti-aliasing, light PWM and print properties.
    ///
    /// Default: 2
    pub version: i32,

    /// Bed size along x (mm).
    pub bed_x: f32,

    /// Bed size along y (mm).
    pub bed_y: f32,

    /// Bed height (mm).
    pub bed_z: f32,

    /// Nominal layer height (mm).
    ///
    /// Default: 0.05
    pub layer_height: f32,

    /// Exposure of normal layers (s).
    ///
    /// Default: 8.0
    pub exposure: f32,

    /// Exposure of bottom layers (s).
    ///
    /// Default: 60.0
    pub exposure_bottom: f32,

    /// Light off time between layers (s).
    ///
    /// Default: 1.0
    pub off_time: f32,

    /// Number of bottom layers.
    ///
    /// Default: 6
    pub bottom_layers: i32,

    /// Pixel resolution of the layer masks.
    ///
    /// Default: 1440x2560
    pub resolution: Resolution,

    /// Raw projection type.
    pub projection_type: i32,

    /// Print time estimate (s), version 2 only.
    pub print_time: i32,

    /// Sublayers per layer. Values above 1 require `version > 1`; a version 1 template ignores
    /// this field.
    ///
    /// Default: 1
    pub anti_aliasing_level: u32,

    /// Light PWM of normal layers, version 2 only.
    pub light_pwm: i16,

    /// Light PWM of bottom layers, version 2 only.
    pub light_pwm_bottom: i16,

    /// Machine and resin parameters, version 2 only.
    pub properties: PrintProperties,

    /// High-resolution preview.
    pub preview_high: PreviewImage,

    /// Low-resolution preview.
    pub preview_low: PreviewImage,
}

impl Default for PhotonDefaults {
    fn default() -> Self {
        PhotonDefaults {
            magic: PHOTON_MAGIC,
            version: 2,
            bed_x: 68.04,
            bed_y: 120.96,
            bed_z: 150.0,
            layer_height: 0.05,
            exposure: 8.0,
            exposure_bottom: 60.0,
            off_time: 1.0,
            bottom_layers: 6,
            resolution: Resolution::PHOTON,
            projection_type: 0,
            print_time: 0,
            anti_aliasing_level: 1,
            light_pwm: 255,
            light_pwm_bottom: 255,
            properties: PrintProperties::default(),
            preview_high: PreviewImage::default(),
            preview_low: PreviewImage::default(),
        }
    }
}
