//! Layer and sublayer store.
//!
//! A print is an ordered list of [`Layer`]s, bottom to top. Each layer holds exactly
//! `anti_aliasing_level` [`SubLayer`]s: one run-length encoded mask plus exposure parameters per
//! anti-aliasing pass. A file without anti-aliasing is the degenerate case of one sublayer per
//! layer.
//!
//! The [`LayerStore`] owns the layers and keeps the sublayer count invariant across every
//! mutation. Parameters omitted by the caller are filled from a [`LayerDefaults`] snapshot of
//! the header.
//!
//! # Examples
//!
//! ```rust
//! use photonfile::{LayerParams, LayerStore, PixelGrid, Resolution};
//! use photonfile::photon::header::LayerDefaults;
//!
//! let resolution = Resolution::new(8, 8);
//! let defaults = LayerDefaults {
//!     layer_height: 0.05,
//!     exposure: 8.0,
//!     exposure_bottom: 60.0,
//!     off_time: 1.0,
//!     bottom_layers: 1,
//! };
//!
//! let mut store = LayerStore::new(resolution, 1);
//! store.append(vec![PixelGrid::new(resolution).into()], LayerParams::new(), &defaults)?;
//! store.append(vec![PixelGrid::new(resolution).into()], LayerParams::new(), &defaults)?;
//!
//! assert_eq!(store.layer(0)?.sublayers()[0].exposure_time, 60.0);
//! assert_eq!(store.layer(1)?.sublayers()[0].exposure_time, 8.0);
//! # Ok::<(), photonfile::Error>(())
//! ```

use crate::{
    photon::header::LayerDefaults,
    rle::{self, PixelGrid, Resolution},
    Error, Result,
};

/// Size of one layer table entry.
pub const LAYER_ENTRY_SIZE: usize = 36;

/// Reserved bytes at the end of a layer table entry.
pub(crate) const LAYER_ENTRY_RESERVED_SIZE: usize = 16;

/// One anti-aliasing pass of a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SubLayer {
    /// Thickness added by this layer (mm). Stored on disk as a cumulative height.
    pub layer_thickness: f32,
    /// Exposure time (s)
    pub exposure_time: f32,
    /// Light off time (s)
    pub off_time: f32,
    data: Vec<u8>,
}

impl SubLayer {
    /// Creates a sublayer from an encoded mask.
    #[must_use]
    pub fn new(data: Vec<u8>, layer_thickness: f32, exposure_time: f32, off_time: f32) -> Self {
        SubLayer {
            layer_thickness,
            exposure_time,
            off_time,
            data,
        }
    }

    /// The run-length encoded mask.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replaces the encoded mask.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Length of the encoded mask; the value written as the payload length.
    #[must_use]
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Decodes the mask.
    ///
    /// # Errors
    /// Returns [`crate::Error::PixelCountMismatch`] if the mask does not fill `resolution`.
    pub fn decode(&self, resolution: Resolution) -> Result<PixelGrid> {
        rle::decode(&self.data, resolution)
    }
}

/// A print layer: one [`SubLayer`] per anti-aliasing level.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    sublayers: Vec<SubLayer>,
}

impl Layer {
    pub(crate) fn from_sublayers(sublayers: Vec<SubLayer>) -> Self {
        Layer { sublayers }
    }

    /// Sublayers in level order.
    #[must_use]
    pub fn sublayers(&self) -> &[SubLayer] {
        &self.sublayers
    }

    /// Mutable sublayers. The slice cannot change length.
    pub fn sublayers_mut(&mut self) -> &mut [SubLayer] {
        &mut self.sublayers
    }

    /// Sublayer for anti-aliasing `level`.
    #[must_use]
    pub fn sublayer(&self, level: usize) -> Option<&SubLayer> {
        self.sublayers.get(level)
    }
}

/// Image input for a new sublayer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerImage {
    /// A decoded mask; it is checked against the store resolution and encoded.
    Pixels(PixelGrid),
    /// An already encoded mask, stored as is.
    Rle(Vec<u8>),
}

impl LayerImage {
    /// Produces the encoded mask for a store of `resolution`.
    ///
    /// # Errors
    /// Returns [`crate::Error::DimensionMismatch`] for a pixel grid of another resolution.
    pub fn into_rle(self, resolution: Resolution) -> Result<Vec<u8>> {
        match self {
            LayerImage::Pixels(grid) => {
                resolution.ensure(grid.resolution())?;
                Ok(rle::encode(&grid))
            }
            LayerImage::Rle(data) => Ok(data),
        }
    }
}

impl From<PixelGrid> for LayerImage {
    fn from(grid: PixelGrid) -> Self {
        LayerImage::Pixels(grid)
    }
}

impl From<Vec<u8>> for LayerImage {
    fn from(data: Vec<u8>) -> Self {
        LayerImage::Rle(data)
    }
}

/// Optional per-layer parameters.
///
/// Used both for adding layers, where missing values fall back to the header defaults, and for
/// [`LayerStore::overwrite_parameters`], where missing values are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayerParams {
    /// Layer thickness (mm)
    pub thickness: Option<f32>,
    /// Exposure time (s)
    pub exposure_time: Option<f32>,
    /// Light off time (s)
    pub off_time: Option<f32>,
}

impl LayerParams {
    /// No parameters set.
    #[must_use]
    pub fn new() -> Self {
        LayerParams::default()
    }

    /// Sets the thickness.
    #[must_use]
    pub fn with_thickness(mut self, thickness: f32) -> Self {
        self.thickness = Some(thickness);
        self
    }

    /// Sets the exposure time.
    #[must_use]
    pub fn with_exposure_time(mut self, exposure_time: f32) -> Self {
        self.exposure_time = Some(exposure_time);
        self
    }

    /// Sets the off time.
    #[must_use]
    pub fn with_off_time(mut self, off_time: f32) -> Self {
        self.off_time = Some(off_time);
        self
    }
}

/// Ordered, mutable collection of layers.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStore {
    resolution: Resolution,
    anti_aliasing_level: usize,
    layers: Vec<Layer>,
}

impl LayerStore {
    /// Creates an empty store. A level of 0 is treated as 1.
    #[must_use]
    pub fn new(resolution: Resolution, anti_aliasing_level: usize) -> Self {
        LayerStore {
            resolution,
            anti_aliasing_level: anti_aliasing_level.max(1),
            layers: Vec::new(),
        }
    }

    /// Wraps parsed layers. Every layer must already hold `anti_aliasing_level` sublayers.
    pub(crate) fn from_layers(
        resolution: Resolution,
        anti_aliasing_level: usize,
        layers: Vec<Layer>,
    ) -> Result<Self> {
        if let Some(layer) = layers
            .iter()
            .find(|layer| layer.sublayers.len() != anti_aliasing_level)
        {
            return Err(Error::CountMismatch {
                expected: anti_aliasing_level,
                actual: layer.sublayers.len(),
            });
        }

        Ok(LayerStore {
            resolution,
            anti_aliasing_level,
            layers,
        })
    }

    /// Changes resolution and level of an empty store.
    pub(crate) fn reconfigure(
        &mut self,
        resolution: Resolution,
        anti_aliasing_level: usize,
    ) -> Result<()> {
        if !self.layers.is_empty() {
            return Err(Error::NotSupported(format!(
                "cannot reconfigure a store holding {} layers",
                self.layers.len()
            )));
        }

        self.resolution = resolution;
        self.anti_aliasing_level = anti_aliasing_level.max(1);
        Ok(())
    }

    /// Mask resolution.
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Sublayers per layer.
    #[must_use]
    pub fn anti_aliasing_level(&self) -> usize {
        self.anti_aliasing_level
    }

    /// Number of layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if the store holds no layers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// All layers in print order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Iterates layers in print order.
    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    /// Layer at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::IndexError`] if `index` is out of range.
    pub fn layer(&self, index: usize) -> Result<&Layer> {
        self.layers.get(index).ok_or(Error::IndexError {
            index,
            len: self.layers.len(),
        })
    }

    /// Mutable layer at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::IndexError`] if `index` is out of range.
    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        let len = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(Error::IndexError { index, len })
    }

    /// Appends a layer built from one image per anti-aliasing level.
    ///
    /// # Errors
    /// - [`crate::Error::CountMismatch`] if `images.len()` differs from the anti-aliasing level
    /// - [`crate::Error::DimensionMismatch`] if a pixel grid has the wrong resolution
    pub fn append(
        &mut self,
        images: Vec<LayerImage>,
        params: LayerParams,
        defaults: &LayerDefaults,
    ) -> Result<()> {
        let layer = self.build_layer(images, self.layers.len(), params, defaults)?;
        self.layers.push(layer);
        Ok(())
    }

    /// Inserts a layer before `index`; `index == len()` appends.
    ///
    /// # Errors
    /// - [`crate::Error::IndexError`] if `index > len()`
    /// - the errors of [`LayerStore::append`]
    pub fn insert(
        &mut self,
        index: usize,
        images: Vec<LayerImage>,
        params: LayerParams,
        defaults: &LayerDefaults,
    ) -> Result<()> {
        if index > self.layers.len() {
            return Err(Error::IndexError {
                index,
                len: self.layers.len(),
            });
        }

        let layer = self.build_layer(images, index, params, defaults)?;
        self.layers.insert(index, layer);
        Ok(())
    }

    /// Replaces the layer at `index`.
    ///
    /// # Errors
    /// - [`crate::Error::IndexError`] if `index >= len()`
    /// - the errors of [`LayerStore::append`]
    pub fn replace(
        &mut self,
        index: usize,
        images: Vec<LayerImage>,
        params: LayerParams,
        defaults: &LayerDefaults,
    ) -> Result<Layer> {
        if index >= self.layers.len() {
            return Err(Error::IndexError {
                index,
                len: self.layers.len(),
            });
        }

        let layer = self.build_layer(images, index, params, defaults)?;
        Ok(std::mem::replace(&mut self.layers[index], layer))
    }

    /// Removes and returns the layer at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::IndexError`] if `index >= len()`.
    pub fn delete(&mut self, index: usize) -> Result<Layer> {
        if index >= self.layers.len() {
            return Err(Error::IndexError {
                index,
                len: self.layers.len(),
            });
        }

        Ok(self.layers.remove(index))
    }

    /// Removes all layers.
    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Sets the supplied parameters on every sublayer of every layer.
    pub fn overwrite_parameters(&mut self, params: LayerParams) {
        for sublayer in self
            .layers
            .iter_mut()
            .flat_map(|layer| layer.sublayers.iter_mut())
        {
            if let Some(thickness) = params.thickness {
                sublayer.layer_thickness = thickness;
            }
            if let Some(exposure_time) = params.exposure_time {
                sublayer.exposure_time = exposure_time;
            }
            if let Some(off_time) = params.off_time {
                sublayer.off_time = off_time;
            }
        }
    }

    /// Decodes every sublayer mask of the layer at `index`, in level order.
    ///
    /// # Errors
    /// - [`crate::Error::IndexError`] if `index` is out of range
    /// - [`crate::Error::PixelCountMismatch`] if a mask does not fill the resolution
    pub fn export(&self, index: usize) -> Result<Vec<PixelGrid>> {
        self.layer(index)?
            .sublayers
            .iter()
            .map(|sublayer| sublayer.decode(self.resolution))
            .collect()
    }

    /// Decodes the mask of one sublayer.
    ///
    /// # Errors
    /// - [`crate::Error::IndexError`] if `index` or `level` is out of range
    /// - [`crate::Error::PixelCountMismatch`] if the mask does not fill the resolution
    pub fn export_sublayer(&self, index: usize, level: usize) -> Result<PixelGrid> {
        let layer = self.layer(index)?;
        let sublayer = layer.sublayer(level).ok_or(Error::IndexError {
            index: level,
            len: layer.sublayers.len(),
        })?;

        sublayer.decode(self.resolution)
    }

    fn build_layer(
        &self,
        images: Vec<LayerImage>,
        index: usize,
        params: LayerParams,
        defaults: &LayerDefaults,
    ) -> Result<Layer> {
        if images.len() != self.anti_aliasing_level {
            return Err(Error::CountMismatch {
                expected: self.anti_aliasing_level,
                actual: images.len(),
            });
        }

        let thickness = params.thickness.unwrap_or(defaults.layer_height);
        let exposure_time = params
            .exposure_time
            .unwrap_or_else(|| defaults.exposure_for(index));
        let off_time = params.off_time.unwrap_or(defaults.off_time);

        let sublayers = images
            .into_iter()
            .map(|image| {
                let data = image.into_rle(self.resolution)?;
                Ok(SubLayer::new(data, thickness, exposure_time, off_time))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Layer { sublayers })
    }
}

impl<'a> IntoIterator for &'a LayerStore {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESOLUTION: Resolution = Resolution::new(16, 4);

    fn defaults() -> LayerDefaults {
        LayerDefaults {
            layer_height: 0.05,
            exposure: 8.0,
            exposure_bottom: 60.0,
            off_time: 1.0,
            bottom_layers: 2,
        }
    }

    fn grid(lit: usize) -> PixelGrid {
        let mut grid = PixelGrid::new(RESOLUTION);
        for x in 0..lit as u32 {
            grid.set(x, 0, true);
        }
        grid
    }

    fn images(level: usize, lit: usize) -> Vec<LayerImage> {
        (0..level).map(|offset| grid(lit + offset).into()).collect()
    }

    #[test]
    fn append_fills_defaults() {
        let mut store = LayerStore::new(RESOLUTION, 2);
        for lit in 0..4 {
            store.append(images(2, lit), LayerParams::new(), &defaults()).unwrap();
        }

        assert_eq!(store.len(), 4);
        let exposures: Vec<f32> = store
            .iter()
            .map(|layer| layer.sublayers()[1].exposure_time)
            .collect();
        assert_eq!(exposures, vec![60.0, 60.0, 8.0, 8.0]);

        let sublayer = &store.layer(3).unwrap().sublayers()[0];
        assert_eq!(sublayer.layer_thickness, 0.05);
        assert_eq!(sublayer.off_time, 1.0);
        assert_eq!(sublayer.decode(RESOLUTION).unwrap(), grid(3));
    }

    #[test]
    fn explicit_params_win() {
        let mut store = LayerStore::new(RESOLUTION, 1);
        let params = LayerParams::new()
            .with_thickness(0.1)
            .with_exposure_time(3.0)
            .with_off_time(0.5);
        store.append(images(1, 1), params, &defaults()).unwrap();

        let sublayer = &store.layer(0).unwrap().sublayers()[0];
        assert_eq!(sublayer.layer_thickness, 0.1);
        assert_eq!(sublayer.exposure_time, 3.0);
        assert_eq!(sublayer.off_time, 0.5);
    }

    #[test]
    fn count_and_dimension_checks() {
        let mut store = LayerStore::new(RESOLUTION, 2);

        let result = store.append(images(1, 0), LayerParams::new(), &defaults());
        assert!(matches!(
            result,
            Err(Error::CountMismatch {
                expected: 2,
                actual: 1
            })
        ));

        let wrong = vec![
            LayerImage::from(PixelGrid::new(Resolution::new(4, 16))),
            LayerImage::from(grid(1)),
        ];
        let result = store.append(wrong, LayerParams::new(), &defaults());
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn raw_rle_is_stored_verbatim() {
        let mut store = LayerStore::new(RESOLUTION, 1);
        store
            .append(vec![vec![0x80 | 64].into()], LayerParams::new(), &defaults())
            .unwrap();

        let sublayer = &store.layer(0).unwrap().sublayers()[0];
        assert_eq!(sublayer.data(), &[0x80 | 64]);
        assert_eq!(sublayer.data_len(), 1);
        assert_eq!(sublayer.decode(RESOLUTION).unwrap().lit_count(), 64);
    }

    #[test]
    fn positional_operations() {
        let mut store = LayerStore::new(RESOLUTION, 1);
        store.append(images(1, 1), LayerParams::new(), &defaults()).unwrap();
        store.append(images(1, 3), LayerParams::new(), &defaults()).unwrap();

        store.insert(1, images(1, 2), LayerParams::new(), &defaults()).unwrap();
        store.insert(3, images(1, 4), LayerParams::new(), &defaults()).unwrap();
        assert!(matches!(
            store.insert(5, images(1, 0), LayerParams::new(), &defaults()),
            Err(Error::IndexError { index: 5, len: 4 })
        ));

        let lit: Vec<usize> = (0..store.len())
            .map(|index| store.export(index).unwrap()[0].lit_count())
            .collect();
        assert_eq!(lit, vec![1, 2, 3, 4]);

        // Index 1 is a bottom layer with bottom_layers = 2.
        let old = store
            .replace(1, images(1, 9), LayerParams::new(), &defaults())
            .unwrap();
        assert_eq!(old.sublayers()[0].decode(RESOLUTION).unwrap().lit_count(), 2);
        assert_eq!(store.layer(1).unwrap().sublayers()[0].exposure_time, 60.0);
        assert!(matches!(
            store.replace(4, images(1, 0), LayerParams::new(), &defaults()),
            Err(Error::IndexError { index: 4, len: 4 })
        ));

        let removed = store.delete(0).unwrap();
        assert_eq!(removed.sublayers()[0].decode(RESOLUTION).unwrap().lit_count(), 1);
        assert_eq!(store.len(), 3);
        assert!(store.delete(3).is_err());

        store.clear();
        assert!(store.is_empty());
        assert!(store.layer(0).is_err());
    }

    #[test]
    fn overwrite_only_supplied_fields() {
        let mut store = LayerStore::new(RESOLUTION, 3);
        for lit in 0..3 {
            store.append(images(3, lit), LayerParams::new(), &defaults()).unwrap();
        }

        store.overwrite_parameters(LayerParams::new().with_exposure_time(8.5));

        for sublayer in store.iter().flat_map(Layer::sublayers) {
            assert_eq!(sublayer.exposure_time, 8.5);
            assert_eq!(sublayer.layer_thickness, 0.05);
            assert_eq!(sublayer.off_time, 1.0);
        }
    }

    #[test]
    fn export_sublayer_bounds() {
        let mut store = LayerStore::new(RESOLUTION, 2);
        store.append(images(2, 5), LayerParams::new(), &defaults()).unwrap();

        assert_eq!(store.export_sublayer(0, 1).unwrap().lit_count(), 6);
        assert!(matches!(
            store.export_sublayer(0, 2),
            Err(Error::IndexError { index: 2, len: 2 })
        ));
        assert!(matches!(
            store.export_sublayer(1, 0),
            Err(Error::IndexError { index: 1, len: 1 })
        ));
    }

    #[test]
    fn reconfigure_requires_empty() {
        let mut store = LayerStore::new(RESOLUTION, 1);
        store.reconfigure(Resolution::PHOTON, 4).unwrap();
        assert_eq!(store.anti_aliasing_level(), 4);
        assert_eq!(store.resolution(), Resolution::PHOTON);

        store.reconfigure(RESOLUTION, 1).unwrap();
        store.append(images(1, 0), LayerParams::new(), &defaults()).unwrap();
        assert!(matches!(
            store.reconfigure(RESOLUTION, 2),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn from_layers_checks_counts() {
        let layer = Layer::from_sublayers(vec![SubLayer::new(vec![], 0.05, 8.0, 1.0)]);
        assert!(LayerStore::from_layers(RESOLUTION, 1, vec![layer.clone()]).is_ok());
        assert!(matches!(
            LayerStore::from_layers(RESOLUTION, 2, vec![layer]),
            Err(Error::CountMismatch { .. })
        ));
    }
}
