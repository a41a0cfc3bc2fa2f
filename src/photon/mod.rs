//! The photon file model and its facade.
//!
//! [`PhotonFile`] ties together the header model, the two previews and the layer store, and is
//! the entry point for reading, editing and writing files.
//!
//! # Key Components
//!
//! - [`crate::photon::header`] - Header fields, print properties, projection type
//! - [`crate::photon::preview`] - Preview thumbnails
//! - [`crate::photon::layer`] - Layers, sublayers and the [`crate::photon::layer::LayerStore`]
//! - [`crate::photon::config`] - [`crate::photon::config::PhotonDefaults`] for new files
//! - [`crate::photon::writer`] - Layout planner producing the on-disk form
//!
//! # Examples
//!
//! ```rust,no_run
//! use photonfile::{LayerParams, PhotonFile};
//!
//! let mut photon = PhotonFile::from_file("model.photon")?;
//! photon.overwrite_layer_parameters(LayerParams::new().with_exposure_time(8.5));
//! photon.delete_layer(0)?;
//! photon.write_to_file("edited.photon")?;
//! # Ok::<(), photonfile::Error>(())
//! ```

pub mod config;
pub mod header;
pub mod layer;
pub mod preview;
pub mod writer;

mod reader;

use std::path::Path;

use log::debug;

use crate::{
    file::{Backend, Memory, Physical},
    raster::{self, ImageAdapter},
    rle::{PixelGrid, Resolution},
    Error, Result,
};

use config::PhotonDefaults;
use header::FileHeader;
use layer::{Layer, LayerImage, LayerParams, LayerStore};
use preview::{PreviewImage, PreviewKind};

/// A photon file held in memory.
///
/// The whole file is parsed eagerly; afterwards the model is independent of its source.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotonFile {
    header: FileHeader,
    preview_high: PreviewImage,
    preview_low: PreviewImage,
    layers: LayerStore,
}

impl PhotonFile {
    /// Creates an empty file from a template configuration.
    #[must_use]
    pub fn new(defaults: PhotonDefaults) -> Self {
        let header = FileHeader::from_defaults(&defaults);
        let layers = LayerStore::new(
            header.resolution(),
            header.anti_aliasing_level() as usize,
        );

        PhotonFile {
            header,
            preview_high: defaults.preview_high,
            preview_low: defaults.preview_low,
            layers,
        }
    }

    /// Reads a file from disk through a memory mapping.
    ///
    /// # Errors
    /// - [`crate::Error::FileError`] if the file cannot be opened
    /// - [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`] for damaged files
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let input = Physical::new(path)?;
        Self::load(&input)
    }

    /// Parses a file from a byte buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] or [`crate::Error::Malformed`] for damaged input.
    pub fn from_mem(data: Vec<u8>) -> Result<Self> {
        let input = Memory::new(data);
        Self::load(&input)
    }

    fn load<B: Backend>(input: &B) -> Result<Self> {
        let parsed = reader::parse(input.data())?;
        Ok(PhotonFile {
            header: parsed.header,
            preview_high: parsed.preview_high,
            preview_low: parsed.preview_low,
            layers: parsed.layers,
        })
    }

    /// Serializes the file.
    ///
    /// # Errors
    /// - [`crate::Error::FormatOverflow`] if an offset or length exceeds 32 bits
    /// - [`crate::Error::IntegrityError`] if the layout bookkeeping fails its checks
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        writer::to_bytes(self)
    }

    /// Writes the file to `path`.
    ///
    /// The data goes to a temporary file next to `path`, which replaces `path` only after the
    /// write succeeded.
    ///
    /// # Errors
    /// The errors of [`PhotonFile::to_bytes`], and [`crate::Error::FileError`] for filesystem
    /// failures.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        writer::write_to_file(self, path.as_ref())
    }

    /// The header.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Mutable header access.
    ///
    /// Resolution and anti-aliasing level shape the layer store and are changed through
    /// [`PhotonFile::set_resolution`] and [`PhotonFile::set_anti_aliasing_level`].
    pub fn header_mut(&mut self) -> &mut FileHeader {
        &mut self.header
    }

    /// Format version.
    #[must_use]
    pub fn version(&self) -> i32 {
        self.header.version()
    }

    /// Mask resolution.
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.header.resolution()
    }

    /// Sublayers per layer.
    #[must_use]
    pub fn anti_aliasing_level(&self) -> usize {
        self.layers.anti_aliasing_level()
    }

    /// Changes the mask resolution.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] while the file holds layers.
    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        self.layers
            .reconfigure(resolution, self.layers.anti_aliasing_level())?;
        self.header.set_resolution(resolution);
        Ok(())
    }

    /// Changes the anti-aliasing level.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] while the file holds layers, for a level below 1,
    /// or for a level above 1 on a version 1 file.
    pub fn set_anti_aliasing_level(&mut self, level: u32) -> Result<()> {
        if !self.layers.is_empty() {
            return Err(Error::NotSupported(format!(
                "cannot change the anti-aliasing level of a file holding {} layers",
                self.layers.len()
            )));
        }

        self.header.set_anti_aliasing_level(level)?;
        self.layers
            .reconfigure(self.header.resolution(), level as usize)
    }

    /// The preview of the given kind.
    #[must_use]
    pub fn preview(&self, kind: PreviewKind) -> &PreviewImage {
        match kind {
            PreviewKind::High => &self.preview_high,
            PreviewKind::Low => &self.preview_low,
        }
    }

    /// Mutable preview access.
    pub fn preview_mut(&mut self, kind: PreviewKind) -> &mut PreviewImage {
        match kind {
            PreviewKind::High => &mut self.preview_high,
            PreviewKind::Low => &mut self.preview_low,
        }
    }

    /// Replaces a preview, returning the previous one.
    pub fn set_preview(&mut self, kind: PreviewKind, preview: PreviewImage) -> PreviewImage {
        std::mem::replace(self.preview_mut(kind), preview)
    }

    /// The layer store.
    #[must_use]
    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Number of layers; the value written as the layer count.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Layer at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::IndexError`] if `index` is out of range.
    pub fn layer(&self, index: usize) -> Result<&Layer> {
        self.layers.layer(index)
    }

    /// Mutable layer at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::IndexError`] if `index` is out of range.
    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        self.layers.layer_mut(index)
    }

    /// Appends a layer; omitted parameters come from the header.
    ///
    /// # Errors
    /// See [`LayerStore::append`].
    pub fn append_layer(&mut self, images: Vec<LayerImage>, params: LayerParams) -> Result<()> {
        let defaults = self.header.layer_defaults();
        self.layers.append(images, params, &defaults)
    }

    /// Inserts a layer before `index`.
    ///
    /// # Errors
    /// See [`LayerStore::insert`].
    pub fn insert_layer(
        &mut self,
        index: usize,
        images: Vec<LayerImage>,
        params: LayerParams,
    ) -> Result<()> {
        let defaults = self.header.layer_defaults();
        self.layers.insert(index, images, params, &defaults)
    }

    /// Replaces the layer at `index`, returning the previous layer.
    ///
    /// # Errors
    /// See [`LayerStore::replace`].
    pub fn replace_layer(
        &mut self,
        index: usize,
        images: Vec<LayerImage>,
        params: LayerParams,
    ) -> Result<Layer> {
        let defaults = self.header.layer_defaults();
        self.layers.replace(index, images, params, &defaults)
    }

    /// Removes the layer at `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::IndexError`] if `index` is out of range.
    pub fn delete_layer(&mut self, index: usize) -> Result<Layer> {
        self.layers.delete(index)
    }

    /// Removes all layers.
    pub fn clear_layers(&mut self) {
        self.layers.clear();
    }

    /// Overwrites the supplied parameters on every sublayer.
    pub fn overwrite_layer_parameters(&mut self, params: LayerParams) {
        self.layers.overwrite_parameters(params);
    }

    /// Decodes all sublayer masks of the layer at `index`.
    ///
    /// # Errors
    /// See [`LayerStore::export`].
    pub fn export_layer(&self, index: usize) -> Result<Vec<PixelGrid>> {
        self.layers.export(index)
    }

    /// Saves every sublayer as an image into `directory`.
    ///
    /// Returns the number of images written.
    ///
    /// # Errors
    /// See [`crate::raster::export_all`].
    pub fn export_images<A>(&self, directory: impl AsRef<Path>, adapter: &A) -> Result<usize>
    where
        A: ImageAdapter + ?Sized,
    {
        raster::export_all(&self.layers, directory.as_ref(), adapter)
    }

    /// Saves one sublayer as an image.
    ///
    /// # Errors
    /// - [`crate::Error::IndexError`] if `index` or `level` is out of range
    /// - errors of the adapter
    pub fn export_image<A>(
        &self,
        index: usize,
        level: usize,
        path: impl AsRef<Path>,
        adapter: &A,
    ) -> Result<()>
    where
        A: ImageAdapter + ?Sized,
    {
        let grid = self.layers.export_sublayer(index, level)?;
        adapter.save(&grid, path.as_ref())
    }

    /// Appends one layer built from image files, one per anti-aliasing level.
    ///
    /// # Errors
    /// - [`crate::Error::CountMismatch`] if the path count differs from the anti-aliasing level
    /// - [`crate::Error::DimensionMismatch`] if an image has the wrong size
    pub fn append_layer_from_paths<A, P>(
        &mut self,
        paths: &[P],
        adapter: &A,
        params: LayerParams,
    ) -> Result<()>
    where
        A: ImageAdapter + ?Sized,
        P: AsRef<Path> + Sync,
    {
        if paths.len() != self.anti_aliasing_level() {
            return Err(Error::CountMismatch {
                expected: self.anti_aliasing_level(),
                actual: paths.len(),
            });
        }

        let images = raster::load_encoded(paths, adapter, self.resolution())?;
        self.append_layer(images.into_iter().map(LayerImage::Rle).collect(), params)
    }

    /// Appends layers from every image in `directory`.
    ///
    /// Files with the adapter's extension are taken in name order and grouped by the
    /// anti-aliasing level, layer-major, matching the names produced by
    /// [`PhotonFile::export_images`]. Returns the number of layers appended.
    ///
    /// # Errors
    /// - [`crate::Error::CountMismatch`] if the image count is not a multiple of the
    ///   anti-aliasing level; no layer is appended in that case
    /// - [`crate::Error::DimensionMismatch`] if an image has the wrong size
    pub fn append_layers_from_dir<A>(
        &mut self,
        directory: impl AsRef<Path>,
        adapter: &A,
        params: LayerParams,
    ) -> Result<usize>
    where
        A: ImageAdapter + ?Sized,
    {
        let level = self.anti_aliasing_level();
        let paths = raster::list_images(directory.as_ref(), adapter)?;

        let remainder = paths.len() % level;
        if remainder != 0 {
            return Err(Error::CountMismatch {
                expected: level,
                actual: remainder,
            });
        }

        let encoded = raster::load_encoded(&paths, adapter, self.resolution())?;

        let mut images = encoded.into_iter().map(LayerImage::Rle);
        let layer_count = paths.len() / level;
        for _ in 0..layer_count {
            self.append_layer(images.by_ref().take(level).collect(), params)?;
        }

        debug!(
            "Appended {} layers from {}",
            layer_count,
            directory.as_ref().display()
        );
        Ok(layer_count)
    }
}

impl Default for PhotonFile {
    fn default() -> Self {
        PhotonFile::new(PhotonDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{rle_mask, FileBuilder};

    fn small() -> PhotonDefaults {
        PhotonDefaults {
            resolution: Resolution::new(10, 10),
            ..PhotonDefaults::default()
        }
    }

    #[test]
    fn new_from_defaults() {
        let photon = PhotonFile::default();
        assert_eq!(photon.version(), 2);
        assert_eq!(photon.resolution(), Resolution::PHOTON);
        assert_eq!(photon.anti_aliasing_level(), 1);
        assert_eq!(photon.layer_count(), 0);
        assert!(photon.header().properties().is_some());
    }

    #[test]
    fn read_write_round_trip() {
        let data = FileBuilder::new(2, 2)
            .resolution(10, 10)
            .uniform_layers(5, |layer, level| rle_mask(10, 10, layer + level))
            .build();

        let photon = PhotonFile::from_mem(data.clone()).unwrap();
        assert_eq!(photon.layer_count(), 5);
        assert_eq!(photon.to_bytes().unwrap(), data);
    }

    #[test]
    fn configuration_changes() {
        let mut photon = PhotonFile::new(small());
        photon.set_anti_aliasing_level(4).unwrap();
        assert_eq!(photon.anti_aliasing_level(), 4);
        assert_eq!(photon.header().anti_aliasing_level(), 4);

        photon.set_resolution(Resolution::new(20, 5)).unwrap();
        assert_eq!(photon.layers().resolution(), Resolution::new(20, 5));

        let images = (0..4)
            .map(|_| PixelGrid::new(Resolution::new(20, 5)).into())
            .collect();
        photon.append_layer(images, LayerParams::new()).unwrap();

        assert!(photon.set_anti_aliasing_level(2).is_err());
        assert!(photon.set_resolution(Resolution::new(10, 10)).is_err());
        assert!(photon.header_mut().set_version(1).is_err());

        photon.clear_layers();
        photon.set_anti_aliasing_level(1).unwrap();
        photon.header_mut().set_version(1).unwrap();
        assert!(matches!(
            photon.set_anti_aliasing_level(2),
            Err(Error::NotSupported(_))
        ));
        assert_eq!(photon.anti_aliasing_level(), 1);
    }

    #[test]
    fn previews() {
        let mut photon = PhotonFile::new(small());
        let old = photon.set_preview(PreviewKind::Low, PreviewImage::new(2, 2, vec![1, 2, 3]));
        assert!(old.data.is_empty());

        photon.preview_mut(PreviewKind::High).resolution_x = 7;

        let reread = PhotonFile::from_mem(photon.to_bytes().unwrap()).unwrap();
        assert_eq!(reread.preview(PreviewKind::Low).data, vec![1, 2, 3]);
        assert_eq!(reread.preview(PreviewKind::High).resolution_x, 7);
    }

    #[test]
    fn version_1_through_facade() {
        let mut photon = PhotonFile::new(PhotonDefaults {
            version: 1,
            ..small()
        });
        photon
            .append_layer(vec![rle_mask(10, 10, 3).into()], LayerParams::new())
            .unwrap();

        let data = photon.to_bytes().unwrap();
        assert_eq!(&data[0x4C..0x50], &[0, 0, 0, 0]);
        assert!(data[0x54..0x6C].iter().all(|&byte| byte == 0));

        let reread = PhotonFile::from_mem(data).unwrap();
        assert_eq!(reread, photon);
    }
}
