//! Image file adapter and bulk layer image transfer.
//!
//! Turning on-disk images into [`crate::PixelGrid`]s is delegated to an [`ImageAdapter`]. The
//! crate ships [`PngAdapter`] (feature `image`); any other format can be plugged in by
//! implementing the trait.
//!
//! Exported layer images are named `{layer:05}_{level:02}.{extension}`. Directory listings are
//! sorted by the numeric layer and level in the name, so an export directory is listed in
//! layer-major order at any layer count and can be imported back with
//! [`crate::PhotonFile::append_layers_from_dir`].
//!
//! Decoding, encoding and image I/O of separate sublayers are independent and run in parallel
//! on the rayon thread pool.

#[cfg(feature = "image")]
mod png;

#[cfg(feature = "image")]
pub use png::PngAdapter;

use std::path::{Path, PathBuf};

use log::debug;
use rayon::prelude::*;

use crate::{
    photon::layer::LayerStore,
    rle::{self, PixelGrid, Resolution},
    Result,
};

/// Converts between image files and pixel grids.
pub trait ImageAdapter: Sync {
    /// Loads the image at `path` as a grid of `resolution`.
    ///
    /// # Errors
    /// Returns [`crate::Error::DimensionMismatch`] if the image has another size.
    fn load(&self, path: &Path, resolution: Resolution) -> Result<PixelGrid>;

    /// Saves `grid` to `path`.
    ///
    /// # Errors
    /// Returns an error if the image cannot be encoded or written.
    fn save(&self, grid: &PixelGrid, path: &Path) -> Result<()>;

    /// File extension, without dot, of the images this adapter handles.
    fn extension(&self) -> &str {
        "png"
    }
}

/// File name of the exported image of one sublayer.
#[must_use]
pub fn image_file_name(layer: usize, level: usize, extension: &str) -> String {
    format!("{layer:05}_{level:02}.{extension}")
}

/// Layer and level parsed from a `{layer}_{level}` file stem.
fn image_index(path: &Path) -> Option<(u64, u64)> {
    let (layer, level) = path.file_stem()?.to_str()?.split_once('_')?;
    Some((layer.parse().ok()?, level.parse().ok()?))
}

/// Decodes and saves every sublayer of `store` into `directory`, creating it if needed.
///
/// Returns the number of images written.
///
/// # Errors
/// Fails on the first sublayer that cannot be decoded or saved, or if the directory cannot be
/// created.
pub fn export_all<A>(store: &LayerStore, directory: &Path, adapter: &A) -> Result<usize>
where
    A: ImageAdapter + ?Sized,
{
    std::fs::create_dir_all(directory)?;

    let jobs: Vec<(usize, usize)> = store
        .iter()
        .enumerate()
        .flat_map(|(layer, sublayers)| {
            (0..sublayers.sublayers().len()).map(move |level| (layer, level))
        })
        .collect();

    jobs.par_iter().try_for_each(|&(layer, level)| {
        let grid = store.export_sublayer(layer, level)?;
        let path = directory.join(image_file_name(layer, level, adapter.extension()));
        adapter.save(&grid, &path)
    })?;

    debug!(
        "Exported {} layer images to {}",
        jobs.len(),
        directory.display()
    );
    Ok(jobs.len())
}

/// Lists the regular files in `directory` with the adapter's extension, sorted by name.
///
/// # Errors
/// Returns [`crate::Error::FileError`] if the directory cannot be read.
pub fn list_images<A>(directory: &Path, adapter: &A) -> Result<Vec<PathBuf>>
where
    A: ImageAdapter + ?Sized,
{
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        let matches_extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case(adapter.extension()));

        if entry.file_type()?.is_file() && matches_extension {
            paths.push(path);
        }
    }

    // Names without a layer index go last, by name.
    paths.sort_by_cached_key(|path| {
        (
            image_index(path).unwrap_or((u64::MAX, u64::MAX)),
            path.clone(),
        )
    });
    Ok(paths)
}

/// Loads and run-length encodes the images at `paths`, preserving their order.
///
/// # Errors
/// Fails on the first image that cannot be loaded or has the wrong size.
pub fn load_encoded<A, P>(paths: &[P], adapter: &A, resolution: Resolution) -> Result<Vec<Vec<u8>>>
where
    A: ImageAdapter + ?Sized,
    P: AsRef<Path> + Sync,
{
    paths
        .par_iter()
        .map(|path| {
            let grid = adapter.load(path.as_ref(), resolution)?;
            Ok(rle::encode(&grid))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        photon::{header::LayerDefaults, layer::LayerParams},
        Error,
    };
    use std::{collections::HashMap, sync::Mutex};

    /// Stores grids in memory, keyed by path.
    #[derive(Default)]
    struct MemoryAdapter {
        images: Mutex<HashMap<PathBuf, PixelGrid>>,
    }

    impl ImageAdapter for MemoryAdapter {
        fn load(&self, path: &Path, resolution: Resolution) -> Result<PixelGrid> {
            let images = self.images.lock().unwrap();
            let grid = images.get(path).cloned().ok_or(Error::OutOfBounds)?;
            resolution.ensure(grid.resolution())?;
            Ok(grid)
        }

        fn save(&self, grid: &PixelGrid, path: &Path) -> Result<()> {
            std::fs::write(path, b"")?;
            self.images
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), grid.clone());
            Ok(())
        }

        fn extension(&self) -> &str {
            "mem"
        }
    }

    const RESOLUTION: Resolution = Resolution::new(8, 2);

    fn store(levels: usize, layers: usize) -> LayerStore {
        let defaults = LayerDefaults {
            layer_height: 0.05,
            exposure: 8.0,
            exposure_bottom: 60.0,
            off_time: 1.0,
            bottom_layers: 0,
        };
        let mut store = LayerStore::new(RESOLUTION, levels);
        for layer in 0..layers {
            let images = (0..levels)
                .map(|level| {
                    let mut grid = PixelGrid::new(RESOLUTION);
                    grid.set(layer as u32, level as u32, true);
                    grid.into()
                })
                .collect();
            store.append(images, LayerParams::new(), &defaults).unwrap();
        }
        store
    }

    #[test]
    fn file_names() {
        assert_eq!(image_file_name(12, 3, "png"), "00012_03.png");
        assert_eq!(image_file_name(123_456, 0, "bmp"), "123456_00.bmp");
    }

    #[test]
    fn listing_is_numeric() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["100000_00.mem", "99999_01.mem", "00002_00.mem", "99999_00.mem", "notes.mem"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<_> = list_images(dir.path(), &MemoryAdapter::default())
            .unwrap()
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            ["00002_00.mem", "99999_00.mem", "99999_01.mem", "100000_00.mem", "notes.mem"]
        );
    }

    #[test]
    fn export_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("layers");
        let adapter = MemoryAdapter::default();
        let store = store(2, 3);

        assert_eq!(export_all(&store, &target, &adapter).unwrap(), 6);
        std::fs::write(target.join("notes.txt"), b"ignored").unwrap();
        std::fs::create_dir(target.join("sub.mem")).unwrap();

        let paths = list_images(&target, &adapter).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "00000_00.mem",
                "00000_01.mem",
                "00001_00.mem",
                "00001_01.mem",
                "00002_00.mem",
                "00002_01.mem"
            ]
        );

        let encoded = load_encoded(&paths, &adapter, RESOLUTION).unwrap();
        assert_eq!(encoded.len(), 6);
        assert_eq!(encoded[3], store.layer(1).unwrap().sublayers()[1].data());
    }

    #[test]
    fn load_checks_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = MemoryAdapter::default();
        export_all(&store(1, 1), dir.path(), &adapter).unwrap();

        let paths = list_images(dir.path(), &adapter).unwrap();
        assert!(matches!(
            load_encoded(&paths, &adapter, Resolution::new(2, 8)),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
