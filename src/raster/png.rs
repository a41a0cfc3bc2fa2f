//! PNG image adapter backed by the `image` crate.

use std::{io::Cursor, path::Path};

use image::{GrayImage, ImageFormat};

use crate::{
    raster::ImageAdapter,
    rle::{PixelGrid, Resolution},
    Error, Result,
};

/// Reads and writes layer masks as 8-bit grayscale PNG files.
///
/// On load every pixel with a non-zero luma is lit; colour images are converted to luma first.
/// On save lit pixels are written as 255 and dark pixels as 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngAdapter;

impl ImageAdapter for PngAdapter {
    fn load(&self, path: &Path, resolution: Resolution) -> Result<PixelGrid> {
        let bytes = std::fs::read(path)?;
        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_luma8();

        resolution.ensure(Resolution::new(image.width(), image.height()))?;

        let pixels = image.into_raw().into_iter().map(|luma| luma > 0).collect();
        PixelGrid::from_pixels(resolution, pixels)
    }

    fn save(&self, grid: &PixelGrid, path: &Path) -> Result<()> {
        let resolution = grid.resolution();
        let luma = grid
            .pixels()
            .iter()
            .map(|&lit| if lit { 255 } else { 0 })
            .collect();

        let image = GrayImage::from_raw(resolution.width, resolution.height, luma).ok_or(
            Error::PixelCountMismatch {
                expected: resolution.pixel_count(),
                actual: grid.pixels().len(),
            },
        )?;

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        std::fs::write(path, png)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let resolution = Resolution::new(12, 5);

        let mut grid = PixelGrid::new(resolution);
        for x in 2..9 {
            grid.set(x, 3, true);
        }
        grid.set(0, 0, true);

        PngAdapter.save(&grid, &path).unwrap();
        assert_eq!(PngAdapter.load(&path, resolution).unwrap(), grid);
    }

    #[test]
    fn grey_levels_are_lit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grey.png");

        let image = GrayImage::from_raw(3, 1, vec![0, 1, 128]).unwrap();
        image.save_with_format(&path, ImageFormat::Png).unwrap();

        let grid = PngAdapter.load(&path, Resolution::new(3, 1)).unwrap();
        assert_eq!(grid.pixels(), &[false, true, true]);
    }

    #[test]
    fn wrong_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        PngAdapter
            .save(&PixelGrid::new(Resolution::new(4, 2)), &path)
            .unwrap();

        assert!(matches!(
            PngAdapter.load(&path, Resolution::new(2, 4)),
            Err(Error::DimensionMismatch {
                expected: (2, 4),
                actual: (4, 2)
            })
        ));
    }
}
