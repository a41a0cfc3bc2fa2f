//! Run-length codec for layer masks.
//!
//! Every layer of a photon file stores a binary (lit / dark) pixel mask of the display
//! resolution as a run-length encoded byte stream. The pixels are flattened in row-major order
//! and split into maximal runs of one color; each run is emitted as one or more bytes:
//!
//! ```text
//!  bit 7      bits 6..0
//! ┌───────┬──────────────────┐
//! │ color │ repetitions 1..125│
//! └───────┴──────────────────┘
//! ```
//!
//! Runs longer than [`MAX_RUN`] are split into several bytes of the same color. A run whose
//! length is an exact multiple of [`MAX_RUN`] ends with a full 125 chunk; a count of zero is
//! never emitted.
//!
//! # Examples
//!
//! ```rust
//! use photonfile::rle::{decode, encode, PixelGrid, Resolution};
//!
//! let resolution = Resolution::new(250, 1);
//! let mut grid = PixelGrid::new(resolution);
//! for x in 0..125 {
//!     grid.set(x, 0, true);
//! }
//!
//! let data = encode(&grid);
//! assert_eq!(data, vec![0x80 | 125, 125]);
//! assert_eq!(decode(&data, resolution)?, grid);
//! # Ok::<(), photonfile::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`encode`] and [`decode`] are pure functions; separate layers can be processed in parallel.

use std::fmt;

use crate::{Error, Result};

/// Largest repetition count stored in a single run byte.
pub const MAX_RUN: usize = 125;

const COLOR_BIT: u8 = 0x80;
const COUNT_MASK: u8 = 0x7F;

/// Pixel dimensions of the layer masks.
///
/// The classic Photon uses 1440x2560 ([`Resolution::PHOTON`]); other machines that share the
/// format use different panels, so the value is carried by the file header rather than fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Pixels per row
    pub width: u32,
    /// Number of rows
    pub height: u32,
}

impl Resolution {
    /// Panel resolution of the original Anycubic Photon.
    pub const PHOTON: Resolution = Resolution {
        width: 1440,
        height: 2560,
    };

    /// Creates a new resolution.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Resolution { width, height }
    }

    /// Number of pixels in one layer mask.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Fails with [`crate::Error::DimensionMismatch`] unless `other` equals `self`.
    ///
    /// # Errors
    /// Returns [`crate::Error::DimensionMismatch`] when the resolutions differ.
    pub fn ensure(&self, other: Resolution) -> Result<()> {
        if *self != other {
            return Err(Error::DimensionMismatch {
                expected: (self.width, self.height),
                actual: (other.width, other.height),
            });
        }
        Ok(())
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::PHOTON
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A binary pixel mask of a fixed resolution, stored row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelGrid {
    resolution: Resolution,
    pixels: Vec<bool>,
}

impl PixelGrid {
    /// Creates a grid with every pixel dark.
    #[must_use]
    pub fn new(resolution: Resolution) -> Self {
        PixelGrid {
            resolution,
            pixels: vec![false; resolution.pixel_count()],
        }
    }

    /// Wraps a row-major pixel buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::PixelCountMismatch`] if `pixels` does not hold exactly
    /// `width * height` entries.
    pub fn from_pixels(resolution: Resolution, pixels: Vec<bool>) -> Result<Self> {
        if pixels.len() != resolution.pixel_count() {
            return Err(Error::PixelCountMismatch {
                expected: resolution.pixel_count(),
                actual: pixels.len(),
            });
        }
        Ok(PixelGrid { resolution, pixels })
    }

    /// The resolution of this grid.
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Row-major pixel values.
    #[must_use]
    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    /// Returns the pixel at column `x`, row `y`; out of range pixels read as dark.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.index(x, y)
            .map(|index| self.pixels[index])
            .unwrap_or(false)
    }

    /// Sets the pixel at column `x`, row `y`. Out of range coordinates are ignored.
    pub fn set(&mut self, x: u32, y: u32, lit: bool) {
        if let Some(index) = self.index(x, y) {
            self.pixels[index] = lit;
        }
    }

    /// Number of lit pixels.
    #[must_use]
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&lit| lit).count()
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.resolution.width || y >= self.resolution.height {
            return None;
        }
        Some(y as usize * self.resolution.width as usize + x as usize)
    }
}

impl fmt::Debug for PixelGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelGrid")
            .field("resolution", &self.resolution)
            .field("lit", &self.lit_count())
            .finish()
    }
}

/// Encodes a pixel grid into the packed run-length byte stream.
///
/// An empty grid encodes to an empty stream.
#[must_use]
pub fn encode(grid: &PixelGrid) -> Vec<u8> {
    let pixels = grid.pixels();
    let mut data = Vec::new();

    let mut start = 0;
    while start < pixels.len() {
        let color = pixels[start];
        let length = pixels[start..]
            .iter()
            .take_while(|&&pixel| pixel == color)
            .count();

        push_run(&mut data, color, length);
        start += length;
    }

    data
}

/// Emits one maximal run of `length >= 1` pixels.
fn push_run(data: &mut Vec<u8>, color: bool, length: usize) {
    let color_bit = if color { COLOR_BIT } else { 0 };

    let mut full_chunks = length / MAX_RUN;
    let mut last_chunk = length % MAX_RUN;
    if last_chunk == 0 {
        // Exact multiple of MAX_RUN: the last full chunk becomes the terminal one.
        full_chunks -= 1;
        last_chunk = MAX_RUN;
    }

    data.extend(std::iter::repeat(color_bit | MAX_RUN as u8).take(full_chunks));
    data.push(color_bit | last_chunk as u8);
}

/// Decodes a run-length byte stream into a grid of `resolution`.
///
/// # Errors
/// Returns [`crate::Error::PixelCountMismatch`] if the stream does not expand to exactly
/// `width * height` pixels.
pub fn decode(data: &[u8], resolution: Resolution) -> Result<PixelGrid> {
    let expected = resolution.pixel_count();
    let actual: usize = data
        .iter()
        .map(|&byte| usize::from(byte & COUNT_MASK))
        .sum();
    if actual != expected {
        return Err(Error::PixelCountMismatch { expected, actual });
    }

    let mut pixels = Vec::with_capacity(expected);
    for &byte in data {
        let lit = byte & COLOR_BIT != 0;
        let count = usize::from(byte & COUNT_MASK);
        pixels.extend(std::iter::repeat(lit).take(count));
    }

    Ok(PixelGrid { resolution, pixels })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from_runs(resolution: Resolution, runs: &[(bool, usize)]) -> PixelGrid {
        let pixels = runs
            .iter()
            .flat_map(|&(lit, len)| std::iter::repeat(lit).take(len))
            .collect();
        PixelGrid::from_pixels(resolution, pixels).unwrap()
    }

    #[test]
    fn run_of_exactly_max() {
        let grid = grid_from_runs(Resolution::new(125, 1), &[(true, 125)]);
        assert_eq!(encode(&grid), vec![0x80 | 125]);
    }

    #[test]
    fn run_of_twice_max() {
        let grid = grid_from_runs(Resolution::new(250, 1), &[(false, 250)]);
        assert_eq!(encode(&grid), vec![125, 125]);
    }

    #[test]
    fn run_just_over_max() {
        let grid = grid_from_runs(Resolution::new(127, 1), &[(true, 126), (false, 1)]);
        assert_eq!(encode(&grid), vec![0x80 | 125, 0x80 | 1, 1]);
    }

    #[test]
    fn alternating_runs() {
        let grid = grid_from_runs(
            Resolution::new(10, 3),
            &[(false, 3), (true, 7), (false, 12), (true, 8)],
        );
        assert_eq!(encode(&grid), vec![3, 0x80 | 7, 12, 0x80 | 8]);
    }

    #[test]
    fn never_emits_zero_count() {
        let resolution = Resolution::new(1000, 3);
        let grid = grid_from_runs(
            resolution,
            &[(false, 375), (true, 1), (false, 1250), (true, 1374)],
        );
        let data = encode(&grid);

        assert!(data.iter().all(|&byte| byte & COUNT_MASK != 0));
        assert!(data.iter().all(|&byte| usize::from(byte & COUNT_MASK) <= MAX_RUN));
        assert_eq!(decode(&data, resolution).unwrap(), grid);
    }

    #[test]
    fn empty_grid() {
        let resolution = Resolution::new(0, 0);
        let grid = PixelGrid::new(resolution);

        assert!(encode(&grid).is_empty());
        assert_eq!(decode(&[], resolution).unwrap(), grid);
    }

    #[test]
    fn full_resolution_round_trip() {
        let resolution = Resolution::PHOTON;
        let mut grid = PixelGrid::new(resolution);

        // Deterministic pseudo-random blobs, in the spirit of a sliced cross section.
        let mut state: u32 = 0x1234_5678;
        for _ in 0..200 {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let cx = state % resolution.width;
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let cy = state % resolution.height;
            for y in cy.saturating_sub(20)..(cy + 20).min(resolution.height) {
                for x in cx.saturating_sub(30)..(cx + 30).min(resolution.width) {
                    grid.set(x, y, true);
                }
            }
        }

        let data = encode(&grid);
        assert!(data.len() < resolution.pixel_count() / 10);
        assert_eq!(decode(&data, resolution).unwrap(), grid);
    }

    #[test]
    fn decode_ignores_zero_count_bytes() {
        let grid = decode(&[0x80, 2, 0x80 | 1], Resolution::new(3, 1)).unwrap();
        assert_eq!(grid.pixels(), &[false, false, true]);
    }

    #[test]
    fn decode_pixel_count_mismatch() {
        let result = decode(&[0x80 | 125], Resolution::new(10, 10));
        assert!(matches!(
            result,
            Err(Error::PixelCountMismatch {
                expected: 100,
                actual: 125
            })
        ));
    }

    #[test]
    fn pixel_grid_access() {
        let mut grid = PixelGrid::new(Resolution::new(4, 2));
        grid.set(3, 1, true);
        grid.set(4, 1, true);

        assert!(grid.get(3, 1));
        assert!(!grid.get(4, 1));
        assert_eq!(grid.lit_count(), 1);
        assert_eq!(grid.pixels()[7], true);

        assert!(PixelGrid::from_pixels(Resolution::new(4, 2), vec![false; 7]).is_err());
    }

    #[test]
    fn resolution_ensure() {
        assert!(Resolution::PHOTON.ensure(Resolution::new(1440, 2560)).is_ok());
        assert!(matches!(
            Resolution::PHOTON.ensure(Resolution::new(2560, 1440)),
            Err(Error::DimensionMismatch {
                expected: (1440, 2560),
                actual: (2560, 1440)
            })
        ));
    }
}
