// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' and 'photon/writer/output.rs' use mmap

//! # photonfile
//!
//! Reading, editing and writing of Photon / CBDDLP machine files, the sliced print jobs consumed
//! by Anycubic Photon class masked-SLA resin printers.
//!
//! A file holds a fixed header with print parameters, two RGB15 preview thumbnails, an optional
//! block of machine properties (version 2), a table of layer entries and the run-length encoded
//! monochrome masks of every layer. Version 2 files may carry several anti-aliasing sublayers per
//! layer, which together approximate grey levels at the mask edges.
//!
//! ## Features
//!
//! - **📦 Memory-mapped input** - Files are read through `memmap2`, or from an owned buffer
//! - **🔍 Strict validation** - Every address and length is bounds checked before use
//! - **✏️ Editing** - Append, insert, replace and delete layers, rewrite per-layer parameters
//! - **🧮 Exact layout** - Files are written in canonical order with backpatched addresses
//! - **🖼️ Image transfer** - Parallel export and import of layer masks as PNG (feature `image`)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use photonfile::prelude::*;
//!
//! let photon = PhotonFile::from_file("model.photon")?;
//! println!(
//!     "{} layers at {}, anti-aliasing {}",
//!     photon.layer_count(),
//!     photon.resolution(),
//!     photon.anti_aliasing_level()
//! );
//! # Ok::<(), photonfile::Error>(())
//! ```
//!
//! ### Creating a file
//!
//! ```rust,no_run
//! use photonfile::prelude::*;
//!
//! let mut photon = PhotonFile::new(PhotonDefaults::default());
//! photon.set_anti_aliasing_level(2)?;
//!
//! let resolution = photon.resolution();
//! let mut mask = PixelGrid::new(resolution);
//! mask.set(720, 1280, true);
//!
//! photon.append_layer(
//!     vec![mask.clone().into(), mask.into()],
//!     LayerParams::new().with_exposure_time(9.0),
//! )?;
//! photon.write_to_file("new.photon")?;
//! # Ok::<(), photonfile::Error>(())
//! ```
//!
//! ### Image transfer
//!
//! ```rust,no_run
//! # #[cfg(feature = "image")]
//! # fn run() -> photonfile::Result<()> {
//! use photonfile::prelude::*;
//!
//! let mut photon = PhotonFile::from_file("model.photon")?;
//! photon.export_images("layers", &PngAdapter)?;
//!
//! photon.clear_layers();
//! photon.append_layers_from_dir("layers", &PngAdapter, LayerParams::new())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`rle`] - Run-length codec for layer masks and the [`PixelGrid`] mask type
//! - [`photon`] - The [`PhotonFile`] facade, header model, previews, layers and the writer
//! - [`raster`] - The [`raster::ImageAdapter`] seam and bulk image export and import
//! - [`file`] - Input backends and the bounds-checked [`Parser`]
//! - [`prelude`] - Re-exports for glob imports
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust,no_run
//! use photonfile::{Error, PhotonFile};
//!
//! match PhotonFile::from_file("broken.photon") {
//!     Ok(photon) => println!("{} layers", photon.layer_count()),
//!     Err(Error::OutOfBounds) => println!("File is truncated"),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run photonfile --release
//! ```
#[macro_use]
pub(crate) mod error;

/// Input backends and low-level binary access.
pub mod file;

/// Shared functionality which is used in unit-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use photonfile::prelude::*;
///
/// let photon = PhotonFile::from_file("model.photon")?;
/// let masks = photon.export_layer(0)?;
/// # Ok::<(), photonfile::Error>(())
/// ```
pub mod prelude;

pub mod photon;
pub mod raster;
pub mod rle;

/// `photonfile` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `photonfile` Error type
///
/// # Examples
///
/// ```rust,no_run
/// use photonfile::{Error, PhotonFile};
///
/// match PhotonFile::from_mem(vec![0; 16]) {
///     Ok(_) => println!("Loaded successfully"),
///     Err(Error::OutOfBounds) => println!("Too short"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
pub use error::Error;

/// Main entry point for working with photon files.
///
/// # Example
///
/// ```rust,no_run
/// use photonfile::PhotonFile;
/// let photon = PhotonFile::from_file("model.photon")?;
/// println!("Found {} layers", photon.layer_count());
/// # Ok::<(), photonfile::Error>(())
/// ```
pub use photon::PhotonFile;

pub use photon::{
    config::PhotonDefaults,
    header::{FileHeader, PrintProperties, ProjectionType},
    layer::{Layer, LayerImage, LayerParams, LayerStore, SubLayer},
    preview::{PreviewImage, PreviewKind},
};

pub use raster::ImageAdapter;

#[cfg(feature = "image")]
pub use raster::PngAdapter;

pub use rle::{PixelGrid, Resolution};

/// Provides access to the bounds-checked cursor used for decoding.
///
/// # Example
///
/// ```rust
/// use photonfile::Parser;
/// let data = [0x2A, 0x00, 0x00, 0x00];
/// let mut parser = Parser::new(&data);
/// assert_eq!(parser.read_le::<i32>()?, 42);
/// # Ok::<(), photonfile::Error>(())
/// ```
pub use file::parser::Parser;
