//! # photonfile Prelude
//!
//! The most commonly used types and traits of the crate, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all photonfile operations
pub use crate::Error;

/// The result type used throughout photonfile
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Main entry point for photon files
pub use crate::PhotonFile;

/// Template for new files
pub use crate::PhotonDefaults;

// ================================================================================================
// File Model
// ================================================================================================

pub use crate::{
    FileHeader, Layer, LayerImage, LayerParams, LayerStore, PreviewImage, PreviewKind,
    PrintProperties, ProjectionType, SubLayer,
};

// ================================================================================================
// Masks and Images
// ================================================================================================

pub use crate::{ImageAdapter, PixelGrid, Resolution};

#[cfg(feature = "image")]
pub use crate::PngAdapter;
