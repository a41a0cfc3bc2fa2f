use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Reading and writing either completes fully or fails with one of these variants; there is no
/// partial recovery and no automatic retry.
///
/// # Error Categories
///
/// ## Format Errors
/// - [`Error::Malformed`] - Inconsistent or invalid field values in the input
/// - [`Error::OutOfBounds`] - A read or address would leave the input buffer
/// - [`Error::PixelCountMismatch`] - A decoded RLE stream does not fill the pixel grid
///
/// ## Layout Errors
/// - [`Error::FormatOverflow`] - An offset or length does not fit its 32-bit field
/// - [`Error::IntegrityError`] - Recorded section bookkeeping disagrees with the bytes written
///
/// ## Model Errors
/// - [`Error::DimensionMismatch`] - A pixel grid has the wrong resolution
/// - [`Error::CountMismatch`] - Wrong number of images for the anti-aliasing level
/// - [`Error::IndexError`] - Layer index outside the layer table
/// - [`Error::NotSupported`] - Operation not valid for the current version or state
///
/// ## I/O and External Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Image`] - Image decoding/encoding errors from the PNG adapter
///
/// # Examples
///
/// ```rust,no_run
/// use photonfile::{Error, PhotonFile};
/// use std::path::Path;
///
/// match PhotonFile::from_file(Path::new("model.photon")) {
///     Ok(photon) => println!("{} layers", photon.layer_count()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The file is damaged and could not be parsed.
    ///
    /// Raised for fields whose values are internally inconsistent, e.g. negative addresses,
    /// counts or lengths. The error includes the source location where the malformation
    /// was detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    ///
    /// Truncated inputs and addresses pointing past the end of the buffer end up here.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A run-length encoded layer did not decode to exactly `width * height` pixels.
    #[error("Decoded {actual} pixels, expected {expected}")]
    PixelCountMismatch {
        /// Number of pixels of the configured resolution
        expected: usize,
        /// Number of pixels the stream expanded to
        actual: usize,
    },

    /// An offset or length exceeds the signed 32-bit field it is stored in.
    #[error("{what} of {value} does not fit into a 32-bit field")]
    FormatOverflow {
        /// Which field overflowed
        what: String,
        /// The value that could not be stored
        value: u64,
    },

    /// Bookkeeping of the layout planner disagrees with the bytes actually written.
    ///
    /// This is a defensive check; seeing it indicates a bug in the writer rather than
    /// bad input.
    #[error("Integrity check failed - {0}")]
    IntegrityError(String),

    /// A pixel grid does not match the resolution configured in the file header.
    #[error("Image is {}x{}, expected {}x{}", actual.0, actual.1, expected.0, expected.1)]
    DimensionMismatch {
        /// Configured (width, height)
        expected: (u32, u32),
        /// Supplied (width, height)
        actual: (u32, u32),
    },

    /// The number of images supplied for one layer does not equal the anti-aliasing level.
    #[error("Expected {expected} images per layer, got {actual}")]
    CountMismatch {
        /// The anti-aliasing level of the file
        expected: usize,
        /// Number of images supplied
        actual: usize,
    },

    /// A layer index is outside of the current layer table.
    #[error("Layer index {index} is out of range for {len} layers")]
    IndexError {
        /// The requested index
        index: usize,
        /// Number of layers at the time of the request
        len: usize,
    },

    /// The requested operation is not possible for the file in its current state.
    #[error("Not supported - {0}")]
    NotSupported(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Error from the image crate while loading or saving a layer image.
    #[cfg(feature = "image")]
    #[error("{0}")]
    Image(#[from] image::ImageError),
}
