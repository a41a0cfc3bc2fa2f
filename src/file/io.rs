//! Little-endian primitive reading for the photon file layout.
//!
//! Every scalar in a photon file is a fixed-width little-endian value: `i32` addresses,
//! counts and lengths, `f32` physical parameters and two `i16` PWM values. This module
//! provides the [`crate::file::io::PhotonIO`] trait over those primitives, used by the
//! [`crate::file::parser::Parser`] to read them and by the writer to emit them.
//!
//! # Examples
//!
//! ```rust
//! use photonfile::file::io::read_le_at;
//!
//! let data = [0xCD, 0xCC, 0x4C, 0x3D, 0x02, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//! let height: f32 = read_le_at(&data, &mut offset)?;
//! let version: i32 = read_le_at(&data, &mut offset)?;
//! assert_eq!((height, version, offset), (0.05, 2, 8));
//! # Ok::<(), photonfile::Error>(())
//! ```
//!
//! # Error Handling
//!
//! Reads return [`crate::Error::OutOfBounds`] if the buffer is too short.

use crate::{Error::OutOfBounds, Result};

/// Trait for primitives that can be stored in a photon file.
///
/// Each implementation names the fixed-size byte array of the type and converts from and to
/// it in little-endian order.
pub trait PhotonIO: Sized {
    /// Byte array representation of the type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_photon_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl PhotonIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_photon_io! {
    i16 => 2,
    i32 => 4,
    f32 => 4,
}

/// Reads a value of type `T` at `offset` and advances the offset past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: PhotonIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_le_bytes(read))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x19, 0x00, 0xFD, 0x12, 0xCD, 0xCC, 0x4C, 0x3D];

    #[test]
    fn read_i16() {
        let mut offset = 0;
        assert_eq!(read_le_at::<i16>(&[0xFF, 0x00], &mut offset).unwrap(), 255);

        let mut offset = 0;
        assert_eq!(read_le_at::<i16>(&[0xFF, 0xFF], &mut offset).unwrap(), -1);
    }

    #[test]
    fn read_sequential() {
        let mut offset = 0;
        let magic: i32 = read_le_at(&TEST_BUFFER, &mut offset).unwrap();
        let height: f32 = read_le_at(&TEST_BUFFER, &mut offset).unwrap();

        assert_eq!(magic, 0x12FD_0019);
        assert_eq!(height, 0.05);
        assert_eq!(offset, 8);
    }

    #[test]
    fn round_trip_bytes() {
        assert_eq!((-2_i32).to_le_bytes(), [0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(<f32 as PhotonIO>::from_le_bytes([0xCD, 0xCC, 0x4C, 0x3D]), 0.05);
        assert_eq!(PhotonIO::to_le_bytes(255_i16), [0xFF, 0x00]);
    }

    #[test]
    fn errors() {
        let mut offset = 6;
        let result = read_le_at::<i32>(&TEST_BUFFER, &mut offset);
        assert!(matches!(result, Err(OutOfBounds)));
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        let result = read_le_at::<i16>(&TEST_BUFFER, &mut offset);
        assert!(matches!(result, Err(OutOfBounds)));
    }
}
