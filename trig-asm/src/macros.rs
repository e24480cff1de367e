//! Helper macros for the engine discriminant enums.

/// Implements `TryFrom<u8>` for a `#[repr(u8)]` enum with explicit
/// discriminants, failing with the given [`DecodeError`] variant.
///
/// [`DecodeError`]: crate::DecodeError
macro_rules! impl_try_from_u8 {
    ($ty:ident, $err:ident, { $($variant:ident = $value:literal),+ $(,)? }) => {
        impl core::convert::TryFrom<u8> for $ty {
            type Error = crate::types::DecodeError;

            fn try_from(b: u8) -> Result<Self, Self::Error> {
                match b {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(crate::types::DecodeError::$err(b)),
                }
            }
        }

        impl From<$ty> for u8 {
            fn from(v: $ty) -> u8 {
                v as u8
            }
        }
    };
}

pub(crate) use impl_try_from_u8;
