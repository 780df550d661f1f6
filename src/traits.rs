//! Traits used in this library

/// Fixed-size integers that can be assembled from raw bytes.
///
/// Implemented for the integer widths a GIF stream can contain, so the binary reader can offer
/// a single generic `read_be`/`read_le` pair instead of one method per type and byte order.
pub trait Primitive: Sized + Copy {
    /// Number of bytes occupied in the stream.
    const SIZE: usize;

    /// Builds `Self` from `bytes`, most significant byte first.
    ///
    /// `bytes.len()` must equal `Self::SIZE`.
    fn from_be_slice(bytes: &[u8]) -> Self;

    /// Builds `Self` from `bytes`, least significant byte first.
    ///
    /// `bytes.len()` must equal `Self::SIZE`.
    fn from_le_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_primitive {
    ($($ty:ty),*) => {$(
        impl Primitive for $ty {
            const SIZE: usize = core::mem::size_of::<$ty>();

            #[inline]
            fn from_be_slice(bytes: &[u8]) -> Self {
                let mut raw = [0; core::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_be_bytes(raw)
            }

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Self {
                let mut raw = [0; core::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                <$ty>::from_le_bytes(raw)
            }
        }
    )*};
}

impl_primitive!(u8, i8, u16, i16, u32, i32);
