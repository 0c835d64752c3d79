//! Big-endian integer encoding shared by the SOCKS4 and SOCKS5 machines.
//!
//! Both functions operate on `bytes` cursors: a `&[u8]` (or any other
//! [`Buf`]) advances past what it yields, a [`BytesMut`] or `&mut [u8]`
//! advances past what it is given. Neither checks bounds up front; the
//! caller sizes the cursor before reading or writing, and running off the
//! end panics inside `bytes`.
//!
//! [`BytesMut`]: bytes::BytesMut
use bytes::{Buf, BufMut};


/// An unsigned integer with a fixed big-endian wire width.
pub trait WireInt: Sized + Copy {
    /// Number of bytes the integer occupies on the wire.
    const WIDTH: usize;

    fn get_be<B: Buf>(src: &mut B) -> Self;
    fn put_be<B: BufMut>(self, dst: &mut B);
}

macro_rules! impl_wire_int {
    ($($ty:ty => $get:ident, $put:ident;)*) => {
        $(
            impl WireInt for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn get_be<B: Buf>(src: &mut B) -> Self {
                    src.$get()
                }

                #[inline]
                fn put_be<B: BufMut>(self, dst: &mut B) {
                    dst.$put(self)
                }
            }
        )*
    };
}

impl_wire_int! {
    u8   => get_u8,   put_u8;
    u16  => get_u16,  put_u16;
    u32  => get_u32,  put_u32;
    u128 => get_u128, put_u128;
}

/// Reads the next `T::WIDTH` bytes as a big-endian unsigned integer.
#[inline]
pub fn read_be<T: WireInt, B: Buf>(cursor: &mut B) -> T {
    T::get_be(cursor)
}

/// Writes `value` as `T::WIDTH` big-endian bytes.
#[inline]
pub fn write_be<T: WireInt, B: BufMut>(value: T, cursor: &mut B) {
    value.put_be(cursor)
}
