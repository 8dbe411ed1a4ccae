// Raw C ABI exported by the native codec library.
//
// Every function returning a `FastImageBuffer` transfers ownership of it to
// the caller, who must hand it back to `fast_image_free` exactly once.
use std::os::raw::{c_char, c_int};

pub const COMPRESS_SYMBOL: &[u8] = b"fast_image_compress\0";
pub const ROTATE_SYMBOL: &[u8] = b"fast_image_rotate\0";
pub const FREE_SYMBOL: &[u8] = b"fast_image_free\0";

/// Result of a native call. A non-null `error` is a NUL-terminated failure
/// message and `data`/`len` are then meaningless.
#[repr(C)]
#[derive(Debug)]
pub struct FastImageBuffer {
    pub data: *mut u8,
    pub len: usize,
    pub error: *mut c_char,
}

/// `fast_image_compress(data, len, quality)`: re-encode in the input's own format.
pub type CompressFn =
    unsafe extern "C" fn(data: *const u8, len: usize, quality: c_int) -> FastImageBuffer;

/// `fast_image_rotate(data, len, angle)`: clockwise rotation by `angle` degrees.
pub type RotateFn =
    unsafe extern "C" fn(data: *const u8, len: usize, angle: c_int) -> FastImageBuffer;

pub type FreeFn = unsafe extern "C" fn(buffer: FastImageBuffer);
