//! Minimal library exporting the fast-image codec ABI.
//!
//! Behaviour is keyed on the input bytes:
//! - `fail...` or a bare 8-byte PNG signature returns the error
//!   "PNG compression failed: truncated"
//! - `empty` returns a buffer with null data and no error
//! - `slow...` sleeps while tracking how many calls overlap
//! - anything else echoes the input followed by one parameter byte
//!   (the quality, or the angle in quarter turns for rotate)
//!
//! `fast_image_test_*` exports expose counters so tests can check that every
//! buffer handed out is freed exactly once.

use std::ffi::{CString, c_char, c_int};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[repr(C)]
pub struct FastImageBuffer {
    data: *mut u8,
    len: usize,
    error: *mut c_char,
}

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

static ISSUED: AtomicUsize = AtomicUsize::new(0);
static FREED: AtomicUsize = AtomicUsize::new(0);
static IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);
static MAX_IN_FLIGHT: AtomicUsize = AtomicUsize::new(0);

fn data(bytes: Vec<u8>) -> FastImageBuffer {
    let len = bytes.len();
    let data = Box::into_raw(bytes.into_boxed_slice()) as *mut u8;
    FastImageBuffer {
        data,
        len,
        error: std::ptr::null_mut(),
    }
}

fn error(message: &str) -> FastImageBuffer {
    FastImageBuffer {
        data: std::ptr::null_mut(),
        len: 0,
        error: CString::new(message).unwrap_or_default().into_raw(),
    }
}

/// # Safety
/// `input` must point to `len` readable bytes.
unsafe fn answer(input: *const u8, len: usize, param: u8) -> FastImageBuffer {
    ISSUED.fetch_add(1, Ordering::SeqCst);
    let input = unsafe { std::slice::from_raw_parts(input, len) };
    if input.starts_with(b"fail") || input == PNG_SIGNATURE {
        return error("PNG compression failed: truncated");
    }
    if input == b"empty" {
        return FastImageBuffer {
            data: std::ptr::null_mut(),
            len: 0,
            error: std::ptr::null_mut(),
        };
    }
    if input.starts_with(b"slow") {
        let now = IN_FLIGHT.fetch_add(1, Ordering::SeqCst) + 1;
        MAX_IN_FLIGHT.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        IN_FLIGHT.fetch_sub(1, Ordering::SeqCst);
    }
    let mut out = input.to_vec();
    out.push(param);
    data(out)
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fast_image_compress(
    input: *const u8,
    len: usize,
    quality: c_int,
) -> FastImageBuffer {
    unsafe { answer(input, len, quality as u8) }
}

#[cfg(not(feature = "no-rotate"))]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fast_image_rotate(
    input: *const u8,
    len: usize,
    angle: c_int,
) -> FastImageBuffer {
    unsafe { answer(input, len, (angle / 90) as u8) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fast_image_free(buffer: FastImageBuffer) {
    FREED.fetch_add(1, Ordering::SeqCst);
    if !buffer.data.is_null() {
        let slice = std::ptr::slice_from_raw_parts_mut(buffer.data, buffer.len);
        drop(unsafe { Box::from_raw(slice) });
    }
    if !buffer.error.is_null() {
        drop(unsafe { CString::from_raw(buffer.error) });
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn fast_image_test_issued() -> usize {
    ISSUED.load(Ordering::SeqCst)
}

#[unsafe(no_mangle)]
pub extern "C" fn fast_image_test_freed() -> usize {
    FREED.load(Ordering::SeqCst)
}

#[unsafe(no_mangle)]
pub extern "C" fn fast_image_test_max_in_flight() -> usize {
    MAX_IN_FLIGHT.load(Ordering::SeqCst)
}
