//! The native codec boundary.
//!
//! The [`NativeCodec`] trait is the only view the rest of the crate has of
//! the codec: compress and rotate, bytes in, bytes out. Both operations keep
//! the input's format (PNG stays PNG, JPEG stays JPEG); the codec sniffs it.
//!
//! The production implementation is [`LibraryCodec`], which calls the C ABI
//! described in [`sys`] through function pointers resolved from the loaded
//! library. Tests substitute their own implementations.
//!
//! ## Thread safety
//!
//! Nothing guarantees the codec library tolerates concurrent calls, so
//! [`LibraryCodec`] serializes them through a mutex unless the loader is
//! configured with `serialize_native_calls = false`.

pub mod sys;

use crate::error::LoadError;
use crate::params::{Quality, Rotation};
use libloading::Library;
use std::ffi::CStr;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Failure reported by the codec for otherwise well-formed input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct NativeError(pub String);

/// Image operations provided by the codec.
///
/// Implementations receive already-validated arguments: `image` is non-empty,
/// quality is in 0–100, and rotation is a quarter turn.
pub trait NativeCodec: Send + Sync {
    /// Re-encode `image` in its own format at `quality`.
    fn compress(&self, image: &[u8], quality: Quality) -> Result<Vec<u8>, NativeError>;

    /// Rotate `image` clockwise, keeping its format.
    fn rotate(&self, image: &[u8], rotation: Rotation) -> Result<Vec<u8>, NativeError>;
}

/// Codec backed by a dynamically loaded library.
pub struct LibraryCodec {
    compress_fn: sys::CompressFn,
    rotate_fn: sys::RotateFn,
    free_fn: sys::FreeFn,
    gate: Option<Mutex<()>>,
    path: PathBuf,
    // Keeps the function pointers above valid.
    _library: Library,
}

impl LibraryCodec {
    /// Load the library at `path` and resolve its three entry points.
    ///
    /// # Safety
    /// Loading runs the library's initializers. The library must export
    /// `fast_image_compress`, `fast_image_rotate` and `fast_image_free` with
    /// exactly the signatures in [`sys`].
    pub unsafe fn open(path: &Path, serialize_calls: bool) -> Result<Self, LoadError> {
        let library = unsafe { Library::new(path) }.map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let compress_fn = unsafe { resolve::<sys::CompressFn>(&library, path, sys::COMPRESS_SYMBOL) }?;
        let rotate_fn = unsafe { resolve::<sys::RotateFn>(&library, path, sys::ROTATE_SYMBOL) }?;
        let free_fn = unsafe { resolve::<sys::FreeFn>(&library, path, sys::FREE_SYMBOL) }?;

        Ok(Self {
            compress_fn,
            rotate_fn,
            free_fn,
            gate: serialize_calls.then(|| Mutex::new(())),
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Absolute path the library was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn call(&self, invoke: impl FnOnce() -> sys::FastImageBuffer) -> Result<Vec<u8>, NativeError> {
        // A panic while holding the gate cannot corrupt `()`.
        let _guard = self
            .gate
            .as_ref()
            .map(|gate| gate.lock().unwrap_or_else(PoisonError::into_inner));
        let buffer = invoke();
        unsafe { self.take(buffer) }
    }

    /// Copy the result out of a native buffer and release it.
    ///
    /// # Safety
    /// `buffer` must have been returned by one of this library's entry points
    /// and not yet freed.
    unsafe fn take(&self, buffer: sys::FastImageBuffer) -> Result<Vec<u8>, NativeError> {
        let result = if !buffer.error.is_null() {
            let message = unsafe { CStr::from_ptr(buffer.error) }
                .to_string_lossy()
                .into_owned();
            Err(NativeError(message))
        } else if buffer.data.is_null() || buffer.len == 0 {
            Err(NativeError("native codec returned no data".into()))
        } else {
            Ok(unsafe { std::slice::from_raw_parts(buffer.data, buffer.len) }.to_vec())
        };
        unsafe { (self.free_fn)(buffer) };
        result
    }
}

impl NativeCodec for LibraryCodec {
    fn compress(&self, image: &[u8], quality: Quality) -> Result<Vec<u8>, NativeError> {
        let f = self.compress_fn;
        self.call(|| unsafe { f(image.as_ptr(), image.len(), c_int::from(quality.value())) })
    }

    fn rotate(&self, image: &[u8], rotation: Rotation) -> Result<Vec<u8>, NativeError> {
        let f = self.rotate_fn;
        self.call(|| unsafe { f(image.as_ptr(), image.len(), rotation.degrees() as c_int) })
    }
}

/// Resolve a NUL-terminated symbol name into a copy of the function pointer.
unsafe fn resolve<T: Copy>(library: &Library, path: &Path, name: &[u8]) -> Result<T, LoadError> {
    let symbol = unsafe { library.get::<T>(name) }.map_err(|source| LoadError::Symbol {
        path: path.to_path_buf(),
        symbol: String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name)).into_owned(),
        source,
    })?;
    Ok(*symbol)
}
