//! The public image API.
//!
//! [`ImageApi`] wraps an [`InitState`] and enforces the call contract before
//! anything crosses into native code:
//!
//! 1. The state must be initialized; a failed bootstrap is replayed as
//!    [`Error::Initialization`].
//! 2. Arguments are validated ([`Error::InvalidArgument`]): the image must be
//!    non-empty, quality must be 0–100, and the angle must be 90, 180 or 270.
//! 3. The codec runs; its failures become [`Error::NativeExecution`] with the
//!    codec's own message.
//!
//! Output keeps the input's format. The facade never inspects or converts it.
//!
//! The crate root re-exposes every method as a free function bound to the
//! process-wide state (see [`crate::compress`] and friends).

use crate::bootstrap::InitState;
use crate::descriptor::describe;
use crate::error::{Error, ErrorKind, Operation};
use crate::format::PNG_SIGNATURE;
use crate::native::NativeCodec;
use crate::params::{Quality, Rotation};
use crate::platform::{Environment, resolve};

/// Facade over an initialized (or failed) codec state.
#[derive(Debug, Clone, Copy)]
pub struct ImageApi<'a> {
    state: &'a InitState,
}

impl<'a> ImageApi<'a> {
    pub fn new(state: &'a InitState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &'a InitState {
        self.state
    }

    fn codec(&self) -> Result<&'a dyn NativeCodec, Error> {
        self.state.codec()
    }

    /// Recompress `image` at `quality` (0–100), keeping its format.
    pub fn compress(&self, image: &[u8], quality: i32) -> Result<Vec<u8>, Error> {
        let codec = self.codec()?;
        require_image(image)?;
        let quality = Quality::new(quality)?;
        codec
            .compress(image, quality)
            .map_err(|e| native_failure(Operation::Compress, e.0))
    }

    /// [`compress`](Self::compress) at quality 90.
    pub fn compress_high(&self, image: &[u8]) -> Result<Vec<u8>, Error> {
        self.compress(image, i32::from(Quality::HIGH.value()))
    }

    /// [`compress`](Self::compress) at quality 60.
    pub fn compress_medium(&self, image: &[u8]) -> Result<Vec<u8>, Error> {
        self.compress(image, i32::from(Quality::MEDIUM.value()))
    }

    /// [`compress`](Self::compress) at quality 30.
    pub fn compress_low(&self, image: &[u8]) -> Result<Vec<u8>, Error> {
        self.compress(image, i32::from(Quality::LOW.value()))
    }

    /// Rotate `image` clockwise by 90, 180 or 270 degrees, keeping its format.
    pub fn rotate(&self, image: &[u8], degrees: i32) -> Result<Vec<u8>, Error> {
        let codec = self.codec()?;
        require_image(image)?;
        let rotation = Rotation::new(degrees)?;
        codec
            .rotate(image, rotation)
            .map_err(|e| native_failure(Operation::Rotate, e.0))
    }

    pub fn rotate90(&self, image: &[u8]) -> Result<Vec<u8>, Error> {
        self.rotate(image, 90)
    }

    pub fn rotate180(&self, image: &[u8]) -> Result<Vec<u8>, Error> {
        self.rotate(image, 180)
    }

    pub fn rotate270(&self, image: &[u8]) -> Result<Vec<u8>, Error> {
        self.rotate(image, 270)
    }

    /// Smoke test: feed the codec a bare PNG signature, which it must reject
    /// without crashing.
    ///
    /// Returns `true` only for a [`ErrorKind::NativeExecution`] rejection.
    /// Success or any other error (including a failed bootstrap) is `false`.
    pub fn test_library(&self) -> bool {
        match self.compress(&PNG_SIGNATURE, 50) {
            Ok(_) => false,
            Err(e) => e.kind() == ErrorKind::NativeExecution,
        }
    }

    /// Multi-line diagnostic summary of the platform and library.
    ///
    /// ```text
    /// Platform: linux (linux-x86_64)
    /// Architecture: x86_64
    /// Crate: fast-image 0.3.0
    /// Native Library: libfast_image-linux-x86_64.so
    /// Initialized: true
    /// ```
    pub fn platform_info(&self, env: &Environment) -> String {
        let initialized = self.state.is_initialized();
        let version = concat!("fast-image ", env!("CARGO_PKG_VERSION"));
        let lookup = resolve(&env.os_name, &env.os_arch)
            .and_then(|platform| describe(&platform).map(|d| (platform, d)));
        match lookup {
            Ok((platform, descriptor)) => format!(
                "Platform: {} ({})\nArchitecture: {}\nCrate: {}\nNative Library: {}\nInitialized: {}",
                env.os_name, platform, env.os_arch, version, descriptor.file_name, initialized
            ),
            Err(e) => format!(
                "Platform: {}\nArchitecture: {}\nCrate: {}\nError: {}\nInitialized: {}",
                env.os_name, env.os_arch, version, e, initialized
            ),
        }
    }
}

fn require_image(image: &[u8]) -> Result<(), Error> {
    if image.is_empty() {
        return Err(Error::invalid("image data must not be empty"));
    }
    Ok(())
}

fn native_failure(operation: Operation, message: String) -> Error {
    Error::NativeExecution { operation, message }
}
