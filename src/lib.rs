//! # Fast Image
//!
//! Image recompression and rotation backed by a native codec library that is
//! shipped inside the package, one binary per supported platform. At first use
//! the crate works out which binary fits the host, extracts it to a temporary
//! file, opens it, and routes every call through it.
//!
//! ```no_run
//! let jpeg = std::fs::read("photo.jpg")?;
//! let smaller = fast_image::compress(&jpeg, 70)?;
//! let upright = fast_image::rotate90(&smaller)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture: Resolve, Extract, Load, Call
//!
//! ```text
//! 1. Resolve   OS + arch strings  →  PlatformId          (platform)
//! 2. Describe  PlatformId         →  LibraryDescriptor   (descriptor)
//! 3. Extract   resource bytes     →  temp file on disk   (resources, loader)
//! 4. Load      temp file          →  NativeCodec         (loader, native)
//! 5. Call      ImageApi           →  native compress/rotate (api)
//! ```
//!
//! Steps 1–4 run exactly once per process, inside [`bootstrap`]. Their outcome,
//! success or failure, is cached; a failure is replayed to every later call
//! instead of being retried.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`platform`] | Classifies OS/architecture strings into a [`PlatformId`] |
//! | [`descriptor`] | Static registry of per-platform library file names |
//! | [`resources`] | Where library bytes come from: embedded at build time or a directory |
//! | [`loader`] | Extracts a library to a temp file and opens it; exit-time cleanup |
//! | [`native`] | Raw C ABI of the codec and its safe wrapper |
//! | [`bootstrap`] | One-time initialization state machine and the process-wide state |
//! | [`params`] | Validated `Quality` and `Rotation` |
//! | [`api`] | [`ImageApi`]: argument validation and native dispatch |
//! | [`error`] | Error taxonomy shared by all of the above |
//! | [`format`] | PNG/JPEG signature sniffing |
//! | [`config`] | TOML + environment configuration |
//! | [`batch`] | Parallel compress-and-rotate over a directory of images |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Libraries Embedded by `build.rs`
//!
//! Every file under `native/` is compiled into the crate with `include_bytes!`,
//! so a single artifact carries the codec for every platform. A directory given
//! by `loader.resource_dir` (or `FAST_IMAGE_RESOURCE_DIR`) is consulted first,
//! which lets a deployment swap in a newer codec without rebuilding.
//!
//! ## Uniquely Named Temp Files
//!
//! The extracted library gets a unique name with a `fast_image_` prefix and
//! keeps its platform extension, since some loaders refuse files without one.
//! The file is removed by a process-exit hook. A crash leaves it behind, which
//! is accepted.
//!
//! ## Serialized Native Calls
//!
//! Nothing promises that the codec is reentrant, so by default one native call
//! runs at a time. `loader.serialize_native_calls = false` lifts the lock for a
//! codec known to be thread-safe.
//!
//! ## Global State Without Globals in the Logic
//!
//! [`bootstrap::bootstrap`] is a plain function of an [`Environment`] and a
//! [`loader::LibraryLoader`]. Only the thin wrappers below touch the
//! process-wide `OnceLock`, so everything else is tested with in-memory
//! loaders and test codecs.

pub mod api;
pub mod batch;
pub mod bootstrap;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod format;
pub mod loader;
pub mod native;
pub mod output;
pub mod params;
pub mod platform;
pub mod resources;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use api::ImageApi;
pub use bootstrap::{InitState, Status};
pub use config::Config;
pub use error::{Error, ErrorKind, InitError};
pub use params::{Quality, Rotation};
pub use platform::{Environment, PlatformId};

/// [`ImageApi`] bound to the process-wide state, bootstrapping on first use.
pub fn api() -> ImageApi<'static> {
    ImageApi::new(bootstrap::state())
}

/// The process-wide state, bootstrapping from the environment on first use.
pub fn state() -> &'static InitState {
    bootstrap::state()
}

/// Bootstrap with an explicit configuration instead of the environment.
///
/// Only the first initialization counts: if the state already exists, it is
/// returned unchanged.
pub fn initialize(config: &Config) -> &'static InitState {
    bootstrap::initialize(config)
}

/// Lifecycle of the process-wide state. Never triggers the bootstrap.
pub fn status() -> Status {
    bootstrap::status()
}

/// Recompress `image` at `quality` (0–100), keeping its format.
pub fn compress(image: &[u8], quality: i32) -> Result<Vec<u8>, Error> {
    api().compress(image, quality)
}

pub fn compress_high(image: &[u8]) -> Result<Vec<u8>, Error> {
    api().compress_high(image)
}

pub fn compress_medium(image: &[u8]) -> Result<Vec<u8>, Error> {
    api().compress_medium(image)
}

pub fn compress_low(image: &[u8]) -> Result<Vec<u8>, Error> {
    api().compress_low(image)
}

/// Rotate `image` by 90, 180 or 270 degrees, keeping its format.
pub fn rotate(image: &[u8], degrees: i32) -> Result<Vec<u8>, Error> {
    api().rotate(image, degrees)
}

pub fn rotate90(image: &[u8]) -> Result<Vec<u8>, Error> {
    api().rotate90(image)
}

pub fn rotate180(image: &[u8]) -> Result<Vec<u8>, Error> {
    api().rotate180(image)
}

pub fn rotate270(image: &[u8]) -> Result<Vec<u8>, Error> {
    api().rotate270(image)
}

/// `true` when the loaded codec rejects malformed input cleanly.
pub fn test_library() -> bool {
    api().test_library()
}

/// Diagnostic summary of the host platform and the codec library.
pub fn platform_info() -> String {
    api().platform_info(&Environment::current())
}
