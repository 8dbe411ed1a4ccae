//! One-time initialization of the native codec.
//!
//! ```text
//! Uninitialized ──bootstrap ok──▶ Initialized
//!       │
//!       └────────bootstrap err──▶ Failed(cause)
//! ```
//!
//! Both outcomes are terminal. [`bootstrap`] is a plain function from an
//! [`Environment`] and a [`LibraryLoader`] to an [`InitState`]; the process
//! global ([`state`] / [`initialize`]) memoizes its single result in a
//! `OnceLock`, so concurrent first callers block until the one bootstrap
//! finishes and every later reader sees the same state without locking.
//! A failure is never retried.

use crate::config::Config;
use crate::descriptor::{LibraryDescriptor, describe};
use crate::error::{Error, InitError, LoadError};
use crate::loader::{LibraryLoader, NativeLoader};
use crate::native::NativeCodec;
use crate::platform::{Environment, PlatformId, resolve};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// A successfully loaded codec and what it was loaded for.
pub struct Loaded {
    pub platform: PlatformId,
    pub descriptor: &'static LibraryDescriptor,
    pub codec: Box<dyn NativeCodec>,
}

/// Outcome of the bootstrap.
pub enum InitState {
    Initialized(Loaded),
    Failed(Arc<InitError>),
}

impl InitState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, InitState::Initialized(_))
    }

    /// The codec, or the cached bootstrap failure.
    pub fn codec(&self) -> Result<&dyn NativeCodec, Error> {
        match self {
            InitState::Initialized(loaded) => Ok(loaded.codec.as_ref()),
            InitState::Failed(cause) => Err(Error::Initialization(Arc::clone(cause))),
        }
    }

    pub fn failure(&self) -> Option<&Arc<InitError>> {
        match self {
            InitState::Failed(cause) => Some(cause),
            InitState::Initialized(_) => None,
        }
    }
}

impl std::fmt::Debug for InitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InitState::Initialized(loaded) => f
                .debug_struct("Initialized")
                .field("platform", &loaded.platform)
                .field("library", &loaded.descriptor.file_name)
                .finish(),
            InitState::Failed(cause) => f.debug_tuple("Failed").field(cause).finish(),
        }
    }
}

/// Externally visible lifecycle of the process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Uninitialized,
    Initialized,
    Failed,
}

/// Resolve the platform, pick its binary, and load it.
pub fn bootstrap(env: &Environment, loader: &dyn LibraryLoader) -> InitState {
    let platform = match resolve(&env.os_name, &env.os_arch) {
        Ok(platform) => platform,
        Err(e) => return fail(env.platform_label(), e.into()),
    };
    debug!(platform = %platform, "resolved platform");

    let descriptor = match describe(&platform) {
        Ok(descriptor) => descriptor,
        Err(e) => return fail(platform.to_string(), e.into()),
    };

    match loader.load(descriptor) {
        Ok(codec) => InitState::Initialized(Loaded {
            platform,
            descriptor,
            codec,
        }),
        Err(e) => fail(platform.to_string(), e),
    }
}

fn fail(platform: String, cause: LoadError) -> InitState {
    let err = InitError { platform, cause };
    warn!(error = %err, cause = %err.cause, "native library initialization failed");
    InitState::Failed(Arc::new(err))
}

// =============================================================================
// Process-wide state
// =============================================================================

static STATE: OnceLock<InitState> = OnceLock::new();

/// The process-wide state, bootstrapping from [`Config::from_env`] on first use.
pub fn state() -> &'static InitState {
    STATE.get_or_init(|| match Config::from_env() {
        Ok(config) => bootstrap_with(&config),
        Err(e) => fail(Environment::current().platform_label(), e.into()),
    })
}

/// Bootstrap with an explicit configuration. If the state is already set
/// (by an earlier call or by [`state`]), that state is returned unchanged.
pub fn initialize(config: &Config) -> &'static InitState {
    STATE.get_or_init(|| bootstrap_with(config))
}

/// Current lifecycle stage, without triggering the bootstrap.
pub fn status() -> Status {
    match STATE.get() {
        None => Status::Uninitialized,
        Some(InitState::Initialized(_)) => Status::Initialized,
        Some(InitState::Failed(_)) => Status::Failed,
    }
}

fn bootstrap_with(config: &Config) -> InitState {
    bootstrap(&Environment::current(), &NativeLoader::from_config(&config.loader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, UnsupportedPlatform};
    use crate::test_helpers::{CountingLoader, ImageCodec};

    #[test]
    fn successful_load_records_platform_and_descriptor() {
        let loader = CountingLoader::succeeding(ImageCodec::new);
        let state = bootstrap(&Environment::new("Linux", "amd64"), &loader);

        match &state {
            InitState::Initialized(loaded) => {
                assert_eq!(loaded.platform.to_string(), "linux-x86_64");
                assert_eq!(loaded.descriptor.file_name, "libfast_image-linux-x86_64.so");
            }
            other => panic!("expected Initialized, got {other:?}"),
        }
        assert_eq!(loader.calls(), 1);
        assert_eq!(loader.requested(), vec!["libfast_image-linux-x86_64.so"]);
    }

    #[test]
    fn unsupported_os_never_reaches_loader() {
        let loader = CountingLoader::succeeding(ImageCodec::new);
        let state = bootstrap(&Environment::new("Plan 9", "x86_64"), &loader);

        let cause = state.failure().expect("failed state");
        assert!(matches!(
            cause.cause,
            LoadError::Unsupported(UnsupportedPlatform::OperatingSystem(_))
        ));
        assert_eq!(loader.calls(), 0);
    }

    #[test]
    fn unsupported_arch_never_reaches_loader() {
        let loader = CountingLoader::succeeding(ImageCodec::new);
        let state = bootstrap(&Environment::new("Windows 10", "x86"), &loader);

        let cause = state.failure().expect("failed state");
        assert_eq!(cause.platform, "windows-x86");
        assert!(matches!(
            cause.cause,
            LoadError::Unsupported(UnsupportedPlatform::Platform(_))
        ));
        assert_eq!(loader.calls(), 0);
    }

    #[test]
    fn loader_failure_is_wrapped_with_platform() {
        let loader = CountingLoader::not_found();
        let state = bootstrap(&Environment::new("Darwin", "arm64"), &loader);

        let cause = state.failure().expect("failed state");
        assert_eq!(cause.platform, "macos-aarch64");
        assert!(matches!(cause.cause, LoadError::LibraryNotFound { .. }));
        assert_eq!(
            cause.to_string(),
            "Failed to load Fast Image native library for platform: macos-aarch64"
        );
    }

    #[test]
    fn failed_state_replays_the_same_error() {
        let loader = CountingLoader::not_found();
        let state = bootstrap(&Environment::new("linux", "aarch64"), &loader);

        let first = state.codec().err().unwrap();
        let second = state.codec().err().unwrap();
        assert_eq!(first.kind(), ErrorKind::Initialization);
        match (first, second) {
            (Error::Initialization(a), Error::Initialization(b)) => assert!(Arc::ptr_eq(&a, &b)),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(loader.calls(), 1);
    }
}
