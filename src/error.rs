//! Error taxonomy for the bootstrap and the public API.
//!
//! Errors are layered the same way the bootstrap is:
//!
//! | Type | Raised by | Recoverable |
//! |---|---|---|
//! | [`UnsupportedPlatform`] | [`platform::resolve`](crate::platform::resolve), [`descriptor::describe`](crate::descriptor::describe) | no |
//! | [`LoadError`] | [`LibraryLoader::load`](crate::loader::LibraryLoader) | no |
//! | [`InitError`] | [`bootstrap`](crate::bootstrap::bootstrap), wraps any of the above | no, cached |
//! | [`Error`] | every [`ImageApi`](crate::api::ImageApi) call | `InvalidArgument` / `NativeExecution` by changing input |
//!
//! [`Error`] is `Clone` so a cached bootstrap failure can be handed to every
//! caller: the [`InitError`] lives behind an `Arc` and each call receives a
//! pointer to the same value.

use crate::config::ConfigError;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// The host OS or (OS, architecture) pair has no registry entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedPlatform {
    #[error("Unsupported operating system: {0}")]
    OperatingSystem(String),
    #[error("Unsupported platform: {0}")]
    Platform(String),
}

/// A single failed step of resolving, extracting, or opening the codec library.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Unsupported(#[from] UnsupportedPlatform),
    #[error("Native library not found in resources: {resource}")]
    LibraryNotFound { resource: String },
    #[error("Failed to read resource {resource}: {source}")]
    Resource {
        resource: String,
        source: std::io::Error,
    },
    #[error("Failed to extract native library: {0}")]
    Extract(#[source] std::io::Error),
    #[error("Failed to load {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: libloading::Error,
    },
    #[error("Symbol `{symbol}` missing from {}: {source}", path.display())]
    Symbol {
        path: PathBuf,
        symbol: String,
        source: libloading::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Bootstrap failure: which platform was being initialized and why it failed.
#[derive(Error, Debug)]
#[error("Failed to load Fast Image native library for platform: {platform}")]
pub struct InitError {
    pub platform: String,
    #[source]
    pub cause: LoadError,
}

/// Which native entry point produced a [`Error::NativeExecution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Compress,
    Rotate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Compress => f.write_str("compression"),
            Operation::Rotate => f.write_str("rotation"),
        }
    }
}

/// Coarse classification of [`Error`], stable across message wording changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Initialization,
    InvalidArgument,
    NativeExecution,
}

/// Error returned by every public image operation.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Fast Image native library initialization failed")]
    Initialization(#[source] Arc<InitError>),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Native {operation} failed: {message}")]
    NativeExecution { operation: Operation, message: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Initialization(_) => ErrorKind::Initialization,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::NativeExecution { .. } => ErrorKind::NativeExecution,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}
