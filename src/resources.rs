//! Lookup of native binaries by resource path (`native/<file name>`).
//!
//! Two sources exist:
//! - [`EmbeddedResources`]: files under the crate's `native/` directory,
//!   baked into the binary by `build.rs` with `include_bytes!`.
//! - [`DirectoryResources`]: an on-disk directory with the same layout,
//!   used for deployments that ship the codec next to the executable.
//!
//! [`LayeredResources`] consults them in order; the first hit wins.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

include!(concat!(env!("OUT_DIR"), "/embedded_natives.rs"));

/// A read-only namespace of resources addressed by `/`-separated relative paths.
pub trait ResourceSource: Send + Sync {
    /// Full content of the resource, or `Ok(None)` if it does not exist.
    fn read(&self, path: &str) -> io::Result<Option<Cow<'static, [u8]>>>;
}

/// Resources compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedResources;

impl EmbeddedResources {
    /// Resource paths available in this build.
    pub fn paths() -> impl Iterator<Item = &'static str> {
        EMBEDDED.iter().map(|(path, _)| *path)
    }
}

impl ResourceSource for EmbeddedResources {
    fn read(&self, path: &str) -> io::Result<Option<Cow<'static, [u8]>>> {
        Ok(EMBEDDED
            .iter()
            .find(|(p, _)| *p == path)
            .map(|(_, bytes)| Cow::Borrowed(*bytes)))
    }
}

/// Resources stored under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceSource for DirectoryResources {
    fn read(&self, path: &str) -> io::Result<Option<Cow<'static, [u8]>>> {
        let file = path
            .split('/')
            .filter(|s| !s.is_empty())
            .fold(self.root.clone(), |acc, seg| acc.join(seg));
        match std::fs::read(&file) {
            Ok(bytes) => Ok(Some(Cow::Owned(bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Ordered stack of sources; earlier layers shadow later ones.
#[derive(Default)]
pub struct LayeredResources {
    layers: Vec<Box<dyn ResourceSource>>,
}

impl LayeredResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl ResourceSource + 'static) -> Self {
        self.layers.push(Box::new(source));
        self
    }
}

impl ResourceSource for LayeredResources {
    fn read(&self, path: &str) -> io::Result<Option<Cow<'static, [u8]>>> {
        for layer in &self.layers {
            if let Some(bytes) = layer.read(path)? {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }
}
