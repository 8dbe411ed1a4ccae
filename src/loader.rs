//! Extraction and loading of the native codec library.
//!
//! Dynamic loaders need a real file, but the codec ships as a resource
//! (embedded in the binary or in a resource directory). [`NativeLoader`]
//! bridges the two:
//!
//! 1. Derive the resource path from the [`LibraryDescriptor`] (`native/<file name>`).
//! 2. Read it from the [`ResourceSource`]; absence is [`LoadError::LibraryNotFound`].
//! 3. Write it to a fresh, uniquely named temp file that keeps the platform
//!    extension (`.so`, `.dylib`, `.dll`), since some loaders look at it.
//! 4. Open that file by absolute path and resolve the entry points.
//! 5. Register the file for removal at process exit.
//!
//! Removal is best effort. A loaded library may still be mapped (Windows
//! refuses to delete it), and failure to delete is not an error.
//! Libraries are never unloaded: the codec lives in a process-wide static.

use crate::config::LoaderConfig;
use crate::descriptor::LibraryDescriptor;
use crate::error::LoadError;
use crate::native::{LibraryCodec, NativeCodec};
use crate::resources::{DirectoryResources, EmbeddedResources, LayeredResources, ResourceSource};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};
use tracing::{debug, info};

/// Prefix of every extracted library file name.
pub const TEMP_PREFIX: &str = "fast_image_";

/// Turns a [`LibraryDescriptor`] into a ready-to-call codec.
pub trait LibraryLoader {
    fn load(&self, descriptor: &LibraryDescriptor) -> Result<Box<dyn NativeCodec>, LoadError>;
}

/// Production loader: resource lookup, temp-file extraction, `dlopen`.
pub struct NativeLoader {
    resources: Box<dyn ResourceSource>,
    temp_dir: Option<PathBuf>,
    serialize_calls: bool,
}

impl NativeLoader {
    pub fn new(resources: impl ResourceSource + 'static) -> Self {
        Self {
            resources: Box::new(resources),
            temp_dir: None,
            serialize_calls: true,
        }
    }

    /// Resource directory (if configured) layered over the embedded resources.
    pub fn from_config(config: &LoaderConfig) -> Self {
        let mut layers = LayeredResources::new();
        if let Some(dir) = &config.resource_dir {
            layers = layers.with(DirectoryResources::new(dir));
        }
        layers = layers.with(EmbeddedResources);

        Self {
            resources: Box::new(layers),
            temp_dir: config.temp_dir.clone(),
            serialize_calls: config.serialize_native_calls,
        }
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn serialize_calls(mut self, serialize: bool) -> Self {
        self.serialize_calls = serialize;
        self
    }

    /// Copy the descriptor's resource into a new temp file and return its
    /// absolute path. The file is registered for removal at process exit.
    pub fn extract(&self, descriptor: &LibraryDescriptor) -> Result<PathBuf, LoadError> {
        let resource = descriptor.resource_path();
        let bytes = self
            .resources
            .read(&resource)
            .map_err(|source| LoadError::Resource {
                resource: resource.clone(),
                source,
            })?
            .ok_or_else(|| LoadError::LibraryNotFound {
                resource: resource.clone(),
            })?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(descriptor.extension);
        // An absolute directory makes the kept path absolute, so the file is
        // registered for removal under the same path it is opened by.
        let dir = match &self.temp_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir(),
        };
        let dir = std::path::absolute(&dir).map_err(LoadError::Extract)?;
        let mut file = builder.tempfile_in(&dir).map_err(LoadError::Extract)?;

        file.write_all(&bytes).map_err(LoadError::Extract)?;
        file.flush().map_err(LoadError::Extract)?;

        // Close the handle and stop tempfile from deleting it on drop: the
        // loader needs the file to outlive this function.
        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| LoadError::Extract(e.error))?;
        remove_on_exit(path.clone());

        debug!(
            resource = %resource,
            path = %path.display(),
            bytes = bytes.len(),
            "extracted native library"
        );
        Ok(path)
    }
}

impl LibraryLoader for NativeLoader {
    fn load(&self, descriptor: &LibraryDescriptor) -> Result<Box<dyn NativeCodec>, LoadError> {
        let path = self.extract(descriptor)?;
        // The library comes from our own resource namespace and is built
        // against the ABI in `native::sys`.
        let codec = unsafe { LibraryCodec::open(&path, self.serialize_calls) }?;
        info!(
            platform = %descriptor.platform,
            path = %path.display(),
            "loaded native library"
        );
        Ok(Box::new(codec))
    }
}

// =============================================================================
// Exit-time cleanup
// =============================================================================

static PENDING_REMOVAL: Mutex<Vec<PathBuf>> = Mutex::new(Vec::new());
static REGISTER_HOOK: Once = Once::new();

/// Schedule `path` for deletion when the process exits normally.
pub fn remove_on_exit(path: PathBuf) {
    REGISTER_HOOK.call_once(|| {
        // A failed registration only means the file outlives the process.
        unsafe { libc::atexit(remove_pending) };
    });
    if let Ok(mut pending) = PENDING_REMOVAL.lock() {
        pending.push(path);
    }
}

/// Paths currently scheduled for removal.
pub fn pending_removal() -> Vec<PathBuf> {
    PENDING_REMOVAL
        .lock()
        .map(|p| p.clone())
        .unwrap_or_default()
}

extern "C" fn remove_pending() {
    let paths = match PENDING_REMOVAL.lock() {
        Ok(mut pending) => std::mem::take(&mut *pending),
        Err(_) => return,
    };
    for path in paths {
        remove_quietly(&path);
    }
}

fn remove_quietly(path: &Path) {
    let _ = std::fs::remove_file(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{REGISTRY, describe};
    use crate::platform::resolve;
    use tempfile::TempDir;

    fn linux_descriptor() -> &'static LibraryDescriptor {
        describe(&resolve("linux", "x86_64").unwrap()).unwrap()
    }

    fn resource_dir(descriptor: &LibraryDescriptor, bytes: &[u8]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let native = tmp.path().join("native");
        std::fs::create_dir_all(&native).unwrap();
        std::fs::write(native.join(descriptor.file_name), bytes).unwrap();
        tmp
    }

    #[test]
    fn extract_copies_bytes_with_platform_suffix() {
        let descriptor = linux_descriptor();
        let res = resource_dir(descriptor, b"\x7fELF fake library body");
        let out = TempDir::new().unwrap();
        let loader = NativeLoader::new(DirectoryResources::new(res.path())).temp_dir(out.path());

        let path = loader.extract(descriptor).unwrap();

        assert!(path.is_absolute());
        assert!(path.starts_with(std::path::absolute(out.path()).unwrap()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(TEMP_PREFIX), "{name}");
        assert!(name.ends_with(".so"), "{name}");
        assert_eq!(std::fs::read(&path).unwrap(), b"\x7fELF fake library body");
        assert!(pending_removal().contains(&path));
    }

    #[test]
    fn relative_temp_dir_still_registers_an_absolute_path() {
        let descriptor = linux_descriptor();
        let res = resource_dir(descriptor, b"relative");
        // created under the working directory so it can be named relatively
        let out = TempDir::new_in(".").unwrap();
        let relative = Path::new(".").join(out.path().file_name().unwrap());
        let loader = NativeLoader::new(DirectoryResources::new(res.path())).temp_dir(&relative);

        let path = loader.extract(descriptor).unwrap();

        assert!(path.is_absolute(), "{}", path.display());
        assert!(path.is_file());
        assert!(pending_removal().contains(&path));
    }

    #[test]
    fn every_extraction_gets_a_fresh_file() {
        let descriptor = &REGISTRY[5];
        let res = resource_dir(descriptor, b"dylib");
        let out = TempDir::new().unwrap();
        let loader = NativeLoader::new(DirectoryResources::new(res.path())).temp_dir(out.path());

        let a = loader.extract(descriptor).unwrap();
        let b = loader.extract(descriptor).unwrap();
        assert_ne!(a, b);
        assert!(a.to_str().unwrap().ends_with(".dylib"));
    }

    #[test]
    fn missing_resource_is_library_not_found() {
        let empty = TempDir::new().unwrap();
        let loader = NativeLoader::new(DirectoryResources::new(empty.path()));

        let err = loader.load(linux_descriptor()).err().unwrap();
        match err {
            LoadError::LibraryNotFound { resource } => {
                assert_eq!(resource, "native/libfast_image-linux-x86_64.so")
            }
            other => panic!("expected LibraryNotFound, got {other}"),
        }
    }

    #[test]
    fn corrupt_binary_fails_to_open() {
        let descriptor = linux_descriptor();
        let res = resource_dir(descriptor, b"not a shared object");
        let out = TempDir::new().unwrap();
        let loader = NativeLoader::new(DirectoryResources::new(res.path())).temp_dir(out.path());

        let err = loader.load(descriptor).err().unwrap();
        assert!(matches!(err, LoadError::Open { .. }), "{err}");
    }

    #[test]
    fn missing_temp_dir_is_extract_error() {
        let descriptor = linux_descriptor();
        let res = resource_dir(descriptor, b"bytes");
        let loader = NativeLoader::new(DirectoryResources::new(res.path()))
            .temp_dir("/nonexistent/fast-image-temp");

        let err = loader.extract(descriptor).unwrap_err();
        assert!(matches!(err, LoadError::Extract(_)), "{err}");
    }

    #[test]
    fn from_config_prefers_resource_dir() {
        let descriptor = linux_descriptor();
        let res = resource_dir(descriptor, b"from disk");
        let out = TempDir::new().unwrap();
        let config = LoaderConfig {
            resource_dir: Some(res.path().to_path_buf()),
            temp_dir: Some(out.path().to_path_buf()),
            serialize_native_calls: true,
        };

        let path = NativeLoader::from_config(&config).extract(descriptor).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"from disk");
    }

    #[test]
    fn quiet_removal_ignores_missing_files() {
        remove_quietly(Path::new("/nonexistent/fast_image_gone.so"));
    }
}
