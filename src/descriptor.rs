//! Registry of native codec binaries, one per supported platform.
//!
//! File names follow `{prefix}fast_image-{os}-{arch}{ext}`: Unix-like systems
//! use the `lib` prefix, Windows does not.
//!
//! | Platform | File |
//! |---|---|
//! | windows-x86_64 | `fast_image-windows-x86_64.dll` |
//! | windows-aarch64 | `fast_image-windows-aarch64.dll` |
//! | linux-x86_64 | `libfast_image-linux-x86_64.so` |
//! | linux-aarch64 | `libfast_image-linux-aarch64.so` |
//! | macos-x86_64 | `libfast_image-macos-x86_64.dylib` |
//! | macos-aarch64 | `libfast_image-macos-aarch64.dylib` |
//!
//! 32-bit x86 and unclassified architectures are deliberately absent.

use crate::error::UnsupportedPlatform;
use crate::platform::{Arch, OsFamily, PlatformId};

/// Resource namespace every native binary lives under.
pub const RESOURCE_PREFIX: &str = "native/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryDescriptor {
    pub platform: PlatformId,
    pub file_name: &'static str,
    /// Extension including the leading dot.
    pub extension: &'static str,
}

impl LibraryDescriptor {
    const fn new(
        os: OsFamily,
        arch: Arch,
        file_name: &'static str,
        extension: &'static str,
    ) -> Self {
        Self {
            platform: PlatformId::new(os, arch),
            file_name,
            extension,
        }
    }

    /// Path of this binary inside the resource namespace, e.g. `native/libfast_image-linux-x86_64.so`.
    pub fn resource_path(&self) -> String {
        format!("{RESOURCE_PREFIX}{}", self.file_name)
    }
}

pub static REGISTRY: [LibraryDescriptor; 6] = [
    LibraryDescriptor::new(
        OsFamily::Windows,
        Arch::X86_64,
        "fast_image-windows-x86_64.dll",
        ".dll",
    ),
    LibraryDescriptor::new(
        OsFamily::Windows,
        Arch::Aarch64,
        "fast_image-windows-aarch64.dll",
        ".dll",
    ),
    LibraryDescriptor::new(
        OsFamily::Linux,
        Arch::X86_64,
        "libfast_image-linux-x86_64.so",
        ".so",
    ),
    LibraryDescriptor::new(
        OsFamily::Linux,
        Arch::Aarch64,
        "libfast_image-linux-aarch64.so",
        ".so",
    ),
    LibraryDescriptor::new(
        OsFamily::MacOs,
        Arch::X86_64,
        "libfast_image-macos-x86_64.dylib",
        ".dylib",
    ),
    LibraryDescriptor::new(
        OsFamily::MacOs,
        Arch::Aarch64,
        "libfast_image-macos-aarch64.dylib",
        ".dylib",
    ),
];

/// Look up the binary for `platform`.
pub fn describe(platform: &PlatformId) -> Result<&'static LibraryDescriptor, UnsupportedPlatform> {
    REGISTRY
        .iter()
        .find(|d| &d.platform == platform)
        .ok_or_else(|| UnsupportedPlatform::Platform(platform.to_string()))
}
