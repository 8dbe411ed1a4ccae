//! Host platform classification.
//!
//! Maps raw operating-system and architecture strings onto the small set of
//! identifiers the [`descriptor`](crate::descriptor) registry is keyed by.
//! Classification is substring-based and case-insensitive so it accepts the
//! spellings different toolchains report (`amd64`, `x86_64`, `arm64`,
//! `aarch64`, `Mac OS X`, `darwin`, ...).
//!
//! | Input contains | Architecture |
//! |---|---|
//! | `64` and `arm`/`aarch` | `aarch64` |
//! | `64` | `x86_64` |
//! | `86` | `x86` |
//! | `arm`/`aarch` | `aarch64` |
//! | anything else | passed through verbatim |
//!
//! An unrecognized architecture is not an error here; it simply has no
//! registry entry and fails at [`describe`](crate::descriptor::describe).
//! An unrecognized OS fails immediately.

use crate::error::UnsupportedPlatform;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Linux,
    MacOs,
}

impl OsFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Linux => "linux",
            OsFamily::MacOs => "macos",
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_64,
    Aarch64,
    X86,
    /// Unclassified architecture, kept as reported (lowercased).
    Other(String),
}

impl Arch {
    pub fn as_str(&self) -> &str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::X86 => "x86",
            Arch::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An (OS family, architecture) pair. Displays as `{os}-{arch}`, e.g. `linux-x86_64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformId {
    pub os: OsFamily,
    pub arch: Arch,
}

impl PlatformId {
    pub const fn new(os: OsFamily, arch: Arch) -> Self {
        Self { os, arch }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

/// Raw OS/architecture strings the bootstrap classifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub os_name: String,
    pub os_arch: String,
}

impl Environment {
    pub fn new(os_name: impl Into<String>, os_arch: impl Into<String>) -> Self {
        Self {
            os_name: os_name.into(),
            os_arch: os_arch.into(),
        }
    }

    /// The platform this binary was compiled for, as reported by `std::env::consts`.
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// `{os}-{arch}` for diagnostics: the resolved identifier when the OS is
    /// recognized, the raw strings otherwise.
    pub fn platform_label(&self) -> String {
        match resolve(&self.os_name, &self.os_arch) {
            Ok(platform) => platform.to_string(),
            Err(_) => format!("{}-{}", self.os_name, self.os_arch),
        }
    }
}

fn is_arm(arch: &str) -> bool {
    arch.contains("aarch") || arch.contains("arm")
}

/// Classify an architecture string. Never fails; see the [module docs](self).
pub fn normalize_arch(os_arch: &str) -> Arch {
    let arch = os_arch.to_lowercase();
    if arch.contains("64") {
        if is_arm(&arch) {
            Arch::Aarch64
        } else {
            Arch::X86_64
        }
    } else if arch.contains("86") {
        Arch::X86
    } else if is_arm(&arch) {
        Arch::Aarch64
    } else {
        Arch::Other(arch)
    }
}

/// Classify an OS string, failing if it is none of Windows, Linux, or macOS.
pub fn classify_os(os_name: &str) -> Result<OsFamily, UnsupportedPlatform> {
    let os = os_name.to_lowercase();
    if os.contains("windows") {
        Ok(OsFamily::Windows)
    } else if os.contains("linux") {
        Ok(OsFamily::Linux)
    } else if os.contains("mac") || os.contains("darwin") {
        Ok(OsFamily::MacOs)
    } else {
        Err(UnsupportedPlatform::OperatingSystem(os_name.to_string()))
    }
}

/// Resolve raw OS/architecture strings into a [`PlatformId`].
pub fn resolve(os_name: &str, os_arch: &str) -> Result<PlatformId, UnsupportedPlatform> {
    let arch = normalize_arch(os_arch);
    let os = classify_os(os_name)?;
    Ok(PlatformId::new(os, arch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_supported_pairs() {
        let cases = [
            ("Windows 11", "amd64", "windows-x86_64"),
            ("Windows 10", "aarch64", "windows-aarch64"),
            ("windows", "x86_64", "windows-x86_64"),
            ("Linux", "amd64", "linux-x86_64"),
            ("linux", "x86_64", "linux-x86_64"),
            ("linux", "aarch64", "linux-aarch64"),
            ("Mac OS X", "x86_64", "macos-x86_64"),
            ("Mac OS X", "aarch64", "macos-aarch64"),
            ("macos", "arm64", "macos-aarch64"),
            ("Darwin", "arm64", "macos-aarch64"),
        ];
        for (os, arch, expected) in cases {
            let platform = resolve(os, arch).unwrap();
            assert_eq!(platform.to_string(), expected, "resolve({os:?}, {arch:?})");
        }
    }

    #[test]
    fn arch_markers() {
        assert_eq!(normalize_arch("X86_64"), Arch::X86_64);
        assert_eq!(normalize_arch("ARM64"), Arch::Aarch64);
        assert_eq!(normalize_arch("i386"), Arch::X86);
        assert_eq!(normalize_arch("x86"), Arch::X86);
        // ARM without a 64-bit marker still maps to aarch64
        assert_eq!(normalize_arch("arm"), Arch::Aarch64);
        assert_eq!(normalize_arch("armv7l"), Arch::Aarch64);
    }

    #[test]
    fn unknown_arch_passes_through() {
        assert_eq!(normalize_arch("RISCV"), Arch::Other("riscv".into()));
        let platform = resolve("linux", "riscv").unwrap();
        assert_eq!(platform.to_string(), "linux-riscv");
    }

    #[test]
    fn unknown_os_is_rejected() {
        for os in ["FreeBSD", "SunOS", "", "haiku"] {
            let err = resolve(os, "x86_64").unwrap_err();
            assert_eq!(err, UnsupportedPlatform::OperatingSystem(os.to_string()));
        }
    }

    #[test]
    fn platform_label_falls_back_to_raw_strings() {
        assert_eq!(Environment::new("Linux", "amd64").platform_label(), "linux-x86_64");
        assert_eq!(Environment::new("Plan 9", "mips").platform_label(), "Plan 9-mips");
    }

    #[test]
    fn current_environment_uses_compile_target() {
        let env = Environment::current();
        assert_eq!(env.os_name, std::env::consts::OS);
        assert_eq!(env.os_arch, std::env::consts::ARCH);
    }
}
