//! Architecture and variant catalog
//!
//! Closed sets of the hardware architectures and distribution variants
//! AOSC OS publishes, with the per-architecture emulation and path mappings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ArchError;

/// Hardware architecture supported by AOSC OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    /// x86-64
    Amd64,
    /// AArch64
    Arm64,
    /// Loongson 3 (MIPS64 little endian, r2)
    Loongson3,
    /// 32-bit big endian PowerPC
    Powerpc,
    /// 64-bit little endian PowerPC
    Ppc64el,
    /// RISC-V 64
    Riscv64,
    /// MIPS64 release 6, little endian
    Mips64r6el,
}

impl Architecture {
    /// Every supported architecture
    pub const ALL: [Architecture; 7] = [
        Architecture::Amd64,
        Architecture::Arm64,
        Architecture::Loongson3,
        Architecture::Powerpc,
        Architecture::Ppc64el,
        Architecture::Riscv64,
        Architecture::Mips64r6el,
    ];

    /// Identifier used by AOSC OS (and the release manifest)
    pub fn as_str(self) -> &'static str {
        match self {
            Architecture::Amd64 => "amd64",
            Architecture::Arm64 => "arm64",
            Architecture::Loongson3 => "loongson3",
            Architecture::Powerpc => "powerpc",
            Architecture::Ppc64el => "ppc64el",
            Architecture::Riscv64 => "riscv64",
            Architecture::Mips64r6el => "mips64r6el",
        }
    }

    /// Architecture name in QEMU nomenclature
    pub fn qemu_arch(self) -> &'static str {
        match self {
            Architecture::Amd64 => "x86_64",
            Architecture::Arm64 => "aarch64",
            Architecture::Loongson3 | Architecture::Mips64r6el => "mips64el",
            Architecture::Powerpc => "ppc",
            Architecture::Ppc64el => "ppc64le",
            Architecture::Riscv64 => "riscv64",
        }
    }

    /// File name of the static user-mode emulator for this architecture
    pub fn emulation_binary_name(self) -> String {
        format!("qemu-{}-static", self.qemu_arch())
    }

    /// Name of the binfmt_misc registration entry for this architecture
    pub fn binfmt_entry_name(self) -> String {
        format!("qemu-{}", self.qemu_arch())
    }

    /// Standard sysroot location below `base`
    pub fn standard_sysroot(self, base: &Path) -> PathBuf {
        base.join(self.as_str())
    }

    fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ArchError::InvalidArchitecture {
                name: s.to_string(),
                supported: Self::supported_list(),
            })
    }
}

/// Distribution variant published in the release manifest
///
/// Only Base and BuildKit are useful as cross-compiling sysroots; the rest
/// are listed so every manifest group has a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    /// Minimal system
    Base,
    /// Base plus the build toolchain
    #[default]
    BuildKit,
    /// Server tools
    Server,
    /// Desktop environment
    Desktop,
    /// Desktop with the proprietary NVIDIA driver
    DesktopNvidia,
    /// Retro X11 flavor
    X11,
}

impl Variant {
    /// Every known variant
    pub const ALL: [Variant; 6] = [
        Variant::Base,
        Variant::BuildKit,
        Variant::Server,
        Variant::Desktop,
        Variant::DesktopNvidia,
        Variant::X11,
    ];

    /// Label as it appears in the manifest
    pub fn label(self) -> &'static str {
        match self {
            Variant::Base => "Base",
            Variant::BuildKit => "BuildKit",
            Variant::Server => "Server",
            Variant::Desktop => "Desktop",
            Variant::DesktopNvidia => "Desktop (with NVIDIA driver)",
            Variant::X11 => "X11",
        }
    }

    /// Short command-line alias
    pub fn alias(self) -> &'static str {
        match self {
            Variant::Base => "base",
            Variant::BuildKit => "buildkit",
            Variant::Server => "server",
            Variant::Desktop => "desktop",
            Variant::DesktopNvidia => "desktop-nvidia",
            Variant::X11 => "x11",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Variant {
    type Err = ArchError;

    /// Accepts the manifest label or the lowercase alias
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.label() == s || v.alias() == s)
            .ok_or_else(|| ArchError::InvalidVariant {
                name: s.to_string(),
                supported: Self::ALL
                    .iter()
                    .map(|v| v.alias())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
