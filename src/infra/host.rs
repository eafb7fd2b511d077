//! Host platform detection
//!
//! Determines whether programs built for a target architecture can run on
//! this machine, either natively or through a binfmt_misc-registered QEMU
//! user-mode emulator.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;

use crate::config::defaults;
use crate::core::arch::Architecture;

/// Outcome of matching the host machine against the supported architectures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeMatch {
    /// Host runs this architecture natively
    Exact(Architecture),
    /// Host machine maps to several architectures and cannot be told apart
    ///
    /// A `mips64` kernel may be loongson3 or mips64r6el; the machine string
    /// alone does not say which.
    Indeterminate,
    /// Host is none of the supported architectures
    Unsupported,
}

/// Host machine type and emulator registrations
#[derive(Debug, Clone)]
pub struct HostPlatform {
    machine: String,
    binfmt_dir: PathBuf,
}

impl HostPlatform {
    /// Detect the running host, reading registrations from `binfmt_dir`
    pub fn detect(binfmt_dir: impl Into<PathBuf>) -> Self {
        Self {
            machine: detect_machine(),
            binfmt_dir: binfmt_dir.into(),
        }
    }

    /// Host with a known machine string, for tests and diagnostics
    pub fn with_machine(machine: impl Into<String>, binfmt_dir: impl Into<PathBuf>) -> Self {
        Self {
            machine: machine.into(),
            binfmt_dir: binfmt_dir.into(),
        }
    }

    /// Machine string as reported by `uname -m`
    pub fn machine(&self) -> &str {
        &self.machine
    }

    /// Match the machine string against the supported architectures
    pub fn native_architecture(&self) -> NativeMatch {
        match self.machine.as_str() {
            "x86_64" => NativeMatch::Exact(Architecture::Amd64),
            "aarch64" => NativeMatch::Exact(Architecture::Arm64),
            "riscv64" => NativeMatch::Exact(Architecture::Riscv64),
            "ppc" => NativeMatch::Exact(Architecture::Powerpc),
            "ppc64le" => NativeMatch::Exact(Architecture::Ppc64el),
            "mips64" => NativeMatch::Indeterminate,
            _ => NativeMatch::Unsupported,
        }
    }

    /// Whether `arch` binaries run without emulation
    ///
    /// An indeterminate host is never assumed to match.
    pub fn can_execute_natively(&self, arch: Architecture) -> bool {
        self.native_architecture() == NativeMatch::Exact(arch)
    }

    /// Whether `arch` binaries run natively or through emulation
    pub fn can_execute(&self, arch: Architecture) -> bool {
        self.can_execute_natively(arch) || self.has_emulation_support(arch)
    }

    /// Whether a working binfmt_misc emulator is registered for `arch`
    ///
    /// Every failure is logged and reported as `false`.
    pub fn has_emulation_support(&self, arch: Architecture) -> bool {
        self.emulation_interpreter(arch).is_some()
    }

    /// Interpreter path of the binfmt_misc registration for `arch`
    pub fn emulation_interpreter(&self, arch: Architecture) -> Option<PathBuf> {
        let binary = arch.emulation_binary_name();
        let entry = self.binfmt_dir.join(arch.binfmt_entry_name());

        let content = match std::fs::read_to_string(&entry) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Architecture {arch} is not registered with binfmt: {e}");
                return None;
            }
        };

        let mut lines = content.lines();
        if lines.next().map(str::trim) != Some("enabled") {
            tracing::error!("Architecture {arch} is not enabled with binfmt");
            tracing::debug!("Content of binfmt descriptor:\n{content}");
            return None;
        }

        let Some(interpreter) = lines.next().and_then(|line| match_interpreter(line, &binary))
        else {
            tracing::error!("Architecture {arch} does not have a valid interpreter");
            return None;
        };

        let resolved_name = std::fs::canonicalize(&interpreter)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));
        if resolved_name.as_deref() != Some(binary.as_str()) {
            tracing::error!(
                "Architecture {arch} has incorrect interpreter {} instead of {binary}",
                interpreter.display()
            );
            return None;
        }

        Some(interpreter)
    }
}

impl Default for HostPlatform {
    fn default() -> Self {
        Self::detect(defaults::BINFMT_DIR)
    }
}

/// Extract the interpreter path from an `interpreter <path>` line, requiring
/// the path to end in `binary`
fn match_interpreter(line: &str, binary: &str) -> Option<PathBuf> {
    let pattern = format!(r"^interpreter (?P<path>.+{})$", regex::escape(binary));
    let re = Regex::new(&pattern).ok()?;
    re.captures(line.trim())
        .map(|caps| Path::new(&caps["path"]).to_path_buf())
}

/// Machine string from `uname -m`, falling back to the compile target
fn detect_machine() -> String {
    Command::new("uname")
        .arg("-m")
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|machine| !machine.is_empty())
        .unwrap_or_else(|| std::env::consts::ARCH.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_binfmt_entry;
    use tempfile::TempDir;

    fn fake_emulator(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_native_match_table() {
        let host = |m: &str| HostPlatform::with_machine(m, "/nonexistent");
        assert_eq!(
            host("x86_64").native_architecture(),
            NativeMatch::Exact(Architecture::Amd64)
        );
        assert_eq!(
            host("ppc64le").native_architecture(),
            NativeMatch::Exact(Architecture::Ppc64el)
        );
        assert_eq!(host("mips64").native_architecture(), NativeMatch::Indeterminate);
        assert_eq!(host("s390x").native_architecture(), NativeMatch::Unsupported);
    }

    #[test]
    fn test_can_execute_natively() {
        let host = HostPlatform::with_machine("aarch64", "/nonexistent");
        assert!(host.can_execute_natively(Architecture::Arm64));
        assert!(!host.can_execute_natively(Architecture::Amd64));
    }

    #[test]
    fn test_mips_host_is_never_native() {
        let host = HostPlatform::with_machine("mips64", "/nonexistent");
        assert!(!host.can_execute_natively(Architecture::Loongson3));
        assert!(!host.can_execute_natively(Architecture::Mips64r6el));
    }

    #[test]
    fn test_detect_reports_a_machine() {
        let host = HostPlatform::detect("/nonexistent");
        assert!(!host.machine().is_empty());
    }

    #[test]
    fn test_emulation_missing_registration() {
        let temp = TempDir::new().unwrap();
        let host = HostPlatform::with_machine("x86_64", temp.path());
        assert!(!host.has_emulation_support(Architecture::Arm64));
    }

    #[test]
    fn test_emulation_supported() {
        let temp = TempDir::new().unwrap();
        let emulator = fake_emulator(temp.path(), "qemu-aarch64-static");
        write_binfmt_entry(temp.path(), "qemu-aarch64", true, &emulator);

        let host = HostPlatform::with_machine("x86_64", temp.path());
        assert!(host.has_emulation_support(Architecture::Arm64));
        assert!(host.can_execute(Architecture::Arm64));
        assert_eq!(
            host.emulation_interpreter(Architecture::Arm64),
            Some(emulator)
        );
    }

    #[test]
    fn test_emulation_disabled_registration() {
        let temp = TempDir::new().unwrap();
        let emulator = fake_emulator(temp.path(), "qemu-riscv64-static");
        write_binfmt_entry(temp.path(), "qemu-riscv64", false, &emulator);

        let host = HostPlatform::with_machine("x86_64", temp.path());
        assert!(!host.has_emulation_support(Architecture::Riscv64));
    }

    #[test]
    fn test_emulation_wrong_interpreter_name() {
        let temp = TempDir::new().unwrap();
        let emulator = fake_emulator(temp.path(), "qemu-aarch64");
        write_binfmt_entry(temp.path(), "qemu-aarch64", true, &emulator);

        let host = HostPlatform::with_machine("x86_64", temp.path());
        assert!(!host.has_emulation_support(Architecture::Arm64));
    }

    #[test]
    fn test_emulation_symlink_resolving_elsewhere() {
        let temp = TempDir::new().unwrap();
        let real = fake_emulator(temp.path(), "qemu-aarch64");
        let link = temp.path().join("qemu-aarch64-static");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        write_binfmt_entry(temp.path(), "qemu-aarch64", true, &link);

        let host = HostPlatform::with_machine("x86_64", temp.path());
        assert!(!host.has_emulation_support(Architecture::Arm64));
    }

    #[test]
    fn test_emulation_interpreter_missing_on_disk() {
        let temp = TempDir::new().unwrap();
        write_binfmt_entry(
            temp.path(),
            "qemu-ppc64le",
            true,
            &temp.path().join("qemu-ppc64le-static"),
        );

        let host = HostPlatform::with_machine("x86_64", temp.path());
        assert!(!host.has_emulation_support(Architecture::Ppc64el));
    }

    #[test]
    fn test_match_interpreter() {
        assert_eq!(
            match_interpreter("interpreter /usr/bin/qemu-ppc-static", "qemu-ppc-static"),
            Some(PathBuf::from("/usr/bin/qemu-ppc-static"))
        );
        assert_eq!(
            match_interpreter("interpreter /usr/bin/qemu-ppc", "qemu-ppc-static"),
            None
        );
        assert_eq!(match_interpreter("flags: OCF", "qemu-ppc-static"), None);
    }
}
