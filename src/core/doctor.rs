//! Doctor command logic
//!
//! Checks that the host tools abcross shells out to are installed and
//! whether the selected architecture can run on this machine.

use crate::core::arch::Architecture;
use crate::infra::host::{HostPlatform, NativeMatch};

/// One host tool or capability and whether it is usable
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Tool or capability, with what it is used for
    pub name: String,
    /// Usable on this host
    pub passed: bool,
    /// Where the tool was found, or how the architecture runs
    pub detail: Option<String>,
    /// Why it is not usable
    pub error: Option<String>,
    /// How to make it usable
    pub suggestion: Option<String>,
    /// Failing it makes `doctor` exit non-zero
    pub required: bool,
}

impl CheckResult {
    /// Usable item
    pub fn pass(name: &str, detail: Option<String>, required: bool) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail,
            error: None,
            suggestion: None,
            required,
        }
    }

    /// Unusable item
    pub fn fail(name: &str, error: &str, suggestion: Option<&str>, required: bool) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: None,
            error: Some(error.to_string()),
            suggestion: suggestion.map(String::from),
            required,
        }
    }
}

/// Everything `doctor` looked at, in check order
#[derive(Debug, Default)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    /// Report with no checks yet
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_check(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    /// No required tool is missing
    pub fn all_required_passed(&self) -> bool {
        self.checks
            .iter()
            .filter(|c| c.required)
            .all(|c| c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Required tools that are missing
    pub fn failed_required(&self) -> Vec<&CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .collect()
    }

    /// 0 when every required tool is present, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.all_required_passed() {
            0
        } else {
            1
        }
    }
}

/// Check that `program` is on `PATH`
pub fn check_tool(program: &str, purpose: &str, suggestion: &str) -> CheckResult {
    let name = format!("{program} ({purpose})");
    match which::which(program) {
        Ok(path) => CheckResult::pass(&name, Some(path.display().to_string()), true),
        Err(_) => CheckResult::fail(
            &name,
            &format!("{program} not found in PATH"),
            Some(suggestion),
            true,
        ),
    }
}

/// Check whether programs built for `arch` can run on `host`
pub fn check_execution(arch: Architecture, host: &HostPlatform) -> CheckResult {
    let name = format!("Running {arch} programs");
    if host.can_execute_natively(arch) {
        return CheckResult::pass(&name, Some("native".to_string()), false);
    }
    if let Some(interpreter) = host.emulation_interpreter(arch) {
        return CheckResult::pass(
            &name,
            Some(format!("emulated by {}", interpreter.display())),
            false,
        );
    }

    let error = match host.native_architecture() {
        NativeMatch::Indeterminate => format!(
            "{} host cannot be matched to {arch} and no emulator is registered",
            host.machine()
        ),
        _ => format!("no binfmt_misc emulator registered for {arch}"),
    };
    let suggestion = format!(
        "Install {} and register it with binfmt_misc (needed by enter and unpack)",
        arch.emulation_binary_name()
    );
    CheckResult::fail(&name, &error, Some(&suggestion), false)
}

/// Run all doctor checks
pub fn run_doctor(arch: Architecture, host: &HostPlatform, escalation: Option<&str>) -> DoctorReport {
    let mut report = DoctorReport::new();

    if let Some(program) = escalation {
        report.add_check(check_tool(
            program,
            "privilege escalation",
            "Install it, or set `escalation` in config.toml",
        ));
    }
    report.add_check(check_tool(
        "tar",
        "extraction",
        "Install GNU tar with your package manager",
    ));
    report.add_check(check_tool(
        "systemd-nspawn",
        "containers",
        "Install systemd-container (or your distribution's equivalent)",
    ));
    report.add_check(check_tool(
        "dpkg",
        "package unpacking",
        "Install dpkg with your package manager",
    ));
    report.add_check(check_execution(arch, host));

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::write_binfmt_entry;
    use tempfile::TempDir;

    #[test]
    fn test_check_result_fail() {
        let result = CheckResult::fail("test", "error", Some("suggestion"), false);
        assert!(!result.passed);
        assert_eq!(result.error, Some("error".to_string()));
        assert_eq!(result.suggestion, Some("suggestion".to_string()));
        assert!(!result.required);
    }

    #[test]
    fn test_report_exit_code_ignores_optional_failures() {
        let mut report = DoctorReport::new();
        report.add_check(CheckResult::pass("a", None, true));
        report.add_check(CheckResult::fail("b", "err", None, false));
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.exit_code(), 0);

        report.add_check(CheckResult::fail("c", "err", None, true));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failed_required().len(), 1);
    }

    #[test]
    fn test_check_tool() {
        let found = check_tool("sh", "shell", "install a shell");
        assert!(found.passed);
        assert!(found.detail.is_some());

        let missing = check_tool("definitely-not-a-real-program-abcross", "nothing", "none");
        assert!(!missing.passed);
        assert!(missing.required);
    }

    #[test]
    fn test_check_execution_native() {
        let host = HostPlatform::with_machine("x86_64", "/nonexistent");
        let result = check_execution(Architecture::Amd64, &host);
        assert!(result.passed);
        assert_eq!(result.detail.as_deref(), Some("native"));
    }

    #[test]
    fn test_check_execution_emulated() {
        let temp = TempDir::new().unwrap();
        let emulator = temp.path().join("qemu-ppc-static");
        std::fs::write(&emulator, b"").unwrap();
        write_binfmt_entry(temp.path(), "qemu-ppc", true, &emulator);

        let host = HostPlatform::with_machine("x86_64", temp.path());
        let result = check_execution(Architecture::Powerpc, &host);
        assert!(result.passed);
        assert!(result.detail.unwrap().starts_with("emulated by"));
    }

    #[test]
    fn test_check_execution_unavailable_is_optional() {
        let temp = TempDir::new().unwrap();
        let host = HostPlatform::with_machine("mips64", temp.path());
        let result = check_execution(Architecture::Loongson3, &host);
        assert!(!result.passed);
        assert!(!result.required);
        assert!(result.suggestion.unwrap().contains("qemu-mips64el-static"));
    }

    #[test]
    fn test_run_doctor_without_escalation() {
        let host = HostPlatform::with_machine("x86_64", "/nonexistent");
        let report = run_doctor(Architecture::Amd64, &host, None);
        assert_eq!(report.checks.len(), 4);
        assert!(report.checks[0].name.starts_with("tar"));
    }
}
