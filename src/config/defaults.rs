//! Default configuration values

/// Default release variant to deploy
pub const DEFAULT_VARIANT: &str = "BuildKit";

/// Base directory holding the standard per-architecture sysroots
pub const SYSROOT_BASE: &str = "/var/ab/cross-root";

/// Program started by `enter` when no argv is given
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Program used to run privileged operations
pub const ESCALATION_PROGRAM: &str = "sudo";

/// Kernel binfmt_misc registration directory
pub const BINFMT_DIR: &str = "/proc/sys/fs/binfmt_misc";

/// Download buffer size (1 MiB)
pub const DOWNLOAD_CHUNK_SIZE: usize = 1024 * 1024;

/// Connect timeout for mirror requests (in seconds)
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Package database directory, relative to the sysroot
pub const PACKAGE_DB: &str = "var/lib/dpkg";

/// Mount point of the temporary package download directory inside the container
pub const UNPACK_MOUNT: &str = "/var/cache/abcross/archives";

/// Prefix of the container host name, followed by the architecture
pub const HOSTNAME_PREFIX: &str = "abcross";
