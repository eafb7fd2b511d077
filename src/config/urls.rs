//! Mirror URLs and release layout

/// Default AOSC OS mirror
pub const DEFAULT_MIRROR: &str = "https://repo.aosc.io/";

/// Release tree below the mirror root
pub const RELEASE_BASE: &str = "aosc-os";

/// Manifest location below the release tree
pub const MANIFEST_PATH: &str = "manifest/recipe.json";

/// URL schemes accepted for mirrors
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "file"];
