//! Common types for Seedbed: CRDs, errors, and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group for the extension resources consumed by the compiler
///
/// Repeated as a literal in the `#[kube(group)]` attribute of
/// [`crd::OperatingSystemConfig`].
pub const EXTENSIONS_GROUP: &str = "extensions.seedbed.dev";

/// Directory systemd loads unit files and drop-in directories from
pub const SYSTEMD_UNIT_DIR: &str = "/etc/systemd/system";

/// Mode of every file materialized by a rendered script (under umask 022)
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Wire encoding ID for inline content that is literal text
pub const ENCODING_PLAIN: &str = "";

/// Wire encoding ID for inline content that is base64 of the literal bytes
pub const ENCODING_BASE64: &str = "b64";
