//! Node bootstrap script compiler
//!
//! Compiles the files and systemd units of an OperatingSystemConfig into a
//! shell script that a machine runs once at boot. The script format is
//! consumed verbatim by the boot mechanism, so rendering is byte-exact and
//! deterministic.
//!
//! # Modules
//!
//! - [`content`] - Resolves inline and Secret-backed content to raw bytes
//! - [`emit`] - Renders `mkdir`/heredoc fragments
//! - [`files`] - Fail-fast compilation of file lists
//! - [`units`] - Compilation of units and drop-ins
//! - [`secrets`] - Secret store capability and its implementations
//! - [`render`] - End-to-end rendering of an OperatingSystemConfig
//!
//! # Example
//!
//! ```ignore
//! use seedbed_osc::{files_to_disk_script, ContentSource, FileSpec, KubeSecretGetter};
//!
//! let files = [FileSpec::new("/etc/motd", ContentSource::plain("hello"))];
//! let script = files_to_disk_script(&cancel, &KubeSecretGetter::new(client), "ns", &files).await?;
//! ```

#![deny(missing_docs)]

pub mod content;
pub mod emit;
pub mod files;
pub mod render;
pub mod secrets;
pub mod units;
mod validation;

pub use content::{resolve_content, ContentSource, Encoding};
pub use files::{files_to_disk_script, FileSpec, ResolvedFile};
pub use render::{render_operating_system_config, render_spec, RenderedConfig};
pub use secrets::{KubeSecretGetter, SecretData, SecretGetter, StaticSecretGetter};
pub use units::{units_to_disk_script, DropInSpec, UnitSpec};
