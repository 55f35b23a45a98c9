//! OperatingSystemConfig rendering
//!
//! Validates a whole resource into typed specs before anything is fetched,
//! then runs the file and unit compilers.

use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use seedbed_common::crd::{OperatingSystemConfig, OperatingSystemConfigSpec};
use seedbed_common::{Error, Result};

use crate::files::{files_to_disk_script, FileSpec};
use crate::secrets::SecretGetter;
use crate::units::{units_to_disk_script, UnitSpec};

/// Interpreter line of an assembled boot script
pub const SHEBANG: &str = "#!/bin/bash";

/// Output of rendering one OperatingSystemConfig
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedConfig {
    /// Script writing all files
    pub files_script: String,
    /// Script writing all units and drop-ins
    pub units_script: String,
}

impl RenderedConfig {
    /// Standalone executable script: files first, then units
    pub fn boot_script(&self) -> String {
        format!("{SHEBANG}\n{}{}\n", self.files_script, self.units_script)
    }
}

/// Validate `spec.files` into file specs
pub fn file_specs(spec: &OperatingSystemConfigSpec) -> Result<Vec<FileSpec>> {
    spec.files
        .iter()
        .enumerate()
        .map(|(i, file)| FileSpec::from_wire(file, &format!("spec.files[{i}]")))
        .collect()
}

/// Validate `spec.units` into unit specs
pub fn unit_specs(spec: &OperatingSystemConfigSpec) -> Result<Vec<UnitSpec>> {
    spec.units
        .iter()
        .enumerate()
        .map(|(i, unit)| UnitSpec::from_wire(unit, &format!("spec.units[{i}]")))
        .collect()
}

/// Render a spec whose Secrets live in `namespace`
#[instrument(skip_all, fields(namespace = %namespace))]
pub async fn render_spec<S: SecretGetter + ?Sized>(
    cancel: &CancellationToken,
    secrets: &S,
    namespace: &str,
    spec: &OperatingSystemConfigSpec,
) -> Result<RenderedConfig> {
    let files = file_specs(spec)?;
    let units = unit_specs(spec)?;

    let files_script = files_to_disk_script(cancel, secrets, namespace, &files).await?;
    let units_script = units_to_disk_script(&units);

    info!(
        files = files.len(),
        units = units.len(),
        "rendered OperatingSystemConfig"
    );
    Ok(RenderedConfig {
        files_script,
        units_script,
    })
}

/// Render an OperatingSystemConfig against Secrets in its own namespace
pub async fn render_operating_system_config<S: SecretGetter + ?Sized>(
    cancel: &CancellationToken,
    secrets: &S,
    osc: &OperatingSystemConfig,
) -> Result<RenderedConfig> {
    let namespace = osc.namespace().ok_or_else(|| {
        Error::validation(
            "metadata.namespace",
            format!("OperatingSystemConfig {} has no namespace", osc.name_any()),
        )
    })?;
    render_spec(cancel, secrets, &namespace, &osc.spec).await
}
