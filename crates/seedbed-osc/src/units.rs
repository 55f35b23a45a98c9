//! Systemd unit compilation
//!
//! Units and their drop-ins are always inline, so this step cannot fail once
//! the specs exist. Content is always embedded as base64.
//!
//! ```text
//! UnitBlock(unit) := [MkdirLine(<unit>.d) ("\n\n" CatBlock(<unit>.d/<dropin>))*]
//!                    ["\n\n" CatBlock(<unit>)]
//! ```

use tracing::{debug, info, instrument};

use seedbed_common::crd::Unit;
use seedbed_common::{Result, SYSTEMD_UNIT_DIR};

use crate::emit::{cat_block, mkdir_line, Embedding};
use crate::validation::check_file_name;

/// A systemd drop-in fragment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DropInSpec {
    /// File name under the unit's `.d` directory
    pub name: String,
    /// Raw content
    pub content: Vec<u8>,
}

/// A systemd unit with optional content and drop-ins
///
/// Names are interpolated into the script as is. Specs built in code rather
/// than through [`UnitSpec::from_wire`] must hold single, shell-safe file names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitSpec {
    /// Unit file name
    pub name: String,
    /// Raw content of the unit file itself
    pub content: Option<Vec<u8>>,
    /// Drop-in fragments, in order
    pub drop_ins: Vec<DropInSpec>,
}

impl UnitSpec {
    /// Create a unit with neither content nor drop-ins
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the unit file's content
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Append a drop-in
    pub fn with_drop_in(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.drop_ins.push(DropInSpec {
            name: name.into(),
            content: content.into(),
        });
        self
    }

    /// Convert and validate a wire `Unit` located at `field`
    pub fn from_wire(unit: &Unit, field: &str) -> Result<Self> {
        check_file_name(&unit.name, &format!("{field}.name"))?;
        let mut spec = Self::new(&unit.name);
        spec.content = unit.content.as_ref().map(|c| c.clone().into_bytes());

        for (i, drop_in) in unit.drop_ins.iter().enumerate() {
            check_file_name(&drop_in.name, &format!("{field}.dropIns[{i}].name"))?;
            spec = spec.with_drop_in(&drop_in.name, drop_in.content.as_bytes());
        }
        Ok(spec)
    }

    /// Path of the unit file
    pub fn unit_path(&self) -> String {
        format!("{SYSTEMD_UNIT_DIR}/{}", self.name)
    }

    /// Path of the unit's drop-in directory
    pub fn drop_in_dir(&self) -> String {
        format!("{SYSTEMD_UNIT_DIR}/{}.d", self.name)
    }
}

fn unit_block(unit: &UnitSpec) -> String {
    debug!(
        unit = %unit.name,
        drop_ins = unit.drop_ins.len(),
        has_content = unit.content.is_some(),
        "emitting unit"
    );
    let mut out = String::new();

    if !unit.drop_ins.is_empty() {
        let dir = unit.drop_in_dir();
        out.push_str(&mkdir_line(&dir));
        for drop_in in &unit.drop_ins {
            out.push_str("\n\n");
            out.push_str(&cat_block(
                &format!("{dir}/{}", drop_in.name),
                Embedding::Base64(&drop_in.content),
            ));
        }
    }

    if let Some(content) = &unit.content {
        out.push_str("\n\n");
        out.push_str(&cat_block(&unit.unit_path(), Embedding::Base64(content)));
    }

    out
}

/// Render a script writing every unit and drop-in, in input order
///
/// Unit files land in the systemd unit directory, which already exists on
/// any systemd host, so only drop-in directories are created.
#[instrument(skip_all, fields(units = units.len()))]
pub fn units_to_disk_script(units: &[UnitSpec]) -> String {
    let script: String = units.iter().map(unit_block).collect();
    info!(bytes = script.len(), "rendered units script");
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbed_common::crd::DropIn;

    #[test]
    fn renders_drop_ins_then_content_only_unit() {
        let units = [
            UnitSpec::new("unit1")
                .with_drop_in("dropin1", "dropdrop")
                .with_drop_in("dropin2", "dropeldidrop"),
            UnitSpec::new("unit2").with_content("content2"),
        ];

        assert_eq!(
            units_to_disk_script(&units),
            r#"
mkdir -p "/etc/systemd/system/unit1.d"

cat << EOF | base64 -d > "/etc/systemd/system/unit1.d/dropin1"
ZHJvcGRyb3A=
EOF

cat << EOF | base64 -d > "/etc/systemd/system/unit1.d/dropin2"
ZHJvcGVsZGlkcm9w
EOF

cat << EOF | base64 -d > "/etc/systemd/system/unit2"
Y29udGVudDI=
EOF"#
        );
    }

    #[test]
    fn unit_with_content_and_drop_ins_writes_drop_ins_first() {
        let units = [UnitSpec::new("kubelet.service")
            .with_content("[Service]")
            .with_drop_in("10-env.conf", "[Service]\nEnvironment=A=B")];

        let script = units_to_disk_script(&units);
        let mkdir = script.find("mkdir -p \"/etc/systemd/system/kubelet.service.d\"").unwrap();
        let drop_in = script
            .find("> \"/etc/systemd/system/kubelet.service.d/10-env.conf\"")
            .unwrap();
        let unit = script.find("> \"/etc/systemd/system/kubelet.service\"\n").unwrap();
        assert!(mkdir < drop_in && drop_in < unit);
        assert_eq!(script.matches("mkdir -p").count(), 1);
    }

    #[test]
    fn unit_without_content_or_drop_ins_renders_nothing() {
        let units = [UnitSpec::new("empty.service")];
        assert_eq!(units_to_disk_script(&units), "");
        assert_eq!(units_to_disk_script(&[]), "");
    }

    #[test]
    fn empty_content_still_renders_a_block() {
        let script = units_to_disk_script(&[UnitSpec::new("mask.service").with_content("")]);
        assert_eq!(
            script,
            "\n\ncat << EOF | base64 -d > \"/etc/systemd/system/mask.service\"\n\nEOF"
        );
    }

    #[test]
    fn drop_ins_keep_input_order() {
        let unit = (0..5).fold(UnitSpec::new("a.service"), |u, i| {
            u.with_drop_in(format!("{i}.conf"), "x")
        });
        let script = units_to_disk_script(&[unit]);
        let positions: Vec<usize> = (0..5)
            .map(|i| script.find(&format!("a.service.d/{i}.conf")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn wire_unit_converts_content_and_drop_ins() {
        let unit = Unit {
            name: "kubelet.service".to_string(),
            content: Some("[Unit]".to_string()),
            drop_ins: vec![DropIn {
                name: "10-env.conf".to_string(),
                content: "[Service]".to_string(),
            }],
        };
        let spec = UnitSpec::from_wire(&unit, "spec.units[0]").unwrap();
        assert_eq!(spec.content.as_deref(), Some(&b"[Unit]"[..]));
        assert_eq!(spec.drop_ins[0].name, "10-env.conf");
        assert_eq!(spec.drop_ins[0].content, b"[Service]");
    }

    #[test]
    fn wire_unit_rejects_bad_drop_in_name() {
        let unit = Unit {
            name: "kubelet.service".to_string(),
            content: None,
            drop_ins: vec![
                DropIn {
                    name: "ok.conf".to_string(),
                    content: String::new(),
                },
                DropIn {
                    name: "../escape.conf".to_string(),
                    content: String::new(),
                },
            ],
        };
        let err = UnitSpec::from_wire(&unit, "spec.units[2]").unwrap_err();
        assert_eq!(err.field(), Some("spec.units[2].dropIns[1].name"));
    }
}
