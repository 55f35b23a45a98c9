//! OperatingSystemConfig CRD
//!
//! An OperatingSystemConfig describes the files and systemd units a node
//! materializes on first boot. The reconciler compiles it into a shell script
//! that is embedded into the node's boot payload.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OperatingSystemConfig declares files and units to write onto a node.
///
/// Example:
/// ```yaml
/// apiVersion: extensions.seedbed.dev/v1alpha1
/// kind: OperatingSystemConfig
/// metadata:
///   name: worker-pool-a
///   namespace: shoot--dev--alpha
/// spec:
///   files:
///   - path: /var/lib/kubelet/ca.crt
///     content:
///       secretRef:
///         name: kubelet-ca
///         dataKey: ca.crt
///   units:
///   - name: kubelet.service
///     content: |
///       [Service]
///       ExecStart=/opt/bin/kubelet
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
// `group` must equal `crate::EXTENSIONS_GROUP`; the derive only takes literals
#[kube(
    group = "extensions.seedbed.dev",
    version = "v1alpha1",
    kind = "OperatingSystemConfig",
    shortname = "osc",
    namespaced,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OperatingSystemConfigSpec {
    /// Files to write, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,

    /// Systemd units to write, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<Unit>,
}

/// A file to materialize on the node
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct File {
    /// Absolute path of the file on the node
    pub path: String,

    /// Where the file's bytes come from
    pub content: FileContent,
}

/// Content source of a file. Exactly one of `inline` and `secretRef` is set.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    /// Content embedded in the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<FileContentInline>,

    /// Content stored in a Secret in the resource's namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<FileContentSecretRef>,

    /// Embed the content literally in the script instead of base64
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmit_unencoded: Option<bool>,
}

/// Inline file content
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContentInline {
    /// Encoding of `data`: empty for plain text, `b64` for base64
    #[serde(default)]
    pub encoding: String,

    /// The (possibly encoded) content
    pub data: String,
}

/// Reference to a key of a Secret
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileContentSecretRef {
    /// Name of the Secret
    pub name: String,

    /// Key within the Secret's data
    pub data_key: String,
}

/// A systemd unit with optional drop-ins
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    /// Unit file name (e.g., "kubelet.service")
    pub name: String,

    /// Content of the unit file itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Override fragments written under `<name>.d/`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drop_ins: Vec<DropIn>,
}

/// A systemd drop-in fragment
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DropIn {
    /// File name of the fragment (e.g., "10-override.conf")
    pub name: String,

    /// Content of the fragment
    pub content: String,
}

impl FileContent {
    /// Whether the content should be embedded literally
    pub fn transmit_unencoded(&self) -> bool {
        self.transmit_unencoded.unwrap_or(false)
    }
}
