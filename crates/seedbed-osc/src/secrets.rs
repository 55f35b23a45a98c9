//! Secret store capability
//!
//! The compiler only needs to read the data of a named Secret. That need is
//! expressed as the [`SecretGetter`] trait so the compile step does not depend
//! on a particular Kubernetes client:
//!
//! - [`KubeSecretGetter`] reads from the API server through kube-rs.
//! - [`StaticSecretGetter`] serves Secrets held in memory, e.g. loaded from a
//!   YAML file for offline rendering.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::Client;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::{debug, trace};

use seedbed_common::{Error, Result};

/// Decoded data of a Secret, keyed by data key
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Read access to Secrets
///
/// Implementations must report a missing Secret as [`Error::NotFound`] (or a
/// 404 API error) so callers can tell it apart from transport failures.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretGetter: Send + Sync {
    /// Fetch the data of Secret `name` in `namespace`
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretData>;
}

/// Flatten a Secret into raw bytes per key
///
/// `stringData` entries win over `data` entries with the same key, matching
/// how the API server merges them on write.
pub fn secret_data(secret: &Secret) -> SecretData {
    let mut out: SecretData = secret
        .data
        .iter()
        .flatten()
        .map(|(k, v)| (k.clone(), v.0.clone()))
        .collect();

    for (k, v) in secret.string_data.iter().flatten() {
        out.insert(k.clone(), v.clone().into_bytes());
    }
    out
}

// =============================================================================
// Kubernetes-backed implementation
// =============================================================================

/// Reads Secrets from the cluster
#[derive(Clone)]
pub struct KubeSecretGetter {
    client: Client,
}

impl KubeSecretGetter {
    /// Create a getter using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretGetter for KubeSecretGetter {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretData> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(name)
            .await?
            .ok_or_else(|| Error::not_found("Secret", namespace, name))?;

        debug!(namespace, name, "fetched Secret");
        Ok(secret_data(&secret))
    }
}

// =============================================================================
// In-memory implementation
// =============================================================================

/// Serves Secrets from memory
#[derive(Clone, Debug, Default)]
pub struct StaticSecretGetter {
    secrets: BTreeMap<(String, String), SecretData>,
}

impl StaticSecretGetter {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a Secret with the given data, replacing any existing one
    pub fn with_secret<K, V>(
        mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        data: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let data = data
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.secrets.insert((namespace.into(), name.into()), data);
        self
    }

    /// Add a Secret object, defaulting its namespace to `default_namespace`
    pub fn insert(&mut self, secret: &Secret, default_namespace: &str) -> Result<()> {
        let name = secret
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::validation("metadata.name", "Secret must have a name"))?;
        let namespace = secret
            .metadata
            .namespace
            .clone()
            .unwrap_or_else(|| default_namespace.to_string());

        trace!(%namespace, %name, "loaded Secret");
        self.secrets.insert((namespace, name), secret_data(secret));
        Ok(())
    }

    /// Load Secrets from a (possibly multi-document) YAML stream
    ///
    /// Empty documents are skipped. Every other document must be a `v1/Secret`.
    pub fn from_yaml(yaml: &str, default_namespace: &str) -> Result<Self> {
        let mut store = Self::new();
        for document in serde_yaml::Deserializer::from_str(yaml) {
            let value = serde_yaml::Value::deserialize(document)
                .map_err(|e| Error::serialization_for_kind("Secret", e.to_string()))?;
            if value.is_null() {
                continue;
            }

            let kind = value.get("kind").and_then(|k| k.as_str()).unwrap_or_default();
            if kind != "Secret" {
                return Err(Error::serialization_for_kind(
                    "Secret",
                    format!("expected kind Secret, found {kind:?}"),
                ));
            }

            let secret: Secret = serde_yaml::from_value(value)
                .map_err(|e| Error::serialization_for_kind("Secret", e.to_string()))?;
            store.insert(&secret, default_namespace)?;
        }
        Ok(store)
    }

    /// Number of Secrets held
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    /// Whether the store holds no Secrets
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }
}

#[async_trait]
impl SecretGetter for StaticSecretGetter {
    async fn get(&self, namespace: &str, name: &str) -> Result<SecretData> {
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found("Secret", namespace, name))
    }
}

// =============================================================================
// Test helpers
// =============================================================================

/// Getter whose fetch never completes, for exercising in-flight cancellation
#[cfg(test)]
pub(crate) struct StalledSecretGetter {
    /// Notified once a fetch has started
    pub(crate) started: std::sync::Arc<tokio::sync::Notify>,
}

#[cfg(test)]
#[async_trait]
impl SecretGetter for StalledSecretGetter {
    async fn get(&self, _namespace: &str, _name: &str) -> Result<SecretData> {
        self.started.notify_one();
        std::future::pending::<Result<SecretData>>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;

    #[test]
    fn string_data_overrides_data() {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some("foo".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([
                ("a".to_string(), ByteString(b"from-data".to_vec())),
                ("b".to_string(), ByteString(vec![0xff, 0x00])),
            ])),
            string_data: Some(BTreeMap::from([(
                "a".to_string(),
                "from-string-data".to_string(),
            )])),
            ..Default::default()
        };

        let data = secret_data(&secret);
        assert_eq!(data["a"], b"from-string-data");
        assert_eq!(data["b"], vec![0xff, 0x00]);
    }

    #[tokio::test]
    async fn static_getter_returns_not_found_for_unknown_secret() {
        let store = StaticSecretGetter::new().with_secret("ns", "foo", [("bar", "x")]);

        let err = store.get("ns", "missing").await.unwrap_err();
        assert!(err.is_not_found());

        // Same name in a different namespace is a different Secret
        let err = store.get("other", "foo").await.unwrap_err();
        assert!(err.is_not_found());

        let data = store.get("ns", "foo").await.unwrap();
        assert_eq!(data["bar"], b"x");
    }

    #[tokio::test]
    async fn loads_multi_document_yaml() {
        let yaml = r#"
apiVersion: v1
kind: Secret
metadata:
  name: foo
data:
  bar: YmFyLWNvbnRlbnQ=
---
---
apiVersion: v1
kind: Secret
metadata:
  name: creds
  namespace: other
stringData:
  token: s3cr3t
"#;
        let store = StaticSecretGetter::from_yaml(yaml, "default-ns").unwrap();
        assert_eq!(store.len(), 2);

        let foo = store.get("default-ns", "foo").await.unwrap();
        assert_eq!(foo["bar"], b"bar-content");

        let creds = store.get("other", "creds").await.unwrap();
        assert_eq!(creds["token"], b"s3cr3t");
    }

    #[test]
    fn rejects_documents_that_are_not_secrets() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: foo
"#;
        let err = StaticSecretGetter::from_yaml(yaml, "ns").unwrap_err();
        assert!(err.to_string().contains("expected kind Secret"));
    }

    #[test]
    fn rejects_secret_without_name() {
        let yaml = r#"
apiVersion: v1
kind: Secret
metadata: {}
"#;
        let err = StaticSecretGetter::from_yaml(yaml, "ns").unwrap_err();
        assert_eq!(err.field(), Some("metadata.name"));
    }
}
