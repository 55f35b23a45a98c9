//! Content resolution
//!
//! Turns a file's content source into the raw bytes that end up on disk.
//! The input encoding is consumed here; how the bytes are embedded into the
//! script is decided later and independently.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use seedbed_common::crd::FileContent;
use seedbed_common::{Error, Result, ENCODING_BASE64, ENCODING_PLAIN};

use crate::secrets::SecretGetter;
use crate::validation::check_not_empty;

/// Encoding of inline content
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Data is the literal text
    #[default]
    Plain,
    /// Data is standard padded base64 of the literal bytes
    Base64,
}

impl std::str::FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ENCODING_PLAIN => Ok(Self::Plain),
            ENCODING_BASE64 => Ok(Self::Base64),
            other => Err(Error::validation(
                "encoding",
                format!("unsupported encoding {other:?}, expected \"\" or \"b64\""),
            )),
        }
    }
}

/// Where a file's bytes come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentSource {
    /// Content embedded in the resource
    Inline {
        /// Encoding of `data`
        encoding: Encoding,
        /// The (possibly encoded) payload
        data: String,
    },
    /// A key of a Secret in the compile namespace
    SecretRef {
        /// Name of the Secret
        name: String,
        /// Key within the Secret's data
        data_key: String,
    },
}

impl ContentSource {
    /// Plain-text inline content
    pub fn plain(data: impl Into<String>) -> Self {
        Self::Inline {
            encoding: Encoding::Plain,
            data: data.into(),
        }
    }

    /// Base64-encoded inline content
    pub fn base64(data: impl Into<String>) -> Self {
        Self::Inline {
            encoding: Encoding::Base64,
            data: data.into(),
        }
    }

    /// Content from a Secret key
    pub fn secret_ref(name: impl Into<String>, data_key: impl Into<String>) -> Self {
        Self::SecretRef {
            name: name.into(),
            data_key: data_key.into(),
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inline { .. } => "inline",
            Self::SecretRef { .. } => "secretRef",
        }
    }

    /// Convert the wire representation, which must set exactly one source
    pub fn from_wire(content: &FileContent, field: &str) -> Result<Self> {
        match (&content.inline, &content.secret_ref) {
            (Some(inline), None) => {
                let encoding = inline.encoding.parse::<Encoding>().map_err(|e| match e {
                    Error::Validation { message, .. } => {
                        Error::validation(format!("{field}.inline.encoding"), message)
                    }
                    other => other,
                })?;
                Ok(Self::Inline {
                    encoding,
                    data: inline.data.clone(),
                })
            }
            (None, Some(secret_ref)) => {
                check_not_empty(&secret_ref.name, &format!("{field}.secretRef.name"))?;
                check_not_empty(&secret_ref.data_key, &format!("{field}.secretRef.dataKey"))?;
                Ok(Self::secret_ref(&secret_ref.name, &secret_ref.data_key))
            }
            (Some(_), Some(_)) => Err(Error::validation(
                field,
                "exactly one of inline and secretRef must be set, found both",
            )),
            (None, None) => Err(Error::validation(
                field,
                "exactly one of inline and secretRef must be set, found neither",
            )),
        }
    }
}

/// Standard padded alphabet that ignores non-zero bits after the last symbol
///
/// Producers of `b64` inline content are not required to emit canonical
/// encodings, so `YR==` decodes to `a` rather than failing.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Decode standard padded base64, skipping line breaks the way `base64 -d` does
fn decode_base64(data: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    if data.contains(['\n', '\r']) {
        let compact: String = data.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
        LENIENT_STANDARD.decode(compact)
    } else {
        LENIENT_STANDARD.decode(data)
    }
}

/// Produce the raw bytes for `source`
///
/// Secret values are returned as stored; they are never decoded again.
/// `path` only serves as error context.
pub async fn resolve_content<S: SecretGetter + ?Sized>(
    cancel: &CancellationToken,
    secrets: &S,
    namespace: &str,
    path: &str,
    source: &ContentSource,
) -> Result<Vec<u8>> {
    match source {
        ContentSource::Inline {
            encoding: Encoding::Plain,
            data,
        } => Ok(data.as_bytes().to_vec()),
        ContentSource::Inline {
            encoding: Encoding::Base64,
            data,
        } => decode_base64(data).map_err(|e| Error::decode(path, e.to_string())),
        ContentSource::SecretRef { name, data_key } => {
            let context = || format!("fetching Secret {namespace}/{name}");
            if cancel.is_cancelled() {
                return Err(Error::cancelled(context()));
            }

            let data = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::cancelled(context())),
                result = secrets.get(namespace, name) => result?,
            };
            trace!(namespace, secret = %name, keys = data.len(), "resolved Secret");

            data.get(data_key)
                .cloned()
                .ok_or_else(|| Error::missing_key(namespace, name, data_key))
        }
    }
}
