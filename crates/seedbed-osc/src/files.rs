//! File compilation
//!
//! Resolves every file's content in input order and renders one block per
//! file. The first failure aborts the whole compile: a half-rendered script
//! must never reach a node.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use seedbed_common::crd::File;
use seedbed_common::{Error, Result};

use crate::content::{resolve_content, ContentSource};
use crate::emit::{file_block, Embedding, HEREDOC_DELIMITER};
use crate::secrets::SecretGetter;
use crate::validation::{check_file_path, check_heredoc_literal};

/// One file to materialize on the node
///
/// Specs built directly rather than through [`FileSpec::from_wire`] are
/// still path-checked by [`files_to_disk_script`] before anything is fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSpec {
    /// Absolute target path
    pub path: String,
    /// Where the bytes come from
    pub content: ContentSource,
    /// Embed the bytes literally instead of base64
    pub transmit_unencoded: bool,
}

impl FileSpec {
    /// Create a spec with base64 embedding
    pub fn new(path: impl Into<String>, content: ContentSource) -> Self {
        Self {
            path: path.into(),
            content,
            transmit_unencoded: false,
        }
    }

    /// Set literal embedding
    pub fn with_transmit_unencoded(mut self, transmit_unencoded: bool) -> Self {
        self.transmit_unencoded = transmit_unencoded;
        self
    }

    /// Convert and validate a wire `File` located at `field`
    pub fn from_wire(file: &File, field: &str) -> Result<Self> {
        check_file_path(&file.path, &format!("{field}.path"))?;
        let content = ContentSource::from_wire(&file.content, &format!("{field}.content"))?;
        Ok(Self::new(&file.path, content)
            .with_transmit_unencoded(file.content.transmit_unencoded()))
    }
}

/// A file whose content has been resolved to raw bytes
#[derive(Debug)]
pub struct ResolvedFile<'a> {
    /// Target path
    pub path: &'a str,
    /// Raw bytes to write
    pub bytes: Vec<u8>,
    /// Embed the bytes literally instead of base64
    pub transmit_unencoded: bool,
}

impl ResolvedFile<'_> {
    /// Embedding for the script
    ///
    /// Literal embedding needs UTF-8 text that the shell writes back
    /// unchanged: no expansions and no line that closes the heredoc early.
    pub fn embedding(&self) -> Result<Embedding<'_>> {
        if !self.transmit_unencoded {
            return Ok(Embedding::Base64(&self.bytes));
        }

        let text = std::str::from_utf8(&self.bytes).map_err(|e| {
            Error::validation(
                self.path,
                format!("content embedded unencoded must be UTF-8: {e}"),
            )
        })?;
        check_heredoc_literal(text, HEREDOC_DELIMITER, self.path)?;
        Ok(Embedding::Literal(text))
    }

    /// Render the file's block
    pub fn emit(&self) -> Result<String> {
        Ok(file_block(self.path, self.embedding()?))
    }
}

/// Resolve the content of a single file
pub async fn resolve_file<'a, S: SecretGetter + ?Sized>(
    cancel: &CancellationToken,
    secrets: &S,
    namespace: &str,
    file: &'a FileSpec,
) -> Result<ResolvedFile<'a>> {
    let bytes = resolve_content(cancel, secrets, namespace, &file.path, &file.content).await?;
    debug!(
        path = %file.path,
        source = file.content.kind(),
        bytes = bytes.len(),
        transmit_unencoded = file.transmit_unencoded,
        "resolved file content"
    );
    Ok(ResolvedFile {
        path: &file.path,
        bytes,
        transmit_unencoded: file.transmit_unencoded,
    })
}

/// Render a script writing every file, in input order
///
/// Every path is checked before the first fetch. Secrets are then fetched
/// one at a time in the order the files are listed. On the first error
/// nothing is returned but the error.
#[instrument(skip_all, fields(namespace = %namespace, files = files.len()))]
pub async fn files_to_disk_script<S: SecretGetter + ?Sized>(
    cancel: &CancellationToken,
    secrets: &S,
    namespace: &str,
    files: &[FileSpec],
) -> Result<String> {
    for (i, file) in files.iter().enumerate() {
        check_file_path(&file.path, &format!("files[{i}].path"))?;
    }

    let mut script = String::new();
    for file in files {
        let resolved = resolve_file(cancel, secrets, namespace, file).await?;
        script.push_str(&resolved.emit()?);
    }

    info!(bytes = script.len(), "rendered files script");
    Ok(script)
}
