//! Script fragments
//!
//! Every fragment starts with a newline and ends without one, so fragments
//! concatenate directly: the leading newline of the next fragment terminates
//! the closing `EOF` of the previous one.
//!
//! ```text
//! MkdirLine(dir)           := "\nmkdir -p \"" dir "\""
//! FileBlock(path, content) := MkdirLine(dir(path)) "\n\n" CatBlock(path, content)
//! CatBlock(path, literal)  := "cat << EOF > \"" path "\"\n" literal "\nEOF"
//! CatBlock(path, bytes)    := "cat << EOF | base64 -d > \"" path "\"\n" base64(bytes) "\nEOF"
//! ```

use base64::{engine::general_purpose::STANDARD, Engine};

/// Heredoc delimiter used by every content block
pub const HEREDOC_DELIMITER: &str = "EOF";

/// How content is embedded in a content block
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Embedding<'a> {
    /// Written verbatim between the heredoc markers
    Literal(&'a str),
    /// Base64-encoded in the script, decoded by the executing shell
    Base64(&'a [u8]),
}

/// POSIX dirname of an absolute path: `/foo/bar` -> `/foo`, `/foo` -> `/`
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => {
            let dir = path[..idx].trim_end_matches('/');
            if dir.is_empty() {
                "/"
            } else {
                dir
            }
        }
        None => ".",
    }
}

/// `\nmkdir -p "<dir>"`
pub fn mkdir_line(dir: &str) -> String {
    format!("\nmkdir -p \"{dir}\"")
}

/// Heredoc that writes `content` to `path`
pub fn cat_block(path: &str, content: Embedding<'_>) -> String {
    match content {
        Embedding::Literal(text) => {
            format!("cat << {HEREDOC_DELIMITER} > \"{path}\"\n{text}\n{HEREDOC_DELIMITER}")
        }
        Embedding::Base64(bytes) => format!(
            "cat << {HEREDOC_DELIMITER} | base64 -d > \"{path}\"\n{}\n{HEREDOC_DELIMITER}",
            STANDARD.encode(bytes)
        ),
    }
}

/// Directory creation followed by the content block for `path`
pub fn file_block(path: &str, content: Embedding<'_>) -> String {
    let mut out = mkdir_line(parent_dir(path));
    out.push_str("\n\n");
    out.push_str(&cat_block(path, content));
    out
}
