//! Input checks shared by file and unit conversion
//!
//! Paths and names end up inside double-quoted shell words, so anything the
//! shell would interpret there is rejected.

use seedbed_common::{Error, Result};

/// Characters that are not inert inside a double-quoted shell word
const SHELL_UNSAFE: &[char] = &['"', '`', '$', '\\', '\n', '\r', '\0'];

fn check_shell_safe(value: &str, field: &str) -> Result<()> {
    if let Some(c) = value.chars().find(|c| SHELL_UNSAFE.contains(c)) {
        return Err(Error::validation(
            field,
            format!("{value:?} contains shell-unsafe character {c:?}"),
        ));
    }
    Ok(())
}

/// Check that `path` is a normalized absolute file path
pub(crate) fn check_file_path(path: &str, field: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::validation(field, "path must not be empty"));
    }
    if !path.starts_with('/') {
        return Err(Error::validation(
            field,
            format!("path {path:?} must be absolute"),
        ));
    }
    if path.ends_with('/') {
        return Err(Error::validation(
            field,
            format!("path {path:?} must name a file, not a directory"),
        ));
    }
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(Error::validation(
            field,
            format!("path {path:?} must not contain '.' or '..' segments"),
        ));
    }
    check_shell_safe(path, field)
}

/// Check that `name` is usable as a single file name
pub(crate) fn check_file_name(name: &str, field: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation(field, "name must not be empty"));
    }
    if name.contains('/') || name == "." || name == ".." {
        return Err(Error::validation(
            field,
            format!("name {name:?} must be a single file name"),
        ));
    }
    check_shell_safe(name, field)
}

/// Characters the shell still interprets inside an unquoted heredoc body
const HEREDOC_UNSAFE: &[char] = &['$', '`', '\\', '\0'];

/// Check that `text` lands on disk unchanged when written through an
/// unquoted heredoc closed by `delimiter`
pub(crate) fn check_heredoc_literal(text: &str, delimiter: &str, field: &str) -> Result<()> {
    if let Some(c) = text.chars().find(|c| HEREDOC_UNSAFE.contains(c)) {
        return Err(Error::validation(
            field,
            format!("content embedded unencoded must not contain {c:?}, the shell would expand it"),
        ));
    }
    if text.split('\n').any(|line| line == delimiter) {
        return Err(Error::validation(
            field,
            format!("content embedded unencoded must not contain a line {delimiter:?}"),
        ));
    }
    Ok(())
}

/// Check that a required reference field is set
pub(crate) fn check_not_empty(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(())
}
