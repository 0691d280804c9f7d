//! The [`PathValidator`] and the [`ValidatedPath`] proof type.
//!
//! Validation is binary accept/reject: a rejected candidate is never
//! truncated or "fixed". A [`ValidatedPath`] can only be produced by this
//! module, so any API that takes one is guaranteed the containment check ran.

use std::fmt;
use std::path::Path;

use crate::error::{SecurityError, SecurityReason};

/// Percent-decoding passes applied during validation. Bounded so crafted
/// nested encodings cannot turn validation into unbounded work.
const MAX_DECODE_PASSES: usize = 2;

/// An absolute, normalized path proven to resolve inside the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedPath {
    inner: String,
}

impl ValidatedPath {
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.inner)
    }

    /// The path relative to the workspace root, without a leading separator.
    /// Empty for the root itself.
    pub fn relative_to(&self, root: &str) -> &str {
        self.inner
            .strip_prefix(root)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or("")
    }
}

impl fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl AsRef<str> for ValidatedPath {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

/// Validates candidate paths and names against a fixed workspace root.
///
/// Pure and synchronous: no I/O, no suspension. Symlink chains are resolved
/// by the storage backend; [`PathValidator::validate_symlink_target`] only
/// judges the final absolute target it is handed.
#[derive(Debug, Clone)]
pub struct PathValidator {
    root: String,
}

impl PathValidator {
    /// Create a validator for `root`. The root is normalized to forward
    /// slashes with no trailing separator and is fixed for the lifetime of
    /// the validator.
    pub fn new(root: impl AsRef<str>) -> Self {
        Self {
            root: normalize_root(root.as_ref()),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Validate a candidate path (relative or absolute) and return the
    /// absolute in-workspace path it resolves to.
    pub fn validate_path(&self, candidate: &str) -> Result<ValidatedPath, SecurityError> {
        reject_control_chars(candidate)?;

        let normalized = normalize_separators(candidate);
        reject_traversal_segments(&normalized, candidate)?;

        // Decoding is detection-only: the returned path is built from the
        // undecoded candidate, so a literal `%` in a file name survives.
        let mut decoded = normalized.clone();
        for _ in 0..MAX_DECODE_PASSES {
            let next = normalize_separators(&percent_decode(&decoded));
            if next == decoded {
                break;
            }
            reject_control_chars(&next)?;
            reject_traversal_segments(&next, candidate)?;
            decoded = next;
        }

        let joined = if is_absolute(&normalized) {
            let trimmed = trim_trailing_separator(&normalized);
            if !self.contains(trimmed) {
                return Err(SecurityError::new(
                    SecurityReason::AbsolutePathOutsideRoot,
                    format!("absolute path '{candidate}' is outside the workspace root"),
                ));
            }
            trimmed.to_string()
        } else {
            let relative = normalized.trim_matches('/');
            if relative.is_empty() {
                self.root.clone()
            } else if self.root.ends_with('/') {
                format!("{}{}", self.root, relative)
            } else {
                format!("{}/{}", self.root, relative)
            }
        };

        // The join cannot introduce new segments, but the exact-or-child test
        // is re-run on the final string as the last line of defense.
        if !self.contains(&joined) {
            return Err(SecurityError::new(
                SecurityReason::PathTraversal,
                format!("joined path '{joined}' escapes the workspace root"),
            ));
        }

        Ok(ValidatedPath { inner: joined })
    }

    /// Validate a single name segment. Names are atomic: anything that could
    /// act as a path (separators, `.`/`..`, control characters) is rejected.
    pub fn validate_name(&self, candidate: &str) -> Result<String, SecurityError> {
        let invalid = |detail: String| SecurityError::new(SecurityReason::InvalidName, detail);

        if candidate.trim().is_empty() {
            return Err(invalid("name is empty or whitespace-only".to_string()));
        }
        if candidate == "." || candidate == ".." {
            return Err(invalid(format!("name '{candidate}' is a path segment")));
        }
        if candidate.contains('/') || candidate.contains('\\') {
            return Err(invalid(format!("name '{candidate}' contains a separator")));
        }
        if candidate.chars().any(|c| c <= '\u{1F}') {
            return Err(invalid("name contains control characters".to_string()));
        }
        if candidate.contains("...") {
            return Err(invalid(format!("name '{candidate}' contains a dot run")));
        }

        Ok(candidate.to_string())
    }

    /// Judge an already-fully-resolved symlink target. Chained resolution is
    /// the backend's contract; this only applies the exact-or-child test to
    /// the final absolute target.
    pub fn validate_symlink_target(
        &self,
        link_path: &str,
        resolved_target: &str,
    ) -> Result<ValidatedPath, SecurityError> {
        let target = trim_trailing_separator(&normalize_separators(resolved_target)).to_string();
        if !self.contains(&target) {
            return Err(SecurityError::new(
                SecurityReason::SymlinkEscape,
                format!("symlink '{link_path}' resolves to '{resolved_target}' outside the workspace root"),
            ));
        }
        Ok(ValidatedPath { inner: target })
    }

    /// Non-throwing containment test for an absolute path.
    pub fn is_within_workspace(&self, path: &str) -> bool {
        let normalized = normalize_separators(path);
        self.contains(trim_trailing_separator(&normalized))
    }

    /// Exact root match or a strict child on a segment boundary. A plain
    /// prefix test would accept `/workspace/project-evil` for root
    /// `/workspace/project`; the separator requirement closes that hole.
    fn contains(&self, normalized: &str) -> bool {
        if self.root == "/" {
            return normalized.starts_with('/');
        }
        normalized == self.root
            || normalized
                .strip_prefix(&self.root)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn normalize_root(root: &str) -> String {
    let normalized = normalize_separators(root);
    trim_trailing_separator(&normalized).to_string()
}

/// Backslashes become forward slashes and repeated separators collapse.
fn normalize_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_sep = false;
    for c in path.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' {
            if prev_sep {
                continue;
            }
            prev_sep = true;
        } else {
            prev_sep = false;
        }
        out.push(c);
    }
    out
}

fn trim_trailing_separator(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

fn is_absolute(path: &str) -> bool {
    if path.starts_with('/') {
        return true;
    }
    // Windows drive prefix: `C:/` or `C:\` (already normalized to `/`).
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(drive), Some(':'), Some('/')) if drive.is_ascii_alphabetic()
    )
}

fn reject_control_chars(path: &str) -> Result<(), SecurityError> {
    if path.chars().any(|c| c <= '\u{1F}') {
        return Err(SecurityError::new(
            SecurityReason::PathTraversal,
            "path contains NUL or control characters".to_string(),
        ));
    }
    Ok(())
}

/// Reject `.`/`..` segments (leading, embedded or trailing) and any segment
/// with a run of three or more dots, before any joining happens.
fn reject_traversal_segments(normalized: &str, original: &str) -> Result<(), SecurityError> {
    for segment in normalized.split('/') {
        if segment == "." || segment == ".." {
            return Err(SecurityError::new(
                SecurityReason::PathTraversal,
                format!("segment '{segment}' in '{original}'"),
            ));
        }
        if segment.contains("...") {
            return Err(SecurityError::new(
                SecurityReason::PathTraversal,
                format!("dot run in segment '{segment}' of '{original}'"),
            ));
        }
    }
    Ok(())
}

/// One pass of `%XX` decoding. Malformed escapes are left untouched; bytes
/// that do not form valid UTF-8 are replaced, which is fine for a
/// detection-only pass.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let high = (bytes[i + 1] as char).to_digit(16).unwrap_or(0) as u8;
            let low = (bytes[i + 2] as char).to_digit(16).unwrap_or(0) as u8;
            out.push(high << 4 | low);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
