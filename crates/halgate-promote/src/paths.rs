//! Relative path hygiene for untrusted draft trees.
//!
//! Every path the gate touches is first reduced to a normalised,
//! `/`-separated relative form. Absolute, drive-qualified, home-relative and
//! parent-traversing paths are rejected before any filesystem access.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PromoteError, Result};

/// Normalise `raw` into a safe relative path.
///
/// Backslashes are treated as separators, `.` and empty segments are
/// dropped.
pub fn normalize_relative(raw: &str) -> Result<String> {
    let unified = raw.replace('\\', "/");
    if unified.trim().is_empty() {
        return Err(PromoteError::unsafe_path(raw, "empty path"));
    }
    if unified.starts_with('/') {
        return Err(PromoteError::unsafe_path(raw, "absolute path"));
    }
    if unified.starts_with('~') {
        return Err(PromoteError::unsafe_path(raw, "home-relative path"));
    }
    let bytes = unified.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return Err(PromoteError::unsafe_path(raw, "drive-qualified path"));
    }

    let mut parts = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(PromoteError::unsafe_path(raw, "parent traversal")),
            s if s.contains('\0') => {
                return Err(PromoteError::unsafe_path(raw, "embedded NUL"));
            }
            s => parts.push(s),
        }
    }
    if parts.is_empty() {
        return Err(PromoteError::unsafe_path(raw, "empty path"));
    }
    Ok(parts.join("/"))
}

/// `root` joined with the normalised form of `rel`.
pub fn resolve_under(root: &Path, rel: &str) -> Result<PathBuf> {
    let safe = normalize_relative(rel)?;
    Ok(safe.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s)))
}

/// What a walk of the draft tree found.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DraftListing {
    /// Regular files, normalised and sorted.
    pub files: Vec<String>,
    /// Entries refused outright, with the reason.
    pub refused: Vec<(String, String)>,
}

impl DraftListing {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.refused.is_empty()
    }
}

/// Walk `root` without following symbolic links.
///
/// Symlinks and names that are not valid UTF-8 are listed in `refused`.
pub fn collect_draft_files(root: &Path) -> Result<DraftListing> {
    let mut listing = DraftListing::default();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| PromoteError::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| PromoteError::io(&dir, e))?;
            let path = entry.path();
            let meta = fs::symlink_metadata(&path).map_err(|e| PromoteError::io(&path, e))?;
            let rel_path = path.strip_prefix(root).unwrap_or(&path);
            let rel = match rel_path.to_str() {
                Some(s) => s.replace('\\', "/"),
                None => {
                    listing
                        .refused
                        .push((rel_path.to_string_lossy().into_owned(), "non UTF-8 name".into()));
                    continue;
                }
            };

            if meta.file_type().is_symlink() {
                listing.refused.push((rel, "symbolic link".to_string()));
            } else if meta.is_dir() {
                pending.push(path);
            } else if meta.is_file() {
                match normalize_relative(&rel) {
                    Ok(safe) => listing.files.push(safe),
                    Err(e) => listing.refused.push((rel, e.to_string())),
                }
            } else {
                listing.refused.push((rel, "not a regular file".to_string()));
            }
        }
    }

    listing.files.sort();
    listing.refused.sort();
    Ok(listing)
}
