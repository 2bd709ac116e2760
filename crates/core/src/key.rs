//! Object key composition
//!
//! Keys are a folder prefix and a file name joined with `/`. Separators are
//! always forward slashes, whatever the host platform.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bucket-relative object key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Join a folder and a file name into a key
    ///
    /// Empty and `.` segments are dropped, so `"uploads/"`, `"/uploads"` and
    /// `"uploads"` all produce the same prefix. A `..` segment removes the
    /// segment before it; one with nothing left to remove is kept. An empty
    /// folder yields the bare file name.
    pub fn join(folder: &str, name: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in folder.split('/').chain(name.split('/')) {
            match segment {
                "" | "." => {}
                ".." if segments.last().is_some_and(|last| *last != "..") => {
                    segments.pop();
                }
                _ => segments.push(segment),
            }
        }
        Self(segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The last segment of the key
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ObjectKey {
    /// Use a key verbatim, without normalization
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ObjectKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Split a file name into stem and extension
///
/// The extension runs from the last `.` to the end, unless that dot is the
/// first character: `.env` has no extension and keeps the whole name as its
/// stem. `.txt` is treated the same way, so it gets stem `.txt` rather than an
/// empty stem with extension `.txt`, and its first suffixed form is `.txt_1`.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// The `n`-th suffixed variant of a file name, e.g. `report_2.pdf`
pub fn suffixed_name(name: &str, n: u32) -> String {
    let (stem, ext) = split_extension(name);
    format!("{stem}_{n}{ext}")
}
