// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathErrorKind {
    InvalidComponent,
    EscapesBase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathError {
    pub kind: PathErrorKind,
    pub message: String,
}

impl PathError {
    fn new(kind: PathErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PathError {}

/// Join untrusted index segments under `base`.
///
/// Segments may carry Windows separators or non-breaking spaces from the
/// index. Empty segments are skipped and any `..` piece is rejected. The
/// result is lexically normalized and must stay inside the normalized base.
/// The filesystem is not consulted.
pub fn resolve_under_base<S: AsRef<str>>(
    base: &Path,
    segments: &[S],
) -> Result<PathBuf, PathError> {
    let base_norm = normalize_lexically(base);
    let mut out = base_norm.clone();

    for segment in segments {
        let cleaned = clean_segment(segment.as_ref());
        if cleaned.is_empty() {
            continue;
        }
        if cleaned.split('/').any(|piece| piece == "..") {
            return Err(PathError::new(
                PathErrorKind::InvalidComponent,
                "Invalid path component.",
            ));
        }
        for piece in cleaned.split('/') {
            if piece.is_empty() || piece == "." {
                continue;
            }
            out.push(piece);
        }
    }

    let out = normalize_lexically(&out);
    if !out.starts_with(&base_norm) {
        return Err(PathError::new(
            PathErrorKind::EscapesBase,
            "Resolved path escapes base directory.",
        ));
    }
    Ok(out)
}

fn clean_segment(raw: &str) -> String {
    let spaced = raw.replace('\u{00A0}', " ");
    spaced
        .trim()
        .replace('\\', "/")
        .trim_matches('/')
        .to_string()
}

fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_in_name =
                    matches!(out.components().next_back(), Some(Component::Normal(_)));
                if ends_in_name {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
