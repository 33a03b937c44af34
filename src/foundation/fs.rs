use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::LakebloomResult;

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> LakebloomResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Sibling path used while a file is being written.
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Removes the wrapped file on drop unless disarmed.
pub(crate) struct TempFileGuard(pub(crate) Option<PathBuf>);

impl TempFileGuard {
    /// Keep the file: the guard forgets it.
    pub(crate) fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Write through a `.partial` sibling, then rename over `path`.
///
/// `write` receives the temporary path. On any failure the temporary file is removed and `path`
/// is left untouched.
pub(crate) fn write_atomically(
    path: &Path,
    write: impl FnOnce(&Path) -> LakebloomResult<()>,
) -> LakebloomResult<()> {
    ensure_parent_dir(path)?;
    let tmp = partial_path(path);
    let mut guard = TempFileGuard(Some(tmp.clone()));
    write(&tmp)?;
    std::fs::rename(&tmp, path).with_context(|| {
        format!(
            "failed to move '{}' into place at '{}'",
            tmp.display(),
            path.display()
        )
    })?;
    guard.disarm();
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/fs.rs"]
mod tests;
