// Copyright 2023 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use anyhow::{Context, Result};

/// Removes a directory tree like [`std::fs::remove_dir_all`], but first makes
/// every entry writable so that directories and files created read-only (or
/// with no execute bit) don't abort the removal halfway through.
pub fn remove_dir_all_with_chmod(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    chmod_recursive(dir)
        .with_context(|| format!("failed to make {dir:?} writable before removal"))?;
    fs::remove_dir_all(dir).with_context(|| format!("failed to remove {dir:?}"))
}

fn chmod_recursive(path: &Path) -> Result<()> {
    for entry in walkdir::WalkDir::new(path).contents_first(false) {
        let entry = entry?;
        let metadata = entry.metadata()?;
        let mut permissions = metadata.permissions();
        let mode = permissions.mode();
        let desired = if metadata.is_dir() {
            mode | 0o700
        } else {
            mode | 0o600
        };
        if desired != mode {
            permissions.set_mode(desired);
            fs::set_permissions(entry.path(), permissions)
                .with_context(|| format!("failed to chmod {:?}", entry.path()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt as _;

    #[test]
    fn removes_readonly_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let file = nested.join("f.txt");
        fs::write(&file, "hi").unwrap();
        fs::set_permissions(&file, PermissionsExt::from_mode(0o400)).unwrap();
        fs::set_permissions(&nested, PermissionsExt::from_mode(0o500)).unwrap();

        remove_dir_all_with_chmod(tmp.path()).unwrap();
        assert!(!tmp.path().exists());
    }

    #[test]
    fn tolerates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        remove_dir_all_with_chmod(&missing).unwrap();
    }
}
