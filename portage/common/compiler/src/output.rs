// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::{Path, PathBuf};

use triple::TargetTriple;

/// Derived output directories for one project + target combination, rooted
/// at `<project>/.yaje/<tripleString>/`. A read-only key into filesystem
/// state: it owns nothing itself.
#[derive(Debug, Clone)]
pub struct OutputInformation {
    pub target_folder: PathBuf,
    pub obj_folder: PathBuf,
    pub mod_folder: PathBuf,
    pub gen_folder: PathBuf,
    pub cache_folder: PathBuf,
}

impl OutputInformation {
    pub fn new(project_root: &Path, target: &TargetTriple) -> Self {
        let target_folder = project_root.join(".yaje").join(target.to_string());
        Self {
            obj_folder: target_folder.join("obj"),
            mod_folder: target_folder.join("modules"),
            gen_folder: target_folder.join("gen"),
            cache_folder: target_folder.join("cache"),
            target_folder,
        }
    }

    /// Creates all four directories, idempotently.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            &self.obj_folder,
            &self.mod_folder,
            &self.gen_folder,
            &self.cache_folder,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Path to the final executable, `.exe`-suffixed on Windows targets.
    pub fn executable_path(&self, target: &TargetTriple) -> PathBuf {
        let name = if target.platform == triple::Platform::Windows {
            "a.exe"
        } else {
            "a"
        };
        self.target_folder.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triple::{Abi, Arch, Platform, Vendor};

    #[test]
    fn lays_out_directories_under_dotyaje() {
        let root = Path::new("/proj");
        let target = TargetTriple::new(Arch::X86_64, Vendor::Unknown, Platform::Linux, Abi::Gnu);
        let out = OutputInformation::new(root, &target);
        assert_eq!(
            out.obj_folder,
            Path::new("/proj/.yaje/x86_64-unknown-linux-gnu/obj")
        );
        assert_eq!(
            out.executable_path(&target),
            Path::new("/proj/.yaje/x86_64-unknown-linux-gnu/a")
        );
    }

    #[test]
    fn windows_executable_has_exe_suffix() {
        let root = Path::new("/proj");
        let target = TargetTriple::new(Arch::X86_64, Vendor::Pc, Platform::Windows, Abi::Msvc);
        let out = OutputInformation::new(root, &target);
        assert_eq!(
            out.executable_path(&target),
            Path::new("/proj/.yaje/x86_64-pc-windows-msvc/a.exe")
        );
    }
}
