// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Link: the final step that combines every module archive, the embedded
//! bundle object, and the generated entry-point object into one standalone
//! executable.

use std::path::{Path, PathBuf};
use std::process::Command;

use compiler::{base_link_flags, CompileError, OutputInformation, CLANG};
use triple::TargetTriple;

/// Links `archives` (in discovery order), followed by `bundle_object` and
/// `entry_object`, into the final executable at
/// `OutputInformation::executable_path`. `link_libraries` is the set of
/// `-l<name>` arguments collected across every native module; `extra_flags`
/// is the concatenation of every native module's `lFlags`.
pub fn link(
    output: &OutputInformation,
    target: &TargetTriple,
    archives: &[PathBuf],
    bundle_object: &Path,
    entry_object: &Path,
    link_libraries: &[String],
    extra_flags: &[String],
) -> Result<PathBuf, CompileError> {
    let executable = output.executable_path(target);

    let mut cmd = Command::new(CLANG);
    cmd.args(archives)
        .arg(bundle_object)
        .arg(entry_object)
        .arg("-target")
        .arg(target.to_string());
    for flag in base_link_flags() {
        cmd.arg(flag);
    }
    cmd.args(extra_flags);
    for lib in link_libraries {
        cmd.arg(format!("-l{lib}"));
    }
    cmd.arg("-o").arg(&executable);

    tracing::debug!(?cmd, "linking final executable");
    let output_result = processes::run_and_capture(&mut cmd)?;
    if !output_result.status.success() {
        return Err(CompileError::Link {
            executable,
            command: format!("{cmd:?}"),
            stderr: String::from_utf8_lossy(&output_result.stderr).into_owned(),
        });
    }

    Ok(executable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triple::{Abi, Arch, Platform, Vendor};

    #[test]
    fn executable_path_matches_output_information() {
        let root = std::env::temp_dir().join("yaje-link-test");
        let target = TargetTriple::new(Arch::X86_64, Vendor::Unknown, Platform::Linux, Abi::Gnu);
        let output = OutputInformation::new(&root, &target);
        assert_eq!(output.executable_path(&target), output.target_folder.join("a"));
    }
}
