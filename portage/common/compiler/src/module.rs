// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-Module Compile: turns one module's C sources into object files
//! (cached) and archives them into a static library.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cfgmodel::CfgResult;
use sha2::{Digest, Sha256};
use triple::TargetTriple;

use crate::args::{assemble_compile_args, base_compile_flags};
use crate::depscan::scan_header_deps;
use crate::errors::CompileError;
use crate::hash::hash_translation_unit;
use crate::output::OutputInformation;
use crate::toolchain::{CLANG, LLVM_AR};

/// Disambiguates duplicate source basenames within one module by suffixing
/// a running counter, e.g. two `util.c` files under different directories
/// become `util.o` and `util_1.o`.
fn disambiguated_stems(sources: &[PathBuf]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    sources
        .iter()
        .map(|s| {
            let stem = s
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let count = seen.entry(stem.clone()).or_insert(0);
            let disambiguated = if *count == 0 {
                stem
            } else {
                format!("{stem}_{count}")
            };
            *count += 1;
            disambiguated
        })
        .collect()
}

/// Compiles `source` to `object`, consulting/rewriting `hash_sidecar`.
/// Returns `true` if a compile was actually invoked, `false` on a cache hit.
///
/// Per the resource model, the object is written before the sidecar: a
/// crash between the two leaves the cache stale, never falsely fresh.
pub fn compile_cached(
    source: &Path,
    object: &Path,
    hash_sidecar: &Path,
    args: &[String],
) -> Result<bool, CompileError> {
    let deps = scan_header_deps(source, args);
    let current_hash = hash_translation_unit(source, &deps, args)?;

    if object.is_file() && hash_sidecar.is_file() {
        if let Ok(stored) = fs::read_to_string(hash_sidecar) {
            if stored.trim() == current_hash {
                return Ok(false);
            }
        }
    }

    let mut cmd = Command::new(CLANG);
    cmd.args(args).arg(source).arg("-o").arg(object);
    tracing::debug!(?cmd, "compiling translation unit");
    let output = processes::run_and_capture(&mut cmd)?;
    if !output.status.success() {
        return Err(CompileError::Compile {
            source_file: source.to_owned(),
            command: format!("{cmd:?}"),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    fs::write(hash_sidecar, &current_hash)?;
    Ok(true)
}

/// A stable, 12-char, filesystem-safe digest of a module's object directory
/// path. Stable across incremental runs for the same module (the object
/// directory is unique per module name); this is a collision-avoidance
/// identifier, not a content hash, so archive names do not change when the
/// module's contents do.
fn module_archive_digest(object_dir: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(object_dir.as_os_str().to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.chars().take(12).collect()
}

/// Compiles every source of module `m` (with native dependency set `deps`,
/// in discovery order) and archives the resulting objects into
/// `modFolder/lib_<digest>.a`. Returns the archive path.
///
/// The archive is rebuilt unconditionally on every call: archiving is cheap
/// and incremental logic lives entirely at the object layer (see
/// [`compile_cached`]).
pub fn compile_module(
    output: &OutputInformation,
    target: &TargetTriple,
    m: &CfgResult,
    deps: &[&CfgResult],
) -> Result<PathBuf, CompileError> {
    let mut base_flags = base_compile_flags(target);
    base_flags.extend(m.c_flags.iter().cloned());
    let args = assemble_compile_args(m, deps, &base_flags);

    let object_dir = output.obj_folder.join(&m.name);
    let cache_dir = output.cache_folder.join(&m.name);
    fs::create_dir_all(&object_dir)?;
    fs::create_dir_all(&cache_dir)?;

    let stems = disambiguated_stems(&m.sources);
    let mut objects = Vec::with_capacity(m.sources.len());
    for (source, stem) in m.sources.iter().zip(stems.iter()) {
        let object = object_dir.join(format!("{stem}.o"));
        let hash_sidecar = cache_dir.join(format!("{stem}.hash"));
        compile_cached(source, &object, &hash_sidecar, &args)?;
        objects.push(object);
    }

    let digest = module_archive_digest(&object_dir);
    let archive = output.mod_folder.join(format!("lib_{digest}.a"));

    let mut cmd = Command::new(LLVM_AR);
    cmd.arg("rcs").arg(&archive).args(&objects);
    tracing::debug!(?cmd, module = %m.name, "archiving module objects");
    let result = processes::run_and_capture(&mut cmd)?;
    if !result.status.success() {
        return Err(CompileError::Archive {
            module: m.name.clone(),
            archive,
            command: format!("{cmd:?}"),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        });
    }

    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disambiguates_duplicate_basenames() {
        let sources = vec![
            PathBuf::from("/a/util.c"),
            PathBuf::from("/b/util.c"),
            PathBuf::from("/a/main.c"),
            PathBuf::from("/c/util.c"),
        ];
        let stems = disambiguated_stems(&sources);
        assert_eq!(stems, vec!["util", "util_1", "main", "util_2"]);
    }

    #[test]
    fn archive_digest_is_stable_and_twelve_chars() {
        let dir = Path::new("/proj/.yaje/target/obj/my-module");
        let d1 = module_archive_digest(dir);
        let d2 = module_archive_digest(dir);
        assert_eq!(d1, d2);
        assert_eq!(d1.len(), 12);
    }

    #[test]
    fn archive_digest_differs_across_modules() {
        let d1 = module_archive_digest(Path::new("/proj/.yaje/target/obj/mod-a"));
        let d2 = module_archive_digest(Path::new("/proj/.yaje/target/obj/mod-b"));
        assert_ne!(d1, d2);
    }
}
