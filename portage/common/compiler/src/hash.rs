// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Incremental Hash: the cache key for one translation unit.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Computes `hash(source, deps, args)` = SHA-256 of, in order: the
/// space-joined argument vector, the source file's bytes, then the bytes of
/// each dependency file that currently exists (missing dependencies are
/// skipped, never an error). Returned as lowercase hex.
pub fn hash_translation_unit(source: &Path, deps: &[impl AsRef<Path>], args: &[String]) -> io::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(args.join(" ").as_bytes());
    stream_file_into(&mut hasher, source)?;
    for dep in deps {
        let dep = dep.as_ref();
        if dep.is_file() {
            stream_file_into(&mut hasher, dep)?;
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

fn stream_file_into(hasher: &mut Sha256, path: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(())
}

/// Computes the SHA-256 of a byte slice directly (used for the bundle
/// embedding sidecar, which hashes the bundle bytes rather than a file).
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn changing_source_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.c");
        fs::write(&source, "int a;").unwrap();
        let args = vec!["-c".to_owned()];
        let h1 = hash_translation_unit(&source, &Vec::<&Path>::new(), &args).unwrap();

        fs::write(&source, "int b;").unwrap();
        let h2 = hash_translation_unit(&source, &Vec::<&Path>::new(), &args).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn changing_args_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.c");
        fs::write(&source, "int a;").unwrap();
        let h1 = hash_translation_unit(&source, &Vec::<&Path>::new(), &["-O0".to_owned()]).unwrap();
        let h2 = hash_translation_unit(&source, &Vec::<&Path>::new(), &["-O2".to_owned()]).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn changing_header_dependency_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.c");
        let header = dir.path().join("a.h");
        fs::write(&source, "#include \"a.h\"").unwrap();
        fs::write(&header, "int x;").unwrap();
        let args = vec!["-c".to_owned()];

        let h1 = hash_translation_unit(&source, &[&header], &args).unwrap();
        fs::write(&header, "int y;").unwrap();
        let h2 = hash_translation_unit(&source, &[&header], &args).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn missing_dependency_is_skipped_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.c");
        fs::write(&source, "int a;").unwrap();
        let missing = dir.path().join("missing.h");
        let result = hash_translation_unit(&source, &[&missing], &[]);
        assert!(result.is_ok());
    }

    #[test]
    fn same_inputs_yield_same_hash() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.c");
        fs::write(&source, "int a;").unwrap();
        let args = vec!["-O2".to_owned()];
        let h1 = hash_translation_unit(&source, &Vec::<&Path>::new(), &args).unwrap();
        let h2 = hash_translation_unit(&source, &Vec::<&Path>::new(), &args).unwrap();
        assert_eq!(h1, h2);
    }
}
