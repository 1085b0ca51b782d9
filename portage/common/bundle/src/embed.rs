// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Bundle Embedding: materializes the JavaScript bundle bytes as a C
//! object exposing a `<prefix>_LENGTH`/`<prefix>_DATA` symbol pair.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use compiler::{hash_bytes, CLANG};
use triple::TargetTriple;

use crate::errors::BundleError;

/// Renders the piped C source the compiler reads from standard input.
/// A trailing `0x00` sentinel is always appended after the content (but not
/// reflected in the length constant), so downstream code can treat `_DATA`
/// as a zero-copy C string.
fn render_source(bytes: &[u8], prefix: &str) -> String {
    let mut out = String::with_capacity(bytes.len() * 5 + 64);
    out.push_str(&format!("size_t {prefix}_LENGTH = {};\n", bytes.len()));
    out.push_str(&format!("unsigned char {prefix}_DATA[] = {{ "));
    for byte in bytes {
        out.push_str(&format!("0x{byte:02x}, "));
    }
    out.push_str("0x00 };\n");
    out
}

/// Embeds `bytes` as a C object at `object`, skipping the compile if
/// `cache_folder/bundle.hash` already matches the SHA-256 of `bytes`.
pub fn embed_bundle(
    bytes: &[u8],
    prefix: &str,
    target: &TargetTriple,
    extra_flags: &[String],
    object: &Path,
    cache_folder: &Path,
) -> Result<(), BundleError> {
    let current_hash = hash_bytes(bytes);
    let sidecar = cache_folder.join("bundle.hash");
    if object.is_file() && sidecar.is_file() {
        if let Ok(stored) = fs::read_to_string(&sidecar) {
            if stored.trim() == current_hash {
                tracing::debug!("bundle unchanged, skipping embed");
                return Ok(());
            }
        }
    }

    let source = render_source(bytes, prefix);

    let mut cmd = Command::new(CLANG);
    cmd.args(extra_flags)
        .arg("-x")
        .arg("c")
        .arg("-c")
        .arg("-target")
        .arg(target.to_string())
        .arg("-")
        .arg("-o")
        .arg(object)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!(?cmd, bytes = bytes.len(), "embedding bundle");
    let mut child = cmd.spawn()?;
    child
        .stdin
        .take()
        .expect("stdin piped above")
        .write_all(source.as_bytes())?;
    let output = child.wait_with_output()?;

    if !output.status.success() {
        return Err(compiler::CompileError::Embed {
            object: object.to_owned(),
            command: format!("{cmd:?}"),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
        .into());
    }

    fs::write(&sidecar, &current_hash)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_length_and_data_with_trailing_sentinel() {
        let rendered = render_source(b"Hi\n", "JS_BUNDLE");
        assert!(rendered.contains("JS_BUNDLE_LENGTH = 3;"));
        assert!(rendered.contains("0x48, 0x69, 0x0a, 0x00 };"));
    }

    #[test]
    fn empty_bundle_yields_zero_length_and_sentinel_only() {
        let rendered = render_source(b"", "JS_BUNDLE");
        assert!(rendered.contains("JS_BUNDLE_LENGTH = 0;"));
        assert!(rendered.contains("JS_BUNDLE_DATA[] = { 0x00 };"));
    }
}
