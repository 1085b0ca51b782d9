// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Managed Bundling Gateway: a uniform capability interface over the
//! pluggable JavaScript bundlers (Vite/Rollup/Webpack/esbuild), each reached
//! as a real CLI subprocess with the driver's fixed flags (ES module
//! format, inline dynamic imports, single chunk, no minification, no
//! sourcemaps).
//!
//! Per the redesign note in spec.md section 9 ("replace the abstract base
//! with a capability interface"), there is no nominal base class: the
//! gateway loader only checks that the selected bundler package resolves to
//! one of the shapes below, not that it inherits from anything.

use std::path::{Path, PathBuf};
use std::process::Command;

use discovery::PackageCollection;

use crate::errors::BundleError;

/// The capability every bundler implementation exposes: `init` prepares the
/// bundler (installing/validating its toolchain), `bundle` produces the
/// single ES-module artifact for `entry`.
pub trait Bundler {
    fn init(&mut self) -> Result<(), BundleError>;
    fn bundle(&mut self, entry: &Path) -> Result<PathBuf, BundleError>;
}

/// One real bundler CLI, invoked with the fixed flag shape every built-in
/// implementation shares; only the binary name and per-tool flag spellings
/// differ.
struct CliBundler {
    name: &'static str,
    binary: &'static str,
    gen_folder: PathBuf,
    build_args: fn(entry: &Path, out_file: &Path) -> Vec<String>,
}

impl Bundler for CliBundler {
    fn init(&mut self) -> Result<(), BundleError> {
        let status = Command::new(self.binary).arg("--version").status();
        match status {
            Ok(s) if s.success() => Ok(()),
            Ok(s) => Err(BundleError::InitFailed {
                bundler: self.name,
                message: format!("`{} --version` exited with {s}", self.binary),
            }),
            Err(e) => Err(BundleError::InitFailed {
                bundler: self.name,
                message: e.to_string(),
            }),
        }
    }

    fn bundle(&mut self, entry: &Path) -> Result<PathBuf, BundleError> {
        std::fs::create_dir_all(&self.gen_folder)?;
        let out_file = self.gen_folder.join("bundle.js");
        let args = (self.build_args)(entry, &out_file);

        let mut cmd = Command::new(self.binary);
        cmd.args(&args);
        tracing::debug!(?cmd, bundler = self.name, "invoking bundler");
        let output = cmd.output().map_err(|e| BundleError::BundleFailed {
            bundler: self.name,
            entry: entry.to_owned(),
            message: e.to_string(),
        })?;
        if !output.status.success() {
            return Err(BundleError::BundleFailed {
                bundler: self.name,
                entry: entry.to_owned(),
                message: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let artifacts: Vec<PathBuf> = std::fs::read_dir(&self.gen_folder)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("js"))
            .collect();
        if artifacts.len() != 1 {
            return Err(BundleError::WrongArtifactCount {
                bundler: self.name,
                dir: self.gen_folder.clone(),
                count: artifacts.len(),
            });
        }
        Ok(artifacts.into_iter().next().unwrap())
    }
}

fn vite_args(entry: &Path, out_file: &Path) -> Vec<String> {
    vec![
        "build".into(),
        "--config=false".into(),
        format!("--outDir={}", out_file.parent().unwrap().display()),
        "--minify=false".into(),
        "--sourcemap=false".into(),
        format!("--build.lib.entry={}", entry.display()),
        "--build.lib.formats=es".into(),
        "--build.rollupOptions.output.inlineDynamicImports=true".into(),
        "--build.rollupOptions.output.entryFileNames=bundle.js".into(),
    ]
}

fn rollup_args(entry: &Path, out_file: &Path) -> Vec<String> {
    vec![
        entry.display().to_string(),
        "--format=es".into(),
        "--inlineDynamicImports".into(),
        format!("--file={}", out_file.display()),
    ]
}

fn webpack_args(entry: &Path, out_file: &Path) -> Vec<String> {
    vec![
        format!("--entry={}", entry.display()),
        "--output-module=true".into(),
        "--mode=none".into(),
        "--devtool=false".into(),
        format!("--output-path={}", out_file.parent().unwrap().display()),
        format!("--output-filename={}", out_file.file_name().unwrap().to_string_lossy()),
    ]
}

fn esbuild_args(entry: &Path, out_file: &Path) -> Vec<String> {
    vec![
        entry.display().to_string(),
        "--bundle".into(),
        "--format=esm".into(),
        "--minify=false".into(),
        "--sourcemap=false".into(),
        format!("--outfile={}", out_file.display()),
    ]
}

/// Constructs the bundler implementation matching `package_name`, one of
/// `@yaje/vite`, `@yaje/rollup`, `@yaje/webpack`, `@yaje/esbuild`.
pub fn bundler_for_package(
    package_name: &str,
    gen_folder: PathBuf,
) -> Result<Box<dyn Bundler>, BundleError> {
    let (name, binary, build_args): (&'static str, &'static str, fn(&Path, &Path) -> Vec<String>) =
        match package_name {
            "@yaje/vite" => ("vite", "vite", vite_args),
            "@yaje/rollup" => ("rollup", "rollup", rollup_args),
            "@yaje/webpack" => ("webpack", "webpack", webpack_args),
            "@yaje/esbuild" => ("esbuild", "esbuild", esbuild_args),
            other => return Err(BundleError::UnknownBundlerShape(other.to_owned())),
        };
    Ok(Box::new(CliBundler {
        name,
        binary,
        gen_folder,
        build_args,
    }))
}

/// Selects and constructs the bundler advertised by the discovered package
/// collection (the package with `manifest.bundler == true`).
pub fn select_bundler(
    collection: &PackageCollection,
    gen_folder: PathBuf,
) -> Result<Box<dyn Bundler>, BundleError> {
    let bundler_package = collection
        .get_bundler()
        .map_err(|_| BundleError::NoBundlerSelected("<none>".to_owned()))?;
    bundler_for_package(&bundler_package.manifest.name, gen_folder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_bundler_shape() {
        let err = bundler_for_package("@yaje/turbopack", PathBuf::from("/gen")).unwrap_err();
        assert!(matches!(err, BundleError::UnknownBundlerShape(_)));
    }

    #[test]
    fn esbuild_args_fix_the_required_flags() {
        let args = esbuild_args(Path::new("/app/src/index.js"), Path::new("/gen/bundle.js"));
        assert!(args.contains(&"--format=esm".to_owned()));
        assert!(args.contains(&"--bundle".to_owned()));
        assert!(args.contains(&"--outfile=/gen/bundle.js".to_owned()));
    }
}
