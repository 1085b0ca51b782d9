// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("no package in the collection declares itself a bundler ({0:?} was expected to, or no package set `bundler: true`)")]
    NoBundlerSelected(String),
    #[error("bundler package {0:?} does not match any known bundler shape (vite, rollup, webpack, esbuild)")]
    UnknownBundlerShape(String),
    #[error("bundler {bundler} failed to initialize: {message}")]
    InitFailed { bundler: &'static str, message: String },
    #[error("bundler {bundler} failed to bundle {entry:?}: {message}")]
    BundleFailed {
        bundler: &'static str,
        entry: PathBuf,
        message: String,
    },
    #[error("bundler {bundler} produced {count} artifacts at {dir:?}, expected exactly 1")]
    WrongArtifactCount {
        bundler: &'static str,
        dir: PathBuf,
        count: usize,
    },
    #[error("failed to embed bundle bytes: {0}")]
    Embed(#[from] compiler::CompileError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
