// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("discovery never encountered a native @yaje/core package")]
    MissingCore,
    #[error("discovery never encountered a package declaring itself a bundler")]
    MissingBundler,
    #[error("{0:?} has no package.json")]
    MissingManifest(PathBuf),
    #[error("{path:?} is not valid JSON: {source}")]
    UnparseableManifest {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{parent:?} depends on {name:?}, but no node_modules/{name} was found in any enclosing directory")]
    UnresolvableDependency { parent: String, name: String },
    #[error("{0:?} could not be evaluated")]
    Script(#[from] cfgscript::ScriptError),
}
