// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The closed error taxonomy named in the error handling design: every
//! phase's library error is folded into one enum here, then converted to
//! `anyhow::Error` at the binary boundary the way `cliutil::handle_top_level_result`
//! expects.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("target triple: {0}")]
    Triple(#[from] triple::TripleError),
    #[error("package discovery: {0}")]
    Discovery(#[from] discovery::DiscoveryError),
    #[error("native build: {0}")]
    Compile(#[from] compiler::CompileError),
    #[error("bundler: {0}")]
    Bundle(#[from] bundle::BundleError),
}
