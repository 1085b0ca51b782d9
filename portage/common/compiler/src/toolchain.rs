// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Presence probing for the clang-compatible tools the driver shells out to.

use std::process::{Command, Stdio};

use crate::CompileError;

pub const CLANG: &str = "clang";
pub const LLVM_AR: &str = "llvm-ar";

/// Probes `tool --version`, per the tool contract in the external interfaces
/// section: presence is checked this way, absence aborts the build.
pub fn probe(tool: &'static str) -> Result<(), CompileError> {
    Command::new(tool)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|source| CompileError::MissingTool { tool, source })?;
    Ok(())
}
