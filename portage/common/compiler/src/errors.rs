// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("required build tool {tool:?} was not found on PATH (probed with `{tool} --version`): {source}")]
    MissingTool {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to compile {source_file:?}\ncommand: {command}\n{stderr}")]
    Compile {
        source_file: PathBuf,
        command: String,
        stderr: String,
    },
    #[error("failed to archive {module:?} into {archive:?}\ncommand: {command}\n{stderr}")]
    Archive {
        module: String,
        archive: PathBuf,
        command: String,
        stderr: String,
    },
    #[error("failed to embed bundle bytes into {object:?}\ncommand: {command}\n{stderr}")]
    Embed {
        object: PathBuf,
        command: String,
        stderr: String,
    },
    #[error("failed to link {executable:?}\ncommand: {command}\n{stderr}")]
    Link {
        executable: PathBuf,
        command: String,
        stderr: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Process(#[from] anyhow::Error),
}
