// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod build;
mod cdb;
mod errors;
mod init;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cliutil::{cli_main, ConfigBuilder};

use crate::build::{do_build, BuildArgs};
use crate::cdb::{do_cdb, CdbArgs};
use crate::init::{do_init, InitArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Builds a yaje package graph into a standalone executable")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the full build pipeline: discovery, bundling, native compile, link.
    Build(BuildArgs),
    /// Scaffolds a new yaje project.
    Init(InitArgs),
    /// Emits a compile_commands.json compilation database.
    Cdb(CdbArgs),
}

fn do_main() -> Result<()> {
    let cli = Cli::try_parse()?;
    match cli.command {
        Commands::Build(args) => do_build(args),
        Commands::Init(args) => do_init(args),
        Commands::Cdb(args) => do_cdb(args),
    }
}

fn main() -> ExitCode {
    cli_main(
        do_main,
        ConfigBuilder::new().build().expect("valid config"),
    )
}
