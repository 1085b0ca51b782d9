// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! `yaje cdb`: emits a JSON compilation database derived from the same
//! per-module argument assembler the real build uses. Peripheral per
//! spec.md section 1, but it consumes the same dependency-graph discovery
//! service, so it lives here rather than in a separate tool.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use discovery::PackageCollection;
use serde_json::json;
use triple::TargetTriple;

#[derive(Args, Debug)]
pub struct CdbArgs {
    #[arg(short = 't', long)]
    target: Option<String>,

    #[arg(long, default_value = ".")]
    project: PathBuf,

    #[arg(short = 'o', long, default_value = "compile_commands.json")]
    output: PathBuf,
}

pub fn do_cdb(args: CdbArgs) -> Result<()> {
    let target: TargetTriple = match args.target.as_deref() {
        Some(s) => triple::parse_triple(s)?,
        None => triple::host_target(),
    };

    let mut collection = PackageCollection::new();
    // Per spec.md section 7, a missing `@yaje/core` is swallowed here: the
    // tool is still useful for non-native packages even without it, unlike
    // the real build which hard-fails in `get_core()`.
    discovery::discover(&args.project, &target, &mut collection)
        .with_context(|| format!("discovering packages rooted at {:?}", args.project))?;

    let mut entries = Vec::new();
    for package in collection.native_modules_in_order() {
        let cfg = package
            .instructions
            .as_ref()
            .expect("native_modules_in_order only returns native packages");

        let dep_names: Vec<&str> = collection
            .transitive_native_deps(&package.manifest.name)
            .into_iter()
            .map(|p| p.manifest.name.as_str())
            .collect();
        let deps: Vec<&cfgmodel::CfgResult> = dep_names
            .iter()
            .filter_map(|name| collection[*name].instructions.as_ref())
            .collect();

        let mut base_flags = compiler::base_compile_flags(&target);
        base_flags.extend(cfg.c_flags.iter().cloned());
        let args_vec = compiler::assemble_compile_args(cfg, &deps, &base_flags);

        for source in &cfg.sources {
            entries.push(json!({
                "directory": package.package_folder,
                "file": source,
                "arguments": std::iter::once("clang".to_string()).chain(args_vec.iter().cloned()).collect::<Vec<_>>(),
            }));
        }
    }

    let rendered = serde_json::to_string_pretty(&entries)?;
    fs::write(&args.output, rendered)
        .with_context(|| format!("writing compilation database to {:?}", args.output))?;
    tracing::info!(entries = entries.len(), output = %args.output.display(), "wrote compilation database");
    Ok(())
}
