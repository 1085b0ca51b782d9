// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The build driver: the linear four-phase pipeline described in the
//! system overview, wired from the `build` subcommand.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cfgmodel::CfgResult;
use clap::Args;
use discovery::PackageCollection;
use triple::TargetTriple;

use crate::errors::DriverError;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Target triple to build for, e.g. `x86_64-unknown-linux-gnu`. Defaults
    /// to the host triple.
    #[arg(short = 't', long)]
    target: Option<String>,

    /// Project root directory. Defaults to the current directory.
    #[arg(long, default_value = ".")]
    project: PathBuf,
}

pub fn do_build(args: BuildArgs) -> Result<()> {
    let executable = run_build(&args.project, args.target.as_deref())?;
    tracing::info!(executable = %executable.display(), "build succeeded");
    println!("{}", executable.display());
    Ok(())
}

/// Runs the full pipeline and returns the path to the produced executable.
pub fn run_build(project_root: &Path, target_override: Option<&str>) -> Result<PathBuf> {
    // Phase 1: target resolution.
    let target: TargetTriple = match target_override {
        Some(s) => triple::parse_triple(s).map_err(DriverError::from)?,
        None => triple::host_target(),
    };
    tracing::info!(target = %target, "resolved target triple");

    for tool in [compiler::CLANG, compiler::LLVM_AR] {
        compiler::probe(tool).map_err(DriverError::from)?;
    }

    // Phase 2: package discovery.
    let mut collection = PackageCollection::new();
    let root_name = discovery::discover(project_root, &target, &mut collection)
        .map_err(DriverError::from)
        .with_context(|| format!("discovering packages rooted at {project_root:?}"))?;
    tracing::info!(packages = collection.len(), root = %root_name, "discovery complete");

    let output = compiler::OutputInformation::new(project_root, &target);
    output.ensure_dirs()?;

    // Phase 3: managed bundling.
    let root_package = &collection[root_name.as_str()];
    let entry_path = root_package.package_folder.join(&root_package.manifest.main);
    let mut bundler = bundle::select_bundler(&collection, output.gen_folder.clone())
        .map_err(DriverError::from)?;
    bundler.init().map_err(DriverError::from)?;
    let bundle_js = bundler
        .bundle(&entry_path)
        .map_err(DriverError::from)
        .context("managed bundling")?;
    let bundle_bytes = fs::read(&bundle_js)
        .with_context(|| format!("reading bundler output {bundle_js:?}"))?;

    let bundle_object = output.mod_folder.join("bundle.o");
    bundle::embed_bundle(
        &bundle_bytes,
        "JS_BUNDLE",
        &target,
        &[],
        &bundle_object,
        &output.cache_folder,
    )
    .map_err(DriverError::from)
    .context("embedding bundle")?;

    // Phase 4: native build.
    let native_modules = collection.native_modules_in_order();
    let mut archives = Vec::with_capacity(native_modules.len());
    let mut loading_functions = Vec::new();
    let mut link_libraries = Vec::new();
    let mut link_flags = Vec::new();

    for package in &native_modules {
        let cfg: &CfgResult = package
            .instructions
            .as_ref()
            .expect("native package always carries instructions");

        let dep_names: Vec<&str> = collection
            .transitive_native_deps(&package.manifest.name)
            .into_iter()
            .map(|p| p.manifest.name.as_str())
            .collect();
        let deps: Vec<&CfgResult> = dep_names
            .iter()
            .filter_map(|name| collection[*name].instructions.as_ref())
            .collect();

        let archive = compiler::compile_module(&output, &target, cfg, &deps)
            .map_err(DriverError::from)
            .with_context(|| format!("compiling native module {:?}", cfg.name))?;
        archives.push(archive);

        loading_functions.extend(cfg.loading_functions.iter().cloned());
        link_libraries.extend(cfg.link_libraries.iter().cloned());
        link_flags.extend(cfg.l_flags.iter().cloned());
    }

    let core = collection.get_core().map_err(DriverError::from)?;
    let core_cfg = core
        .instructions
        .as_ref()
        .expect("@yaje/core is always native");

    let entry_object = entrypoint::generate_and_compile(
        &output,
        &target,
        &core_cfg.include_dirs,
        &loading_functions,
    )
    .map_err(DriverError::from)
    .context("generating entry point")?;

    let executable = linker::link(
        &output,
        &target,
        &archives,
        &bundle_object,
        &entry_object,
        &link_libraries,
        &link_flags,
    )
    .map_err(DriverError::from)
    .context("linking final executable")?;

    Ok(executable)
}
