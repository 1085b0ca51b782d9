// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Assembles the compiler argument vector for one module, per the
//! Compiler Arguments Assembler component.

use cfgmodel::CfgResult;
use triple::TargetTriple;

/// The fixed compile flags shared by every translation unit, before the
/// per-module `-I`/`-D`/`-L` arguments and the module's own `cFlags`.
pub fn base_compile_flags(target: &TargetTriple) -> Vec<String> {
    let mut flags: Vec<String> = vec![
        "-std=gnu11",
        "-Wall",
        "-Wextra",
        "-Wformat=2",
        "-fwrapv",
        "-funsigned-char",
        "-g",
    ]
    .into_iter()
    .map(str::to_owned)
    .collect();
    flags.push("-target".to_owned());
    flags.push(target.to_string());
    flags.push("-c".to_owned());
    for suppressed in [
        "-Wno-unused-parameter",
        "-Wno-missing-field-initializers",
        "-Wno-sign-compare",
    ] {
        flags.push(suppressed.to_owned());
    }
    flags
}

/// The fixed link flags shared by the final link step, before the collected
/// `-l<name>` arguments.
pub fn base_link_flags() -> Vec<String> {
    vec!["-g".to_owned()]
}

/// Produces the ordered argument vector for compiling a source belonging to
/// module `m`, given its native dependency set `deps` (in discovery order)
/// and the already-materialized `base_flags` (see [`base_compile_flags`]).
///
/// Order, per the component spec:
/// 1. for each `d` in `deps` followed by `m` itself: every `-I <dir>`, then
///    every `-D ...` macro in enumeration order;
/// 2. for `m` only: every `-L <dir>`;
/// 3. `base_flags`.
pub fn assemble_compile_args(
    m: &CfgResult,
    deps: &[&CfgResult],
    base_flags: &[String],
) -> Vec<String> {
    let mut args = Vec::new();

    for module in deps.iter().copied().chain(std::iter::once(m)) {
        for dir in &module.include_dirs {
            args.push("-I".to_owned());
            args.push(dir.display().to_string());
        }
        for (name, value) in &module.define_macros {
            args.push("-D".to_owned());
            args.push(value.render_define(name));
        }
    }

    for dir in &m.library_lookup {
        args.push("-L".to_owned());
        args.push(dir.display().to_string());
    }

    args.extend(base_flags.iter().cloned());
    args
}
