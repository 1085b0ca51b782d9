// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Header Dependency Scan: asks the compiler which headers a source
//! transitively includes, via its `-MM`-equivalent dependency-only mode.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::toolchain::CLANG;

/// Filters a full compile argument vector down to the `-I`, `-D`, and
/// `-target` pairs the dependency scan is allowed to see, per the component
/// spec ("passing only -I, -D, and -target arguments").
fn filter_depscan_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-I" | "-D" | "-target" if i + 1 < args.len() => {
                out.push(args[i].clone());
                out.push(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

/// Scans `source`'s header dependencies. On any non-zero exit from the
/// compiler, returns an empty list rather than an error: a failed scan is
/// treated as "no known headers", per the spec's soft-failure policy, which
/// keeps the source eligible for recompilation until a scan succeeds.
#[tracing::instrument(skip(args))]
pub fn scan_header_deps(source: &Path, args: &[String]) -> Vec<PathBuf> {
    let depscan_args = filter_depscan_args(args);
    let source_dir = source.parent().unwrap_or_else(|| Path::new("."));

    let mut cmd = Command::new(CLANG);
    cmd.args(&depscan_args).arg("-MM").arg(source);
    tracing::debug!(?cmd, "running header dependency scan");

    let output = match processes::run_and_capture(&mut cmd) {
        Ok(output) if output.status.success() => output,
        Ok(_) | Err(_) => return Vec::new(),
    };

    let Ok(text) = String::from_utf8(output.stdout) else {
        return Vec::new();
    };
    parse_make_deps(&text, source_dir)
}

/// Parses `make`-style dependency output: joins `\`-continued lines, drops
/// the leading `<obj>:` target, splits on whitespace, and resolves each
/// token relative to `source_dir`.
fn parse_make_deps(text: &str, source_dir: &Path) -> Vec<PathBuf> {
    let joined = text.replace("\\\n", " ");
    let mut tokens = joined.split_whitespace();

    // First token is `<obj>:` (or `<obj>` immediately followed by a `:`
    // token); drop up to and including the first token ending in ':'.
    let mut rest: Vec<&str> = Vec::new();
    let mut dropped_target = false;
    for tok in tokens.by_ref() {
        if !dropped_target {
            if let Some(stripped) = tok.strip_suffix(':') {
                if !stripped.is_empty() {
                    dropped_target = true;
                }
                continue;
            }
            dropped_target = true;
            continue;
        }
        rest.push(tok);
    }

    rest.into_iter()
        .map(|tok| {
            let p = PathBuf::from(tok);
            if p.is_absolute() {
                p
            } else {
                source_dir.join(p)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_to_include_define_and_target() {
        let args = vec![
            "-I".to_owned(),
            "/a".to_owned(),
            "-D".to_owned(),
            "X=1".to_owned(),
            "-L".to_owned(),
            "/lib".to_owned(),
            "-target".to_owned(),
            "x86_64-unknown-linux-gnu".to_owned(),
            "-std=gnu11".to_owned(),
        ];
        let filtered = filter_depscan_args(&args);
        assert_eq!(
            filtered,
            vec!["-I", "/a", "-D", "X=1", "-target", "x86_64-unknown-linux-gnu"]
        );
    }

    #[test]
    fn parses_single_line_make_deps() {
        let out = "foo.o: foo.c foo.h bar.h\n";
        let deps = parse_make_deps(out, Path::new("/src"));
        assert_eq!(
            deps,
            vec![
                PathBuf::from("/src/foo.c"),
                PathBuf::from("/src/foo.h"),
                PathBuf::from("/src/bar.h"),
            ]
        );
    }

    #[test]
    fn joins_continuation_lines() {
        let out = "foo.o: foo.c \\\n  foo.h \\\n  bar.h\n";
        let deps = parse_make_deps(out, Path::new("/src"));
        assert_eq!(deps.len(), 3);
    }

    #[test]
    fn absolute_tokens_are_not_rejoined() {
        let out = "foo.o: /abs/foo.c /abs/foo.h\n";
        let deps = parse_make_deps(out, Path::new("/src"));
        assert_eq!(deps, vec![PathBuf::from("/abs/foo.c"), PathBuf::from("/abs/foo.h")]);
    }
}
