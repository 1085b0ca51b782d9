// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! `yaje init`: the peripheral project-scaffolding command. Explicitly out
//! of core scope per spec.md section 1, but implemented as a minimal
//! template writer so the binary is runnable end-to-end rather than a stub.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

const PACKAGE_JSON_TEMPLATE: &str = r#"{
  "name": "app",
  "main": "./src/index.js",
  "dependencies": {
    "@yaje/core": "^1",
    "@yaje/esbuild": "^1"
  }
}
"#;

const BUILD_SCRIPT_TEMPLATE: &str = r#"// Native module build configuration.
// See the CFGResult contract: addSource, addIncludeDir, addLibraryLookup,
// defineMacro, linkLibrary, setLoadingFunctions, setCFlags, setLFlags.
config.addSource("./native.c");
config.setLoadingFunctions("yaje_app_init");
export default config;
"#;

const INDEX_JS_TEMPLATE: &str = "console.log('hello from yaje');\n";

const NATIVE_C_TEMPLATE: &str = r#"#include "yaje_core.h"

static JSValue js_hello(JSContext *ctx, JSValueConst this_val, int argc, JSValueConst *argv) {
    return JS_NewString(ctx, "hello from native code");
}

void yaje_app_init(JSRuntime *rt, JSContext *ctx) {
    JSValue global = JS_GetGlobalObject(ctx);
    JS_SetPropertyStr(ctx, global, "nativeHello", JS_NewCFunction(ctx, js_hello, "nativeHello", 0));
    JS_FreeValue(ctx, global);
}
"#;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to scaffold. Defaults to the current directory.
    #[arg(default_value = ".")]
    directory: PathBuf,
}

pub fn do_init(args: InitArgs) -> Result<()> {
    let root = args.directory;
    fs::create_dir_all(&root).with_context(|| format!("creating {root:?}"))?;

    let manifest_path = root.join("package.json");
    if manifest_path.exists() {
        bail!("{manifest_path:?} already exists; refusing to overwrite an existing project");
    }
    fs::write(&manifest_path, PACKAGE_JSON_TEMPLATE)
        .with_context(|| format!("writing {manifest_path:?}"))?;

    fs::write(root.join("yaje.build.mjs"), BUILD_SCRIPT_TEMPLATE)?;
    fs::write(root.join("native.c"), NATIVE_C_TEMPLATE)?;

    let src_dir = root.join("src");
    fs::create_dir_all(&src_dir)?;
    fs::write(src_dir.join("index.js"), INDEX_JS_TEMPLATE)?;

    tracing::info!(project = %root.display(), "scaffolded new yaje project");
    println!("Scaffolded a new yaje project at {}", root.display());
    Ok(())
}
