// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Entry-Point Generator: emits and compiles `gen/main.c`, the translation
//! unit that boots the QuickJS-NG runtime, loads every native module, runs
//! the embedded bundle, and frees the runtime.

use std::fs;
use std::path::PathBuf;

use compiler::{compile_cached, CompileError, OutputInformation};
use triple::TargetTriple;

/// Renders `main.c`'s source text. Pure and deterministic: the same ordered
/// list `loading_functions` always produces byte-identical output.
pub fn generate_main_c(loading_functions: &[String]) -> String {
    let mut out = String::new();
    out.push_str("// Generated by the yaje build driver. Do not edit.\n");
    out.push_str("#include \"yaje_core.h\"\n\n");

    for f in loading_functions {
        out.push_str(&format!("extern void {f}(JSRuntime*, JSContext*);\n"));
    }
    out.push('\n');

    out.push_str("void yaje_core_load_modules(JSRuntime *rt, JSContext *ctx) {\n");
    for f in loading_functions {
        out.push_str(&format!("    {f}(rt, ctx);\n"));
    }
    out.push_str("}\n\n");

    out.push_str("int main(int argc, char **argv) {\n");
    out.push_str("    JSRuntime *rt;\n");
    out.push_str("    JSContext *ctx;\n");
    out.push_str("    yaje_core_ctor(&rt, &ctx);\n");
    out.push_str("    yaje_core_load_modules(rt, ctx);\n");
    out.push_str("    int result = yaje_core_execute(rt, ctx);\n");
    out.push_str("    yaje_core_free(&rt, &ctx);\n");
    out.push_str("    return result;\n");
    out.push_str("}\n");
    out
}

/// Writes `gen/main.c`, compiles it to `modules/main.o` (cached via
/// `cache/main.hash`), and returns the object path.
pub fn generate_and_compile(
    output: &OutputInformation,
    target: &TargetTriple,
    core_include_dirs: &[PathBuf],
    loading_functions: &[String],
) -> Result<PathBuf, CompileError> {
    let source_text = generate_main_c(loading_functions);
    let source_path = output.gen_folder.join("main.c");
    fs::write(&source_path, &source_text)?;

    let mut args = Vec::new();
    for dir in core_include_dirs {
        args.push("-I".to_owned());
        args.push(dir.display().to_string());
    }
    args.push("-g".to_owned());
    args.push("-fwrapv".to_owned());
    args.push("-Wall".to_owned());
    args.push("-target".to_owned());
    args.push(target.to_string());
    args.push("-c".to_owned());

    let object_path = output.mod_folder.join("main.o");
    let hash_sidecar = output.cache_folder.join("main.hash");
    compile_cached(&source_path, &object_path, &hash_sidecar, &args)?;
    Ok(object_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let functions = vec!["yaje_mod_a_init".to_owned(), "yaje_mod_b_init".to_owned()];
        let a = generate_main_c(&functions);
        let b = generate_main_c(&functions);
        assert_eq!(a, b);
    }

    #[test]
    fn declares_and_calls_every_loading_function_in_order() {
        let functions = vec!["yaje_mod_a_init".to_owned(), "yaje_mod_b_init".to_owned()];
        let generated = generate_main_c(&functions);
        assert!(generated.contains("extern void yaje_mod_a_init(JSRuntime*, JSContext*);"));
        assert!(generated.contains("extern void yaje_mod_b_init(JSRuntime*, JSContext*);"));

        let call_a = generated.find("yaje_mod_a_init(rt, ctx);").unwrap();
        let call_b = generated.find("yaje_mod_b_init(rt, ctx);").unwrap();
        assert!(call_a < call_b, "loading functions must be invoked in discovery order");
    }

    #[test]
    fn wires_the_stable_entry_point_abi() {
        let generated = generate_main_c(&[]);
        assert!(generated.contains("yaje_core_ctor(&rt, &ctx);"));
        assert!(generated.contains("yaje_core_execute(rt, ctx);"));
        assert!(generated.contains("yaje_core_free(&rt, &ctx);"));
    }

    #[test]
    fn empty_loading_list_still_compiles_a_valid_shell() {
        let generated = generate_main_c(&[]);
        assert!(generated.contains("void yaje_core_load_modules(JSRuntime *rt, JSContext *ctx) {\n}"));
    }
}
