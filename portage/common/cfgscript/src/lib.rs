// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Evaluates a package's build-configuration script (`yaje.build.js` /
//! `yaje.build.mjs`) to produce a [`cfgmodel::CfgResult`].
//!
//! The original system runs these scripts under Node.js against a process-wide
//! configuration object. Requiring a Node.js installation on the build host
//! would make the driver's own bootstrap depend on the exact tool it is trying
//! to avoid shelling out to, so instead the script runs inside an embedded,
//! sandboxed ECMAScript evaluator ([`boa_engine`]) and the configuration
//! object is threaded in explicitly per evaluation via [`ScriptContext`] rather
//! than stored in any global.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use boa_engine::object::ObjectInitializer;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsArgs, JsValue, Module, NativeFunction, Source};
use cfgmodel::{is_valid_c_identifier, CfgResult, MacroValue};
use thiserror::Error;
use triple::TargetTriple;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to read build-configuration script {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path:?} has no default export")]
    MissingDefaultExport { path: PathBuf },
    #[error("{path:?}'s default export is not a configuration object (no complete() method)")]
    DefaultExportNotConfig { path: PathBuf },
    #[error("{path} passed to {call} must be an existing directory")]
    NotADirectory { call: &'static str, path: PathBuf },
    #[error("{path} passed to addSource must be an existing file or directory")]
    NoSuchSource { path: PathBuf },
    #[error("defineMacro({name:?}, ...) value must be a string, number, or `true`")]
    UnknownMacroKind { name: String },
    #[error("setLoadingFunctions was given {0:?}, which is not a valid C identifier")]
    InvalidLoadingFunction(String),
    #[error("script error in {path:?}: {message}")]
    Js { path: PathBuf, message: String },
}

/// The seed threaded explicitly into a script evaluation. Stands in for the
/// process-wide configuration object the original system relies on.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    pub project_dir: PathBuf,
    pub module_name: String,
    pub target: TargetTriple,
}

/// Mutable state accumulated by the `config` object's builder methods, shared
/// between every native closure bound into the script's realm for one
/// evaluation.
#[derive(Default)]
struct CfgBuilder {
    sources: Vec<PathBuf>,
    include_dirs: Vec<PathBuf>,
    define_macros: indexmap::IndexMap<String, MacroValue>,
    library_lookup: Vec<PathBuf>,
    link_libraries: Vec<String>,
    loading_functions: Vec<String>,
    c_flags: Vec<String>,
    l_flags: Vec<String>,
}

impl CfgBuilder {
    fn into_result(self, name: String) -> CfgResult {
        CfgResult {
            name,
            sources: self.sources,
            include_dirs: self.include_dirs,
            define_macros: self.define_macros,
            library_lookup: self.library_lookup,
            link_libraries: self.link_libraries,
            loading_functions: self.loading_functions,
            c_flags: self.c_flags,
            l_flags: self.l_flags,
        }
    }
}

fn arg_string(args: &[JsValue], index: usize, context: &mut Context<'_>) -> boa_engine::JsResult<String> {
    Ok(args
        .get_or_undefined(index)
        .to_string(context)?
        .to_std_string_escaped())
}

fn resolve_under(project_dir: &Path, raw: &str) -> PathBuf {
    let candidate = PathBuf::from(raw);
    if candidate.is_absolute() {
        candidate
    } else {
        project_dir.join(candidate)
    }
}

fn collect_c_sources_recursive(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut children: Vec<_> = entries.flatten().map(|e| e.path()).collect();
    children.sort();
    for path in children {
        if path.is_dir() {
            collect_c_sources_recursive(&path, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some("c") {
            out.push(path);
        }
    }
}

/// Evaluates `script_path` and returns the `CfgResult` its default export
/// produces via `complete()`.
pub fn evaluate(script_path: &Path, ctx: &ScriptContext) -> Result<CfgResult, ScriptError> {
    tracing::debug!(script = %script_path.display(), "evaluating build-configuration script");

    let source_text = fs::read_to_string(script_path).map_err(|source| ScriptError::Read {
        path: script_path.to_owned(),
        source,
    })?;

    let builder = Rc::new(RefCell::new(CfgBuilder::default()));
    let completed: Rc<RefCell<bool>> = Rc::new(RefCell::new(false));

    let mut context = Context::default();

    let config_object = build_config_object(&mut context, ctx, builder.clone(), completed.clone())
        .map_err(|e| js_error(script_path, &e, &mut context))?;
    context
        .register_global_property(js_string!("config"), config_object, Attribute::READONLY)
        .map_err(|e| js_error(script_path, &e, &mut context))?;

    register_predicate_globals(&mut context, ctx).map_err(|e| js_error(script_path, &e, &mut context))?;

    let module = Module::parse(Source::from_bytes(source_text.as_bytes()), None, &mut context)
        .map_err(|e| js_error(script_path, &e, &mut context))?;
    let promise = module.load_link_evaluate(&mut context);
    context.run_jobs();
    promise
        .state()
        .as_result()
        .map_err(|e| js_error(script_path, &e, &mut context))?;

    let namespace = module.namespace(&mut context);
    let default_export = namespace
        .get(js_string!("default"), &mut context)
        .map_err(|e| js_error(script_path, &e, &mut context))?;

    let default_object = default_export
        .as_object()
        .ok_or_else(|| ScriptError::MissingDefaultExport {
            path: script_path.to_owned(),
        })?;

    let complete_fn = default_object
        .get(js_string!("complete"), &mut context)
        .ok()
        .filter(|v| v.is_callable())
        .ok_or_else(|| ScriptError::DefaultExportNotConfig {
            path: script_path.to_owned(),
        })?;

    complete_fn
        .as_object()
        .expect("checked is_callable above")
        .call(&default_export, &[], &mut context)
        .map_err(|e| js_error(script_path, &e, &mut context))?;

    if !*completed.borrow() {
        return Err(ScriptError::DefaultExportNotConfig {
            path: script_path.to_owned(),
        });
    }

    let builder = Rc::try_unwrap(builder)
        .map(RefCell::into_inner)
        .unwrap_or_default();
    Ok(builder.into_result(ctx.module_name.clone()))
}

fn js_error(path: &Path, err: &boa_engine::JsError, context: &mut Context<'_>) -> ScriptError {
    ScriptError::Js {
        path: path.to_owned(),
        message: err
            .to_opaque(context)
            .display()
            .to_string(),
    }
}

fn build_config_object(
    context: &mut Context<'_>,
    ctx: &ScriptContext,
    builder: Rc<RefCell<CfgBuilder>>,
    completed: Rc<RefCell<bool>>,
) -> boa_engine::JsResult<JsValue> {
    let project_dir = ctx.project_dir.clone();

    let b = builder.clone();
    let dir = project_dir.clone();
    let add_source = NativeFunction::from_closure(move |_this, args, context| {
        let path_arg = arg_string(args, 0, context)?;
        let recursive = args.get_or_undefined(1).to_boolean();
        let resolved = resolve_under(&dir, &path_arg);
        if recursive {
            if !resolved.is_dir() {
                return Err(boa_engine::JsNativeError::typ()
                    .with_message(format!("{resolved:?} is not an existing directory"))
                    .into());
            }
            let mut found = Vec::new();
            collect_c_sources_recursive(&resolved, &mut found);
            let mut state = b.borrow_mut();
            for path in found {
                if !state.sources.contains(&path) {
                    state.sources.push(path);
                }
            }
        } else {
            if !resolved.is_file() {
                return Err(boa_engine::JsNativeError::typ()
                    .with_message(format!("{resolved:?} is not an existing file"))
                    .into());
            }
            let mut state = b.borrow_mut();
            if !state.sources.contains(&resolved) {
                state.sources.push(resolved);
            }
        }
        Ok(JsValue::undefined())
    });

    let b = builder.clone();
    let dir = project_dir.clone();
    let add_include_dir = NativeFunction::from_closure(move |_this, args, context| {
        let path_arg = arg_string(args, 0, context)?;
        let resolved = resolve_under(&dir, &path_arg);
        if !resolved.is_dir() {
            return Err(boa_engine::JsNativeError::typ()
                .with_message(format!("{resolved:?} is not an existing directory"))
                .into());
        }
        b.borrow_mut().include_dirs.push(resolved);
        Ok(JsValue::undefined())
    });

    let b = builder.clone();
    let dir = project_dir.clone();
    let add_library_lookup = NativeFunction::from_closure(move |_this, args, context| {
        let path_arg = arg_string(args, 0, context)?;
        let resolved = resolve_under(&dir, &path_arg);
        if !resolved.is_dir() {
            return Err(boa_engine::JsNativeError::typ()
                .with_message(format!("{resolved:?} is not an existing directory"))
                .into());
        }
        b.borrow_mut().library_lookup.push(resolved);
        Ok(JsValue::undefined())
    });

    let b = builder.clone();
    let define_macro = NativeFunction::from_closure(move |_this, args, context| {
        let name = arg_string(args, 0, context)?;
        let value = args.get_or_undefined(1);
        let macro_value = if value.is_boolean() && value.as_boolean() == Some(true) {
            MacroValue::Flag
        } else if let Some(n) = value.as_number() {
            MacroValue::Num(n as i64)
        } else if value.is_string() {
            MacroValue::Str(value.to_string(context)?.to_std_string_escaped())
        } else {
            return Err(boa_engine::JsNativeError::typ()
                .with_message(format!(
                    "defineMacro({name:?}, ...) value must be a string, number, or `true`"
                ))
                .into());
        };
        b.borrow_mut().define_macros.insert(name, macro_value);
        Ok(JsValue::undefined())
    });

    let b = builder.clone();
    let link_library = NativeFunction::from_closure(move |_this, args, context| {
        let name = arg_string(args, 0, context)?;
        b.borrow_mut().link_libraries.push(name);
        Ok(JsValue::undefined())
    });

    let b = builder.clone();
    let set_loading_functions = NativeFunction::from_closure(move |_this, args, context| {
        let mut names = Vec::with_capacity(args.len());
        for i in 0..args.len() {
            let name = arg_string(args, i, context)?;
            if !is_valid_c_identifier(&name) {
                return Err(boa_engine::JsNativeError::typ()
                    .with_message(format!("{name:?} is not a valid C identifier"))
                    .into());
            }
            names.push(name);
        }
        b.borrow_mut().loading_functions = names;
        Ok(JsValue::undefined())
    });

    let b = builder.clone();
    let set_c_flags = NativeFunction::from_closure(move |_this, args, context| {
        let mut flags = Vec::with_capacity(args.len());
        for i in 0..args.len() {
            flags.push(arg_string(args, i, context)?);
        }
        b.borrow_mut().c_flags = flags;
        Ok(JsValue::undefined())
    });

    let b = builder.clone();
    let set_l_flags = NativeFunction::from_closure(move |_this, args, context| {
        let mut flags = Vec::with_capacity(args.len());
        for i in 0..args.len() {
            flags.push(arg_string(args, i, context)?);
        }
        b.borrow_mut().l_flags = flags;
        Ok(JsValue::undefined())
    });

    let complete = NativeFunction::from_closure(move |_this, _args, _context| {
        *completed.borrow_mut() = true;
        Ok(JsValue::undefined())
    });

    let object = ObjectInitializer::new(context)
        .function(add_source, js_string!("addSource"), 2)
        .function(add_include_dir, js_string!("addIncludeDir"), 1)
        .function(add_library_lookup, js_string!("addLibraryLookup"), 1)
        .function(define_macro, js_string!("defineMacro"), 2)
        .function(link_library, js_string!("linkLibrary"), 1)
        .function(set_loading_functions, js_string!("setLoadingFunctions"), 0)
        .function(set_c_flags, js_string!("setCFlags"), 0)
        .function(set_l_flags, js_string!("setLFlags"), 0)
        .function(complete, js_string!("complete"), 0)
        .build();

    Ok(object.into())
}

/// Registers the `arch`, `vendor`, `platform`, `abi` read-only predicate
/// globals described in the build-configuration script contract.
fn register_predicate_globals(
    context: &mut Context<'_>,
    ctx: &ScriptContext,
) -> boa_engine::JsResult<()> {
    let arch = ctx.target.arch.to_string();
    let vendor = ctx.target.vendor.to_string();
    let platform = ctx.target.platform.to_string();
    let abi = ctx.target.abi.to_string();

    let arch_obj = predicate_object(
        context,
        &arch,
        &[
            ("isX64", "x86_64"),
            ("isI686", "i686"),
            ("isAArch64", "aarch64"),
            ("isArmv7", "armv7"),
        ],
    );
    let vendor_obj = predicate_object(context, &vendor, &[]);
    let platform_obj = predicate_object(
        context,
        &platform,
        &[
            ("isWindows", "windows"),
            ("isLinux", "linux"),
            ("isDarwin", "darwin"),
        ],
    );
    let abi_obj = predicate_object(
        context,
        &abi,
        &[("isMSVC", "msvc"), ("isMusl", "musl"), ("isGNU", "gnu")],
    );

    context.register_global_property(js_string!("arch"), arch_obj, Attribute::READONLY)?;
    context.register_global_property(js_string!("vendor"), vendor_obj, Attribute::READONLY)?;
    context.register_global_property(js_string!("platform"), platform_obj, Attribute::READONLY)?;
    context.register_global_property(js_string!("abi"), abi_obj, Attribute::READONLY)?;
    Ok(())
}

fn predicate_object(context: &mut Context<'_>, actual: &str, named: &[(&str, &str)]) -> JsValue {
    let actual_owned = actual.to_owned();
    let for_is = actual_owned.clone();
    let is_fn = NativeFunction::from_closure(move |_this, args, context| {
        let candidate = arg_string(args, 0, context)?;
        Ok(JsValue::from(candidate == for_is))
    });

    let mut init = ObjectInitializer::new(context);
    init.function(is_fn, js_string!("is"), 1);
    for (property, value) in named {
        init.property(
            js_string!(*property),
            JsValue::from(actual_owned == *value),
            Attribute::READONLY,
        );
    }
    init.build().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use triple::{Abi, Arch, Platform, TargetTriple, Vendor};

    fn host_ctx(project_dir: &Path) -> ScriptContext {
        ScriptContext {
            project_dir: project_dir.to_owned(),
            module_name: "my-native-module".into(),
            target: TargetTriple::new(Arch::X86_64, Vendor::Unknown, Platform::Linux, Abi::Gnu),
        }
    }

    fn write_script(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn evaluates_minimal_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("native.c"), "int main(void){return 0;}").unwrap();
        let script = write_script(
            dir.path(),
            "yaje.build.mjs",
            r#"
            config.addSource("./native.c");
            config.defineMacro("DEBUG", true);
            config.defineMacro("LEVEL", 3);
            config.linkLibrary("m");
            config.setLoadingFunctions("yaje_mymod_init");
            export default config;
            "#,
        );

        let result = evaluate(&script, &host_ctx(dir.path())).unwrap();
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.link_libraries, vec!["m".to_string()]);
        assert_eq!(result.loading_functions, vec!["yaje_mymod_init".to_string()]);
        assert!(matches!(
            result.define_macros.get("DEBUG"),
            Some(MacroValue::Flag)
        ));
        assert!(matches!(
            result.define_macros.get("LEVEL"),
            Some(MacroValue::Num(3))
        ));
    }

    #[test]
    fn rejects_nonexistent_source() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "yaje.build.mjs",
            r#"
            config.addSource("./missing.c");
            export default config;
            "#,
        );
        assert!(evaluate(&script, &host_ctx(dir.path())).is_err());
    }

    #[test]
    fn rejects_missing_default_export() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(dir.path(), "yaje.build.mjs", "const x = 1;");
        assert!(evaluate(&script, &host_ctx(dir.path())).is_err());
    }

    #[test]
    fn platform_predicates_reflect_target() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "yaje.build.mjs",
            r#"
            if (platform.isLinux && abi.isGNU && !platform.isWindows) {
                config.linkLibrary("matched");
            }
            export default config;
            "#,
        );
        let result = evaluate(&script, &host_ctx(dir.path())).unwrap();
        assert_eq!(result.link_libraries, vec!["matched".to_string()]);
    }
}
