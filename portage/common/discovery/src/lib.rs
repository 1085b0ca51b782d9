// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Walks a project's `package.json` dependency graph, evaluating each
//! package's build-configuration script (if any) along the way, and returns
//! the resulting [`PackageCollection`].

mod data;
mod errors;

pub use data::*;
pub use errors::*;

use std::fs;
use std::path::{Path, PathBuf};

use triple::TargetTriple;

/// Discovers the package rooted at `root` and all of its transitive
/// dependencies, recording them into `collection`. Returns the root
/// package's name.
pub fn discover(
    root: &Path,
    target: &TargetTriple,
    collection: &mut PackageCollection,
) -> Result<String, DiscoveryError> {
    discover_recursive(root, target, collection)
}

fn discover_recursive(
    dir: &Path,
    target: &TargetTriple,
    collection: &mut PackageCollection,
) -> Result<String, DiscoveryError> {
    let manifest_path = dir.join("package.json");
    if !manifest_path.is_file() {
        return Err(DiscoveryError::MissingManifest(dir.to_owned()));
    }
    let text = fs::read_to_string(&manifest_path)
        .map_err(|_| DiscoveryError::MissingManifest(manifest_path.clone()))?;
    let manifest: Manifest =
        serde_json::from_str(&text).map_err(|source| DiscoveryError::UnparseableManifest {
            path: manifest_path.clone(),
            source,
        })?;
    let name = manifest.name.clone();

    if collection.has(&name) {
        tracing::debug!(
            package = %name,
            "already discovered; skipping re-walk (cycle or diamond dependency)"
        );
        return Ok(name);
    }

    let package = match find_build_script(dir) {
        Some(script_path) => {
            let ctx = cfgscript::ScriptContext {
                project_dir: dir.to_owned(),
                module_name: name.clone(),
                target: target.clone(),
            };
            tracing::debug!(package = %name, script = ?script_path, "evaluating build-configuration script");
            let result = cfgscript::evaluate(&script_path, &ctx)?;
            TrackedPackage::native(manifest.clone(), dir.to_owned(), result)
        }
        None => TrackedPackage::non_native(manifest.clone(), dir.to_owned()),
    };
    collection.set(name.clone(), package);

    for dep_name in manifest.dependencies.keys() {
        if collection.has(dep_name) {
            continue;
        }
        let dep_dir = resolve_node_modules(dir, dep_name).ok_or_else(|| {
            DiscoveryError::UnresolvableDependency {
                parent: name.clone(),
                name: dep_name.clone(),
            }
        })?;
        discover_recursive(&dep_dir, target, collection)?;
    }

    Ok(name)
}

/// A package opts into native compilation by shipping exactly one of these
/// files alongside its `package.json`. `.mjs` takes priority when both exist.
fn find_build_script(dir: &Path) -> Option<PathBuf> {
    let mjs = dir.join("yaje.build.mjs");
    if mjs.is_file() {
        return Some(mjs);
    }
    let js = dir.join("yaje.build.js");
    if js.is_file() {
        return Some(js);
    }
    None
}

/// Walks upward from `start`, looking for `node_modules/<name>` the way
/// Node's own module resolution does, stopping at the first match.
fn resolve_node_modules(start: &Path, name: &str) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join("node_modules").join(name);
        if candidate.join("package.json").is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use triple::{Abi, Arch, Platform, Vendor};

    fn linux_x64() -> TargetTriple {
        TargetTriple::new(Arch::X86_64, Vendor::Unknown, Platform::Linux, Abi::Gnu)
    }

    fn write_manifest(dir: &Path, name: &str, deps: &[&str], bundler: bool) {
        fs::create_dir_all(dir).unwrap();
        let deps_json = deps
            .iter()
            .map(|d| format!("\"{d}\": \"*\""))
            .collect::<Vec<_>>()
            .join(",");
        fs::write(
            dir.join("package.json"),
            format!(
                r#"{{"name":"{name}","main":"./index.js","bundler":{bundler},"dependencies":{{{deps_json}}}}}"#
            ),
        )
        .unwrap();
    }

    #[test]
    fn discovers_simple_graph() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("app");
        write_manifest(&root, "app", &["left-pad"], false);

        let dep_dir = root.join("node_modules").join("left-pad");
        write_manifest(&dep_dir, "left-pad", &[], false);

        let mut collection = PackageCollection::new();
        let root_name = discover(&root, &linux_x64(), &mut collection).unwrap();

        assert_eq!(root_name, "app");
        assert_eq!(collection.len(), 2);
        assert!(collection.has("left-pad"));
        assert!(!collection["left-pad"].is_native);
    }

    #[test]
    fn tolerates_dependency_cycles() {
        let tmp = tempfile::tempdir().unwrap();
        let a_dir = tmp.path().join("a");
        let b_dir = a_dir.join("node_modules").join("b");
        write_manifest(&a_dir, "a", &["b"], false);
        write_manifest(&b_dir, "b", &["a"], false);
        fs::create_dir_all(b_dir.join("node_modules").join("a")).unwrap();
        fs::write(
            b_dir.join("node_modules").join("a").join("package.json"),
            fs::read_to_string(a_dir.join("package.json")).unwrap(),
        )
        .unwrap();

        let mut collection = PackageCollection::new();
        let root_name = discover(&a_dir, &linux_x64(), &mut collection).unwrap();
        assert_eq!(root_name, "a");
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn fails_on_unresolvable_dependency() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("app");
        write_manifest(&root, "app", &["does-not-exist"], false);

        let mut collection = PackageCollection::new();
        let err = discover(&root, &linux_x64(), &mut collection).unwrap_err();
        assert!(matches!(err, DiscoveryError::UnresolvableDependency { .. }));
    }

    #[test]
    fn evaluates_native_build_script() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("app");
        write_manifest(&root, "app", &["native-mod"], false);

        let dep_dir = root.join("node_modules").join("native-mod");
        write_manifest(&dep_dir, "native-mod", &[], false);
        fs::write(dep_dir.join("native.c"), "int main(void){return 0;}").unwrap();
        fs::write(
            dep_dir.join("yaje.build.mjs"),
            r#"
            config.addSource("./native.c");
            export default config;
            "#,
        )
        .unwrap();

        let mut collection = PackageCollection::new();
        discover(&root, &linux_x64(), &mut collection).unwrap();

        assert!(collection["native-mod"].is_native);
        assert_eq!(
            collection["native-mod"]
                .instructions
                .as_ref()
                .unwrap()
                .sources
                .len(),
            1
        );
    }
}
