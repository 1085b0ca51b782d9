// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::PathBuf;

use cfgmodel::CfgResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::DiscoveryError;

/// A package's `package.json`, trimmed to the fields the build driver cares about.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default = "default_main")]
    pub main: String,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    /// Set by a bundler package to advertise itself to the discovery service.
    #[serde(default)]
    pub bundler: bool,
}

fn default_main() -> String {
    "./index.js".to_owned()
}

/// A package discovered while walking the dependency graph from the project root.
#[derive(Debug, Clone)]
pub struct TrackedPackage {
    pub manifest: Manifest,
    pub package_folder: PathBuf,
    pub is_native: bool,
    pub is_bundler: bool,
    pub instructions: Option<CfgResult>,
}

impl TrackedPackage {
    pub fn non_native(manifest: Manifest, package_folder: PathBuf) -> Self {
        let is_bundler = manifest.bundler;
        Self {
            manifest,
            package_folder,
            is_native: false,
            is_bundler,
            instructions: None,
        }
    }

    pub fn native(manifest: Manifest, package_folder: PathBuf, instructions: CfgResult) -> Self {
        let is_bundler = manifest.bundler;
        Self {
            manifest,
            package_folder,
            is_native: true,
            is_bundler,
            instructions: Some(instructions),
        }
    }
}

/// Mapping from package name to [`TrackedPackage`], iterable in insertion
/// (i.e. discovery) order.
#[derive(Debug, Clone, Default)]
pub struct PackageCollection {
    packages: IndexMap<String, TrackedPackage>,
}

pub const CORE_PACKAGE_NAME: &str = "@yaje/core";

impl PackageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TrackedPackage> {
        self.packages.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn set(&mut self, name: String, package: TrackedPackage) {
        self.packages.insert(name, package);
    }

    /// Returns the native `@yaje/core` package. Fails if it was never discovered.
    pub fn get_core(&self) -> Result<&TrackedPackage, DiscoveryError> {
        self.packages
            .get(CORE_PACKAGE_NAME)
            .filter(|p| p.is_native)
            .ok_or(DiscoveryError::MissingCore)
    }

    /// Returns the first discovered package with `manifest.bundler == true`.
    pub fn get_bundler(&self) -> Result<&TrackedPackage, DiscoveryError> {
        self.packages
            .values()
            .find(|p| p.is_bundler)
            .ok_or(DiscoveryError::MissingBundler)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Returns true if `name` transitively depends (through manifest
    /// `dependencies`) on `@yaje/core`. Cycles are tolerated: a package is
    /// visited at most once.
    pub fn transitively_depends_on_core(&self, name: &str) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.depends_on(name, CORE_PACKAGE_NAME, &mut seen)
    }

    fn depends_on(
        &self,
        name: &str,
        target: &str,
        seen: &mut std::collections::HashSet<String>,
    ) -> bool {
        if name == target {
            return true;
        }
        if !seen.insert(name.to_owned()) {
            return false;
        }
        let Some(package) = self.packages.get(name) else {
            return false;
        };
        package
            .manifest
            .dependencies
            .keys()
            .any(|dep| self.depends_on(dep, target, seen))
    }

    /// Native packages in discovery order that are eligible for native
    /// compilation: they produced a `CfgResult` and transitively depend on
    /// `@yaje/core` (the dependency-pruning rule in the data model).
    pub fn native_modules_in_order(&self) -> Vec<&TrackedPackage> {
        self.packages
            .values()
            .filter(|p| p.is_native && self.transitively_depends_on_core(&p.manifest.name))
            .collect()
    }

    /// Returns `name`'s transitive native dependencies (packages that
    /// produced a `CfgResult`), deduplicated, in manifest-declaration
    /// depth-first order, excluding `name` itself. This is the dependency
    /// set `D` the Compiler Arguments Assembler needs for one module.
    pub fn transitive_native_deps(&self, name: &str) -> Vec<&TrackedPackage> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        seen.insert(name.to_owned());
        self.collect_native_deps(name, &mut seen, &mut out);
        out
    }

    fn collect_native_deps<'a>(
        &'a self,
        name: &str,
        seen: &mut std::collections::HashSet<String>,
        out: &mut Vec<&'a TrackedPackage>,
    ) {
        let Some(package) = self.packages.get(name) else {
            return;
        };
        for dep_name in package.manifest.dependencies.keys() {
            if !seen.insert(dep_name.clone()) {
                continue;
            }
            if let Some(dep) = self.packages.get(dep_name) {
                if dep.is_native {
                    out.push(dep);
                }
                self.collect_native_deps(dep_name, seen, out);
            }
        }
    }
}

impl<'a> IntoIterator for &'a PackageCollection {
    type Item = (&'a String, &'a TrackedPackage);
    type IntoIter = indexmap::map::Iter<'a, String, TrackedPackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}

impl std::ops::Index<&str> for PackageCollection {
    type Output = TrackedPackage;

    fn index(&self, name: &str) -> &TrackedPackage {
        &self.packages[name]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(name: &str, deps: &[&str]) -> Manifest {
        Manifest {
            name: name.to_owned(),
            main: default_main(),
            dependencies: deps.iter().map(|d| (d.to_string(), "*".to_owned())).collect(),
            bundler: false,
        }
    }

    fn push_native(collection: &mut PackageCollection, name: &str, deps: &[&str]) {
        collection.set(
            name.to_owned(),
            TrackedPackage::native(manifest(name, deps), PathBuf::from(name), CfgResult::empty(name)),
        );
    }

    fn push_non_native(collection: &mut PackageCollection, name: &str, deps: &[&str]) {
        collection.set(
            name.to_owned(),
            TrackedPackage::non_native(manifest(name, deps), PathBuf::from(name)),
        );
    }

    #[test]
    fn transitive_native_deps_skips_non_native_hops() {
        let mut collection = PackageCollection::new();
        push_native(&mut collection, "leaf-a", &[]);
        push_native(&mut collection, "leaf-b", &[]);
        push_non_native(&mut collection, "pure-js-dep", &["leaf-b"]);
        push_native(&mut collection, "app", &["leaf-a", "pure-js-dep"]);

        let deps = collection.transitive_native_deps("app");
        let names: Vec<&str> = deps.iter().map(|p| p.manifest.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"leaf-a"));
        assert!(names.contains(&"leaf-b"));
    }

    #[test]
    fn transitive_native_deps_excludes_self_and_tolerates_cycles() {
        let mut collection = PackageCollection::new();
        push_native(&mut collection, "a", &["b"]);
        push_native(&mut collection, "b", &["a"]);

        let deps = collection.transitive_native_deps("a");
        let names: Vec<&str> = deps.iter().map(|p| p.manifest.name.as_str()).collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn transitive_native_deps_of_leaf_is_empty() {
        let mut collection = PackageCollection::new();
        push_native(&mut collection, "leaf", &[]);
        assert!(collection.transitive_native_deps("leaf").is_empty());
    }
}
