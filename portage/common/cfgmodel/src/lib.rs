// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The normalized, frozen description of one native module ([`CfgResult`]).
//!
//! This crate only holds data types so that both the script evaluator
//! (`cfgscript`, which produces a `CfgResult`) and the package discovery
//! service (`discovery`, which stores one per native `TrackedPackage`) can
//! depend on it without a cycle.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;

/// A `defineMacro` value: either a string, a number, or a name-only flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroValue {
    Str(String),
    Num(i64),
    Flag,
}

impl fmt::Display for MacroValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroValue::Str(s) => write!(f, "\"{s}\""),
            MacroValue::Num(n) => write!(f, "{n}"),
            MacroValue::Flag => Ok(()),
        }
    }
}

impl MacroValue {
    /// Renders `NAME`, `NAME=<n>`, or `NAME="<s>"` for a `-D` argument.
    pub fn render_define(&self, name: &str) -> String {
        match self {
            MacroValue::Flag => name.to_owned(),
            MacroValue::Num(n) => format!("{name}={n}"),
            MacroValue::Str(s) => format!("{name}=\"{s}\""),
        }
    }
}

/// Normalized description of one native module, as produced by evaluating a
/// package's `yaje.build.js`/`yaje.build.mjs` build-configuration script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfgResult {
    pub name: String,
    pub sources: Vec<PathBuf>,
    pub include_dirs: Vec<PathBuf>,
    pub define_macros: IndexMap<String, MacroValue>,
    pub library_lookup: Vec<PathBuf>,
    pub link_libraries: Vec<String>,
    pub loading_functions: Vec<String>,
    pub c_flags: Vec<String>,
    pub l_flags: Vec<String>,
}

impl CfgResult {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sources: Vec::new(),
            include_dirs: Vec::new(),
            define_macros: IndexMap::new(),
            library_lookup: Vec::new(),
            link_libraries: Vec::new(),
            loading_functions: Vec::new(),
            c_flags: Vec::new(),
            l_flags: Vec::new(),
        }
    }
}

/// Returns true if `s` is a valid C identifier (used to validate
/// `setLoadingFunctions` entries).
pub fn is_valid_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_c_identifiers() {
        assert!(is_valid_c_identifier("yaje_mymod_init"));
        assert!(is_valid_c_identifier("_private"));
        assert!(!is_valid_c_identifier("1bad"));
        assert!(!is_valid_c_identifier("has-dash"));
        assert!(!is_valid_c_identifier(""));
    }

    #[test]
    fn renders_macro_values() {
        assert_eq!(MacroValue::Flag.render_define("DEBUG"), "DEBUG");
        assert_eq!(MacroValue::Num(3).render_define("LEVEL"), "LEVEL=3");
        assert_eq!(
            MacroValue::Str("x".into()).render_define("NAME"),
            "NAME=\"x\""
        );
    }
}
