// Copyright 2024 The Yaje Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Target triple parsing and rendering.
//!
//! A [`TargetTriple`] is the four-field `(arch, vendor, platform, abi)` value that
//! identifies a code-generation target throughout the build driver. All operations
//! in this crate are pure: they never touch the filesystem or spawn processes.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TripleError {
    #[error("triple {0:?} has too few components (need 2, 3, or 4)")]
    TooFewComponents(String),
}

macro_rules! open_enum {
    ($name:ident { $($variant:ident => $repr:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $repr,)+
                    $name::Other(s) => s.as_str(),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $($repr => $name::$variant,)+
                    other => $name::Other(other.to_owned()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

open_enum!(Arch {
    X86_64 => "x86_64",
    I686 => "i686",
    Aarch64 => "aarch64",
    Armv7 => "armv7",
});

open_enum!(Vendor {
    Pc => "pc",
    Unknown => "unknown",
    Apple => "apple",
});

open_enum!(Platform {
    Windows => "windows",
    Linux => "linux",
    Darwin => "darwin",
});

open_enum!(Abi {
    Msvc => "msvc",
    Gnu => "gnu",
    Musl => "musl",
    System => "system",
});

impl Platform {
    /// The ABI this platform defaults to when a 2-part triple omits one, per
    /// the mapping in the data model: windows -> msvc, linux -> gnu, else -> system.
    fn default_abi(&self) -> Abi {
        match self {
            Platform::Windows => Abi::Msvc,
            Platform::Linux => Abi::Gnu,
            _ => Abi::System,
        }
    }
}

/// A handful of vendor spellings recognized when disambiguating a 3-part triple.
/// Anything else in that position is assumed to be a platform, not a vendor.
const KNOWN_VENDORS: &[&str] = &["pc", "unknown", "apple", "none"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetTriple {
    pub arch: Arch,
    pub vendor: Vendor,
    pub platform: Platform,
    pub abi: Abi,
}

impl TargetTriple {
    pub fn new(arch: Arch, vendor: Vendor, platform: Platform, abi: Abi) -> Self {
        Self {
            arch,
            vendor,
            platform,
            abi,
        }
    }
}

/// Returns the canonical triple for the host this process is running on.
pub fn host_target() -> TargetTriple {
    let arch = match std::env::consts::ARCH {
        "x86_64" => Arch::X86_64,
        "x86" => Arch::I686,
        "aarch64" => Arch::Aarch64,
        "arm" => Arch::Armv7,
        other => Arch::Other(other.to_owned()),
    };
    let platform = match std::env::consts::OS {
        "windows" => Platform::Windows,
        "linux" => Platform::Linux,
        "macos" => Platform::Darwin,
        other => Platform::Other(other.to_owned()),
    };
    let abi = platform.default_abi();
    TargetTriple::new(arch, Vendor::Unknown, platform, abi)
}

/// Parses a 2-, 3-, or 4-part triple string.
///
/// - 4 parts: `arch-vendor-platform-abi`, taken literally.
/// - 3 parts: if the middle component is a recognized vendor keyword
///   ([`KNOWN_VENDORS`]), it is `arch-vendor-platform` with `abi` inferred from
///   `platform`; otherwise it is `arch-platform-abi` with `vendor` defaulted to
///   `unknown` (the common GNU-triple spelling, e.g. `x86_64-linux-gnu`).
/// - 2 parts: `arch-platform`, with `vendor` defaulted to `unknown` and `abi`
///   inferred from `platform`.
pub fn parse_triple(s: &str) -> Result<TargetTriple, TripleError> {
    let parts: Vec<&str> = s.split('-').collect();
    match parts.as_slice() {
        [arch, vendor, platform, abi] => Ok(TargetTriple::new(
            Arch::from(*arch),
            Vendor::from(*vendor),
            Platform::from(*platform),
            Abi::from(*abi),
        )),
        [arch, middle, last] => {
            if KNOWN_VENDORS.contains(middle) {
                let platform = Platform::from(*last);
                let abi = platform.default_abi();
                Ok(TargetTriple::new(
                    Arch::from(*arch),
                    Vendor::from(*middle),
                    platform,
                    abi,
                ))
            } else {
                Ok(TargetTriple::new(
                    Arch::from(*arch),
                    Vendor::Unknown,
                    Platform::from(*middle),
                    Abi::from(*last),
                ))
            }
        }
        [arch, platform] => {
            let platform = Platform::from(*platform);
            let abi = platform.default_abi();
            Ok(TargetTriple::new(
                Arch::from(*arch),
                Vendor::Unknown,
                platform,
                abi,
            ))
        }
        _ => Err(TripleError::TooFewComponents(s.to_owned())),
    }
}

/// Renders a triple to its hyphenated string form. When `platform == darwin`
/// and `abi == system`, the `abi` field is dropped from the output (the Apple
/// convention of not spelling out a default ABI).
pub fn render_triple(t: &TargetTriple) -> String {
    if t.platform == Platform::Darwin && t.abi == Abi::System {
        format!("{}-{}-{}", t.arch, t.vendor, t.platform)
    } else {
        format!("{}-{}-{}-{}", t.arch, t.vendor, t.platform, t.abi)
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_triple(self))
    }
}

impl FromStr for TargetTriple {
    type Err = TripleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_triple(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_part() {
        let t = parse_triple("x86_64-pc-windows-msvc").unwrap();
        assert_eq!(t.arch, Arch::X86_64);
        assert_eq!(t.vendor, Vendor::Pc);
        assert_eq!(t.platform, Platform::Windows);
        assert_eq!(t.abi, Abi::Msvc);
    }

    #[test]
    fn parses_three_part_with_vendor() {
        let t = parse_triple("aarch64-apple-darwin").unwrap();
        assert_eq!(t.vendor, Vendor::Apple);
        assert_eq!(t.platform, Platform::Darwin);
        assert_eq!(t.abi, Abi::System);
    }

    #[test]
    fn parses_three_part_without_vendor() {
        let t = parse_triple("x86_64-linux-musl").unwrap();
        assert_eq!(t.vendor, Vendor::Unknown);
        assert_eq!(t.platform, Platform::Linux);
        assert_eq!(t.abi, Abi::Musl);
    }

    #[test]
    fn parses_two_part_darwin() {
        // Scenario 5 from the spec: parseTriple("aarch64-darwin").
        let t = parse_triple("aarch64-darwin").unwrap();
        assert_eq!(t.arch, Arch::Aarch64);
        assert_eq!(t.vendor, Vendor::Unknown);
        assert_eq!(t.platform, Platform::Darwin);
        assert_eq!(t.abi, Abi::System);
        assert_eq!(render_triple(&t), "aarch64-unknown-darwin");
    }

    #[test]
    fn parses_two_part_windows_infers_msvc() {
        let t = parse_triple("x86_64-windows").unwrap();
        assert_eq!(t.abi, Abi::Msvc);
    }

    #[test]
    fn parses_two_part_linux_infers_gnu() {
        let t = parse_triple("armv7-linux").unwrap();
        assert_eq!(t.abi, Abi::Gnu);
    }

    #[test]
    fn one_part_fails() {
        assert!(parse_triple("x86_64").is_err());
    }

    #[test]
    fn renders_omit_abi_only_for_darwin_system() {
        let t = TargetTriple::new(Arch::X86_64, Vendor::Pc, Platform::Windows, Abi::Msvc);
        assert_eq!(render_triple(&t), "x86_64-pc-windows-msvc");

        let t = TargetTriple::new(Arch::Aarch64, Vendor::Unknown, Platform::Darwin, Abi::System);
        assert_eq!(render_triple(&t), "aarch64-unknown-darwin");

        // Non-default abi on darwin is still spelled out.
        let t = TargetTriple::new(Arch::Aarch64, Vendor::Unknown, Platform::Darwin, Abi::Gnu);
        assert_eq!(render_triple(&t), "aarch64-unknown-darwin-gnu");
    }

    #[test]
    fn host_target_is_well_formed() {
        let t = host_target();
        // Just check it renders and re-parses without panicking.
        let rendered = render_triple(&t);
        let reparsed = parse_triple(&rendered).unwrap();
        assert_eq!(reparsed.arch, t.arch);
        assert_eq!(reparsed.platform, t.platform);
    }

    proptest::proptest! {
        #[test]
        fn round_trip_non_default_abi(
            arch in "[a-z0-9_]{2,10}",
            vendor in "[a-z0-9_]{2,10}",
            platform in "[a-z0-9_]{2,10}",
            abi in "[a-z0-9_]{2,10}",
        ) {
            // Invariant (spec.md section 8): parseTriple(renderTriple(T)) = T
            // whenever T has a non-default abi.
            let t = TargetTriple::new(
                Arch::from(arch.as_str()),
                Vendor::from(vendor.as_str()),
                Platform::from(platform.as_str()),
                Abi::from(abi.as_str()),
            );
            if !(t.platform == Platform::Darwin && t.abi == Abi::System) {
                let rendered = render_triple(&t);
                let reparsed = parse_triple(&rendered).unwrap();
                prop_assert_eq!(reparsed, t);
            }
        }
    }
}
