//! Language standard and IntelliSense mode inference.
//!
//! Both entry points are total: every input, including an empty property set,
//! maps to a member of the fixed enumerations below.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Compiler family keyed from `qbs.toolchain`.
///
/// Qbs reports toolchains as a list from most to least specific, e.g.
/// `["clang", "llvm", "gcc"]` or `["clang-cl", "msvc"]`, so families are
/// tested in a fixed order against exact list elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainFamily {
    Msvc,
    Clang,
    Gcc,
    Iar,
    Keil,
    Sdcc,
    Unknown,
}

impl ToolchainFamily {
    pub fn detect(toolchain: &[String]) -> Self {
        let has = |name: &str| toolchain.iter().any(|t| t == name);
        if has("msvc") {
            ToolchainFamily::Msvc
        } else if has("clang") || has("clang-cl") || has("llvm") {
            ToolchainFamily::Clang
        } else if has("gcc") || has("mingw") {
            ToolchainFamily::Gcc
        } else if has("iar") {
            ToolchainFamily::Iar
        } else if has("keil") {
            ToolchainFamily::Keil
        } else if has("sdcc") {
            ToolchainFamily::Sdcc
        } else {
            ToolchainFamily::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageStandard {
    C89,
    C99,
    C11,
    C17,
    C18,
    Gnu89,
    Gnu99,
    Gnu11,
    Gnu17,
    Gnu18,
    Cxx98,
    Cxx03,
    Cxx11,
    Cxx14,
    Cxx17,
    Cxx20,
    GnuXx98,
    GnuXx03,
    GnuXx11,
    GnuXx14,
    GnuXx17,
    GnuXx20,
}

impl LanguageStandard {
    pub const ALL: [LanguageStandard; 22] = [
        LanguageStandard::C89,
        LanguageStandard::C99,
        LanguageStandard::C11,
        LanguageStandard::C17,
        LanguageStandard::C18,
        LanguageStandard::Gnu89,
        LanguageStandard::Gnu99,
        LanguageStandard::Gnu11,
        LanguageStandard::Gnu17,
        LanguageStandard::Gnu18,
        LanguageStandard::Cxx98,
        LanguageStandard::Cxx03,
        LanguageStandard::Cxx11,
        LanguageStandard::Cxx14,
        LanguageStandard::Cxx17,
        LanguageStandard::Cxx20,
        LanguageStandard::GnuXx98,
        LanguageStandard::GnuXx03,
        LanguageStandard::GnuXx11,
        LanguageStandard::GnuXx14,
        LanguageStandard::GnuXx17,
        LanguageStandard::GnuXx20,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageStandard::C89 => "c89",
            LanguageStandard::C99 => "c99",
            LanguageStandard::C11 => "c11",
            LanguageStandard::C17 => "c17",
            LanguageStandard::C18 => "c18",
            LanguageStandard::Gnu89 => "gnu89",
            LanguageStandard::Gnu99 => "gnu99",
            LanguageStandard::Gnu11 => "gnu11",
            LanguageStandard::Gnu17 => "gnu17",
            LanguageStandard::Gnu18 => "gnu18",
            LanguageStandard::Cxx98 => "c++98",
            LanguageStandard::Cxx03 => "c++03",
            LanguageStandard::Cxx11 => "c++11",
            LanguageStandard::Cxx14 => "c++14",
            LanguageStandard::Cxx17 => "c++17",
            LanguageStandard::Cxx20 => "c++20",
            LanguageStandard::GnuXx98 => "gnu++98",
            LanguageStandard::GnuXx03 => "gnu++03",
            LanguageStandard::GnuXx11 => "gnu++11",
            LanguageStandard::GnuXx14 => "gnu++14",
            LanguageStandard::GnuXx17 => "gnu++17",
            LanguageStandard::GnuXx20 => "gnu++20",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == text)
    }
}

impl Serialize for LanguageStandard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for LanguageStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IntelliSenseMode {
    MsvcX86,
    MsvcX64,
    MsvcArm,
    MsvcArm64,
    #[default]
    GccX86,
    GccX64,
    GccArm,
    GccArm64,
    ClangX86,
    ClangX64,
    ClangArm,
    ClangArm64,
}

impl IntelliSenseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntelliSenseMode::MsvcX86 => "msvc-x86",
            IntelliSenseMode::MsvcX64 => "msvc-x64",
            IntelliSenseMode::MsvcArm => "msvc-arm",
            IntelliSenseMode::MsvcArm64 => "msvc-arm64",
            IntelliSenseMode::GccX86 => "gcc-x86",
            IntelliSenseMode::GccX64 => "gcc-x64",
            IntelliSenseMode::GccArm => "gcc-arm",
            IntelliSenseMode::GccArm64 => "gcc-arm64",
            IntelliSenseMode::ClangX86 => "clang-x86",
            IntelliSenseMode::ClangX64 => "clang-x64",
            IntelliSenseMode::ClangArm => "clang-arm",
            IntelliSenseMode::ClangArm64 => "clang-arm64",
        }
    }
}

impl Serialize for IntelliSenseMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for IntelliSenseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of the `cpp.*` and `qbs.*` module properties of a product or group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerProperties {
    pub toolchain: Vec<String>,
    pub architecture: Option<String>,
    pub version_major: u32,
    pub version_minor: u32,
    pub version_patch: u32,
    pub c_language_version: Vec<String>,
    pub cxx_language_version: Vec<String>,
    pub compiler_name: String,
    pub compiler_path: String,
    pub compiler_include_paths: Vec<String>,
    pub distribution_include_paths: Vec<String>,
    pub system_include_paths: Vec<String>,
    pub include_paths: Vec<String>,
    pub framework_paths: Vec<String>,
    pub system_framework_paths: Vec<String>,
    pub defines: Vec<String>,
    pub prefix_headers: Vec<String>,
}

impl CompilerProperties {
    pub fn from_value(props: &Value) -> Self {
        Self {
            toolchain: strings(props.get("qbs.toolchain")),
            architecture: props
                .get("qbs.architecture")
                .and_then(Value::as_str)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            version_major: version(props.get("cpp.compilerVersionMajor")),
            version_minor: version(props.get("cpp.compilerVersionMinor")),
            version_patch: version(props.get("cpp.compilerVersionPatch")),
            c_language_version: strings(props.get("cpp.cLanguageVersion")),
            cxx_language_version: strings(props.get("cpp.cxxLanguageVersion")),
            compiler_name: text(props.get("cpp.compilerName")),
            compiler_path: text(props.get("cpp.compilerPath")),
            compiler_include_paths: strings(props.get("cpp.compilerIncludePaths")),
            distribution_include_paths: strings(props.get("cpp.distributionIncludePaths")),
            system_include_paths: strings(props.get("cpp.systemIncludePaths")),
            include_paths: strings(props.get("cpp.includePaths")),
            framework_paths: strings(props.get("cpp.frameworkPaths")),
            system_framework_paths: strings(props.get("cpp.systemFrameworkPaths")),
            defines: strings(props.get("cpp.defines")),
            prefix_headers: strings(props.get("cpp.prefixHeaders")),
        }
    }

    pub fn family(&self) -> ToolchainFamily {
        ToolchainFamily::detect(&self.toolchain)
    }

    /// Every include directory in compiler search order
    pub fn all_include_paths(&self) -> Vec<String> {
        [
            &self.compiler_include_paths,
            &self.distribution_include_paths,
            &self.system_include_paths,
            &self.include_paths,
            &self.framework_paths,
            &self.system_framework_paths,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }

    fn version(&self) -> (u32, u32, u32) {
        (self.version_major, self.version_minor, self.version_patch)
    }

    fn arch_contains(&self, needle: &str) -> bool {
        self.architecture
            .as_deref()
            .is_some_and(|arch| arch.contains(needle))
    }
}

/// Language standard for a source file with `tags`, compiled with `props`.
pub fn language_standard(props: Option<&CompilerProperties>, tags: &[&str]) -> LanguageStandard {
    let is_cpp = tags.contains(&"cpp");
    let is_c = !is_cpp && tags.contains(&"c");

    let Some(props) = props else {
        return if is_cpp {
            LanguageStandard::Cxx03
        } else if is_c {
            LanguageStandard::C89
        } else {
            LanguageStandard::Cxx98
        };
    };

    if is_cpp {
        explicit(&props.cxx_language_version).unwrap_or_else(|| cxx_heuristic(props))
    } else if is_c {
        explicit(&props.c_language_version).unwrap_or_else(|| c_heuristic(props))
    } else {
        LanguageStandard::Cxx98
    }
}

fn explicit(versions: &[String]) -> Option<LanguageStandard> {
    versions
        .first()
        .and_then(|first| LanguageStandard::parse(first))
}

// Thresholds are approximate: they track when each compiler made the standard its default.
fn cxx_heuristic(props: &CompilerProperties) -> LanguageStandard {
    let (major, minor, patch) = props.version();
    match props.family() {
        ToolchainFamily::Msvc => LanguageStandard::Cxx11,
        ToolchainFamily::Clang => {
            if major >= 10 {
                LanguageStandard::Cxx20
            } else if major >= 5 {
                LanguageStandard::Cxx17
            } else if (major, minor) > (3, 4) {
                LanguageStandard::Cxx14
            } else if (major, minor) > (3, 3) {
                LanguageStandard::Cxx11
            } else {
                LanguageStandard::Cxx03
            }
        }
        ToolchainFamily::Gcc => {
            if major >= 11 {
                LanguageStandard::Cxx17
            } else if (major, minor) > (6, 1) {
                LanguageStandard::Cxx14
            } else if (major, minor, patch) > (4, 8, 1) {
                LanguageStandard::Cxx11
            } else {
                LanguageStandard::Cxx03
            }
        }
        ToolchainFamily::Iar => LanguageStandard::Cxx03,
        ToolchainFamily::Keil if props.arch_contains("arm") => {
            if major >= 5 {
                LanguageStandard::Cxx11
            } else {
                LanguageStandard::Cxx03
            }
        }
        _ => LanguageStandard::Cxx98,
    }
}

fn c_heuristic(props: &CompilerProperties) -> LanguageStandard {
    let (major, minor, patch) = props.version();
    match props.family() {
        ToolchainFamily::Msvc => LanguageStandard::C99,
        ToolchainFamily::Clang => {
            if major >= 5 {
                LanguageStandard::C99
            } else {
                LanguageStandard::C89
            }
        }
        ToolchainFamily::Gcc => {
            if (major, minor) > (6, 1) {
                LanguageStandard::C11
            } else if (major, minor, patch) > (4, 8, 1) {
                LanguageStandard::C99
            } else {
                LanguageStandard::C89
            }
        }
        ToolchainFamily::Iar => LanguageStandard::C99,
        ToolchainFamily::Keil => {
            if major >= 5 {
                LanguageStandard::C99
            } else {
                LanguageStandard::C89
            }
        }
        ToolchainFamily::Sdcc => {
            if major >= 3 {
                LanguageStandard::C11
            } else {
                LanguageStandard::C99
            }
        }
        ToolchainFamily::Unknown => LanguageStandard::C89,
    }
}

/// IntelliSense mode for `props`; `gcc-x86` when nothing better is known.
pub fn intellisense_mode(props: Option<&CompilerProperties>) -> IntelliSenseMode {
    use IntelliSenseMode::*;

    let Some(props) = props else {
        return IntelliSenseMode::default();
    };
    let Some(arch) = props.architecture.as_deref() else {
        return IntelliSenseMode::default();
    };

    let by_arch = |x86, x64, arm, arm64| {
        if arch == "x86" {
            Some(x86)
        } else if arch == "x86_64" {
            Some(x64)
        } else if arch.contains("arm") {
            Some(if arch.contains("64") { arm64 } else { arm })
        } else {
            None
        }
    };

    let mode = match props.family() {
        ToolchainFamily::Msvc => by_arch(MsvcX86, MsvcX64, MsvcArm, MsvcArm64),
        ToolchainFamily::Clang => by_arch(ClangX86, ClangX64, ClangArm, ClangArm64),
        ToolchainFamily::Gcc => by_arch(GccX86, GccX64, GccArm, GccArm64),
        // Closest available modes for the embedded ARM compilers.
        ToolchainFamily::Iar if arch.contains("arm") => Some(GccArm),
        ToolchainFamily::Keil if arch.contains("arm") => {
            if props.compiler_name.contains("armclang") {
                Some(ClangArm)
            } else {
                Some(GccArm)
            }
        }
        _ => None,
    };
    mode.unwrap_or_default()
}

fn strings(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn text(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn version(value: Option<&Value>) -> u32 {
    match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
