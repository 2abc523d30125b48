//! Platform profiles
//!
//! A platform names the compiler, its toolset family, and the flags and
//! libraries shared by every configuration built for it. Profiles are
//! immutable values; variants are produced with [`PlatformProfile::derive`].

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Toolset family: the argument convention a compiler follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Toolset {
    /// cl.exe-compatible drivers (cl.exe, clang-cl.exe)
    Cl,
}

impl Toolset {
    /// Tag used in descriptor tables
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Cl => "CL",
        }
    }

    /// Directive making the compiler emit a dynamic library
    pub fn dynamic_library_directive(&self) -> &'static str {
        match self {
            Self::Cl => "-LD",
        }
    }

    /// Separator between compiler and linker arguments
    pub fn link_separator(&self) -> &'static str {
        match self {
            Self::Cl => "/link",
        }
    }

    /// Compiler flag overriding the output file name
    pub fn output_name_flag(&self, file_name: &str) -> String {
        match self {
            Self::Cl => format!("-Fe{}", file_name),
        }
    }

    /// Linker flag naming the debug-symbol file
    pub fn symbol_file_flag(&self, file_name: &str) -> String {
        match self {
            Self::Cl => format!("/PDB:{}", file_name),
        }
    }

    /// Linker flag selecting the console subsystem
    pub fn console_subsystem_flag(&self) -> &'static str {
        match self {
            Self::Cl => "-subsystem:console,5.2",
        }
    }
}

impl FromStr for Toolset {
    type Err = BuildError;

    fn from_str(s: &str) -> BuildResult<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CL" => Ok(Self::Cl),
            _ => Err(BuildError::UnsupportedToolset {
                toolset: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Toolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Target platform profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    /// Platform name
    pub name: String,
    /// Compiler executable
    pub compiler: String,
    /// Toolset family
    pub toolset: Toolset,
    /// Compiler flags common to all configurations
    pub common_compiler_flags: Vec<String>,
    /// System libraries required by the host
    pub libs: Vec<String>,
    /// Linker flags common to all configurations
    pub common_linker_flags: Vec<String>,
    /// Profile this one was derived from
    pub base: Option<String>,
}

/// Overrides applied when deriving a profile from a base
///
/// `compiler` and `toolset` replace the base's values; flag and library lists
/// are appended to the base's lists.
#[derive(Debug, Clone, Default)]
pub struct PlatformOverrides {
    pub compiler: Option<String>,
    pub toolset: Option<Toolset>,
    pub extra_compiler_flags: Vec<String>,
    pub extra_libs: Vec<String>,
    pub extra_linker_flags: Vec<String>,
}

impl PlatformProfile {
    /// Create a standalone profile with empty flag lists
    pub fn new(name: impl Into<String>, compiler: impl Into<String>, toolset: Toolset) -> Self {
        Self {
            name: name.into(),
            compiler: compiler.into(),
            toolset,
            common_compiler_flags: Vec::new(),
            libs: Vec::new(),
            common_linker_flags: Vec::new(),
            base: None,
        }
    }

    /// Set common compiler flags
    pub fn with_compiler_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.common_compiler_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Set required system libraries
    pub fn with_libs<I, S>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libs = libs.into_iter().map(Into::into).collect();
        self
    }

    /// Set common linker flags
    pub fn with_linker_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.common_linker_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Derive a new profile from `base`; `base` itself is left untouched
    pub fn derive(base: &PlatformProfile, name: impl Into<String>, overrides: PlatformOverrides) -> Self {
        let mut common_compiler_flags = base.common_compiler_flags.clone();
        common_compiler_flags.extend(overrides.extra_compiler_flags);

        let mut libs = base.libs.clone();
        libs.extend(overrides.extra_libs);

        let mut common_linker_flags = base.common_linker_flags.clone();
        common_linker_flags.extend(overrides.extra_linker_flags);

        Self {
            name: name.into(),
            compiler: overrides.compiler.unwrap_or_else(|| base.compiler.clone()),
            toolset: overrides.toolset.unwrap_or(base.toolset),
            common_compiler_flags,
            libs,
            common_linker_flags,
            base: Some(base.name.clone()),
        }
    }

    /// Windows platform using cl.exe
    pub fn win() -> Self {
        Self::new("win", "cl.exe", Toolset::Cl)
            .with_compiler_flags([
                "-MTd",
                "-nologo",
                "-FC",
                "-W4",
                "-WX",
                "-Oi",
                "-GR-",
                "-EHa-",
                "-D_HAS_EXCEPTIONS=0",
                "-D_CRT_SECURE_NO_WARNINGS",
                "-wd4201",
                "-wd4100",
                "-wd4189",
                "-wd4101",
                "-wd4505",
                "-wd4312",
                "-wd4200",
            ])
            .with_libs([
                "user32.lib",
                "gdi32.lib",
                "winmm.lib",
                "ole32.lib",
                "opengl32.lib",
                "shlwapi.lib",
            ])
            .with_linker_flags(["/opt:ref", "/incremental:no"])
    }

    /// Windows platform using clang-cl.exe
    pub fn win_clang() -> Self {
        Self::derive(
            &Self::win(),
            "win_clang",
            PlatformOverrides {
                compiler: Some("clang-cl.exe".to_string()),
                extra_compiler_flags: [
                    "-fdiagnostics-absolute-paths",
                    "-Wno-missing-braces",
                    "-Wno-unused-variable",
                    "-Wno-unused-function",
                    "-Wno-missing-field-initializers",
                ]
                .into_iter()
                .map(String::from)
                .collect(),
                ..Default::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolset_from_str() {
        assert_eq!("CL".parse::<Toolset>().unwrap(), Toolset::Cl);
        assert_eq!("cl".parse::<Toolset>().unwrap(), Toolset::Cl);
        assert!(matches!(
            "gcc".parse::<Toolset>(),
            Err(BuildError::UnsupportedToolset { .. })
        ));
    }

    #[test]
    fn test_win_clang_extends_win() {
        let win = PlatformProfile::win();
        let clang = PlatformProfile::win_clang();

        assert_eq!(clang.compiler, "clang-cl.exe");
        assert_eq!(clang.base.as_deref(), Some("win"));
        assert_eq!(
            &clang.common_compiler_flags[..win.common_compiler_flags.len()],
            &win.common_compiler_flags[..]
        );
        assert_eq!(
            clang.common_compiler_flags.last().map(String::as_str),
            Some("-Wno-missing-field-initializers")
        );
        assert_eq!(clang.libs, win.libs);
    }

    #[test]
    fn test_derive_leaves_base_untouched() {
        let base = PlatformProfile::win();
        let snapshot = base.clone();

        let derived = PlatformProfile::derive(
            &base,
            "win_lto",
            PlatformOverrides {
                extra_linker_flags: vec!["/ltcg".to_string()],
                ..Default::default()
            },
        );

        assert_eq!(base, snapshot);
        assert_eq!(derived.common_linker_flags, vec!["/opt:ref", "/incremental:no", "/ltcg"]);
        assert_eq!(derived.compiler, "cl.exe");
    }

    #[test]
    fn test_cl_directives() {
        assert_eq!(Toolset::Cl.dynamic_library_directive(), "-LD");
        assert_eq!(Toolset::Cl.output_name_flag("launcher.exe"), "-Felauncher.exe");
        assert_eq!(Toolset::Cl.symbol_file_flag("game_7.pdb"), "/PDB:game_7.pdb");
    }
}
