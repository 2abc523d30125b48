//! Build configurations and the target descriptor store
//!
//! Provides the build configurations (debug, develop, release, custom), the
//! selector the CLI hands in, and the store that resolves a platform name and
//! configuration alias to exactly one (platform, configuration) pair.

use crate::error::{BuildError, BuildResult};
use crate::platform::{PlatformOverrides, PlatformProfile};
use hotswap_config::{ConfigurationSection, PlatformSection, ProjectConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Build configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfiguration {
    /// Human-readable name
    pub name: String,
    /// Name of the owning platform
    pub platform: String,
    /// Accepted command-line aliases
    pub aliases: Vec<String>,
    /// Configuration compiler flags
    pub compiler_flags: Vec<String>,
    /// Configuration linker flags
    pub linker_flags: Vec<String>,
}

impl BuildConfiguration {
    /// Create a configuration owned by `platform`
    pub fn new(name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
            aliases: Vec::new(),
            compiler_flags: Vec::new(),
            linker_flags: Vec::new(),
        }
    }

    /// Set accepted aliases
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    /// Set compiler flags
    pub fn with_compiler_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compiler_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Set linker flags
    pub fn with_linker_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linker_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    /// Check if `alias` selects this configuration (case-insensitive)
    pub fn accepts(&self, alias: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias))
    }

    /// Debug configuration for `win`
    pub fn win_debug() -> Self {
        // Full debug info on the linker side keeps hot-reloaded modules debuggable
        Self::new("Debug", "win")
            .with_aliases(["d", "dbg", "debug"])
            .with_compiler_flags(["-DDEBUG=1", "-Z7", "-Od"])
            .with_linker_flags(["/debug:full"])
    }

    /// Optimized development configuration for `win`
    pub fn win_develop() -> Self {
        Self::new("Develop", "win")
            .with_aliases(["dev", "develop"])
            .with_compiler_flags(["-DDEVELOP=1", "-Z7", "-O2"])
            .with_linker_flags(["/debug:full"])
    }

    /// Release configuration for `win`
    pub fn win_release() -> Self {
        Self::new("Release", "win")
            .with_aliases(["r", "rel", "release"])
            .with_compiler_flags(["-DRELEASE=1", "-O2"])
            .with_linker_flags(["/debug:full"])
    }
}

/// Configuration requested on the command line
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigurationSelector {
    /// Debug build
    Debug,
    /// Development build (default)
    Develop,
    /// Release build
    Release,
    /// Any other alias
    Alias(String),
}

impl ConfigurationSelector {
    /// Parse selector from an alias
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" => Self::Debug,
            "develop" => Self::Develop,
            "release" => Self::Release,
            other => Self::Alias(other.to_string()),
        }
    }

    /// Alias looked up in the descriptor store
    pub fn alias(&self) -> &str {
        match self {
            Self::Debug => "debug",
            Self::Develop => "develop",
            Self::Release => "release",
            Self::Alias(alias) => alias,
        }
    }
}

#[allow(clippy::derivable_impls)]
impl Default for ConfigurationSelector {
    fn default() -> Self {
        Self::Develop
    }
}

impl std::fmt::Display for ConfigurationSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.alias())
    }
}

/// A resolved (platform, configuration) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub platform: PlatformProfile,
    pub configuration: BuildConfiguration,
}

/// Target descriptor store - platform and configuration tables
///
/// No alias is ever claimed by two configurations: registering a conflicting
/// configuration is rejected, so resolution is unambiguous.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    /// Platforms in registration order
    platforms: Vec<PlatformProfile>,
    /// Configurations in registration order
    configurations: Vec<BuildConfiguration>,
}

impl DescriptorStore {
    /// Create an empty store
    pub fn empty() -> Self {
        Self {
            platforms: Vec::new(),
            configurations: Vec::new(),
        }
    }

    /// Create a store holding the built-in tables
    pub fn builtin() -> Self {
        Self {
            platforms: vec![PlatformProfile::win(), PlatformProfile::win_clang()],
            configurations: vec![
                BuildConfiguration::win_debug(),
                BuildConfiguration::win_develop(),
                BuildConfiguration::win_release(),
            ],
        }
    }

    /// Create the built-in store extended with a project's tables
    pub fn from_project(project: &ProjectConfig) -> BuildResult<Self> {
        let mut store = Self::builtin();
        store.load_from_manifest(project)?;
        Ok(store)
    }

    /// Register a platform
    pub fn register_platform(&mut self, platform: PlatformProfile) -> BuildResult<()> {
        if self.platform(&platform.name).is_some() {
            return Err(BuildError::DuplicatePlatform {
                name: platform.name,
            });
        }
        if let Some(base) = &platform.base {
            if self.platform(base).is_none() {
                return Err(BuildError::unknown_platform(base.clone()));
            }
        }
        self.platforms.push(platform);
        Ok(())
    }

    /// Register a configuration
    pub fn register_configuration(&mut self, configuration: BuildConfiguration) -> BuildResult<()> {
        if configuration.aliases.is_empty() {
            return Err(BuildError::InvalidDescriptor(format!(
                "configuration '{}' has no aliases",
                configuration.name
            )));
        }
        if self.platform(&configuration.platform).is_none() {
            return Err(BuildError::unknown_platform(configuration.platform.clone()));
        }
        if self
            .configurations
            .iter()
            .any(|c| c.name.eq_ignore_ascii_case(&configuration.name))
        {
            return Err(BuildError::InvalidDescriptor(format!(
                "configuration '{}' is already defined",
                configuration.name
            )));
        }

        for (i, alias) in configuration.aliases.iter().enumerate() {
            let repeated = configuration.aliases[..i]
                .iter()
                .any(|a| a.eq_ignore_ascii_case(alias));
            let claimed_by = self.configurations.iter().find(|c| c.accepts(alias));
            if let Some(existing) = claimed_by {
                return Err(BuildError::AliasConflict {
                    alias: alias.clone(),
                    configuration: configuration.name.clone(),
                    existing: existing.name.clone(),
                });
            }
            if repeated {
                return Err(BuildError::InvalidDescriptor(format!(
                    "configuration '{}' lists alias '{}' twice",
                    configuration.name, alias
                )));
            }
        }

        self.configurations.push(configuration);
        Ok(())
    }

    /// Load platform and configuration tables from hotswap.toml
    ///
    /// Entries may reference each other in any order; an entry is registered
    /// once the platform or configuration it builds on is known.
    pub fn load_from_manifest(&mut self, project: &ProjectConfig) -> BuildResult<()> {
        let mut pending: BTreeMap<&str, &PlatformSection> = project
            .platforms
            .iter()
            .map(|(name, section)| (name.as_str(), section))
            .collect();

        while !pending.is_empty() {
            let ready: Vec<&str> = pending
                .iter()
                .filter(|(_, section)| {
                    section
                        .base
                        .as_deref()
                        .map_or(true, |base| self.platform(base).is_some())
                })
                .map(|(name, _)| *name)
                .collect();

            if ready.is_empty() {
                // Every remaining entry names a base that never appears
                let base = pending
                    .values()
                    .find_map(|s| s.base.clone())
                    .unwrap_or_default();
                return Err(BuildError::unknown_platform(base));
            }

            for name in ready {
                if let Some(section) = pending.remove(name) {
                    let platform = self.platform_from_section(name, section)?;
                    self.register_platform(platform)?;
                }
            }
        }

        let mut pending: BTreeMap<&str, &ConfigurationSection> = project
            .configurations
            .iter()
            .map(|(key, section)| (key.as_str(), section))
            .collect();

        while !pending.is_empty() {
            let ready: Vec<&str> = pending
                .iter()
                .filter(|(_, section)| {
                    section
                        .inherits
                        .as_deref()
                        .map_or(true, |parent| self.configuration(parent).is_some())
                })
                .map(|(key, _)| *key)
                .collect();

            if ready.is_empty() {
                let parent = pending
                    .values()
                    .find_map(|s| s.inherits.clone())
                    .unwrap_or_default();
                return Err(BuildError::unknown_configuration(parent, self.aliases()));
            }

            for key in ready {
                if let Some(section) = pending.remove(key) {
                    let configuration = self.configuration_from_section(key, section)?;
                    self.register_configuration(configuration)?;
                }
            }
        }

        Ok(())
    }

    fn platform_from_section(&self, name: &str, section: &PlatformSection) -> BuildResult<PlatformProfile> {
        let toolset = section.toolset.as_deref().map(str::parse).transpose()?;

        match &section.base {
            Some(base) => {
                let base = self
                    .platform(base)
                    .ok_or_else(|| BuildError::unknown_platform(base.clone()))?;
                Ok(PlatformProfile::derive(
                    base,
                    name,
                    PlatformOverrides {
                        compiler: section.compiler.clone(),
                        toolset,
                        extra_compiler_flags: section.compiler_flags.clone(),
                        extra_libs: section.libs.clone(),
                        extra_linker_flags: section.linker_flags.clone(),
                    },
                ))
            }
            None => {
                let (Some(compiler), Some(toolset)) = (&section.compiler, toolset) else {
                    return Err(BuildError::InvalidDescriptor(format!(
                        "platform '{}' needs a base or both compiler and toolset",
                        name
                    )));
                };
                Ok(PlatformProfile::new(name, compiler.clone(), toolset)
                    .with_compiler_flags(section.compiler_flags.clone())
                    .with_libs(section.libs.clone())
                    .with_linker_flags(section.linker_flags.clone()))
            }
        }
    }

    fn configuration_from_section(
        &self,
        key: &str,
        section: &ConfigurationSection,
    ) -> BuildResult<BuildConfiguration> {
        let parent = match &section.inherits {
            Some(alias) => Some(
                self.configuration(alias)
                    .ok_or_else(|| BuildError::unknown_configuration(alias.clone(), self.aliases()))?,
            ),
            None => None,
        };

        let platform = section
            .platform
            .clone()
            .or_else(|| parent.map(|p| p.platform.clone()))
            .ok_or_else(|| {
                BuildError::InvalidDescriptor(format!("configuration '{}' has no platform", key))
            })?;

        let mut compiler_flags = parent.map(|p| p.compiler_flags.clone()).unwrap_or_default();
        compiler_flags.extend(section.compiler_flags.iter().cloned());

        let mut linker_flags = parent.map(|p| p.linker_flags.clone()).unwrap_or_default();
        linker_flags.extend(section.linker_flags.iter().cloned());

        Ok(BuildConfiguration {
            name: section.name.clone().unwrap_or_else(|| key.to_string()),
            platform,
            aliases: section.aliases.clone(),
            compiler_flags,
            linker_flags,
        })
    }

    /// Look up a platform by name
    pub fn platform(&self, name: &str) -> Option<&PlatformProfile> {
        self.platforms.iter().find(|p| p.name == name)
    }

    /// Look up a configuration by alias; first match wins
    pub fn configuration(&self, alias: &str) -> Option<&BuildConfiguration> {
        self.configurations.iter().find(|c| c.accepts(alias))
    }

    /// Names of `platform` and every profile it derives from, nearest first
    pub fn lineage(&self, platform: &str) -> Vec<&str> {
        let mut lineage = Vec::new();
        let mut current = self.platform(platform);
        while let Some(profile) = current {
            // Registration order rules out cycles; the guard keeps lookups finite regardless
            if lineage.contains(&profile.name.as_str()) {
                break;
            }
            lineage.push(profile.name.as_str());
            current = profile.base.as_deref().and_then(|base| self.platform(base));
        }
        lineage
    }

    /// Resolve a platform name and configuration alias
    pub fn resolve(&self, platform: &str, alias: &str) -> BuildResult<Resolved> {
        let profile = self
            .platform(platform)
            .ok_or_else(|| BuildError::unknown_platform(platform))?;

        let configuration = self
            .configuration(alias)
            .ok_or_else(|| BuildError::unknown_configuration(alias, self.aliases()))?;

        if !self.lineage(platform).contains(&configuration.platform.as_str()) {
            return Err(BuildError::ConfigurationPlatformMismatch {
                configuration: configuration.name.clone(),
                platform: platform.to_string(),
            });
        }

        Ok(Resolved {
            platform: profile.clone(),
            configuration: configuration.clone(),
        })
    }

    /// Resolve a selector
    pub fn resolve_selector(
        &self,
        platform: &str,
        selector: &ConfigurationSelector,
    ) -> BuildResult<Resolved> {
        self.resolve(platform, selector.alias())
    }

    /// All platforms in registration order
    pub fn platforms(&self) -> &[PlatformProfile] {
        &self.platforms
    }

    /// All configurations in registration order
    pub fn configurations(&self) -> &[BuildConfiguration] {
        &self.configurations
    }

    /// Configurations usable with `platform`
    pub fn configurations_for(&self, platform: &str) -> Vec<&BuildConfiguration> {
        let lineage = self.lineage(platform);
        self.configurations
            .iter()
            .filter(|c| lineage.contains(&c.platform.as_str()))
            .collect()
    }

    /// Every claimed alias in registration order
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.configurations
            .iter()
            .flat_map(|c| c.aliases.iter().map(String::as_str))
    }
}

impl Default for DescriptorStore {
    fn default() -> Self {
        Self::builtin()
    }
}
