//! Descriptor store tests

use hotswap_build::{BuildError, ConfigurationSelector, DescriptorStore, Toolset};
use hotswap_config::ProjectConfig;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn project(toml: &str) -> ProjectConfig {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("hotswap.toml");
    fs::write(&path, toml).unwrap();
    ProjectConfig::load_from_file(&path).unwrap()
}

#[rstest]
#[case("d", "Debug")]
#[case("dbg", "Debug")]
#[case("debug", "Debug")]
#[case("DEBUG", "Debug")]
#[case("dev", "Develop")]
#[case("develop", "Develop")]
#[case("r", "Release")]
#[case("rel", "Release")]
#[case("Release", "Release")]
fn test_builtin_aliases(#[case] alias: &str, #[case] expected: &str) {
    let store = DescriptorStore::builtin();
    let resolved = store.resolve("win", alias).unwrap();
    assert_eq!(resolved.configuration.name, expected);
    assert_eq!(resolved.platform.name, "win");
}

#[rstest]
#[case(ConfigurationSelector::Debug, "-Od")]
#[case(ConfigurationSelector::Develop, "-DDEVELOP=1")]
#[case(ConfigurationSelector::Release, "-DRELEASE=1")]
fn test_selector_resolution(#[case] selector: ConfigurationSelector, #[case] flag: &str) {
    let store = DescriptorStore::builtin();
    let resolved = store.resolve_selector("win", &selector).unwrap();
    assert!(resolved.configuration.compiler_flags.iter().any(|f| f == flag));
    assert_eq!(resolved.configuration.linker_flags, vec!["/debug:full"]);
}

#[test]
fn test_every_alias_is_claimed_once() {
    let store = DescriptorStore::builtin();
    let aliases: Vec<&str> = store.aliases().collect();
    for alias in &aliases {
        let claims = store
            .configurations()
            .iter()
            .filter(|c| c.accepts(alias))
            .count();
        assert_eq!(claims, 1, "alias '{}' claimed {} times", alias, claims);
    }
}

#[test]
fn test_manifest_platform_derives_from_base() {
    let project = project(
        r#"
[platforms.win_lto]
base = "win"
linker_flags = ["/ltcg"]
libs = ["dbghelp.lib"]
"#,
    );

    let store = DescriptorStore::from_project(&project).unwrap();
    let resolved = store.resolve("win_lto", "r").unwrap();

    assert_eq!(resolved.platform.compiler, "cl.exe");
    assert_eq!(resolved.platform.toolset, Toolset::Cl);
    assert_eq!(
        resolved.platform.common_linker_flags,
        vec!["/opt:ref", "/incremental:no", "/ltcg"]
    );
    assert_eq!(resolved.platform.libs.last().map(String::as_str), Some("dbghelp.lib"));
    // The base profile is left as it was
    assert_eq!(store.platform("win").unwrap().common_linker_flags.len(), 2);
}

#[test]
fn test_manifest_platform_chain_in_any_order() {
    let project = project(
        r#"
[platforms.a_child]
base = "z_parent"
compiler_flags = ["-child"]

[platforms.z_parent]
base = "win_clang"
compiler_flags = ["-parent"]
"#,
    );

    let store = DescriptorStore::from_project(&project).unwrap();
    assert_eq!(store.lineage("a_child"), vec!["a_child", "z_parent", "win_clang", "win"]);

    let child = store.platform("a_child").unwrap();
    assert_eq!(child.compiler, "clang-cl.exe");
    let tail: Vec<&str> = child
        .common_compiler_flags
        .iter()
        .rev()
        .take(2)
        .map(String::as_str)
        .collect();
    assert_eq!(tail, vec!["-child", "-parent"]);
}

#[test]
fn test_manifest_configuration_inherits() {
    let project = project(
        r#"
[configurations.profile]
name = "Profile"
inherits = "develop"
aliases = ["p", "prof"]
compiler_flags = ["-DPROFILE=1"]
"#,
    );

    let store = DescriptorStore::from_project(&project).unwrap();
    let resolved = store.resolve("win", "prof").unwrap();

    assert_eq!(resolved.configuration.name, "Profile");
    assert_eq!(resolved.configuration.platform, "win");
    assert_eq!(
        resolved.configuration.compiler_flags,
        vec!["-DDEVELOP=1", "-Z7", "-O2", "-DPROFILE=1"]
    );
    assert_eq!(resolved.configuration.linker_flags, vec!["/debug:full"]);
}

#[test]
fn test_manifest_alias_conflict() {
    let project = project(
        r#"
[configurations.fast]
platform = "win"
aliases = ["f", "rel"]
"#,
    );

    let result = DescriptorStore::from_project(&project);
    assert!(matches!(result, Err(BuildError::AliasConflict { .. })));
}

#[test]
fn test_manifest_unsupported_toolset() {
    let project = project(
        r#"
[platforms.linux]
compiler = "gcc"
toolset = "GCC"
"#,
    );

    let result = DescriptorStore::from_project(&project);
    assert!(matches!(result, Err(BuildError::UnsupportedToolset { .. })));
}

#[test]
fn test_manifest_unknown_base() {
    let project = project(
        r#"
[platforms.orphan]
base = "ps4"
"#,
    );

    match DescriptorStore::from_project(&project) {
        Err(BuildError::UnknownPlatform { name }) => assert_eq!(name, "ps4"),
        other => panic!("expected unknown platform, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_configurations_for_platform() {
    let project = project(
        r#"
[platforms.console]
compiler = "cl.exe"
toolset = "CL"

[configurations.console_debug]
platform = "console"
aliases = ["cd"]
"#,
    );

    let store = DescriptorStore::from_project(&project).unwrap();
    let names: Vec<&str> = store
        .configurations_for("console")
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["console_debug"]);
    assert_eq!(store.configurations_for("win_clang").len(), 3);
    assert!(matches!(
        store.resolve("console", "d"),
        Err(BuildError::ConfigurationPlatformMismatch { .. })
    ));
}
