use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE_NAME: &str = ".restyle.json";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Project-level configuration. CLI flags take precedence over every field
/// here.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ResolvedConfig {
  /// Directories excluded from both full-scan and incremental runs.
  #[serde(default)]
  pub exclude_dirs: Vec<String>,
  pub clang_style: Option<String>,
  pub yapf_style: Option<String>,
  /// Upper bound for a single external formatter invocation.
  pub timeout_seconds: Option<u64>,
}

/// Reads the config file. A missing default config is fine, a missing
/// explicitly requested one is an error.
pub fn resolve_config(root: &Path, override_path: Option<&Path>) -> Result<ResolvedConfig> {
  let (path, required): (PathBuf, bool) = match override_path {
    Some(path) => (path.to_path_buf(), true),
    None => (root.join(DEFAULT_CONFIG_FILE_NAME), false),
  };
  let text = match std::fs::read_to_string(&path) {
    Ok(text) => text,
    Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => return Ok(ResolvedConfig::default()),
    Err(err) => return Err(err).with_context(|| format!("Could not read config file at {}", path.display())),
  };
  serde_json::from_str(&text).with_context(|| format!("Error deserializing {}", path.display()))
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn missing_default_config_resolves_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = resolve_config(dir.path(), None).unwrap();
    assert_eq!(config, ResolvedConfig::default());
  }

  #[test]
  fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = resolve_config(dir.path(), Some(&dir.path().join("nope.json"))).err().unwrap();
    assert!(err.to_string().contains("Could not read config file"));
  }

  #[test]
  fn reads_all_fields() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join(DEFAULT_CONFIG_FILE_NAME),
      r#"{
        "excludeDirs": ["external", "build"],
        "clangStyle": "Google",
        "yapfStyle": "pep8",
        "timeoutSeconds": 120
      }"#,
    )
    .unwrap();
    let config = resolve_config(dir.path(), None).unwrap();
    assert_eq!(
      config,
      ResolvedConfig {
        exclude_dirs: vec!["external".to_string(), "build".to_string()],
        clang_style: Some("Google".to_string()),
        yapf_style: Some("pep8".to_string()),
        timeout_seconds: Some(120),
      }
    );
  }

  #[test]
  fn unknown_properties_are_diagnosed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE_NAME), r#"{ "non-existent": 25 }"#).unwrap();
    let err = resolve_config(dir.path(), None).err().unwrap();
    assert!(format!("{:#}", err).contains("Error deserializing"));
  }
}
