use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use anyhow::bail;
use async_trait::async_trait;
use indexmap::IndexMap;
use indexmap::IndexSet;

use crate::arg_parser::RunArgs;
use crate::configuration::ResolvedConfig;
use crate::utils::get_lowercase_dotted_extension;

mod clang;
mod common;
mod yapf;

pub use clang::ClangBackend;
pub use yapf::YapfBackend;

/// How a backend should treat a single file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOptions {
  /// Never mutate the file, only report whether it is compliant.
  pub check_only: bool,
  /// Produce a unified diff fragment for non-compliant files. Only
  /// meaningful together with `check_only`.
  pub want_patch: bool,
}

/// Per-file outcome reported by a backend.
#[derive(Debug)]
pub struct RunResult {
  pub needed_format: bool,
  pub patch: Option<String>,
}

/// One pluggable formatter bound to a set of file extensions.
#[async_trait]
pub trait FormatterBackend: Send + Sync {
  fn name(&self) -> &'static str;

  /// The extensions this backend claims, leading dot included. Fixed for
  /// the lifetime of the backend.
  fn extensions(&self) -> &'static [&'static str];

  /// Name of the formatter's own style config file, when it has one. A
  /// change to this file invalidates formatting decisions tree-wide.
  fn config_file_name(&self) -> Option<&'static str> {
    None
  }

  /// Resolves the required external command, erroring when it is not
  /// installed. Called once before any file is touched.
  fn ensure_available(&self) -> Result<()>;

  /// Formats or checks a single file. `path` is the location on disk and
  /// `rel_path` the root-relative path used to label patch fragments.
  async fn run(&self, path: &Path, rel_path: &Path, options: RunOptions) -> Result<RunResult>;
}

/// The registered backends with their extension lookup table.
pub struct BackendCollection {
  backends: Vec<Arc<dyn FormatterBackend>>,
  by_extension: IndexMap<String, Arc<dyn FormatterBackend>>,
}

impl BackendCollection {
  /// Builds the extension map. An extension claimed by two backends is a
  /// startup error.
  pub fn build(backends: Vec<Arc<dyn FormatterBackend>>) -> Result<Self> {
    let mut by_extension: IndexMap<String, Arc<dyn FormatterBackend>> = IndexMap::new();
    for backend in &backends {
      for extension in backend.extensions() {
        if let Some(existing) = by_extension.insert(extension.to_string(), backend.clone()) {
          bail!(
            "Multiple formatters registered for extension '{}' ({} and {}).",
            extension,
            existing.name(),
            backend.name(),
          );
        }
      }
    }
    Ok(BackendCollection { backends, by_extension })
  }

  /// Errors when any backend's external command is missing so that a run
  /// aborts before touching files instead of finishing partially.
  pub fn ensure_all_available(&self) -> Result<()> {
    for backend in &self.backends {
      backend.ensure_available()?;
    }
    Ok(())
  }

  pub fn for_path(&self, path: &Path) -> Option<&Arc<dyn FormatterBackend>> {
    let extension = get_lowercase_dotted_extension(path)?;
    self.by_extension.get(&extension)
  }

  /// Extensions whose formatting decisions were invalidated by a style
  /// config change somewhere in `changed_files`.
  pub fn forced_extensions(&self, changed_files: &[PathBuf]) -> IndexSet<String> {
    let mut extensions = IndexSet::new();
    for backend in &self.backends {
      let Some(config_name) = backend.config_file_name() else {
        continue;
      };
      let config_changed = changed_files
        .iter()
        .any(|path| path.file_name().is_some_and(|name| name == config_name));
      if config_changed {
        extensions.extend(backend.extensions().iter().map(|extension| extension.to_string()));
      }
    }
    extensions
  }
}

/// Adds every backend's own CLI arguments to the parser.
pub fn register_args(app: clap::Command) -> clap::Command {
  let app = clang::register_args(app);
  yapf::register_args(app)
}

/// Constructs the backends for one run, with CLI flags taking precedence
/// over the config file.
pub fn create_backends(cmd: &RunArgs, config: &ResolvedConfig) -> Vec<Arc<dyn FormatterBackend>> {
  let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(crate::configuration::DEFAULT_TIMEOUT_SECONDS));
  vec![
    Arc::new(ClangBackend::new(cmd.clang_style.clone().or_else(|| config.clang_style.clone()), timeout)),
    Arc::new(YapfBackend::new(cmd.yapf_style.clone().or_else(|| config.yapf_style.clone()), timeout)),
  ]
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use crate::test_helpers::TestBackend;
  use crate::test_helpers::test_backends;

  use super::*;

  #[test]
  fn resolves_backend_by_extension() {
    let backends = test_backends();
    assert!(backends.for_path(Path::new("notes.txt")).is_some());
    assert!(backends.for_path(Path::new("dir/NOTES.TXT")).is_some());
    assert!(backends.for_path(Path::new("main.rs")).is_none());
    assert!(backends.for_path(Path::new("Makefile")).is_none());
  }

  #[test]
  fn rejects_duplicate_extension_claims() {
    let err = BackendCollection::build(vec![Arc::new(TestBackend::default()), Arc::new(TestBackend::default())])
      .err()
      .unwrap();
    assert!(err.to_string().contains("Multiple formatters registered for extension '.txt'"));
  }

  #[test]
  fn config_change_forces_the_backends_extensions() {
    let backends = test_backends();
    let forced = backends.forced_extensions(&[PathBuf::from("src/.testfmt")]);
    assert_eq!(forced.into_iter().collect::<Vec<_>>(), vec![".txt".to_string()]);
  }

  #[test]
  fn unrelated_changes_force_nothing() {
    let backends = test_backends();
    assert!(backends.forced_extensions(&[PathBuf::from("src/a.txt"), PathBuf::from("b.py")]).is_empty());
  }

  #[test]
  fn deleted_config_still_forces_extensions() {
    // the path only has to appear in the changed list, not exist on disk
    let backends = test_backends();
    assert_eq!(backends.forced_extensions(&[PathBuf::from(".testfmt")]).len(), 1);
  }
}
