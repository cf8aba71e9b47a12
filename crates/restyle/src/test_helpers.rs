use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use anyhow::bail;
use async_trait::async_trait;

use crate::backends::BackendCollection;
use crate::backends::FormatterBackend;
use crate::backends::RunOptions;
use crate::backends::RunResult;
use crate::utils::get_unified_diff;

/// In-process backend used to exercise the pipeline without spawning real
/// formatter processes. Its "style" trims trailing whitespace from every
/// line and ensures a single trailing newline, which makes it idempotent.
/// A file containing `should_error` makes it fail.
#[derive(Default)]
pub struct TestBackend;

pub fn format_text(text: &str) -> String {
  let mut formatted = text.lines().map(|line| line.trim_end()).collect::<Vec<_>>().join("\n");
  formatted.push('\n');
  formatted
}

#[async_trait]
impl FormatterBackend for TestBackend {
  fn name(&self) -> &'static str {
    "test-fmt"
  }

  fn extensions(&self) -> &'static [&'static str] {
    &[".txt"]
  }

  fn config_file_name(&self) -> Option<&'static str> {
    Some(".testfmt")
  }

  fn ensure_available(&self) -> Result<()> {
    Ok(())
  }

  async fn run(&self, path: &Path, rel_path: &Path, options: RunOptions) -> Result<RunResult> {
    let original = tokio::fs::read_to_string(path).await?;
    if original.contains("should_error") {
      bail!("Did error.");
    }
    let formatted = format_text(&original);
    if original == formatted {
      return Ok(RunResult {
        needed_format: false,
        patch: None,
      });
    }
    if options.check_only {
      let patch = if options.want_patch {
        get_unified_diff(rel_path, &original, &formatted)
      } else {
        None
      };
      Ok(RunResult {
        needed_format: true,
        patch,
      })
    } else {
      tokio::fs::write(path, &formatted).await?;
      Ok(RunResult {
        needed_format: true,
        patch: None,
      })
    }
  }
}

pub fn test_backends() -> BackendCollection {
  BackendCollection::build(vec![Arc::new(TestBackend)]).unwrap()
}

pub fn test_logger() -> crate::utils::Logger {
  crate::utils::Logger::new(&crate::utils::LoggerOptions::default())
}

pub fn git_available() -> bool {
  which::which("git").is_ok()
}

/// A throwaway git repository on disk with `main` as the initial branch.
pub struct TestGitRepo {
  _dir: tempfile::TempDir,
  root: PathBuf,
}

impl TestGitRepo {
  pub fn new() -> Self {
    let dir = tempfile::tempdir().unwrap();
    let root = dunce::canonicalize(dir.path()).unwrap();
    let repo = TestGitRepo { _dir: dir, root };
    repo.run(&["init", "-q"]);
    repo.run(&["symbolic-ref", "HEAD", "refs/heads/main"]);
    repo.run(&["config", "user.email", "test@example.com"]);
    repo.run(&["config", "user.name", "test"]);
    repo.run(&["config", "commit.gpgsign", "false"]);
    repo
  }

  pub fn path(&self) -> &Path {
    &self.root
  }

  pub fn write_file(&self, rel_path: &str, content: &str) {
    let path = self.root.join(rel_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
  }

  pub fn commit_all(&self, message: &str) {
    self.run(&["add", "-A"]);
    self.run(&["commit", "-q", "-m", message]);
  }

  pub fn head_commit(&self) -> String {
    self.run_output(&["rev-parse", "HEAD"]).trim().to_string()
  }

  pub fn run(&self, args: &[&str]) {
    self.run_output(args);
  }

  pub fn run_output(&self, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
      .args(args)
      .current_dir(&self.root)
      .output()
      .unwrap();
    assert!(
      output.status.success(),
      "git {:?} failed: {}",
      args,
      String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
  }
}
