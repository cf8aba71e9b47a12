use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

/// Runs a git query in `dir`, capturing stdout. A nonzero exit is an error
/// carrying the captured stderr.
fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
  let output = std::process::Command::new("git")
    .args(args)
    .current_dir(dir)
    .stdin(std::process::Stdio::null())
    .output()
    .context("Failed launching git")?;
  if !output.status.success() {
    bail!(
      "'git {}' exited with code {}: {}",
      args.join(" "),
      output.status.code().map(|code| code.to_string()).unwrap_or_else(|| "<signal>".to_string()),
      String::from_utf8_lossy(&output.stderr).trim(),
    );
  }
  Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn run_git_lines(dir: &Path, args: &[&str]) -> Result<Vec<String>> {
  Ok(run_git(dir, args)?.lines().filter(|line| !line.is_empty()).map(|line| line.to_string()).collect())
}

/// Gets the toplevel directory of the repository containing `dir`.
pub fn repo_root(dir: &Path) -> Result<PathBuf> {
  let output = run_git(dir, &["rev-parse", "--show-toplevel"])?;
  Ok(PathBuf::from(output.trim_end()))
}

/// Gets the most recent common ancestor of two revisions.
pub fn merge_base(dir: &Path, rev_a: &str, rev_b: &str) -> Result<String> {
  let output = run_git(dir, &["merge-base", rev_a, rev_b])?;
  Ok(output.trim_end().to_string())
}

/// Lists files that differ between `base` and the working tree. Paths are
/// relative to the repository root.
pub fn diff_name_only(dir: &Path, base: &str) -> Result<Vec<String>> {
  run_git_lines(dir, &["--no-pager", "diff", "--name-only", base])
}

/// Lists files that are untracked but not ignored. Paths are relative to
/// the repository root.
pub fn untracked_files(dir: &Path) -> Result<Vec<String>> {
  run_git_lines(dir, &["ls-files", "--others", "--exclude-standard"])
}
