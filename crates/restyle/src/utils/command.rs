use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use anyhow::bail;
use anyhow::Context;

/// Captured outcome of an external command invocation.
///
/// Callers declare which exit codes they accept instead of assuming zero is
/// the only success. Some formatters signal "file is non-compliant" through
/// a dedicated nonzero code.
pub struct CommandOutput {
  pub exit_code: Option<i32>,
  pub stdout: Vec<u8>,
  pub stderr: String,
}

/// Runs a command to completion, capturing stdout and stderr.
///
/// Errors when the command can't be spawned, exceeds `timeout`, or exits
/// with a code outside `accepted_exit_codes`. Error messages carry the
/// captured stderr so the caller has something actionable to surface.
pub async fn run_command(
  binary: &Path,
  args: impl IntoIterator<Item = impl AsRef<OsStr>>,
  timeout: Duration,
  accepted_exit_codes: &[i32],
) -> Result<CommandOutput> {
  let mut command = tokio::process::Command::new(binary);
  command.args(args).kill_on_drop(true);

  let output = match tokio::time::timeout(timeout, command.output()).await {
    Ok(result) => result.with_context(|| format!("Failed launching '{}'", binary.display()))?,
    Err(_) => bail!("'{}' timed out after {}s", binary.display(), timeout.as_secs()),
  };

  let exit_code = output.status.code();
  let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
  match exit_code {
    Some(code) if accepted_exit_codes.contains(&code) => Ok(CommandOutput {
      exit_code,
      stdout: output.stdout,
      stderr,
    }),
    Some(code) => bail!("'{}' exited with code {}\n{}", binary.display(), code, stderr.trim()),
    None => bail!("'{}' was terminated by a signal\n{}", binary.display(), stderr.trim()),
  }
}

/// Resolves a formatter command by name.
///
/// Prefers the canonical name on PATH. When that's missing, falls back to
/// the newest versioned variant (ex. `clang-format-14.0` for
/// `clang-format`), which is how several distros install these tools.
pub fn resolve_command(canonical_name: &str) -> Option<PathBuf> {
  if let Ok(path) = which::which(canonical_name) {
    return Some(path);
  }
  let search_dirs: Vec<PathBuf> = std::env::var_os("PATH")
    .map(|path| std::env::split_paths(&path).collect())
    .unwrap_or_default();
  find_versioned_command(&search_dirs, canonical_name)
}

fn find_versioned_command(search_dirs: &[PathBuf], canonical_name: &str) -> Option<PathBuf> {
  let prefix = format!("{}-", canonical_name);
  let mut best: Option<((u32, u32), PathBuf)> = None;
  for dir in search_dirs {
    let Ok(entries) = std::fs::read_dir(dir) else {
      continue;
    };
    for entry in entries.flatten() {
      let file_name = entry.file_name();
      let Some(file_name) = file_name.to_str() else {
        continue;
      };
      let Some(suffix) = file_name.strip_prefix(&prefix) else {
        continue;
      };
      let Some(version) = parse_major_minor(suffix) else {
        continue;
      };
      if !entry.path().is_file() {
        continue;
      }
      if best.as_ref().map(|(best_version, _)| version > *best_version).unwrap_or(true) {
        best = Some((version, entry.path()));
      }
    }
  }
  best.map(|(_, path)| path)
}

fn parse_major_minor(text: &str) -> Option<(u32, u32)> {
  let (major, minor) = text.split_once('.')?;
  Some((major.parse().ok()?, minor.parse().ok()?))
}
