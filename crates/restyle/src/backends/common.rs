use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;

use crate::utils::content_fingerprint;
use crate::utils::get_unified_diff;
use crate::utils::run_command;

use super::RunOptions;
use super::RunResult;

/// One external formatter invocation, fully described by the backend.
pub(crate) struct ExternalInvocation<'a> {
  pub command: &'a Path,
  /// Arguments that make the tool print the formatted file to stdout.
  pub check_args: Vec<OsString>,
  /// Arguments that make the tool rewrite the file on disk.
  pub in_place_args: Vec<OsString>,
  pub check_exit_codes: &'a [i32],
  pub in_place_exit_codes: &'a [i32],
  pub timeout: Duration,
}

/// Runs one file through an external formatter.
///
/// Check mode captures the would-be formatted content from the tool's
/// stdout and never touches the original. In-place mode fingerprints the
/// file before and after the tool runs, since formatters commonly exit
/// zero whether or not they modified anything.
pub(crate) async fn run_external(
  invocation: ExternalInvocation<'_>,
  path: &Path,
  rel_path: &Path,
  options: RunOptions,
) -> Result<RunResult> {
  if options.check_only {
    let original = tokio::fs::read(path).await.with_context(|| format!("Could not read {}", path.display()))?;
    let output = run_command(invocation.command, &invocation.check_args, invocation.timeout, invocation.check_exit_codes).await?;
    if output.stdout == original {
      return Ok(RunResult {
        needed_format: false,
        patch: None,
      });
    }
    let patch = if options.want_patch {
      get_unified_diff(
        rel_path,
        &String::from_utf8_lossy(&original),
        &String::from_utf8_lossy(&output.stdout),
      )
    } else {
      None
    };
    Ok(RunResult {
      needed_format: true,
      patch,
    })
  } else {
    let before = fingerprint_file(path).await?;
    run_command(invocation.command, &invocation.in_place_args, invocation.timeout, invocation.in_place_exit_codes).await?;
    let after = fingerprint_file(path).await?;
    Ok(RunResult {
      needed_format: before != after,
      patch: None,
    })
  }
}

async fn fingerprint_file(path: &Path) -> Result<u64> {
  let bytes = tokio::fs::read(path).await.with_context(|| format!("Could not read {}", path.display()))?;
  Ok(content_fingerprint(&bytes))
}
