use std::io::Write;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;

use crate::arg_parser::RunArgs;
use crate::backends::BackendCollection;
use crate::backends::RunOptions;
use crate::configuration::ResolvedConfig;
use crate::format::PatchFragment;
use crate::format::RunSummary;
use crate::format::run_parallelized;
use crate::paths::ExclusionSet;
use crate::paths::resolve_candidates;
use crate::utils::Logger;

/// Verifies compliance without touching any file. Returns how many files
/// need formatting so the driver can turn that into an exit code.
pub async fn check(
  cmd: &RunArgs,
  config: &ResolvedConfig,
  backends: &BackendCollection,
  root: &Path,
  logger: &Logger,
) -> Result<usize> {
  let options = RunOptions {
    check_only: true,
    want_patch: cmd.output_patch_file.is_some(),
  };
  let summary = run_for_candidates(cmd, options, config, backends, root, logger).await?;
  logger.log(&format!("[{} / {}] files need formatting", summary.changed, summary.scanned));

  if let Some(patch_path) = &cmd.output_patch_file {
    if summary.changed > 0 {
      write_patch(patch_path, &summary.patches, logger)?;
    } else {
      logger.log_stderr("No patch written since every file is already formatted.");
    }
  }
  Ok(summary.changed)
}

/// Rewrites non-compliant files in place.
pub async fn format(
  cmd: &RunArgs,
  config: &ResolvedConfig,
  backends: &BackendCollection,
  root: &Path,
  logger: &Logger,
) -> Result<()> {
  let options = RunOptions {
    check_only: false,
    want_patch: false,
  };
  let summary = run_for_candidates(cmd, options, config, backends, root, logger).await?;
  logger.log(&format!("[{} / {}] files formatted", summary.changed, summary.scanned));
  Ok(())
}

async fn run_for_candidates(
  cmd: &RunArgs,
  options: RunOptions,
  config: &ResolvedConfig,
  backends: &BackendCollection,
  root: &Path,
  logger: &Logger,
) -> Result<RunSummary> {
  let verb = if options.check_only { "Checking" } else { "Formatting" };
  match &cmd.diffbase {
    Some(diffbase) => logger.log_stderr(&format!("{} files that differ from {}...", verb, diffbase)),
    None => logger.log_stderr(&format!("{} all C/C++ and Python files under {}...", verb, root.display())),
  }

  let mut exclude_dirs = config.exclude_dirs.clone();
  exclude_dirs.extend(cmd.exclude_dirs.iter().cloned());
  let exclude = ExclusionSet::new(root, &exclude_dirs);
  let candidates = resolve_candidates(root, &exclude, cmd.diffbase.as_deref(), backends, logger);
  let max_jobs = cmd.jobs.unwrap_or_else(default_parallelism);
  log_verbose!(logger, "Processing up to {} files in parallel", max_jobs);
  run_parallelized(candidates, root, backends, options, max_jobs, logger).await
}

fn default_parallelism() -> usize {
  std::thread::available_parallelism().map(|count| count.get()).unwrap_or(4)
}

fn write_patch(path: &str, patches: &[PatchFragment], logger: &Logger) -> Result<()> {
  let mut text = String::new();
  for fragment in patches {
    text.push_str(&fragment.diff);
  }
  if path == "-" {
    std::io::stdout().write_all(text.as_bytes()).context("Error writing patch to stdout")?;
  } else {
    std::fs::write(path, &text).with_context(|| format!("Error writing patch file {}", path))?;
    logger.log_stderr(&format!("Wrote patch to {}", path));
  }
  Ok(())
}
