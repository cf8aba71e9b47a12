use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use anyhow::Result;
use anyhow::bail;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::backends::BackendCollection;
use crate::backends::RunOptions;
use crate::utils::ErrorCountLogger;
use crate::utils::Logger;

/// A per-file unified diff destined for the combined patch.
pub struct PatchFragment {
  pub rel_path: PathBuf,
  pub diff: String,
}

/// Shared tallies for one run. Created fresh per invocation and mutated
/// only through this type, under atomics for the counters and a single
/// mutex for the patch buffer.
struct AggregateStats {
  scanned: AtomicUsize,
  changed: AtomicUsize,
  patches: Mutex<Vec<PatchFragment>>,
}

impl AggregateStats {
  fn new() -> Self {
    AggregateStats {
      scanned: AtomicUsize::new(0),
      changed: AtomicUsize::new(0),
      patches: Mutex::new(Vec::new()),
    }
  }

  fn inc_scanned(&self) -> usize {
    self.scanned.fetch_add(1, Ordering::SeqCst) + 1
  }

  fn inc_changed(&self) {
    self.changed.fetch_add(1, Ordering::SeqCst);
  }

  fn add_patch(&self, fragment: PatchFragment) {
    self.patches.lock().push(fragment);
  }

  /// Fragments in path order so patch output is deterministic regardless
  /// of task completion order.
  fn take_sorted_patches(&self) -> Vec<PatchFragment> {
    let mut patches = std::mem::take(&mut *self.patches.lock());
    patches.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    patches
  }
}

/// Outcome of one run across all candidate files.
pub struct RunSummary {
  pub scanned: usize,
  pub changed: usize,
  pub patches: Vec<PatchFragment>,
}

/// Routes every candidate to its backend and runs the backends
/// concurrently, one task per file, bounded by `max_jobs`.
///
/// Files no backend claims are skipped silently. A failing task logs the
/// error and stops the intake of new work; tasks already in flight run to
/// completion, then the whole run reports failure.
pub async fn run_parallelized(
  candidates: Box<dyn Iterator<Item = PathBuf>>,
  root: &Path,
  backends: &BackendCollection,
  options: RunOptions,
  max_jobs: usize,
  logger: &Logger,
) -> Result<RunSummary> {
  let stats = Arc::new(AggregateStats::new());
  let error_logger = ErrorCountLogger::from_logger(logger);
  let token = CancellationToken::new();
  let semaphore = Arc::new(Semaphore::new(max_jobs.max(1)));
  let mut handles = Vec::new();

  for rel_path in candidates {
    if token.is_cancelled() {
      break;
    }
    let Some(backend) = backends.for_path(&rel_path) else {
      continue;
    };
    let backend = backend.clone();
    // acquiring before spawning keeps enumeration lazy: the candidate
    // sequence is only consumed as fast as workers free up
    let permit = semaphore.clone().acquire_owned().await?;
    let stats = stats.clone();
    let error_logger = error_logger.clone();
    let logger = logger.clone();
    let token = token.clone();
    let path = root.join(&rel_path);
    handles.push(tokio::spawn(async move {
      let _permit = permit;
      if token.is_cancelled() {
        return;
      }
      let scanned = stats.inc_scanned();
      match backend.run(&path, &rel_path, options).await {
        Ok(result) => {
          if result.needed_format {
            stats.inc_changed();
            if options.check_only {
              logger.log_stderr(&format!("Needs formatting: {}", rel_path.display()));
            } else {
              logger.log_stderr(&format!("Formatted: {}", rel_path.display()));
            }
          } else {
            logger.log_transient(&format!("Checked {} [{}]", rel_path.display(), scanned));
          }
          if let Some(diff) = result.patch {
            stats.add_patch(PatchFragment { rel_path, diff });
          }
        }
        Err(err) => {
          let verb = if options.check_only { "checking" } else { "formatting" };
          error_logger.log_error(&format!("Error {} {}. Message: {:#}", verb, rel_path.display(), err));
          token.cancel();
        }
      }
    }));
  }

  for handle in handles {
    handle.await?;
  }

  let error_count = error_logger.get_error_count();
  if error_count > 0 {
    bail!("Had {} error{} formatting.", error_count, if error_count == 1 { "" } else { "s" });
  }

  Ok(RunSummary {
    scanned: stats.scanned.load(Ordering::SeqCst),
    changed: stats.changed.load(Ordering::SeqCst),
    patches: stats.take_sorted_patches(),
  })
}

#[cfg(test)]
mod test {
  use pretty_assertions::assert_eq;

  use crate::test_helpers::test_backends;
  use crate::test_helpers::test_logger;

  use super::*;

  fn candidates_from(names: &[&str]) -> Box<dyn Iterator<Item = PathBuf>> {
    Box::new(names.iter().map(PathBuf::from).collect::<Vec<_>>().into_iter())
  }

  const CHECK: RunOptions = RunOptions {
    check_only: true,
    want_patch: false,
  };
  const CHECK_WITH_PATCH: RunOptions = RunOptions {
    check_only: true,
    want_patch: true,
  };
  const FORMAT: RunOptions = RunOptions {
    check_only: false,
    want_patch: false,
  };

  #[tokio::test]
  async fn counts_are_exact_for_any_worker_pool_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut names = Vec::new();
    for i in 0..15 {
      let name = format!("messy{}.txt", i);
      std::fs::write(dir.path().join(&name), "text  \n").unwrap();
      names.push(name);
    }
    for i in 0..15 {
      let name = format!("clean{}.txt", i);
      std::fs::write(dir.path().join(&name), "text\n").unwrap();
      names.push(name);
    }
    for i in 0..5 {
      let name = format!("other{}.rs", i);
      std::fs::write(dir.path().join(&name), "fn main() {}\n").unwrap();
      names.push(name);
    }

    let backends = test_backends();
    let logger = test_logger();
    for max_jobs in [1, 4, 16] {
      let names: Vec<&str> = names.iter().map(|name| name.as_str()).collect();
      let summary = run_parallelized(candidates_from(&names), dir.path(), &backends, CHECK, max_jobs, &logger)
        .await
        .unwrap();
      assert_eq!(summary.scanned, 30);
      assert_eq!(summary.changed, 15);
    }
  }

  #[tokio::test]
  async fn formatting_then_checking_reports_clean() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "text  \n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "text\n").unwrap();

    let backends = test_backends();
    let logger = test_logger();
    let summary = run_parallelized(candidates_from(&["a.txt", "b.txt"]), dir.path(), &backends, FORMAT, 4, &logger)
      .await
      .unwrap();
    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.changed, 1);
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "text\n");

    let summary = run_parallelized(candidates_from(&["a.txt", "b.txt"]), dir.path(), &backends, CHECK, 4, &logger)
      .await
      .unwrap();
    assert_eq!(summary.changed, 0);
  }

  #[tokio::test]
  async fn check_mode_leaves_files_untouched() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "text  \n").unwrap();

    let backends = test_backends();
    let logger = test_logger();
    let summary = run_parallelized(candidates_from(&["a.txt"]), dir.path(), &backends, CHECK, 4, &logger)
      .await
      .unwrap();
    assert_eq!(summary.changed, 1);
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "text  \n");
  }

  #[tokio::test]
  async fn patch_fragments_are_sorted_and_only_for_changed_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("c.txt"), "c  \n").unwrap();
    std::fs::write(dir.path().join("a.txt"), "a  \n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "b\n").unwrap();

    let backends = test_backends();
    let logger = test_logger();
    let summary = run_parallelized(
      candidates_from(&["c.txt", "a.txt", "b.txt"]),
      dir.path(),
      &backends,
      CHECK_WITH_PATCH,
      4,
      &logger,
    )
    .await
    .unwrap();
    assert_eq!(summary.changed, 2);
    let paths: Vec<_> = summary.patches.iter().map(|fragment| fragment.rel_path.clone()).collect();
    assert_eq!(paths, vec![PathBuf::from("a.txt"), PathBuf::from("c.txt")]);
    assert!(summary.patches[0].diff.starts_with("--- a/a.txt\n"));
  }

  #[tokio::test]
  async fn unrecognized_extensions_are_skipped_silently() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();
    std::fs::write(dir.path().join("b"), "no extension\n").unwrap();

    let backends = test_backends();
    let logger = test_logger();
    let summary = run_parallelized(candidates_from(&["a.rs", "b"]), dir.path(), &backends, CHECK, 4, &logger)
      .await
      .unwrap();
    assert_eq!(summary.scanned, 0);
    assert_eq!(summary.changed, 0);
  }

  #[tokio::test]
  async fn backend_error_fails_the_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.txt"), "text\n").unwrap();
    std::fs::write(dir.path().join("bad.txt"), "should_error\n").unwrap();

    let backends = test_backends();
    let logger = test_logger();
    let err = run_parallelized(candidates_from(&["good.txt", "bad.txt"]), dir.path(), &backends, FORMAT, 2, &logger)
      .await
      .err()
      .unwrap();
    assert_eq!(err.to_string(), "Had 1 error formatting.");
  }

  #[tokio::test]
  async fn missing_file_is_a_per_file_error() {
    let dir = tempfile::tempdir().unwrap();
    let backends = test_backends();
    let logger = test_logger();
    let err = run_parallelized(candidates_from(&["nope.txt"]), dir.path(), &backends, CHECK, 2, &logger)
      .await
      .err()
      .unwrap();
    assert!(err.to_string().contains("Had 1 error"));
  }
}
