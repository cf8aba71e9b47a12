use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use indexmap::IndexSet;

use crate::backends::BackendCollection;
use crate::utils::Logger;
use crate::utils::get_lowercase_dotted_extension;
use crate::vcs;

/// Absolute directory prefixes that are pruned from enumeration.
///
/// Matching is component-wise, so excluding `src` never drops files under
/// `src2`. The VCS metadata directory is always excluded.
#[derive(Clone)]
pub struct ExclusionSet {
  prefixes: Vec<PathBuf>,
}

impl ExclusionSet {
  /// Builds the set from directories given relative to `root` or as
  /// absolute paths.
  pub fn new(root: &Path, dirs: &[String]) -> Self {
    let mut prefixes = vec![root.join(".git")];
    for dir in dirs {
      let dir = Path::new(dir);
      let absolute = if dir.is_absolute() { dir.to_path_buf() } else { root.join(dir) };
      prefixes.push(normalize(absolute));
    }
    ExclusionSet { prefixes }
  }

  pub fn contains(&self, absolute_path: &Path) -> bool {
    self.prefixes.iter().any(|prefix| absolute_path.starts_with(prefix))
  }
}

fn normalize(path: PathBuf) -> PathBuf {
  dunce::canonicalize(&path).unwrap_or(path)
}

/// Lazily walks `root`, yielding every file as a normalized path relative
/// to `root` (no leading `./`). Excluded directories are pruned before
/// descending into them. Unreadable entries are skipped.
///
/// The sequence is single-pass and non-restartable. Symlinks are not
/// followed and symlink cycles are not detected.
pub fn enumerate_all(root: &Path, exclude: &ExclusionSet) -> impl Iterator<Item = PathBuf> + use<> {
  let root = root.to_path_buf();
  let exclude = exclude.clone();
  let walker = ignore::WalkBuilder::new(&root)
    .standard_filters(false)
    .follow_links(false)
    .filter_entry(move |entry| {
      let is_dir = entry.file_type().map(|file_type| file_type.is_dir()).unwrap_or(false);
      !(is_dir && exclude.contains(entry.path()))
    })
    .build();
  walker.filter_map(move |entry| {
    let entry = entry.ok()?;
    if !entry.file_type()?.is_file() {
      return None;
    }
    Some(entry.path().strip_prefix(&root).ok()?.to_path_buf())
  })
}

/// Files that differ from the merge-base of HEAD and a diffbase revision.
pub struct ChangedFiles {
  /// Files that still exist on disk and are not excluded, relative to the
  /// run root. These become formatting candidates.
  pub candidates: Vec<PathBuf>,
  /// Every path git reported, unfiltered, relative to the repository root.
  /// Used to detect formatter config changes even when the config file
  /// itself was deleted or lives under an excluded directory.
  pub all_changed: Vec<PathBuf>,
}

/// Lists the files that differ between the merge-base of HEAD and
/// `diffbase` and the working tree, unioned with untracked files that git
/// does not ignore. Deleted and renamed-away files are skipped. Exclusion
/// applies uniformly to both the changed and the untracked lists.
///
/// The result is buffered from one-shot git commands and consumed once.
pub fn enumerate_changed(root: &Path, exclude: &ExclusionSet, diffbase: &str) -> Result<ChangedFiles> {
  let repo_root = vcs::repo_root(root)?;
  let repo_root = dunce::canonicalize(&repo_root).with_context(|| format!("Could not resolve repository root {}", repo_root.display()))?;
  let base = vcs::merge_base(root, "HEAD", diffbase)?;
  let mut reported = vcs::diff_name_only(root, &base)?;
  reported.extend(vcs::untracked_files(root)?);

  let mut candidates = Vec::new();
  let mut all_changed = Vec::new();
  for file in reported {
    let absolute_path = repo_root.join(&file);
    all_changed.push(PathBuf::from(file));
    // git reports files that were deleted or renamed since the base
    if !absolute_path.is_file() {
      continue;
    }
    if exclude.contains(&absolute_path) {
      continue;
    }
    let Ok(rel_path) = absolute_path.strip_prefix(root) else {
      // changed in the repository, but outside the directory being run on
      continue;
    };
    candidates.push(rel_path.to_path_buf());
  }
  Ok(ChangedFiles { candidates, all_changed })
}

/// Resolves the candidate file sequence for one run.
///
/// Full-scan mode returns the lazy tree walk. Incremental mode returns the
/// changed-file list, widened to every file of a backend whose style config
/// changed, deduplicated. A failing diff (unknown revision, no common
/// ancestor, not a repository) falls back to a full scan so a broken
/// diffbase never silently formats nothing.
pub fn resolve_candidates(
  root: &Path,
  exclude: &ExclusionSet,
  diffbase: Option<&str>,
  backends: &BackendCollection,
  logger: &Logger,
) -> Box<dyn Iterator<Item = PathBuf>> {
  let Some(diffbase) = diffbase else {
    return Box::new(enumerate_all(root, exclude));
  };
  match enumerate_changed(root, exclude, diffbase) {
    Ok(changed) => {
      let forced_extensions = backends.forced_extensions(&changed.all_changed);
      let mut candidates: IndexSet<PathBuf> = changed.candidates.into_iter().collect();
      if !forced_extensions.is_empty() {
        log_verbose!(
          logger,
          "Formatter config changed, so reformatting all files with extensions: {}",
          forced_extensions.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        for path in enumerate_all(root, exclude) {
          let matches_forced = get_lowercase_dotted_extension(&path)
            .map(|ext| forced_extensions.contains(&ext))
            .unwrap_or(false);
          if matches_forced {
            candidates.insert(path);
          }
        }
      }
      Box::new(candidates.into_iter())
    }
    Err(err) => {
      logger.log_stderr(&format!("Could not diff against {}: {:#}. Scanning all files instead.", diffbase, err));
      Box::new(enumerate_all(root, exclude))
    }
  }
}
