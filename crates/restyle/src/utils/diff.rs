use std::path::Path;

use similar::TextDiff;

/// Gets a unified diff fragment between a file's current content and its
/// would-be formatted content, or `None` when the two match.
///
/// Both sides of the header carry the repository-relative path, prefixed
/// `a/` and `b/`, so fragments from many files can be concatenated into a
/// single patch that `patch -p1` or `git apply` accepts.
pub fn get_unified_diff(rel_path: &Path, original: &str, formatted: &str) -> Option<String> {
  if original == formatted {
    return None;
  }
  let rel_path = rel_path.to_string_lossy().replace('\\', "/");
  let diff = TextDiff::from_lines(original, formatted);
  let text = diff
    .unified_diff()
    .context_radius(3)
    .header(&format!("a/{}", rel_path), &format!("b/{}", rel_path))
    .to_string();
  Some(text)
}
