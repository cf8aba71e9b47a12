use std::path::Path;

/// Gets the file's extension with the leading dot, lowercased.
pub fn get_lowercase_dotted_extension(path: &Path) -> Option<String> {
  path.extension().map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}
