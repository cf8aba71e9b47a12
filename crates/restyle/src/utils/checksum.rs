use std::hash::Hasher;

/// Gets a fingerprint of a file's content using the xxHash algorithm.
///
/// This is a very fast insecure hash. That's fine here because fingerprints
/// are only ever compared against a fingerprint of the same file taken
/// moments later in the same process.
pub fn content_fingerprint(bytes: &[u8]) -> u64 {
  let mut hasher = twox_hash::XxHash64::default();
  hasher.write(bytes);
  hasher.finish()
}
