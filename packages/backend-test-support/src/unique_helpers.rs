//! Test helpers for generating unique test data.
//!
//! Nicknames are capped at 24 characters by the backend, so these helpers
//! append only the random tail of a ULID.

use ulid::Ulid;

/// Generate a unique nickname with the given prefix.
///
/// The prefix is truncated to 15 characters so the result always fits the
/// nickname limit (`{prefix}-{8 random chars}`).
///
/// # Examples
/// ```
/// use backend_test_support::unique_helpers::unique_nickname;
///
/// let a = unique_nickname("alice");
/// let b = unique_nickname("alice");
/// assert_ne!(a, b);
/// assert!(a.starts_with("alice-"));
/// assert!(a.len() <= 24);
/// ```
pub fn unique_nickname(prefix: &str) -> String {
    let prefix: String = prefix.chars().take(15).collect();
    let ulid = Ulid::new().to_string();
    format!("{}-{}", prefix, &ulid[ulid.len() - 8..])
}

/// Generate a batch of distinct nicknames sharing a prefix.
pub fn unique_nicknames(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| unique_nickname(&format!("{prefix}{i}")))
        .collect()
}
