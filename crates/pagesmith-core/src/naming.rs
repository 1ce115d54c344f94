//! Unique repository names for first-round builds.
//!
//! `<safe-task>-<YYYYmmddHHMMSS>-<suffix>`: the timestamp and random suffix
//! keep concurrent requests for the same task from colliding on the
//! hosting account.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Longest task prefix kept in a repository name.
pub const MAX_TASK_PREFIX: usize = 30;
/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 4;
/// Upper bound on any derived name: prefix, two separators, timestamp, suffix.
pub const MAX_REPO_NAME_LEN: usize = MAX_TASK_PREFIX + 1 + 14 + 1 + SUFFIX_LEN;

const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const EMPTY_TASK_PREFIX: &str = "site";

/// Map every character a repository name cannot hold to `-` and truncate.
pub fn sanitize_task(task: &str) -> String {
    let safe: String = task
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_TASK_PREFIX)
        .collect();

    if safe.is_empty() {
        EMPTY_TASK_PREFIX.to_string()
    } else {
        safe
    }
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}

/// Derive a repository name from explicit inputs.
pub fn derive_repo_name_with<R: Rng + ?Sized>(
    task: &str,
    now: DateTime<Utc>,
    rng: &mut R,
) -> String {
    format!(
        "{}-{}-{}",
        sanitize_task(task),
        now.format("%Y%m%d%H%M%S"),
        random_suffix(rng)
    )
}

/// Derive a repository name using the current time and thread RNG.
pub fn derive_repo_name(task: &str) -> String {
    derive_repo_name_with(task, Utc::now(), &mut rand::thread_rng())
}
