//! Home directory expansion for user supplied paths.

use std::ffi::OsStr;
use std::path::PathBuf;

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;

/// Expands a leading `~` or `~/` against `$HOME`. Other paths, including
/// `~user/...`, are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    expand_home_with(path, std::env::var_os("HOME").as_deref())
}

fn expand_home_with(path: &str, home: Option<&OsStr>) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return PathBuf::from(path),
    };

    match home {
        Some(home) => PathBuf::from(home).join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    }
}
