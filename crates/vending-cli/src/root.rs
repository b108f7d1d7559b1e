use std::path::{Path, PathBuf};

use vending_core::config::{expand_home, DEFAULT_CONFIG_FILE};

/// Resolve the config file to use.
///
/// Priority:
/// 1. `--config` flag / `VENDING_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `vending.yaml`
/// 3. Fall back to `vending.yaml` in `cwd`
pub fn resolve_config(explicit: Option<&str>) -> PathBuf {
    if let Some(p) = explicit {
        return expand_home(p);
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_upward(&cwd, DEFAULT_CONFIG_FILE).unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_FILE))
}

fn find_upward(start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        match dir.parent() {
            Some(p) => dir = p.to_path_buf(),
            None => return None,
        }
    }
}
