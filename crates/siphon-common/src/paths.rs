//! Input path normalization
//!
//! Source paths supplied on the command line may be absolute, relative to the
//! user's home directory (`~/...`), or relative to the current directory.
//! Everything downstream works with absolute paths.

use crate::error::{Result, SiphonError};
use std::path::{Path, PathBuf};

/// Normalize a user-supplied path into an absolute path.
pub fn normalize(input: &str) -> Result<PathBuf> {
    let path = Path::new(input);

    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    if let Some(rest) = input.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| SiphonError::config("Could not determine home directory"))?;
        return Ok(home.join(rest));
    }
    if input == "~" {
        return dirs::home_dir()
            .ok_or_else(|| SiphonError::config("Could not determine home directory"));
    }

    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path))
}
