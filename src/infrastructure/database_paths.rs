//! Default on-disk locations for the job database and session profiles

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR_NAME: &str = "prodcrawl";
const DATABASE_FILE_NAME: &str = "prodcrawl.db";

/// Platform data directory for the application, created on first use.
/// Falls back to `./data` when the platform reports no data directory.
pub fn app_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("./data"));
    let dir = base.join(APP_DIR_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create app data dir {}", dir.display()))?;
    Ok(dir)
}

/// sqlite URL for the default database location.
pub fn default_database_url() -> Result<String> {
    let path = app_data_dir()?.join(DATABASE_FILE_NAME);
    Ok(format!("sqlite:{}", path.display()))
}

/// Root directory under which per-session browser profiles are created.
/// Lives in the temp dir: profiles are throwaway by design.
pub fn default_profile_root() -> PathBuf {
    std::env::temp_dir().join(APP_DIR_NAME).join("profiles")
}
