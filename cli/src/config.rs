use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const DB_FILE_NAME: &str = "macro_tracker.db";

pub struct Config {
    pub db_path: PathBuf,
}

impl Config {
    /// Use `db_override` (from `--db` or `MACRO_TRACKER_DB`) when given,
    /// otherwise the per-user data directory.
    pub fn load(db_override: Option<PathBuf>) -> Result<Self> {
        if let Some(db_path) = db_override {
            return Ok(Config { db_path });
        }

        let proj_dirs = ProjectDirs::from("", "", "macro-tracker")
            .context("Could not determine home directory")?;
        let db_path = proj_dirs.data_dir().join(DB_FILE_NAME);

        Ok(Config { db_path })
    }
}
