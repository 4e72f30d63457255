use directories::ProjectDirs;
use std::path::PathBuf;

const APP: &str = "molelog";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home).join(".local").join("state").join(APP);
            Some(state_dir.join("logs.db"))
        } else {
            ProjectDirs::from("", "", APP).map(|dirs| dirs.data_local_dir().join("logs.db"))
        }
    }

    pub fn config_path() -> PathBuf {
        ProjectDirs::from("", "", APP)
            .map(|dirs| dirs.config_dir().join("config.json"))
            .unwrap_or_else(|| PathBuf::from("molelog_config.json"))
    }
}
