use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("sous");
            Some(state_dir.join("sous.log"))
        } else {
            ProjectDirs::from("", "", "sous")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("sous.log"))
        }
    }

    pub fn selection_cache_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sous")
            .map(|proj_dirs| proj_dirs.cache_dir().join("selected_recipe.json"))
    }
}
