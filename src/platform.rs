// Smart Bookmark platform paths
// Linux:   $XDG_CONFIG_HOME/smart-bookmark, $XDG_DATA_HOME/smart-bookmark
// macOS:   ~/Library/Application Support/Smart Bookmark
// Windows: %APPDATA%\Smart Bookmark

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    PathBuf::from(env::var(var).unwrap_or_else(|_| String::from("/tmp")))
}

/// Directory holding `settings.json`.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        home_dir().join("Library").join("Application Support").join("Smart Bookmark")
    }
    #[cfg(target_os = "windows")]
    {
        env::var("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
            .join("Smart Bookmark")
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_CONFIG_HOME", &[".config"])
    }
}

/// Directory holding the database.
pub fn get_data_dir() -> PathBuf {
    #[cfg(any(target_os = "macos", target_os = "windows"))]
    {
        get_config_dir()
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        xdg_dir("XDG_DATA_HOME", &[".local", "share"])
    }
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn xdg_dir(var: &str, fallback: &[&str]) -> PathBuf {
    match env::var(var) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join("smart-bookmark"),
        _ => fallback
            .iter()
            .fold(home_dir(), |path, part| path.join(part))
            .join("smart-bookmark"),
    }
}
