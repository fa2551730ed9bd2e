//! Application directory helpers anchored to a single `.course_rec` folder.
//!
//! Log files live under the OS config directory by default. Set
//! `COURSE_REC_HOME` to relocate them for tests or portable setups.

use std::{
    ffi::OsString,
    path::PathBuf,
    sync::{LazyLock, Mutex},
};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".course_rec";
/// Environment variable that overrides the base directory.
pub const HOME_ENV_VAR: &str = "COURSE_REC_HOME";

static BASE_OVERRIDE: LazyLock<Mutex<Option<PathBuf>>> = LazyLock::new(|| Mutex::new(None));

/// Errors that can occur while resolving or preparing application directories.
#[derive(Debug, Error)]
pub enum AppDirError {
    /// No suitable base config directory could be resolved.
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    /// Failed to create the application directory.
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Return the root `.course_rec` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = base_dir().ok_or(AppDirError::NoBaseDir)?;
    let path = base.join(APP_DIR_NAME);
    create_dir(&path)?;
    Ok(path)
}

/// Return the logs directory inside the app root, creating it if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    let path = app_root_dir()?.join("logs");
    create_dir(&path)?;
    Ok(path)
}

fn create_dir(path: &PathBuf) -> Result<(), AppDirError> {
    std::fs::create_dir_all(path).map_err(|source| AppDirError::CreateDir {
        path: path.clone(),
        source,
    })
}

fn base_dir() -> Option<PathBuf> {
    let override_path = BASE_OVERRIDE.lock().ok().and_then(|guard| guard.clone());
    resolve_base(override_path, std::env::var_os(HOME_ENV_VAR))
}

/// Precedence: in-process override, then `COURSE_REC_HOME` if non-empty, then the OS config dir.
fn resolve_base(override_path: Option<PathBuf>, home_env: Option<OsString>) -> Option<PathBuf> {
    if override_path.is_some() {
        return override_path;
    }
    if let Some(home) = home_env.filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(home));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
fn set_base_override(path: Option<PathBuf>) {
    let mut guard = BASE_OVERRIDE
        .lock()
        .expect("base override mutex poisoned");
    *guard = path;
}
