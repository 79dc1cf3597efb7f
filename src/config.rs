//! Persisted command-line state.
//!
//! The folder of the last run is remembered in a tiny TOML file,
//! `.cache/tocscan.toml` by default, so the next prompt can offer it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const CACHE_DIR: &str = ".cache";
pub const STATE_FILE: &str = "tocscan.toml";

/// Default location of the state file.
pub fn default_state_path() -> PathBuf {
    Path::new(CACHE_DIR).join(STATE_FILE)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_folder: Option<String>,
}

impl CliState {
    /// Load state from `path`. A missing or unreadable file is empty state.
    pub fn load(path: &Path) -> Self {
        let Ok(data) = fs::read_to_string(path) else {
            return Self::default();
        };
        toml::from_str(&data).unwrap_or_else(|e| {
            debug!(path = %path.display(), error = %e, "ignoring corrupt state file");
            Self::default()
        })
    }

    /// Persist state to `path`. Failures are logged, never fatal.
    pub fn save(&self, path: &Path) {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "could not create state directory");
            return;
        }
        match toml::to_string(self) {
            Ok(contents) => {
                if let Err(e) = fs::write(path, contents) {
                    warn!(path = %path.display(), error = %e, "could not save state");
                }
            }
            Err(e) => warn!(error = %e, "could not serialize state"),
        }
    }

    /// The folder to use for an answer to the prompt: the answer itself,
    /// else the last folder, else the current directory.
    pub fn choose_folder(&self, answer: &str) -> String {
        let answer = answer.trim();
        if !answer.is_empty() {
            return answer.to_string();
        }
        self.last_folder
            .clone()
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| ".".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.toml");
        let state = CliState {
            last_folder: Some("/srv/books".into()),
        };
        state.save(&path);
        assert_eq!(CliState::load(&path), state);
        assert!(fs::read_to_string(&path).unwrap().contains("last_folder"));
    }

    #[test]
    fn test_save_into_unwritable_location_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "a file, not a directory").unwrap();
        let path = blocker.join("state.toml");

        let state = CliState {
            last_folder: Some("/srv/books".into()),
        };
        state.save(&path);
        assert!(!path.exists());
        assert_eq!(CliState::load(&path), CliState::default());
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "a file, not a directory");
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");
        assert_eq!(CliState::load(&path), CliState::default());

        fs::write(&path, "last_folder = [not toml").unwrap();
        assert_eq!(CliState::load(&path), CliState::default());
    }

    #[test]
    fn test_choose_folder() {
        let empty = CliState::default();
        assert_eq!(empty.choose_folder(""), ".");
        assert_eq!(empty.choose_folder("  ~/books \n"), "~/books");

        let remembered = CliState {
            last_folder: Some("/srv/books".into()),
        };
        assert_eq!(remembered.choose_folder(""), "/srv/books");
        assert_eq!(remembered.choose_folder("/tmp"), "/tmp");
    }
}
