use std::path::PathBuf;

pub const CONTENT_DIR_VAR: &str = "GRAMMAR_CONTENT_DIR";
pub const DATA_DIR_VAR: &str = "GRAMMAR_DATA_DIR";

const DEFAULT_CONTENT_DIR: &str = "./content";
const DEFAULT_DATA_DIR: &str = "./data";
const DATABASE_FILE: &str = "progress.sqlite3";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Directory of section files, one JSON file per section.
    pub content_dir: PathBuf,
    /// Directory holding the progress database.
    pub data_dir: PathBuf,
}

impl Config {
    /// Read the configuration from the process environment (after `.env` has been loaded).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let dir = |name: &str, default: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };
        Self {
            content_dir: dir(CONTENT_DIR_VAR, DEFAULT_CONTENT_DIR),
            data_dir: dir(DATA_DIR_VAR, DEFAULT_DATA_DIR),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    /// Command-line flags win over the environment.
    pub fn with_overrides(mut self, content_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = content_dir {
            self.content_dir = dir;
        }
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.content_dir, PathBuf::from("./content"));
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_environment_and_overrides() {
        let config = Config::from_lookup(|name| match name {
            CONTENT_DIR_VAR => Some("/srv/content".to_string()),
            DATA_DIR_VAR => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.content_dir, PathBuf::from("/srv/content"));
        assert_eq!(config.data_dir, PathBuf::from("./data"));

        let config = config.with_overrides(None, Some(PathBuf::from("/tmp/learners")));
        assert_eq!(config.content_dir, PathBuf::from("/srv/content"));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/learners"));
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/learners/progress.sqlite3")
        );
    }
}
