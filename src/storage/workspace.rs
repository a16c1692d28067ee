//! Workspace resolution
//!
//! Resolves where the config file and the blog directory live, and hands
//! out the stores built on them.

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::BaseDirs;

use super::{Config, ConfigError, LocalStore};

/// Directory name of the blog folder under the home directory
const BLOG_DIR_NAME: &str = "blogs";

/// Paths used by one invocation of the tool
#[derive(Debug, Clone)]
pub struct Workspace {
    config_path: PathBuf,
    blog_dir: PathBuf,
}

impl Workspace {
    /// Creates a workspace from explicit paths
    pub fn new(config_path: impl Into<PathBuf>, blog_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            blog_dir: blog_dir.into(),
        }
    }

    /// Resolves paths, falling back to the per-user defaults
    pub fn resolve(config_path: Option<PathBuf>, blog_dir: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => Config::default_path().ok_or(ConfigError::NoHome)?,
        };

        let blog_dir = match blog_dir {
            Some(dir) => dir,
            None => Self::default_blog_dir().ok_or(ConfigError::NoHome)?,
        };

        Ok(Self::new(config_path, blog_dir))
    }

    /// Returns the default blog directory (`~/blogs`)
    pub fn default_blog_dir() -> Option<PathBuf> {
        BaseDirs::new().map(|dirs| dirs.home_dir().join(BLOG_DIR_NAME))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn blog_dir(&self) -> &Path {
        &self.blog_dir
    }

    /// Returns the local document store
    pub fn local_store(&self) -> LocalStore {
        LocalStore::new(&self.blog_dir)
    }

    /// Loads the config file if present
    pub fn config(&self) -> Result<Option<Config>> {
        Config::load(&self.config_path)
    }

    /// Loads the config file, failing unless a database is configured
    pub fn require_config(&self) -> Result<Config> {
        Config::load_required(&self.config_path)
    }
}
