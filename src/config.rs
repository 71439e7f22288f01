// Runtime configuration

use std::path::PathBuf;

/// Where the store lives and whether the change observer runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_path: PathBuf,
    pub live: bool,
}

impl Config {
    pub fn new(store_path: Option<PathBuf>, live: bool) -> Self {
        Self {
            store_path: store_path.unwrap_or_else(Self::default_store_path),
            live,
        }
    }

    /// `{data_local_dir}/todostore`, or `./.todostore` without a data dir
    pub fn default_store_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("todostore"))
            .unwrap_or_else(|| PathBuf::from(".todostore"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(None, false)
    }
}
