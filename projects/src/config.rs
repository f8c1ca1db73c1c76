use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_PROJECTS_PATH: &str = "src/headless/config/headless-config.json";

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    /// JSON file holding the project list
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            path: default_path(),
        }
    }
}

fn default_path() -> PathBuf {
    PathBuf::from(DEFAULT_PROJECTS_PATH)
}
