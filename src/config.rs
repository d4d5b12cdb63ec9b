use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

const APP_DIR: &str = "photo-puzzle";
const PREFERENCES_FILE: &str = "preferences.yaml";

/// Runtime configuration, loaded from an optional YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Number of random legal moves applied when a puzzle is generated.
    #[serde(default = "Configuration::default_shuffle_moves")]
    pub shuffle_moves: usize,
    /// Accept `.gif` files in addition to jpeg and png.
    #[serde(default)]
    pub include_gif: bool,
    /// Optional deterministic seed for the candidate image order.
    #[serde(default)]
    pub startup_shuffle_seed: Option<u64>,
    /// Optional deterministic seed for puzzle shuffles.
    #[serde(default)]
    pub puzzle_seed: Option<u64>,
    /// Where the remembered directory is stored. Defaults to the user config dir.
    #[serde(default)]
    pub preferences_path: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            shuffle_moves: Self::default_shuffle_moves(),
            include_gif: false,
            startup_shuffle_seed: None,
            puzzle_seed: None,
            preferences_path: None,
        }
    }
}

impl Configuration {
    const fn default_shuffle_moves() -> usize {
        crate::puzzle::SHUFFLE_MOVES
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.shuffle_moves > 0,
            "shuffle-moves must be greater than zero"
        );
        if let Some(path) = &self.preferences_path {
            ensure!(
                path.file_name().is_some(),
                "preferences-path must include a file name"
            );
        }
        Ok(self)
    }

    /// Extensions (lowercase, without dot) accepted by the image source.
    pub fn image_extensions(&self) -> &'static [&'static str] {
        if self.include_gif {
            &["jpg", "jpeg", "png", "gif"]
        } else {
            &["jpg", "jpeg", "png"]
        }
    }

    /// Resolve the preference file location.
    pub fn resolved_preferences_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.preferences_path {
            return Ok(path.clone());
        }
        dirs::config_dir()
            .map(|mut path| {
                path.push(APP_DIR);
                path.push(PREFERENCES_FILE);
                path
            })
            .context("no user configuration directory; set preferences-path")
    }
}
