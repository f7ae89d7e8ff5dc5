//! CLI configuration from `mosaic.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// Configuration file name looked up in the working directory.
pub const CONFIG_FILE: &str = "mosaic.toml";

/// Optional configuration merged under command-line flags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MosaicConfig {
    /// Tile repo directory.
    pub repo: Option<PathBuf>,
    /// Output directory for synthesized templates.
    pub out_dir: Option<PathBuf>,
    /// Fallback deploy target account.
    pub account: Option<String>,
    /// Fallback deploy target region.
    pub region: Option<String>,
}

impl MosaicConfig {
    /// Load `mosaic.toml` from a directory; absent file is an empty
    /// configuration, a malformed one is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        debug!("Loading configuration from {:?}", path);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: MosaicConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Deploy target from the process environment, with this
    /// configuration as the fallback.
    pub fn environment(&self) -> mosaic_synth::Environment {
        let mut env = mosaic_synth::Environment::from_env();
        if env.account.is_none() {
            env.account = self.account.clone();
        }
        if env.region.is_none() {
            env.region = self.region.clone();
        }
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_empty() {
        let temp = tempfile::tempdir().unwrap();
        let config = MosaicConfig::load(temp.path()).unwrap();
        assert!(config.repo.is_none());
    }

    #[test]
    fn test_load_config() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "repo = \"tiles\"\nregion = \"eu-west-1\"\n",
        )
        .unwrap();

        let config = MosaicConfig::load(temp.path()).unwrap();
        assert_eq!(config.repo.as_deref(), Some(Path::new("tiles")));
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "repo = [").unwrap();
        assert!(MosaicConfig::load(temp.path()).is_err());
    }
}
