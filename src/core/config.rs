use crate::constants;
use crate::models::config::PickConfig;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Load the config file; a missing file means defaults.
pub fn load(path: &Path) -> Result<PickConfig> {
    if !path.exists() {
        return Ok(PickConfig::default());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let config: PickConfig =
        toml::from_str(&content).with_context(|| format!("parse config {}", path.display()))?;
    validate(&config).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn validate(config: &PickConfig) -> Result<()> {
    if let Err(msg) = config.kdf.validate() {
        bail!("[kdf] {}", msg);
    }
    if config.generator.length == 0 {
        bail!("[generator] length must be at least 1");
    }
    if config.generator.length > constants::MAX_GENERATED_LENGTH {
        bail!(
            "[generator] length {} exceeds maximum {}",
            config.generator.length,
            constants::MAX_GENERATED_LENGTH
        );
    }
    Ok(())
}
