/*++

Licensed under the Apache-2.0 license.

File Name:

   config.rs

Abstract:

    File contains utilities for parsing configuration files

--*/

use anyhow::{bail, Context};
use boot0_image_types::LayoutCarrier;
use boot0_image_verify::SignatureMode;
use serde_derive::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_mode() -> String {
    "pss".into()
}

fn default_len() -> u32 {
    32
}

fn default_salt_len() -> u8 {
    32
}

/// Policy Configuration
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct PolicyConfig {
    pub public_key: Option<String>,

    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub stage8: bool,

    #[serde(default)]
    pub copy_digest: bool,

    #[serde(default = "default_len")]
    pub token_len: u32,

    #[serde(default = "default_salt_len")]
    pub salt_len: u8,

    /// Hex digest compared when stage 8 is disabled
    pub expected_digest: Option<String>,
}

impl PolicyConfig {
    pub fn signature_mode(&self) -> anyhow::Result<SignatureMode> {
        match self.mode.as_str() {
            "pss" => Ok(SignatureMode::RsaPssSha256),
            "pkcs1v15" => Ok(SignatureMode::RsaPkcs1v15Sha256),
            other => bail!("Unknown signature mode \"{other}\""),
        }
    }
}

/// Signing Configuration
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SigningConfig {
    pub private_key: String,
}

// Image Configuration
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Boot0Config {
    pub policy: PolicyConfig,

    #[serde(default)]
    pub carrier: LayoutCarrier,

    pub signing: Option<SigningConfig>,

    #[serde(skip)]
    pub dir: PathBuf,
}

impl Boot0Config {
    /// Resolve a path relative to the configuration file.
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

/// Load Configuration from file
pub(crate) fn load_config(path: &Path) -> anyhow::Result<Boot0Config> {
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read the config file {}", path.display()))?;

    let mut config = parse_config(&config_str)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    Ok(config)
}

fn parse_config(config_str: &str) -> anyhow::Result<Boot0Config> {
    let config: Boot0Config = toml::from_str(config_str)?;
    config.policy.signature_mode()?;
    Ok(config)
}
