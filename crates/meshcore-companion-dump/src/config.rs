//! Loading the protocol configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use meshcore_companion::ProtocolConfig;
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Load a configuration file, or the defaults when no path is given.
pub fn load(path: Option<&Path>) -> Result<ProtocolConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(ProtocolConfig::default());
    };

    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse(&text).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded config from {}", path.display());
    Ok(config)
}

fn parse(text: &str) -> Result<ProtocolConfig, serde_yaml::Error> {
    // An empty file deserializes as null rather than an empty mapping.
    if text.trim().is_empty() {
        return Ok(ProtocolConfig::default());
    }
    serde_yaml::from_str(text)
}
