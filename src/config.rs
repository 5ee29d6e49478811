// Copyright 2023-5 Seth Pendergrass. See LICENSE.

//! Session configuration, persisted as JSON under `XDG_CONFIG_HOME`.
//!
//! A missing or unreadable file yields the defaults; a malformed file is
//! reported but never fatal.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const CONFIG_PREFIX: &str = "geotag";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
  /// IANA zone used when a photo has no offset of its own.
  pub default_timezone:     Option<String>,
  /// Minimum confidence for visual-similarity location candidates.
  pub similarity_threshold: f64,
  pub cache_dir:            Option<PathBuf>,
  /// When false, `ExifTool` overwrites files in place.
  pub create_backups:       bool,
  pub last_directory:       Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      default_timezone:     None,
      similarity_threshold: 0.85,
      cache_dir:            None,
      create_backups:       true,
      last_directory:       None,
    }
  }
}

impl Config {
  /// Loads the config, falling back to defaults when absent or unreadable.
  #[must_use]
  pub fn load() -> Self {
    let Some(path) = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX).find_config_file(CONFIG_FILE)
    else {
      return Self::default();
    };

    match fs::read(&path) {
      Ok(bytes) => match serde_json::from_slice(&bytes) {
        Ok(config) => config,
        Err(e) => {
          log::warn!("{}: malformed config, using defaults ({e})", path.display());
          Self::default()
        }
      },
      Err(e) => {
        log::warn!("{}: unreadable config, using defaults ({e})", path.display());
        Self::default()
      }
    }
  }

  pub fn save(&self) -> Result<(), Error> {
    let path = xdg::BaseDirectories::with_prefix(CONFIG_PREFIX)
      .place_config_file(CONFIG_FILE)
      .map_err(|e| Error::Session(format!("cannot place config file ({e})")))?;

    let json = serde_json::to_string_pretty(self)
      .map_err(|e| Error::Session(format!("cannot serialize config ({e})")))?;
    fs::write(&path, json)
      .map_err(|e| Error::Session(format!("{}: cannot write config ({e})", path.display())))
  }
}
