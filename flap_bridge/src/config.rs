//! Bridge configuration: one TOML file with three optional sections.
//!
//! ```toml
//! [tuning]
//! preset = "norma"
//! cooldown_ms = 220
//!
//! [link]
//! port = "/dev/ttyACM1"
//! expect_reply = true
//!
//! [scene]
//! obstacles = [[2, 3], [6, 1]]
//! player = "0000002559"
//! ```

use std::path::Path;

use flap_detect::{Tuning, TuningError};
use led_serial::{CommandError, LinkConfig, MatrixCursor, MatrixScene, Rgbi, DEFAULT_SIZE};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("[tuning]: {0}")]
    Tuning(#[from] TuningError),
    #[error("[scene] {key}: {source}")]
    Color {
        key: &'static str,
        #[source]
        source: CommandError,
    },
    #[error("section [{0}] must be a table")]
    NotATable(String),
}

/// Board layout and colours.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub rows:      u8,
    pub cols:      u8,
    pub obstacles: Vec<(u8, u8)>,
    /// `RRRGGGBBBI`
    pub player:    String,
    pub obstacle:  String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            rows:      DEFAULT_SIZE,
            cols:      DEFAULT_SIZE,
            obstacles: vec![(5, 5), (7, 7)],
            player:    Rgbi::PLAYER.to_string(),
            obstacle:  Rgbi::OBSTACLE.to_string(),
        }
    }
}

impl SceneConfig {
    pub fn build(&self) -> Result<MatrixScene, ConfigError> {
        let player: Rgbi = self.player.parse()
            .map_err(|source| ConfigError::Color { key: "player", source })?;
        let obstacle: Rgbi = self.obstacle.parse()
            .map_err(|source| ConfigError::Color { key: "obstacle", source })?;
        Ok(MatrixScene::new(
            MatrixCursor::new(self.rows, self.cols),
            self.obstacles.clone(),
            player,
            obstacle,
        ))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BridgeConfig {
    pub tuning: Tuning,
    pub link:   LinkConfig,
    pub scene:  SceneConfig,
}

impl BridgeConfig {
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let mut root: toml::Table = toml::from_str(src)?;
        let mut cfg = BridgeConfig::default();

        if let Some(v) = root.remove("tuning") {
            cfg.tuning = Tuning::from_table(into_table("tuning", v)?)?;
        }
        if let Some(v) = root.remove("link") {
            cfg.link = toml::Value::Table(into_table("link", v)?).try_into()?;
        }
        if let Some(v) = root.remove("scene") {
            cfg.scene = toml::Value::Table(into_table("scene", v)?).try_into()?;
            cfg.scene.build()?;
        }
        for key in root.keys() {
            tracing::warn!(key = %key, "ignoring unknown config key");
        }
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let cfg = Self::from_toml_str(&src)?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }
}

fn into_table(name: &str, v: toml::Value) -> Result<toml::Table, ConfigError> {
    match v {
        toml::Value::Table(t) => Ok(t),
        _ => Err(ConfigError::NotATable(name.to_string())),
    }
}
