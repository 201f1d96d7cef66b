use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::channel::TransportMode;
use crate::error::{RpcError, RpcResult};
use crate::framing::DEFAULT_MAX_MESSAGE_BYTES;
use crate::message::{Target, TargetName};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    transport: TransportConfig,
    #[serde(default)]
    sequencer: SequencerConfig,
}

#[derive(Deserialize, Default)]
struct TransportConfig {
    mode: Option<TransportMode>,
    max_message_bytes: Option<usize>,
}

#[derive(Deserialize, Default)]
struct SequencerConfig {
    target: Option<String>,
}

/// Bridge settings: embedded defaults overlaid with an optional user file.
pub struct RpcConfig {
    transport: TransportConfig,
    sequencer: SequencerConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        let base = toml::from_str::<ConfigFile>(DEFAULT_CONFIG).unwrap_or_else(|e| {
            log::error!(target: "rpc::config", "embedded config.toml is malformed: {}", e);
            ConfigFile::default()
        });
        Self {
            transport: base.transport,
            sequencer: base.sequencer,
        }
    }
}

impl RpcConfig {
    /// Defaults merged with `<config_dir>/seqlink/config.toml`, if present.
    pub fn load() -> Self {
        match user_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::default(),
        }
    }

    /// Defaults merged with the file at `path`. Unreadable or malformed files
    /// are logged and ignored.
    pub fn load_from(path: &Path) -> Self {
        let mut config = Self::default();
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                Ok(user) => config.merge(user),
                Err(e) => {
                    log::warn!(target: "rpc::config", "ignoring malformed config {}: {}", path.display(), e)
                }
            },
            Err(e) => {
                log::warn!(target: "rpc::config", "could not read config {}: {}", path.display(), e)
            }
        }
        config
    }

    /// Defaults merged with `contents`, failing on malformed input.
    pub fn from_toml_str(contents: &str) -> RpcResult<Self> {
        let user: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::default();
        config.merge(user);
        // Surface a bad target name here rather than falling back later.
        if let Some(name) = &config.sequencer.target {
            name.parse::<TargetName>().map_err(RpcError::Config)?;
        }
        Ok(config)
    }

    pub fn transport_mode(&self) -> TransportMode {
        self.transport.mode.unwrap_or_default()
    }

    pub fn max_message_bytes(&self) -> usize {
        self.transport
            .max_message_bytes
            .unwrap_or(DEFAULT_MAX_MESSAGE_BYTES)
    }

    /// Target the sequencer proxy addresses. Unknown names fall back to `Sequencer`.
    pub fn sequencer_target(&self) -> Target {
        let name = self
            .sequencer
            .target
            .as_deref()
            .and_then(|s| match s.parse::<TargetName>() {
                Ok(name) => Some(name),
                Err(e) => {
                    log::warn!(target: "rpc::config", "{}, using Sequencer", e);
                    None
                }
            })
            .unwrap_or(TargetName::Sequencer);
        Target::new(name)
    }

    fn merge(&mut self, user: ConfigFile) {
        if user.transport.mode.is_some() {
            self.transport.mode = user.transport.mode;
        }
        if user.transport.max_message_bytes.is_some() {
            self.transport.max_message_bytes = user.transport.max_message_bytes;
        }
        if user.sequencer.target.is_some() {
            self.sequencer.target = user.sequencer.target;
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("seqlink").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn embedded_defaults() {
        let config = RpcConfig::default();
        assert_eq!(config.transport_mode(), TransportMode::Direct);
        assert_eq!(config.max_message_bytes(), DEFAULT_MAX_MESSAGE_BYTES);
        assert_eq!(config.sequencer_target(), Target::new(TargetName::Sequencer));
    }

    #[test]
    fn user_values_override_defaults() {
        let config = RpcConfig::from_toml_str(
            "[transport]\nmode = \"serialized\"\n\n[sequencer]\ntarget = \"Player\"\n",
        )
        .unwrap();
        assert_eq!(config.transport_mode(), TransportMode::Serialized);
        assert_eq!(config.max_message_bytes(), DEFAULT_MAX_MESSAGE_BYTES);
        assert_eq!(config.sequencer_target(), Target::new(TargetName::Player));
    }

    #[test]
    fn bad_input_is_a_config_error() {
        assert!(matches!(
            RpcConfig::from_toml_str("[transport]\nmode = \"carrier-pigeon\"\n"),
            Err(RpcError::Config(_))
        ));
        assert!(matches!(
            RpcConfig::from_toml_str("[sequencer]\ntarget = \"Mixer\"\n"),
            Err(RpcError::Config(_))
        ));
    }

    #[test]
    fn load_from_file_merges() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transport]\nmax_message_bytes = 4096").unwrap();

        let config = RpcConfig::load_from(file.path());
        assert_eq!(config.max_message_bytes(), 4096);
        assert_eq!(config.transport_mode(), TransportMode::Direct);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [").unwrap();

        let config = RpcConfig::load_from(file.path());
        assert_eq!(config.transport_mode(), TransportMode::Direct);
    }
}
