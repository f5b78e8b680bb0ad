//! Platform configuration.
//!
//! [`PlatformConfig`] mirrors the configuration handed over by the host platform: the TiVo boxes
//! to manage, the channel line-up, and the program guide options. It is deserialized with serde
//! (TOML is supported directly) and then turned into an immutable [`ValidatedConfig`] with
//! [`PlatformConfig::validate()`]. Invalid channel references are rejected at that point rather
//! than when a channel is first looked up.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::channels::{ChannelDirectory, ChannelEntry};
use crate::connection_settings::{ConnectionSettings, ConnectionSettingsBuilder};

const MIN_TIVO_ID: u8 = 1;
const MAX_TIVO_ID: u8 = 9;
/// Longest guide period (one week), in hours.
const MAX_GUIDE_HOURS: u32 = 168;

/// Configuration problems. These are only raised while building the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(String),
    #[error("could not parse configuration: {0}")]
    Parse(String),
    #[error("invalid TiVo id '{0}' (must be 1-9)")]
    InvalidTivoId(String),
    #[error("TiVo {0} has no host")]
    MissingHost(u8),
    #[error("invalid channel id '{0}' (must be 1-999)")]
    InvalidChannelId(String),
    #[error("channel name '{0}' is used more than once")]
    DuplicateChannelName(String),
    #[error("channel {channel} has unknown HD channel {hd_channel}")]
    UnknownHdChannel { channel: u16, hd_channel: u16 },
    #[error("channel {channel} has unknown +1 channel {plus_one_channel}")]
    UnknownPlusOneChannel { channel: u16, plus_one_channel: u16 },
    #[error("channel {0} is paired with itself")]
    SelfPairing(u16),
    #[error("channel {0} has conflicting HD/+1 pairings")]
    ConflictingPairing(u16),
    #[error("guide {setting} of {value} hours is out of range (must be 1-168)")]
    InvalidGuideHours { setting: String, value: u32 },
}

/// Top-level platform configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    /// Show channels in the source list unless the channel says otherwise.
    #[serde(default = "default_is_show")]
    pub default_is_show: bool,
    /// Force HD on every box.
    #[serde(default)]
    pub force_hd: bool,
    /// Seconds between status polls of each box.
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// TiVo boxes keyed by id (1-9).
    pub tivos: BTreeMap<String, TivoConfig>,
    /// Channels keyed by channel number (1-999).
    pub channels: BTreeMap<String, ChannelConfig>,
    #[serde(default)]
    pub guide: GuideSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TivoConfig {
    pub host: String,
    pub name: String,
    #[serde(default)]
    pub force_hd: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default)]
    pub logo: String,
    pub hd_channel: Option<u16>,
    pub plus_one: Option<u16>,
    /// Unset means "use `default_is_show`".
    pub show: Option<bool>,
    /// External entity to switch when this channel is tuned.
    #[serde(default)]
    pub target: String,
    /// Source to switch the target to.
    #[serde(default)]
    pub source: String,
}

/// Program guide options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GuideSettings {
    #[serde(default = "default_cache_hours")]
    pub cache_hours: u32,
    /// Hours of listings fetched per refresh, measured from the start of the look-back window.
    #[serde(default = "default_picture_refresh")]
    pub picture_refresh: u32,
    #[serde(default = "default_enable_guide")]
    pub enable_guide: bool,
}

impl Default for GuideSettings {
    fn default() -> Self {
        GuideSettings {
            cache_hours: default_cache_hours(),
            picture_refresh: default_picture_refresh(),
            enable_guide: default_enable_guide(),
        }
    }
}

impl GuideSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        for (setting, value) in [
            ("cache_hours", self.cache_hours),
            ("picture_refresh", self.picture_refresh),
        ] {
            if !(1..=MAX_GUIDE_HOURS).contains(&value) {
                return Err(ConfigError::InvalidGuideHours {
                    setting: setting.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}

fn default_is_show() -> bool {
    true
}

fn default_scan_interval_secs() -> u64 {
    10
}

fn default_cache_hours() -> u32 {
    12
}

fn default_picture_refresh() -> u32 {
    60
}

fn default_enable_guide() -> bool {
    true
}

/// A single TiVo box to manage.
#[derive(Debug, Clone, PartialEq)]
pub struct TivoDevice {
    pub tivo_id: u8,
    pub host: String,
    pub name: String,
    pub settings: ConnectionSettings,
}

impl TivoDevice {
    /// Identifier which is unique across all managed boxes.
    pub fn unique_id(&self) -> String {
        format!("{}-{}", self.host, self.tivo_id)
    }
}

/// Configuration which has passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub tivos: Vec<TivoDevice>,
    pub channels: Arc<ChannelDirectory>,
    pub guide: GuideSettings,
}

impl PlatformConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;

        PlatformConfig::from_toml_str(&contents)
    }

    /// Validate the configuration, building the shared channel directory.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        self.guide.validate()?;

        let mut entries = Vec::with_capacity(self.channels.len());

        for (key, channel) in &self.channels {
            let id: u16 = key
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidChannelId(key.clone()))?;

            let mut entry = ChannelEntry::new(id, channel.name.trim());
            entry.hd_channel = channel.hd_channel;
            entry.plus_one_channel = channel.plus_one;
            entry.visible = channel.show.unwrap_or(self.default_is_show);

            if !channel.logo.is_empty() {
                entry.logo_url = Some(channel.logo.clone());
            }

            if !channel.target.is_empty() {
                entry = entry.with_automation(&channel.target, &channel.source);
            }

            entries.push(entry);
        }

        let channels = Arc::new(ChannelDirectory::new(entries)?);

        let mut tivos = Vec::with_capacity(self.tivos.len());

        for (key, tivo) in &self.tivos {
            let tivo_id: u8 = key
                .trim()
                .parse()
                .ok()
                .filter(|id| (MIN_TIVO_ID..=MAX_TIVO_ID).contains(id))
                .ok_or_else(|| ConfigError::InvalidTivoId(key.clone()))?;

            if tivo.host.trim().is_empty() {
                return Err(ConfigError::MissingHost(tivo_id));
            }

            let mut settings_builder = ConnectionSettingsBuilder::new()
                .with_poll_interval(Duration::from_secs(self.scan_interval_secs.max(1)));

            if self.force_hd || tivo.force_hd {
                settings_builder = settings_builder.with_force_hd();
            }

            tivos.push(TivoDevice {
                tivo_id,
                host: tivo.host.trim().to_string(),
                name: tivo.name.clone(),
                settings: settings_builder.build(),
            });
        }

        Ok(ValidatedConfig {
            tivos,
            channels,
            guide: self.guide.clone(),
        })
    }
}

// ================================================================================================
// Tests
