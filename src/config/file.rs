//! Configuration file support

use crate::error::AvOffsetError;
use crate::offset::{
    parse_hashed_table, parse_table, Composition, LearnedFile, OffsetStore, OffsetTables,
};
use crate::playback::{MachineConfig, NotificationConfig};
use crate::seek::{SeekBackConfig, TriggerSetting};
use crate::stream::{ClassifierOptions, HdrType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "avoffset.toml";

/// Configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log file path (empty = no file logging)
    pub log_file: String,

    /// Learned offsets file (empty = platform data directory)
    pub learned_path: String,

    pub monitoring: MonitoringSection,

    pub notifications: NotificationSection,

    pub offsets: OffsetSection,

    /// Per-HDR-type switches, keyed by HDR type (e.g. "dolbyvision")
    pub hdr_types: BTreeMap<String, HdrTypeSection>,

    pub seek_back: SeekBackSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: String::new(),
            learned_path: String::new(),
            monitoring: MonitoringSection::default(),
            notifications: NotificationSection::default(),
            offsets: OffsetSection::default(),
            hdr_types: BTreeMap::new(),
            seek_back: SeekBackSection::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSection {
    /// Learn manual offset corrections
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSection {
    pub enabled: bool,
    pub seconds: u64,
}

impl Default for NotificationSection {
    fn default() -> Self {
        Self {
            enabled: false,
            seconds: 5,
        }
    }
}

/// Raw offset tables; keys are validated when the runtime is built
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffsetSection {
    pub composition: Composition,
    pub hdr: BTreeMap<String, i64>,
    pub audio: BTreeMap<String, i64>,
    pub fps: BTreeMap<String, i64>,
    /// Exact entries keyed by `<hdr>_<fps>_<audio>`
    pub signatures: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdrTypeSection {
    /// Apply and learn offsets for this HDR type
    pub enabled: bool,
    /// Distinguish frame rates for this HDR type
    pub fps_enabled: bool,
}

impl Default for HdrTypeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            fps_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekBackSection {
    pub playback_start: TriggerSection,
    pub audio_track_changed: TriggerSection,
    pub offset_adjusted: TriggerSection,
    pub unpaused: TriggerSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerSection {
    pub enabled: bool,
    pub seconds: i64,
}

impl Default for TriggerSection {
    fn default() -> Self {
        Self {
            enabled: false,
            seconds: 5,
        }
    }
}

impl TriggerSection {
    fn to_setting(&self, name: &str, issues: &mut Vec<AvOffsetError>) -> TriggerSetting {
        match u64::try_from(self.seconds) {
            Ok(seconds) => TriggerSetting {
                enabled: self.enabled,
                duration: Duration::from_secs(seconds),
            },
            Err(_) => {
                issues.push(AvOffsetError::Configuration(format!(
                    "[seek_back.{}] negative duration {}s, trigger disabled",
                    name, self.seconds
                )));
                TriggerSetting::default()
            }
        }
    }
}

/// Validated runtime settings plus every problem found on the way
#[derive(Debug)]
pub struct RuntimeConfig {
    pub tables: OffsetTables,
    pub machine: MachineConfig,
    pub issues: Vec<AvOffsetError>,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. Working directory: avoffset.toml
    /// 2. User config directory: avoffset/config.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path or the default locations
    ///
    /// A file that cannot be read or parsed yields the defaults together
    /// with the error, for the caller to report once logging is up.
    pub fn load_or_default(path: Option<&Path>) -> (Self, Option<ConfigError>) {
        let loaded = match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        };
        match loaded {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// First existing configuration file in the default locations
    pub fn default_path() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("avoffset").join("config.toml"))
            .filter(|path| path.exists())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_string_lossy().to_string(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })
    }

    /// Learned offsets location
    pub fn learned_file(&self) -> LearnedFile {
        if self.learned_path.is_empty() {
            LearnedFile::default_location()
        } else {
            LearnedFile::new(&self.learned_path)
        }
    }

    /// Validate every table and switch without logging
    ///
    /// Invalid tables are replaced by empty ones and invalid triggers are
    /// disabled; each replacement is reported in `issues`.
    pub fn runtime(&self) -> RuntimeConfig {
        let mut issues = Vec::new();

        let mut disabled_hdr = BTreeSet::new();
        let mut fps_disabled = BTreeSet::new();
        for (key, section) in &self.hdr_types {
            match key.parse::<HdrType>() {
                Ok(hdr) => {
                    if !section.enabled {
                        disabled_hdr.insert(hdr);
                    }
                    if !section.fps_enabled {
                        fps_disabled.insert(hdr);
                    }
                }
                Err(e) => issues.push(AvOffsetError::Configuration(format!(
                    "[hdr_types.{}] {}",
                    key, e
                ))),
            }
        }

        let offsets = &self.offsets;
        let tables = OffsetTables {
            composition: offsets.composition,
            hdr: parse_table("hdr", &offsets.hdr).unwrap_or_else(|e| report(&mut issues, e)),
            audio: parse_table("audio", &offsets.audio).unwrap_or_else(|e| report(&mut issues, e)),
            fps: parse_table("fps", &offsets.fps).unwrap_or_else(|e| report(&mut issues, e)),
            signatures: parse_hashed_table("signatures", &offsets.signatures)
                .unwrap_or_else(|e| report(&mut issues, e)),
            disabled_hdr,
        };

        let sb = &self.seek_back;
        let seek_back = SeekBackConfig {
            playback_start: sb.playback_start.to_setting("playback_start", &mut issues),
            audio_track_changed: sb
                .audio_track_changed
                .to_setting("audio_track_changed", &mut issues),
            offset_adjusted: sb.offset_adjusted.to_setting("offset_adjusted", &mut issues),
            unpaused: sb.unpaused.to_setting("unpaused", &mut issues),
        };

        let machine = MachineConfig {
            classifier: ClassifierOptions { fps_disabled },
            seek_back,
            notifications: NotificationConfig {
                enabled: self.notifications.enabled,
                display_for: Duration::from_secs(self.notifications.seconds),
            },
        };

        RuntimeConfig {
            tables,
            machine,
            issues,
        }
    }

    /// Problems `runtime` would fall back from
    pub fn validate(&self) -> Vec<AvOffsetError> {
        self.runtime().issues
    }

    /// Build the offset store and machine settings, logging each problem once
    pub fn build(&self) -> (OffsetStore, MachineConfig) {
        let runtime = self.logged_runtime();
        let store = OffsetStore::with_persistence(
            runtime.tables,
            self.monitoring.enabled,
            self.learned_file(),
        );
        (store, runtime.machine)
    }

    /// Same as `build`, but the learned file is only read, never removed or written
    pub fn build_read_only(&self) -> (OffsetStore, MachineConfig) {
        let runtime = self.logged_runtime();
        let learned = if self.monitoring.enabled {
            self.learned_file().load()
        } else {
            BTreeMap::new()
        };
        let store = OffsetStore::with_learned(runtime.tables, self.monitoring.enabled, learned);
        (store, runtime.machine)
    }

    fn logged_runtime(&self) -> RuntimeConfig {
        let runtime = self.runtime();
        for issue in &runtime.issues {
            warn!("{}", issue);
        }
        runtime
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# avoffset configuration

# Log level: trace, debug, info, warn, error (default: info)
log_level = "info"

# Log file path (empty = no file logging)
log_file = ""

# Learned offsets file (empty = platform data directory)
learned_path = ""

[monitoring]
# Remember manual offset corrections per stream signature
enabled = false

[notifications]
# Show an on-screen message when an offset is applied or learned
enabled = false
seconds = 5

[offsets]
# How axis offsets combine: "sum" or "most_specific"
composition = "sum"

# Offsets in milliseconds; positive values delay audio
[offsets.hdr]
dolbyvision = 0
hdr10 = 0
hdr10plus = 0
hlg = 0
sdr = 0

[offsets.audio]
truehd = 0
eac3 = 0
ac3 = 0
dtsx = 0
dtshd_ma = 0
dts = 0
pcm = 0

[offsets.fps]
"23.98" = 0
"24" = 0
"25" = 0
"29.97" = 0
"30" = 0
"50" = 0
"59.94" = 0
"60" = 0

# Exact entries override the axis tables: "<hdr>_<fps>_<audio>" = ms
[offsets.signatures]
# "dolbyvision_23.98_truehd" = 60

# Per HDR type: manage offsets at all, and tell frame rates apart
[hdr_types.dolbyvision]
enabled = true
fps_enabled = true

[hdr_types.sdr]
enabled = true
fps_enabled = false

# Rewind after the offset changes so the resync isn't missed
[seek_back.playback_start]
enabled = false
seconds = 5

[seek_back.audio_track_changed]
enabled = false
seconds = 5

[seek_back.offset_adjusted]
enabled = false
seconds = 5

[seek_back.unpaused]
enabled = false
seconds = 5
"#
        .to_string()
    }
}

fn report<T: Default>(issues: &mut Vec<AvOffsetError>, error: AvOffsetError) -> T {
    issues.push(error);
    T::default()
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading/writing config file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// Error parsing TOML
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    /// Error serializing config
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
