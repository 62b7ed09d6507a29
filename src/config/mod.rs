//! Configuration: CLI arguments and the TOML configuration file

mod args;
mod file;

pub use args::{Args, Command, ConfigAction, LearnedAction};
pub use file::{
    AppConfig, ConfigError, HdrTypeSection, MonitoringSection, NotificationSection,
    OffsetSection, RuntimeConfig, SeekBackSection, TriggerSection, LOCAL_CONFIG_FILE,
};
