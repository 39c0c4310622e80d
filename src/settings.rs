//! Layered configuration: defaults, an optional TOML file, `HEARTHLOG__*`
//! environment variables, then command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};

use crate::data::duration::parse_duration;

/// Prefix for environment overrides, e.g. `HEARTHLOG__GATEWAY__ENDPOINT`.
pub const ENV_PREFIX: &str = "HEARTHLOG";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub gateway: GatewaySettings,
    pub monitor: MonitorSettings,
    pub network: NetworkSettings,
    pub map: MapSettings,
    #[serde(default)]
    pub session: SessionSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayKind {
    /// In-process tables seeded with a few demo entries.
    Memory,
    /// A PostgREST-style HTTP backend.
    Rest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    pub kind: GatewayKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(deserialize_with = "duration")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSettings {
    #[serde(deserialize_with = "duration")]
    pub probe_timeout: Duration,
    #[serde(default, deserialize_with = "optional_duration")]
    pub poll_interval: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkSettings {
    /// Any routable `host:port`. Nothing is sent to it.
    pub check_addr: String,
    #[serde(deserialize_with = "duration")]
    pub check_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSettings {
    /// `builtin`, or a path to a basemap JSON file.
    pub basemap: String,
    #[serde(deserialize_with = "duration")]
    pub load_timeout: Duration,
    pub ceiling: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub file: PathBuf,
}

/// Values given on the command line. `None` leaves the layer below alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub gateway: Option<String>,
    pub endpoint: Option<String>,
    pub user: Option<String>,
    pub basemap: Option<String>,
    pub log_file: Option<String>,
}

impl Settings {
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("gateway.kind", "memory")?
            .set_default("gateway.request_timeout", "10s")?
            .set_default("monitor.probe_timeout", "5s")?
            .set_default("network.check_addr", "1.1.1.1:53")?
            .set_default("network.check_interval", "5s")?
            .set_default("map.basemap", "builtin")?
            .set_default("map.load_timeout", "10s")?
            .set_default("map.ceiling", 3)?
            .set_default("log.file", "hearthlog.log")?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("gateway.kind", overrides.gateway)?
            .set_override_option("gateway.endpoint", overrides.endpoint)?
            .set_override_option("session.user", overrides.user)?
            .set_override_option("map.basemap", overrides.basemap)?
            .set_override_option("log.file", overrides.log_file)?
            .build()
            .context("reading configuration")?;

        settings
            .try_deserialize()
            .context("invalid configuration")
    }
}

fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_duration(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_a_file() {
        let settings = Settings::load(None, Overrides::default()).unwrap();

        assert_eq!(settings.gateway.kind, GatewayKind::Memory);
        assert_eq!(settings.monitor.probe_timeout, Duration::from_secs(5));
        assert_eq!(settings.monitor.poll_interval, None);
        assert_eq!(settings.map.load_timeout, Duration::from_secs(10));
        assert_eq!(settings.map.ceiling, 3);
        assert_eq!(settings.map.basemap, "builtin");
    }

    #[test]
    fn file_values_layer_over_defaults() {
        let file = write_config(
            r#"
            [gateway]
            kind = "rest"
            endpoint = "https://family.example.co"

            [monitor]
            poll_interval = "30s"
            probe_timeout = "2s"

            [map]
            ceiling = 5
            "#,
        );

        let settings = Settings::load(Some(file.path()), Overrides::default()).unwrap();

        assert_eq!(settings.gateway.kind, GatewayKind::Rest);
        assert_eq!(
            settings.gateway.endpoint.as_deref(),
            Some("https://family.example.co")
        );
        assert_eq!(settings.monitor.poll_interval, Some(Duration::from_secs(30)));
        assert_eq!(settings.monitor.probe_timeout, Duration::from_secs(2));
        assert_eq!(settings.map.ceiling, 5);
        assert_eq!(settings.network.check_interval, Duration::from_secs(5));
    }

    #[test]
    fn command_line_wins() {
        let file = write_config("[session]\nuser = \"file-user\"\n");
        let overrides = Overrides {
            user: Some("cli-user".into()),
            basemap: Some("/tmp/world.json".into()),
            ..Default::default()
        };

        let settings = Settings::load(Some(file.path()), overrides).unwrap();

        assert_eq!(settings.session.user.as_deref(), Some("cli-user"));
        assert_eq!(settings.map.basemap, "/tmp/world.json");
    }

    #[test]
    fn bad_durations_are_rejected() {
        let file = write_config("[monitor]\nprobe_timeout = \"soon\"\n");
        let err = Settings::load(Some(file.path()), Overrides::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("soon"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/hearthlog.toml")), Overrides::default());
        assert!(result.is_err());
    }
}
