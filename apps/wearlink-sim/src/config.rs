use config::{Config, ConfigError, Environment, File};
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use wearlink_core::{StreamKind, WearError};

#[derive(Debug, Deserialize, Clone)]
pub struct SimConfig {
    pub device_id: String,
    pub device_name: String,
    /// Streams started after connecting, in configured order. Accepts a
    /// list of wire names or one string separated by `,` or `;`.
    #[serde(deserialize_with = "deserialize_stream_kinds")]
    pub streams: Vec<StreamKind>,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    #[serde(with = "humantime_serde")]
    pub batch_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub hr_interval: Duration,
    pub ecg_sample_rate: u32,
    pub battery_level: u8,
    pub use_max_settings: bool,
    pub seed: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StreamNames {
    Joined(String),
    Listed(Vec<String>),
}

fn deserialize_stream_kinds<'de, D>(deserializer: D) -> Result<Vec<StreamKind>, D::Error>
where
    D: Deserializer<'de>,
{
    let kinds = match StreamNames::deserialize(deserializer)? {
        StreamNames::Joined(joined) => parse_stream_kinds(joined.split([',', ';'])),
        StreamNames::Listed(names) => parse_stream_kinds(names.iter().map(String::as_str)),
    };
    kinds.map_err(D::Error::custom)
}

/// Parses wire names, skipping blanks and repeated kinds.
fn parse_stream_kinds<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<StreamKind>, WearError> {
    let mut kinds = Vec::new();
    for name in names.into_iter().map(str::trim).filter(|name| !name.is_empty()) {
        let kind: StreamKind = name.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

impl SimConfig {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("device_id", "C19E1A21")?
            .set_default("device_name", "Sim H10 C19E1A21")?
            .set_default("streams", "ecg,acc")?
            .set_default("duration", "10s")?
            .set_default("batch_interval", "250ms")?
            .set_default("hr_interval", "1s")?
            .set_default("ecg_sample_rate", 130)?
            .set_default("battery_level", 87)?
            .set_default("use_max_settings", true)?
            .set_default("seed", None::<u64>)?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // .env files feed the WEARLINK_SIM_* environment source below.
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix("WEARLINK_SIM").try_parsing(true));

        builder.build()?.try_deserialize()
    }
}
