use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::archive::{DEFAULT_ARCHIVE_COMMAND, DEFAULT_ARCHIVE_TIMEOUT};
use crate::preview::{ImageFormat, ImagePolicy};

pub const DEFAULT_PLACEHOLDER_HOSTS: &str = "maps.gstatic.com";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: String, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub is_dev: bool,
    /// Reject preview/archive targets that resolve to private addresses.
    pub block_private_hosts: bool,
    /// Image hosts known to serve generic default images.
    pub placeholder_hosts: Vec<String>,
    pub image_policy: ImagePolicy,
    pub archive_command: String,
    pub archive_args: Vec<String>,
    pub archive_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            is_dev: true,
            block_private_hosts: true,
            placeholder_hosts: split_list(DEFAULT_PLACEHOLDER_HOSTS),
            image_policy: ImagePolicy::default(),
            archive_command: DEFAULT_ARCHIVE_COMMAND.to_string(),
            archive_args: Vec::new(),
            archive_timeout: DEFAULT_ARCHIVE_TIMEOUT,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset keys keep their
    /// defaults; set-but-malformed keys are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let mut policy = defaults.image_policy.clone();

        if let Some(raw) = lookup("PREVIEW_IMAGE_FORMATS") {
            policy.formats = split_list(&raw)
                .iter()
                .map(|name| {
                    name.parse::<ImageFormat>()
                        .ok()
                        .filter(|format| format.is_decodable())
                        .ok_or_else(|| invalid("PREVIEW_IMAGE_FORMATS", &raw))
                })
                .collect::<Result<_, _>>()?;
        }
        if let Some(side) = parse_var::<u32, _>(&lookup, "PREVIEW_IMAGE_MIN_SIDE")? {
            policy.min_width = side;
            policy.min_height = side;
            policy.min_area = u64::from(side) * u64::from(side);
        }
        if let Some(side) = parse_var::<u32, _>(&lookup, "PREVIEW_IMAGE_MAX_SIDE")? {
            policy.max_area = u64::from(side) * u64::from(side);
        }
        if policy.max_area < policy.min_area {
            let key = if lookup("PREVIEW_IMAGE_MAX_SIDE").is_some() {
                "PREVIEW_IMAGE_MAX_SIDE"
            } else {
                "PREVIEW_IMAGE_MIN_SIDE"
            };
            return Err(invalid(key, &lookup(key).unwrap_or_default()));
        }
        if let Some(ratio) = parse_var::<f64, _>(&lookup, "PREVIEW_IMAGE_MAX_ASPECT")? {
            if ratio.is_nan() || ratio < 1.0 {
                return Err(invalid("PREVIEW_IMAGE_MAX_ASPECT", &ratio.to_string()));
            }
            policy.max_aspect_ratio = ratio;
        }

        Ok(Config {
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.server_port),
            is_dev: lookup("APP_ENV").as_deref() != Some("production"),
            block_private_hosts: !parse_var::<bool, _>(&lookup, "PREVIEW_ALLOW_PRIVATE_HOSTS")?
                .unwrap_or(false),
            placeholder_hosts: lookup("PREVIEW_PLACEHOLDER_HOSTS")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.placeholder_hosts),
            image_policy: policy,
            archive_command: lookup("ARCHIVE_COMMAND").unwrap_or(defaults.archive_command),
            archive_args: lookup("ARCHIVE_ARGS")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            archive_timeout: parse_var::<u64, _>(&lookup, "ARCHIVE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.archive_timeout),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(key, &raw)),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_addr(), "0.0.0.0:3000");
        assert!(config.is_dev);
        assert!(config.block_private_hosts);
        assert_eq!(config.placeholder_hosts, vec!["maps.gstatic.com"]);
        assert_eq!(config.image_policy, ImagePolicy::default());
        assert_eq!(config.archive_command, "single-file");
        assert_eq!(config.archive_timeout, Duration::from_secs(60));
    }

    #[test]
    fn reads_server_settings() {
        let config = config_from(&[
            ("SERVER_HOST", "127.0.0.1"),
            ("PORT", "8081"),
            ("APP_ENV", "production"),
        ])
        .unwrap();
        assert_eq!(config.server_addr(), "127.0.0.1:8081");
        assert!(!config.is_dev);
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT".into(),
                value: "eighty".into()
            }
        );
    }

    #[test]
    fn reads_image_policy_overrides() {
        let config = config_from(&[
            ("PREVIEW_IMAGE_FORMATS", "png, GIF"),
            ("PREVIEW_IMAGE_MIN_SIDE", "50"),
            ("PREVIEW_IMAGE_MAX_SIDE", "2048"),
            ("PREVIEW_IMAGE_MAX_ASPECT", "4.5"),
        ])
        .unwrap();
        let policy = config.image_policy;
        assert_eq!(policy.formats, vec![ImageFormat::Png, ImageFormat::Gif]);
        assert_eq!((policy.min_width, policy.min_height), (50, 50));
        assert_eq!(policy.min_area, 2_500);
        assert_eq!(policy.max_area, 2048 * 2048);
        assert_eq!(policy.max_aspect_ratio, 4.5);
    }

    #[test]
    fn rejects_unknown_image_format() {
        assert!(config_from(&[("PREVIEW_IMAGE_FORMATS", "png,svg")]).is_err());
    }

    #[test]
    fn rejects_formats_without_a_decoder() {
        assert_eq!(
            config_from(&[("PREVIEW_IMAGE_FORMATS", "png,avif")]).unwrap_err(),
            ConfigError::Invalid {
                key: "PREVIEW_IMAGE_FORMATS".into(),
                value: "png,avif".into()
            }
        );
        assert!(config_from(&[("PREVIEW_IMAGE_FORMATS", "other")]).is_err());
    }

    #[test]
    fn accepts_every_decodable_format() {
        let config =
            config_from(&[("PREVIEW_IMAGE_FORMATS", "png,jpg,jp2,webp,gif,bmp,tiff,ico")]).unwrap();
        assert_eq!(config.image_policy.formats.len(), 8);
    }

    #[test]
    fn rejects_max_side_below_min_side() {
        assert_eq!(
            config_from(&[
                ("PREVIEW_IMAGE_MIN_SIDE", "200"),
                ("PREVIEW_IMAGE_MAX_SIDE", "150"),
            ])
            .unwrap_err(),
            ConfigError::Invalid {
                key: "PREVIEW_IMAGE_MAX_SIDE".into(),
                value: "150".into()
            }
        );
        // A raised minimum must still fit under the default maximum.
        assert!(config_from(&[("PREVIEW_IMAGE_MIN_SIDE", "2000")]).is_err());
        assert!(config_from(&[
            ("PREVIEW_IMAGE_MIN_SIDE", "300"),
            ("PREVIEW_IMAGE_MAX_SIDE", "300"),
        ])
        .is_ok());
    }

    #[test]
    fn rejects_aspect_below_one() {
        assert!(config_from(&[("PREVIEW_IMAGE_MAX_ASPECT", "0.5")]).is_err());
        assert!(config_from(&[("PREVIEW_IMAGE_MAX_ASPECT", "NaN")]).is_err());
    }

    #[test]
    fn private_hosts_can_be_allowed() {
        let config = config_from(&[("PREVIEW_ALLOW_PRIVATE_HOSTS", "true")]).unwrap();
        assert!(!config.block_private_hosts);
    }

    #[test]
    fn placeholder_hosts_list() {
        let config = config_from(&[("PREVIEW_PLACEHOLDER_HOSTS", "a.example, ,b.example")]).unwrap();
        assert_eq!(config.placeholder_hosts, vec!["a.example", "b.example"]);
    }

    #[test]
    fn archive_settings() {
        let config = config_from(&[
            ("ARCHIVE_COMMAND", "/usr/local/bin/single-file"),
            ("ARCHIVE_ARGS", "--browser-headless=true  --compress-HTML=false"),
            ("ARCHIVE_TIMEOUT_SECS", "90"),
        ])
        .unwrap();
        assert_eq!(config.archive_command, "/usr/local/bin/single-file");
        assert_eq!(
            config.archive_args,
            vec!["--browser-headless=true", "--compress-HTML=false"]
        );
        assert_eq!(config.archive_timeout, Duration::from_secs(90));
    }
}
