//! # mdcontrol configuration
//!
//! Configuration is assembled in three layers:
//! - the embedded default YAML (`mdcontrol.yaml`)
//! - an optional external YAML file, merged key by key over the defaults
//! - environment variables prefixed with `MDCONTROL_CONFIG__`, where `__`
//!   separates path segments (`MDCONTROL_CONFIG__HTTP__TIMEOUT_SECS=10`)
//!
//! All keys are lowercased before the result is deserialized into [`Config`].
//!
//! ```no_run
//! use mdconfig::Config;
//!
//! let config = Config::load(None)?;
//! println!("collection window: {:?}", config.discovery.window());
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::{env, fs, net::Ipv4Addr, path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

// Embedded default configuration
const DEFAULT_CONFIG: &str = include_str!("mdcontrol.yaml");

pub const ENV_PREFIX: &str = "MDCONTROL_CONFIG__";

/// Typed configuration of the control point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discovery: DiscoverySettings,
    pub http: HttpSettings,
    pub browse: BrowseSettings,
}

/// SSDP search cycle settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoverySettings {
    pub multicast_address: String,
    pub port: u16,
    pub search_targets: Vec<String>,
    pub mx: u32,
    pub window_secs: u64,
    pub interval_secs: u64,
    pub receive_poll_ms: u64,
    pub user_agent: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            multicast_address: "239.255.255.250".to_string(),
            port: 1900,
            search_targets: vec!["ssdp:all".to_string()],
            mx: 2,
            window_secs: 3,
            interval_secs: 30,
            receive_poll_ms: 200,
            user_agent: "mdcontrol/0.1 UPnP/1.1".to_string(),
        }
    }
}

impl DiscoverySettings {
    pub fn multicast_group(&self) -> Result<Ipv4Addr> {
        let addr: Ipv4Addr = self
            .multicast_address
            .parse()
            .with_context(|| format!("invalid multicast address '{}'", self.multicast_address))?;
        if !addr.is_multicast() {
            return Err(anyhow!("{} is not a multicast address", addr));
        }
        Ok(addr)
    }

    /// Listen window after each M-SEARCH.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Delay between the starts of two search cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn receive_poll(&self) -> Duration {
        Duration::from_millis(self.receive_poll_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: 5 }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Paging used when listing a ContentDirectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseSettings {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for BrowseSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 50,
        }
    }
}

impl Config {
    /// Loads the configuration using the process environment for overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, env::vars())
    }

    /// Loads the configuration with an explicit set of environment variables.
    ///
    /// Only variables starting with [`ENV_PREFIX`] are considered.
    pub fn load_with_env<I>(path: Option<&Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match path {
            Some(path) if path.exists() => {
                let data = fs::read_to_string(path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                let external: Value = serde_yaml::from_str(&data)
                    .with_context(|| format!("invalid YAML in {}", path.display()))?;
                merge_yaml(&mut value, &lower_keys_value(external));
                info!(config_file = %path.display(), "Loaded config file");
            }
            Some(path) => {
                info!(config_file = %path.display(), "Config file not found, using embedded defaults");
            }
            None => debug!("No config file given, using embedded defaults"),
        }

        let mut value = lower_keys_value(value);
        apply_env_overrides(&mut value, vars);

        Self::from_value(value)
    }

    /// Deserializes a YAML document; missing keys take their default.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(lower_keys_value(value))
    }

    fn from_value(value: Value) -> Result<Self> {
        let config: Config =
            serde_yaml::from_value(value).context("configuration does not match the schema")?;
        config.discovery.multicast_group()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

fn apply_env_overrides<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key_path = rest.split("__").collect::<Vec<_>>();
        match set_value_internal(config, &key_path, convert_env_value(&value)) {
            Ok(()) => debug!(env_var = %key, "Applied environment override"),
            Err(e) => debug!(env_var = %key, error = %e, "Ignored environment override"),
        }
    }
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((first, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };
    let Value::Mapping(map) = data else {
        return Err(anyhow!("Current node is not a map"));
    };

    let key = Value::String(first.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        Ok(())
    } else {
        let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        set_value_internal(entry, rest, value)
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => {
            let mut new_map = Mapping::new();
            for (k, v) in map {
                let k = match k {
                    Value::String(s) => Value::String(s.to_lowercase()),
                    other => other,
                };
                new_map.insert(k, lower_keys_value(v));
            }
            Value::Mapping(new_map)
        }
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        // scalars and sequences are replaced
        (d, e) => *d = e.clone(),
    }
}
