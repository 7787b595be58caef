use crate::config::{DeviceClass, FocusConfigOverrides};
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "config/focus.json";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    config: Option<PathBuf>,
    script: Option<PathBuf>,
    source: Option<PathBuf>,
    device: Option<DeviceClass>,
    spawn_rate: Option<f32>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Use --config/--script/--source/--device/--spawn-rate.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "script" => overrides.script = Some(PathBuf::from(value)),
                "source" => overrides.source = Some(PathBuf::from(value)),
                "device" => {
                    overrides.device = Some(
                        DeviceClass::parse(&value)
                            .ok_or_else(|| anyhow!("Invalid device '{value}'. Use desktop or mobile."))?,
                    );
                }
                "spawn-rate" => {
                    let rate = value.parse::<f32>().with_context(|| format!("Invalid spawn rate '{value}'"))?;
                    if !(rate >= 0.0) {
                        bail!("Spawn rate must be non-negative, got {rate}");
                    }
                    overrides.spawn_rate = Some(rate);
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --script, --source, --device, --spawn-rate."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    pub fn script_path(&self) -> Option<&PathBuf> {
        self.script.as_ref()
    }

    pub fn config_overrides(&self) -> FocusConfigOverrides {
        FocusConfigOverrides { source: self.source.clone(), device: self.device, spawn_rate: self.spawn_rate }
    }
}
