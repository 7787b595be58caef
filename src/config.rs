use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Device class decides the emission throttle. Mobile-class headsets get a
/// fraction of the desktop spawn rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
}

impl DeviceClass {
    pub const MOBILE_SPAWN_RATE_FACTOR: f32 = 0.05;

    pub fn spawn_rate_factor(self) -> f32 {
        match self {
            DeviceClass::Desktop => 1.0,
            DeviceClass::Mobile => Self::MOBILE_SPAWN_RATE_FACTOR,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "desktop" | "pc" => Some(DeviceClass::Desktop),
            "mobile" | "standalone" => Some(DeviceClass::Mobile),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmissionConfig {
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default = "EmissionConfig::default_dt")]
    pub dt: f32,
    #[serde(default = "EmissionConfig::default_lifetime")]
    pub lifetime: f32,
    #[serde(default = "EmissionConfig::default_colormap_max_pressure")]
    pub colormap_max_pressure: f32,
    #[serde(default = "EmissionConfig::default_colormap_min_pressure")]
    pub colormap_min_pressure: f32,
    #[serde(default)]
    pub reverse_colormap: bool,
    #[serde(default)]
    pub hide_out_of_range: bool,
    #[serde(default = "EmissionConfig::default_spawn_rate")]
    pub spawn_rate: f32,
    #[serde(default = "EmissionConfig::default_time_scale")]
    pub time_scale: f32,
    #[serde(default = "EmissionConfig::default_colormap")]
    pub colormap: PathBuf,
    #[serde(default = "EmissionConfig::default_sprite")]
    pub sprite: PathBuf,
    #[serde(default = "EmissionConfig::default_max_particles")]
    pub max_particles: u32,
    #[serde(default = "EmissionConfig::default_size_out_of_focus")]
    pub size_out_of_focus: f32,
    #[serde(default = "EmissionConfig::default_size")]
    pub size: f32,
    #[serde(default)]
    pub device: DeviceClass,
}

impl EmissionConfig {
    const fn default_dt() -> f32 {
        0.01
    }

    const fn default_lifetime() -> f32 {
        2.0
    }

    const fn default_colormap_max_pressure() -> f32 {
        100.0
    }

    const fn default_colormap_min_pressure() -> f32 {
        10.0
    }

    const fn default_spawn_rate() -> f32 {
        15_000.0
    }

    const fn default_time_scale() -> f32 {
        1.0
    }

    fn default_colormap() -> PathBuf {
        PathBuf::from("assets/textures/colormap.png")
    }

    fn default_sprite() -> PathBuf {
        PathBuf::from("assets/textures/particle2.png")
    }

    const fn default_max_particles() -> u32 {
        250_000
    }

    const fn default_size_out_of_focus() -> f32 {
        0.25
    }

    const fn default_size() -> f32 {
        10.0
    }

    /// Simulation frames per second derived from the source step.
    pub fn fps(&self) -> f32 {
        if self.dt > 0.0 {
            1.0 / self.dt
        } else {
            1.0 / Self::default_dt()
        }
    }
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            source: None,
            dt: Self::default_dt(),
            lifetime: Self::default_lifetime(),
            colormap_max_pressure: Self::default_colormap_max_pressure(),
            colormap_min_pressure: Self::default_colormap_min_pressure(),
            reverse_colormap: false,
            hide_out_of_range: false,
            spawn_rate: Self::default_spawn_rate(),
            time_scale: Self::default_time_scale(),
            colormap: Self::default_colormap(),
            sprite: Self::default_sprite(),
            max_particles: Self::default_max_particles(),
            size_out_of_focus: Self::default_size_out_of_focus(),
            size: Self::default_size(),
            device: DeviceClass::default(),
        }
    }
}

/// Partial emission update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmissionConfigDiff {
    pub lifetime: Option<f32>,
    pub colormap_max_pressure: Option<f32>,
    pub colormap_min_pressure: Option<f32>,
    pub reverse_colormap: Option<bool>,
    pub hide_out_of_range: Option<bool>,
    pub spawn_rate: Option<f32>,
    pub time_scale: Option<f32>,
    pub max_particles: Option<u32>,
    pub size_out_of_focus: Option<f32>,
    pub size: Option<f32>,
}

impl EmissionConfigDiff {
    pub fn is_empty(&self) -> bool {
        self.applied_fields().is_empty()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut push = |set: bool, name: &'static str| {
            if set {
                fields.push(name);
            }
        };
        push(self.lifetime.is_some(), "lifetime");
        push(self.colormap_max_pressure.is_some(), "colormap_max_pressure");
        push(self.colormap_min_pressure.is_some(), "colormap_min_pressure");
        push(self.reverse_colormap.is_some(), "reverse_colormap");
        push(self.hide_out_of_range.is_some(), "hide_out_of_range");
        push(self.spawn_rate.is_some(), "spawn_rate");
        push(self.time_scale.is_some(), "time_scale");
        push(self.max_particles.is_some(), "max_particles");
        push(self.size_out_of_focus.is_some(), "size_out_of_focus");
        push(self.size.is_some(), "size");
        fields
    }

    pub fn apply_to(&self, config: &mut EmissionConfig) {
        if let Some(v) = self.lifetime {
            config.lifetime = v;
        }
        if let Some(v) = self.colormap_max_pressure {
            config.colormap_max_pressure = v;
        }
        if let Some(v) = self.colormap_min_pressure {
            config.colormap_min_pressure = v;
        }
        if let Some(v) = self.reverse_colormap {
            config.reverse_colormap = v;
        }
        if let Some(v) = self.hide_out_of_range {
            config.hide_out_of_range = v;
        }
        if let Some(v) = self.spawn_rate {
            config.spawn_rate = v;
        }
        if let Some(v) = self.time_scale {
            config.time_scale = v;
        }
        if let Some(v) = self.max_particles {
            config.max_particles = v;
        }
        if let Some(v) = self.size_out_of_focus {
            config.size_out_of_focus = v;
        }
        if let Some(v) = self.size {
            config.size = v;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FocusSettings {
    /// Fallback radius for regions that do not carry their own.
    #[serde(default = "FocusSettings::default_sphere_radius")]
    pub focus_sphere_radius: f32,
    /// `None` resamples every frame.
    #[serde(default = "FocusSettings::default_resample_interval_ms")]
    pub resample_interval_ms: Option<u64>,
}

impl FocusSettings {
    const fn default_sphere_radius() -> f32 {
        0.3
    }

    const fn default_resample_interval_ms() -> Option<u64> {
        Some(1000)
    }
}

impl Default for FocusSettings {
    fn default() -> Self {
        Self {
            focus_sphere_radius: Self::default_sphere_radius(),
            resample_interval_ms: Self::default_resample_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolSlotConfig {
    pub name: String,
    #[serde(default)]
    pub multi_instance: bool,
    #[serde(default)]
    pub max_clones: Option<usize>,
}

impl ToolSlotConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), multi_instance: false, max_clones: None }
    }

    pub fn clonable(mut self, max_clones: Option<usize>) -> Self {
        self.multi_instance = true;
        self.max_clones = max_clones;
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WheelConfig {
    #[serde(default = "WheelConfig::default_icon_spacing")]
    pub icon_spacing: f32,
    #[serde(default = "WheelConfig::default_wheel_radius")]
    pub wheel_radius: f32,
    #[serde(default = "WheelConfig::default_slots")]
    pub slots: Vec<ToolSlotConfig>,
}

impl WheelConfig {
    const fn default_icon_spacing() -> f32 {
        0.12
    }

    const fn default_wheel_radius() -> f32 {
        0.3
    }

    fn default_slots() -> Vec<ToolSlotConfig> {
        vec![
            ToolSlotConfig::new("slice").clonable(Some(3)),
            ToolSlotConfig::new("colormap"),
            ToolSlotConfig::new("probe").clonable(None),
        ]
    }
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            icon_spacing: Self::default_icon_spacing(),
            wheel_radius: Self::default_wheel_radius(),
            slots: Self::default_slots(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriftConfig {
    #[serde(default = "DriftConfig::default_threshold")]
    pub threshold: f32,
    #[serde(default = "DriftConfig::default_step")]
    pub step: f32,
    #[serde(default = "DriftConfig::default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "DriftConfig::default_initial_offset")]
    pub initial_offset: f32,
}

impl DriftConfig {
    const fn default_threshold() -> f32 {
        0.9
    }

    const fn default_step() -> f32 {
        0.05
    }

    const fn default_interval_ms() -> u64 {
        100
    }

    const fn default_initial_offset() -> f32 {
        -0.35
    }
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            threshold: Self::default_threshold(),
            step: Self::default_step(),
            interval_ms: Self::default_interval_ms(),
            initial_offset: Self::default_initial_offset(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FocusConfig {
    #[serde(default)]
    pub emission: EmissionConfig,
    #[serde(default)]
    pub focus: FocusSettings,
    #[serde(default)]
    pub wheel: WheelConfig,
    #[serde(default)]
    pub drift: DriftConfig,
}

#[derive(Debug, Clone, Default)]
pub struct FocusConfigOverrides {
    pub source: Option<PathBuf>,
    pub device: Option<DeviceClass>,
    pub spawn_rate: Option<f32>,
}

impl FocusConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_slice(&bytes).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let cfg: FocusConfig = serde_json::from_slice(bytes)?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &FocusConfigOverrides) {
        if let Some(source) = &overrides.source {
            self.emission.source = Some(source.clone());
        }
        if let Some(device) = overrides.device {
            self.emission.device = device;
        }
        if let Some(rate) = overrides.spawn_rate {
            self.emission.spawn_rate = rate;
        }
    }
}

impl FocusConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.source.is_none() && self.device.is_none() && self.spawn_rate.is_none()
    }
}
