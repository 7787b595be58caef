use crate::backend::ParticleBackend;
use crate::config::{EmissionConfig, EmissionConfigDiff};
use crate::time::PlaybackClock;

/// Spawn parameters shared by every particle of a configuration epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionOptions {
    pub lifetime: f32,
    pub size: f32,
    pub size_out_of_focus: f32,
    pub colormap_min_pressure: f32,
    pub colormap_max_pressure: f32,
    pub reverse_colormap: bool,
    pub hide_out_of_range: bool,
    pub timestamp: f32,
}

impl EmissionOptions {
    pub fn from_config(config: &EmissionConfig) -> Self {
        let (min_pressure, max_pressure) = if config.colormap_min_pressure <= config.colormap_max_pressure {
            (config.colormap_min_pressure, config.colormap_max_pressure)
        } else {
            log::debug!(
                "colormap pressure range inverted ({} > {}), swapping",
                config.colormap_min_pressure,
                config.colormap_max_pressure
            );
            (config.colormap_max_pressure, config.colormap_min_pressure)
        };
        Self {
            lifetime: config.lifetime.max(0.0),
            size: config.size.max(0.0),
            size_out_of_focus: config.size_out_of_focus.max(0.0),
            colormap_min_pressure: min_pressure,
            colormap_max_pressure: max_pressure,
            reverse_colormap: config.reverse_colormap,
            hide_out_of_range: config.hide_out_of_range,
            timestamp: 0.0,
        }
    }

    pub fn stamped(&self, timestamp: f32) -> Self {
        Self { timestamp, ..*self }
    }
}

/// Number of particles to request for one frame. Fractions are dropped, not carried.
pub fn spawn_count(spawn_rate: f32, spawn_rate_factor: f32, delta: f32) -> u32 {
    if !(delta > 0.0) {
        return 0;
    }
    let desired = spawn_rate.max(0.0) * spawn_rate_factor.max(0.0) * delta;
    if !desired.is_finite() {
        return 0;
    }
    desired.floor().min(u32::MAX as f32) as u32
}

pub struct EmissionScheduler {
    config: EmissionConfig,
    spawn_rate_factor: f32,
    options: EmissionOptions,
    clock: PlaybackClock,
    epoch: u64,
}

impl EmissionScheduler {
    pub fn new(config: &EmissionConfig) -> Self {
        let spawn_rate_factor = config.device.spawn_rate_factor();
        log::info!(
            "emission configured: rate={} factor={} time_scale={} device={:?}",
            config.spawn_rate,
            spawn_rate_factor,
            config.time_scale,
            config.device
        );
        Self {
            config: config.clone(),
            spawn_rate_factor,
            options: EmissionOptions::from_config(config),
            clock: PlaybackClock::new(),
            epoch: 0,
        }
    }

    /// Applies a partial configuration and starts a new options epoch.
    /// The device throttle is fixed for the lifetime of the scheduler.
    pub fn update_config(&mut self, diff: &EmissionConfigDiff) {
        if diff.is_empty() {
            return;
        }
        diff.apply_to(&mut self.config);
        self.options = EmissionOptions::from_config(&self.config);
        self.epoch += 1;
        log::debug!("emission epoch {} ({})", self.epoch, diff.applied_fields().join(", "));
    }

    /// Advances playback by `elapsed_seconds * time_scale` and issues that frame's spawn requests.
    /// Returns the number of requests issued. Pool sizing is the backend's concern; every request
    /// is forwarded.
    pub fn tick(&mut self, elapsed_seconds: f32, backend: &mut dyn ParticleBackend) -> u32 {
        let delta = elapsed_seconds * self.config.time_scale;
        self.clock.advance(delta);
        let count = spawn_count(self.config.spawn_rate, self.spawn_rate_factor, delta);
        let stamped = self.options.stamped(self.clock.seconds());
        for _ in 0..count {
            backend.spawn_particle(&stamped);
        }
        count
    }

    pub fn playback_time(&self) -> f32 {
        self.clock.seconds()
    }

    pub fn spawn_rate_factor(&self) -> f32 {
        self.spawn_rate_factor
    }

    pub fn options(&self) -> &EmissionOptions {
        &self.options
    }

    pub fn config(&self) -> &EmissionConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
