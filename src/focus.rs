use crate::config::FocusSettings;
use crate::error::TeardownError;
use crate::scene::SceneGraph;
use crate::time::TimeGate;
use bevy_ecs::prelude::Entity;
use glam::Vec3;
use smallvec::SmallVec;

/// The particle backend exposes three focus uniforms.
pub const MAX_FOCUS_REGIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FocusHandle(u64);

/// A sphere that modulates particle appearance. When `anchor` is set the region follows
/// that scene entity and `position` is ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusRegion {
    pub position: Vec3,
    pub radius: Option<f32>,
    pub active: bool,
    pub anchor: Option<Entity>,
}

impl FocusRegion {
    pub fn at(position: Vec3) -> Self {
        Self { position, radius: None, active: true, anchor: None }
    }

    pub fn following(anchor: Entity) -> Self {
        Self { position: Vec3::ZERO, radius: None, active: true, anchor: Some(anchor) }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = Some(radius);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Focus regions in registration order.
#[derive(Debug, Default)]
pub struct FocusRegistry {
    entries: Vec<(FocusHandle, FocusRegion)>,
    next_id: u64,
}

impl FocusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, region: FocusRegion) -> FocusHandle {
        let handle = FocusHandle(self.next_id);
        self.next_id += 1;
        self.entries.push((handle, region));
        handle
    }

    pub fn unregister(&mut self, handle: FocusHandle) -> Option<FocusRegion> {
        let index = self.entries.iter().position(|(h, _)| *h == handle)?;
        Some(self.entries.remove(index).1)
    }

    pub fn get(&self, handle: FocusHandle) -> Option<&FocusRegion> {
        self.entries.iter().find(|(h, _)| *h == handle).map(|(_, r)| r)
    }

    pub fn get_mut(&mut self, handle: FocusHandle) -> Option<&mut FocusRegion> {
        self.entries.iter_mut().find(|(h, _)| *h == handle).map(|(_, r)| r)
    }

    pub fn set_active(&mut self, handle: FocusHandle, active: bool) -> bool {
        match self.get_mut(handle) {
            Some(region) => {
                region.active = active;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FocusHandle, &FocusRegion)> {
        self.entries.iter().map(|(h, r)| (*h, r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FocusSample {
    pub positions: SmallVec<[Vec3; MAX_FOCUS_REGIONS]>,
    pub radii: SmallVec<[f32; MAX_FOCUS_REGIONS]>,
    pub any_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleCadence {
    EveryFrame,
    IntervalMs(f64),
}

impl SampleCadence {
    pub fn from_settings(settings: &FocusSettings) -> Self {
        match settings.resample_interval_ms {
            Some(ms) => SampleCadence::IntervalMs(ms as f64),
            None => SampleCadence::EveryFrame,
        }
    }
}

pub struct FocusAggregator {
    fallback_radius: f32,
    gate: Option<TimeGate>,
    last: FocusSample,
}

impl FocusAggregator {
    pub fn new(settings: &FocusSettings) -> Self {
        Self::with_cadence(settings.focus_sphere_radius, SampleCadence::from_settings(settings))
    }

    pub fn with_cadence(fallback_radius: f32, cadence: SampleCadence) -> Self {
        let gate = match cadence {
            SampleCadence::EveryFrame => None,
            SampleCadence::IntervalMs(ms) => Some(TimeGate::new(ms)),
        };
        Self { fallback_radius: fallback_radius.max(0.0), gate, last: FocusSample::default() }
    }

    /// Resolves the first three active regions to world space.
    pub fn sample(
        &self,
        registry: &FocusRegistry,
        scene: &dyn SceneGraph,
    ) -> Result<FocusSample, TeardownError> {
        let mut sample = FocusSample::default();
        for (handle, region) in registry.iter().filter(|(_, r)| r.active).take(MAX_FOCUS_REGIONS) {
            let position = match region.anchor {
                Some(anchor) => {
                    scene.world_position(anchor).ok_or(TeardownError::StaleFocusRegion(handle))?
                }
                None => region.position,
            };
            let radius = match region.radius {
                Some(r) if r.is_finite() => r.max(0.0),
                _ => self.fallback_radius,
            };
            sample.positions.push(position);
            sample.radii.push(radius);
        }
        sample.any_active = !sample.positions.is_empty();
        Ok(sample)
    }

    /// Resamples when the cadence allows and returns the latest result either way.
    pub fn refresh(
        &mut self,
        now_ms: f64,
        registry: &FocusRegistry,
        scene: &dyn SceneGraph,
    ) -> Result<&FocusSample, TeardownError> {
        let due = match self.gate.as_mut() {
            Some(gate) => gate.ready(now_ms),
            None => true,
        };
        if due {
            self.last = self.sample(registry, scene)?;
        }
        Ok(&self.last)
    }

    pub fn last(&self) -> &FocusSample {
        &self.last
    }

    /// Forces the next `refresh` to resample.
    pub fn invalidate(&mut self) {
        if let Some(gate) = self.gate.as_mut() {
            gate.reset();
        }
    }
}
