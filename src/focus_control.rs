use crate::config::DriftConfig;
use crate::focus::{FocusHandle, FocusRegion, FocusRegistry};
use crate::gesture::DistanceDrift;
use crate::scene::SceneGraph;
use bevy_ecs::prelude::Entity;
use glam::Vec3;

/// Scene pieces of a hand-held focus control.
#[derive(Debug, Clone, Copy)]
pub struct FocusRig {
    /// Entity pushed along local -z by the drift offset; the focus region follows it.
    pub offset: Entity,
    /// Optional translucent sphere showing the focus extent.
    pub sphere: Option<Entity>,
}

/// Controller-held focus region: menu toggles the sphere, trigger toggles the region and the
/// stick slides it nearer or further.
pub struct FocusToggle {
    rig: FocusRig,
    region: Option<FocusHandle>,
    active: bool,
    show_sphere: bool,
    drift: DistanceDrift,
}

impl FocusToggle {
    /// Registers an inactive region that follows `rig.offset`.
    pub fn new(
        rig: FocusRig,
        radius: Option<f32>,
        drift: &DriftConfig,
        registry: &mut FocusRegistry,
        scene: &mut dyn SceneGraph,
    ) -> Self {
        let mut region = FocusRegion::following(rig.offset).inactive();
        region.radius = radius;
        let handle = registry.register(region);
        let toggle = Self {
            rig,
            region: Some(handle),
            active: false,
            show_sphere: false,
            drift: DistanceDrift::new(drift),
        };
        if let Some(sphere) = rig.sphere {
            scene.set_visible(sphere, false);
        }
        toggle.write_offset(scene);
        toggle
    }

    pub fn handle(&self) -> Option<FocusHandle> {
        self.region
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sphere_visible(&self) -> bool {
        self.show_sphere
    }

    pub fn offset(&self) -> f32 {
        self.drift.offset()
    }

    pub fn menu_down(&mut self, scene: &mut dyn SceneGraph) {
        self.show_sphere = !self.show_sphere;
        if let Some(sphere) = self.rig.sphere {
            scene.set_visible(sphere, self.show_sphere);
        }
    }

    pub fn trigger_down(&mut self, registry: &mut FocusRegistry) {
        self.active = !self.active;
        if let Some(handle) = self.region {
            if !registry.set_active(handle, self.active) {
                log::warn!("focus region {handle:?} missing from registry");
            }
        }
    }

    pub fn thumbstick(&mut self, _x: f32, y: f32) {
        self.drift.axis(y);
    }

    pub fn tick(&mut self, now_ms: f64, scene: &mut dyn SceneGraph) {
        if self.drift.tick(now_ms) {
            self.write_offset(scene);
        }
    }

    /// Unregisters the region. Safe to call more than once.
    pub fn dispose(&mut self, registry: &mut FocusRegistry) {
        if let Some(handle) = self.region.take() {
            registry.unregister(handle);
        }
    }

    fn write_offset(&self, scene: &mut dyn SceneGraph) {
        scene.set_translation(self.rig.offset, Vec3::new(0.0, 0.0, self.drift.offset()));
    }
}
