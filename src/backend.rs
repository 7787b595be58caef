use crate::emission::EmissionOptions;
use crate::focus::MAX_FOCUS_REGIONS;
use crate::source::SourceData;
use anyhow::Result;
use glam::Vec3;
use smallvec::SmallVec;
use std::path::Path;

/// Per-frame uniforms forwarded to the particle backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameUniforms {
    pub playback_time: f32,
    pub focus_active: bool,
    pub positions: SmallVec<[Vec3; MAX_FOCUS_REGIONS]>,
    pub radii: SmallVec<[f32; MAX_FOCUS_REGIONS]>,
}

/// Everything the backend needs to build its GPU resources.
pub struct BackendSetup<'a> {
    pub max_particles: u32,
    pub fps: f32,
    pub colormap: &'a Path,
    pub sprite: &'a Path,
    pub source: &'a SourceData,
}

/// GPU particle simulation. Owns particle state; the interaction layer only feeds it.
pub trait ParticleBackend {
    fn configure(&mut self, setup: &BackendSetup<'_>) -> Result<()>;
    fn spawn_particle(&mut self, options: &EmissionOptions);
    fn update_particles(&mut self, uniforms: &FrameUniforms);
}

/// Backend that records what it was asked to do.
#[derive(Debug, Default, Clone)]
pub struct ParticleLog {
    pub configured: Option<(u32, f32)>,
    pub spawned: Vec<EmissionOptions>,
    pub updates: Vec<FrameUniforms>,
}

impl ParticleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_update(&self) -> Option<&FrameUniforms> {
        self.updates.last()
    }

    pub fn clear(&mut self) {
        self.spawned.clear();
        self.updates.clear();
    }
}

impl ParticleBackend for ParticleLog {
    fn configure(&mut self, setup: &BackendSetup<'_>) -> Result<()> {
        self.configured = Some((setup.max_particles, setup.fps));
        Ok(())
    }

    fn spawn_particle(&mut self, options: &EmissionOptions) {
        self.spawned.push(*options);
    }

    fn update_particles(&mut self, uniforms: &FrameUniforms) {
        self.updates.push(uniforms.clone());
    }
}
