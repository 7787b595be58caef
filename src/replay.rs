//! Headless replay: builds a reference scene, feeds a scripted sequence of frames and controller
//! events through an [`InteractionSession`] and summarises what happened.

use crate::backend::ParticleLog;
use crate::config::FocusConfig;
use crate::focus::FocusRegistry;
use crate::focus_control::FocusRig;
use crate::gesture::ToolCommand;
use crate::input::ControllerEvent;
use crate::scene::{SceneGraph, SceneWorld, Transform3D};
use crate::session::{CommandOutcome, InteractionSession, SessionContext, SessionLayout};
use crate::source::SourceData;
use crate::tool_wheel::{SlotEntities, WheelLayout};
use crate::widgets::{ReleaseOutcome, ReleasedWidgets};
use anyhow::{Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFrame {
    #[serde(default = "ReplayFrame::default_delta_ms")]
    pub delta_ms: f64,
    #[serde(default)]
    pub events: Vec<ControllerEvent>,
}

impl ReplayFrame {
    fn default_delta_ms() -> f64 {
        1000.0 / 60.0
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReplayScript {
    #[serde(default)]
    pub frames: Vec<ReplayFrame>,
}

impl ReplayScript {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read replay script {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse replay script {}", path.display()))
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub spawned: u64,
    pub playback_time: f32,
    pub commands: Vec<ToolCommand>,
    pub released: usize,
    pub release_refused: usize,
    pub fetched: usize,
    pub final_tool: usize,
    pub widgets_in_world: usize,
    pub focus_active_frames: usize,
}

/// Reference rig: a hand-held wheel with a hub, one focus control, one slot per configured tool.
pub struct DemoScene {
    pub scene: SceneWorld,
    pub layout: SessionLayout,
}

impl DemoScene {
    pub fn build(config: &FocusConfig) -> Self {
        let mut scene = SceneWorld::new();
        let effect_host = scene.spawn_labeled("particles", None, Transform3D::default());
        let tool_hand =
            scene.spawn_labeled("tool-hand", None, Transform3D::from_translation(Vec3::new(0.2, 1.2, -0.3)));
        let wheel = scene.spawn_labeled("wheel", Some(tool_hand), Transform3D::default());
        let hub_offset = Transform3D::from_translation(Vec3::new(0.0, 0.1, 0.0));
        let hub = scene.spawn_labeled("hub", Some(tool_hand), hub_offset);
        let templates = scene.spawn_labeled("templates", None, Transform3D::default());
        scene.set_visible(templates, false);

        let slots = config
            .wheel
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let radius = config.wheel.wheel_radius.max(f32::EPSILON);
                let angle = i as f32 * config.wheel.icon_spacing / radius;
                let icon_pos = Vec3::new(angle.sin(), angle.cos(), 0.0) * config.wheel.wheel_radius;
                let icon = scene.spawn_labeled(
                    &format!("icon:{}", slot.name),
                    Some(wheel),
                    Transform3D::from_translation(icon_pos),
                );
                let info =
                    scene.spawn_labeled(&format!("info:{}", slot.name), Some(icon), Transform3D::default());
                let template = scene.spawn_labeled(
                    &format!("template:{}", slot.name),
                    Some(templates),
                    Transform3D::default(),
                );
                scene.spawn_labeled(&format!("widget:{}", slot.name), Some(template), Transform3D::default());
                SlotEntities { icon, info: Some(info), widget_template: template }
            })
            .collect();

        let focus_hand_pose = Transform3D::from_translation(Vec3::new(-0.2, 1.2, -0.3));
        let focus_hand = scene.spawn_labeled("focus-hand", None, focus_hand_pose);
        let offset = scene.spawn_labeled("focus-offset", Some(focus_hand), Transform3D::default());
        let sphere = scene.spawn_labeled("focus-sphere", Some(offset), Transform3D::default());

        let layout = SessionLayout {
            effect_host,
            wheel: WheelLayout { wheel, hub, anchor: hub },
            slots,
            focus_rigs: vec![FocusRig { offset, sphere: Some(sphere) }],
        };
        Self { scene, layout }
    }
}

pub fn run_replay(config: &FocusConfig, source: &SourceData, script: &ReplayScript) -> Result<ReplaySummary> {
    let DemoScene { mut scene, layout } = DemoScene::build(config);
    let mut focus = FocusRegistry::new();
    let mut widgets = ReleasedWidgets::new();
    let mut backend = ParticleLog::new();
    let mut summary = ReplaySummary::default();

    let mut ctx =
        SessionContext { focus: &mut focus, widgets: &mut widgets, scene: &mut scene, backend: &mut backend };
    let mut session = InteractionSession::new(config, source, layout, &mut ctx)?;

    let mut now_ms = 0.0f64;
    for frame in &script.frames {
        now_ms += frame.delta_ms;
        for event in &frame.events {
            if let Some((command, outcome)) = session.handle_event(*event, &mut ctx)? {
                summary.commands.push(command);
                match outcome {
                    CommandOutcome::Released(ReleaseOutcome::Released(_)) => summary.released += 1,
                    CommandOutcome::Released(_) => summary.release_refused += 1,
                    CommandOutcome::Fetched(Some(_)) => summary.fetched += 1,
                    _ => {}
                }
            }
        }
        let report = session.tick(now_ms, frame.delta_ms, &mut ctx)?;
        summary.spawned += u64::from(report.spawned);
        if report.focus_active {
            summary.focus_active_frames += 1;
        }
        summary.frames += 1;
    }

    summary.playback_time = session.scheduler().playback_time();
    summary.final_tool = session.selector().current_index();
    summary.widgets_in_world = ctx.widgets.len();
    session.dispose(&mut ctx);
    Ok(summary)
}
