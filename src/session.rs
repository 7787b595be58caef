//! Per-frame driver tying emission, focus sampling and the tool wheel together.
//!
//! Shared state (focus regions, released widgets, the scene and the particle backend) is owned by
//! the host and lent to the session on every call through [`SessionContext`].

use crate::backend::{BackendSetup, FrameUniforms, ParticleBackend};
use crate::config::{EmissionConfigDiff, FocusConfig};
use crate::emission::EmissionScheduler;
use crate::error::TeardownError;
use crate::focus::{FocusAggregator, FocusRegistry};
use crate::focus_control::{FocusRig, FocusToggle};
use crate::gesture::{GestureRouter, ToolCommand};
use crate::input::{ControllerEvent, ControllerInput};
use crate::scene::{SceneGraph, Transform3D};
use crate::source::SourceData;
use crate::tool_wheel::{SlotEntities, ToolSelector, ToolSlot, ViewMode, WheelLayout};
use crate::widgets::{Recalled, ReleaseOutcome, ReleasedWidgets, WidgetLifecycleManager};
use anyhow::{bail, Context, Result};
use bevy_ecs::prelude::Entity;

pub struct SessionContext<'a> {
    pub focus: &'a mut FocusRegistry,
    pub widgets: &'a mut ReleasedWidgets,
    pub scene: &'a mut dyn SceneGraph,
    pub backend: &'a mut dyn ParticleBackend,
}

/// Scene entities the session binds to at construction.
#[derive(Debug, Clone)]
pub struct SessionLayout {
    /// Entity the particle effect object is mounted under.
    pub effect_host: Entity,
    pub wheel: WheelLayout,
    /// One entry per configured wheel slot, in order.
    pub slots: Vec<SlotEntities>,
    pub focus_rigs: Vec<FocusRig>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandOutcome {
    ViewToggled(ViewMode),
    Selected(usize),
    Released(ReleaseOutcome),
    Fetched(Option<Recalled>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    pub spawned: u32,
    pub focus_active: bool,
    pub focus_regions: usize,
    pub commands: usize,
}

pub struct InteractionSession {
    scheduler: EmissionScheduler,
    aggregator: FocusAggregator,
    router: GestureRouter,
    selector: ToolSelector,
    widgets: WidgetLifecycleManager,
    focus_controls: Vec<FocusToggle>,
    effect_mount: Option<Entity>,
    pending: ControllerInput,
    poisoned: bool,
    disposed: bool,
}

impl InteractionSession {
    pub fn new(
        config: &FocusConfig,
        source: &SourceData,
        layout: SessionLayout,
        ctx: &mut SessionContext<'_>,
    ) -> Result<Self> {
        if layout.slots.len() != config.wheel.slots.len() {
            bail!(
                "wheel config lists {} slots but the layout provides {}",
                config.wheel.slots.len(),
                layout.slots.len()
            );
        }
        let emission = &config.emission;
        ctx.backend
            .configure(&BackendSetup {
                max_particles: emission.max_particles,
                fps: emission.fps(),
                colormap: &emission.colormap,
                sprite: &emission.sprite,
                source,
            })
            .context("particle backend rejected setup")?;

        let slots = config
            .wheel
            .slots
            .iter()
            .zip(layout.slots.iter())
            .enumerate()
            .map(|(index, (slot_cfg, entities))| ToolSlot::new(index, slot_cfg, *entities))
            .collect();
        let mut selector = ToolSelector::new(&config.wheel, slots, layout.wheel)?;
        selector.set_active_icon(0, None, &mut *ctx.scene);

        let focus_controls = layout
            .focus_rigs
            .iter()
            .map(|rig| FocusToggle::new(*rig, None, &config.drift, &mut *ctx.focus, &mut *ctx.scene))
            .collect();

        let effect_mount = ctx.scene.spawn(Some(layout.effect_host), Transform3D::default());
        log::info!(
            "session ready: {} frames / {} particles of source data, {} tools, {} focus controls",
            source.frame_count(),
            source.total_particles(),
            selector.slot_count(),
            layout.focus_rigs.len()
        );

        Ok(Self {
            scheduler: EmissionScheduler::new(emission),
            aggregator: FocusAggregator::new(&config.focus),
            router: GestureRouter::new(),
            selector,
            widgets: WidgetLifecycleManager::new(),
            focus_controls,
            effect_mount: Some(effect_mount),
            pending: ControllerInput::new(),
            poisoned: false,
            disposed: false,
        })
    }

    pub fn selector(&self) -> &ToolSelector {
        &self.selector
    }

    pub fn scheduler(&self) -> &EmissionScheduler {
        &self.scheduler
    }

    pub fn focus_controls(&self) -> &[FocusToggle] {
        &self.focus_controls
    }

    pub fn effect_mount(&self) -> Option<Entity> {
        self.effect_mount
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn update_config(&mut self, diff: &EmissionConfigDiff) {
        self.scheduler.update_config(diff);
    }

    /// Queues an event for the next `tick`.
    pub fn push_event(&mut self, event: ControllerEvent) {
        self.pending.push(event);
    }

    /// Handles an event immediately, dispatching any command it produces. Events reaching a
    /// disposed session are dropped.
    pub fn handle_event(
        &mut self,
        event: ControllerEvent,
        ctx: &mut SessionContext<'_>,
    ) -> Result<Option<(ToolCommand, CommandOutcome)>, TeardownError> {
        self.ensure_live()?;
        if self.disposed {
            log::debug!("ignoring {event:?} after dispose");
            return Ok(None);
        }
        match event {
            ControllerEvent::GestureStart => self.router.gesture_start(),
            ControllerEvent::GestureEnd => self.router.gesture_end(),
            ControllerEvent::GestureMove { x, y } => {
                if let Some(command) = self.router.gesture_move(x, y) {
                    let outcome = self.dispatch(command, ctx)?;
                    return Ok(Some((command, outcome)));
                }
            }
            ControllerEvent::MenuDown { control } => {
                if let Some(toggle) = self.focus_control_mut(control) {
                    toggle.menu_down(&mut *ctx.scene);
                }
            }
            ControllerEvent::TriggerDown { control } => {
                if let Some(toggle) = self.focus_control_mut(control) {
                    toggle.trigger_down(&mut *ctx.focus);
                }
            }
            ControllerEvent::Thumbstick { control, x, y } => {
                if let Some(toggle) = self.focus_control_mut(control) {
                    toggle.thumbstick(x, y);
                }
            }
        }
        Ok(None)
    }

    pub fn dispatch(
        &mut self,
        command: ToolCommand,
        ctx: &mut SessionContext<'_>,
    ) -> Result<CommandOutcome, TeardownError> {
        self.ensure_live()?;
        if self.disposed {
            return Err(TeardownError::Disposed);
        }
        log::debug!("dispatching {command}");
        let outcome = match command {
            ToolCommand::ToggleView => {
                CommandOutcome::ViewToggled(self.selector.toggle_view(&mut *ctx.scene))
            }
            ToolCommand::SelectPrev => CommandOutcome::Selected(self.selector.select_prev(&mut *ctx.scene)),
            ToolCommand::SelectNext => CommandOutcome::Selected(self.selector.select_next(&mut *ctx.scene)),
            ToolCommand::ReleaseWidget => CommandOutcome::Released(self.widgets.release(
                &self.selector,
                &mut *ctx.widgets,
                &mut *ctx.scene,
            )),
            ToolCommand::FetchWidget => {
                let fetched = self
                    .widgets
                    .fetch(&mut self.selector, &mut *ctx.widgets, &mut *ctx.scene)
                    .map_err(|err| self.poison(err))?;
                CommandOutcome::Fetched(fetched)
            }
        };
        Ok(outcome)
    }

    /// Per-frame entry point: drains queued events, emits particles, resamples focus and
    /// pushes the frame uniforms.
    pub fn tick(
        &mut self,
        timestamp_ms: f64,
        delta_ms: f64,
        ctx: &mut SessionContext<'_>,
    ) -> Result<FrameReport, TeardownError> {
        self.ensure_live()?;
        if self.disposed {
            return Ok(FrameReport::default());
        }
        let mut report = FrameReport::default();
        for event in self.pending.drain() {
            if self.handle_event(event, ctx)?.is_some() {
                report.commands += 1;
            }
        }
        for toggle in &mut self.focus_controls {
            toggle.tick(timestamp_ms, &mut *ctx.scene);
        }

        report.spawned = self.scheduler.tick((delta_ms / 1000.0) as f32, &mut *ctx.backend);

        let sample = match self.aggregator.refresh(timestamp_ms, &*ctx.focus, &*ctx.scene) {
            Ok(sample) => sample.clone(),
            Err(err) => return Err(self.poison(err)),
        };
        report.focus_active = sample.any_active;
        report.focus_regions = sample.positions.len();
        ctx.backend.update_particles(&FrameUniforms {
            playback_time: self.scheduler.playback_time(),
            focus_active: sample.any_active,
            positions: sample.positions,
            radii: sample.radii,
        });
        Ok(report)
    }

    /// Deregisters focus regions and unmounts the effect in one step. Released widgets stay in
    /// the world.
    pub fn dispose(&mut self, ctx: &mut SessionContext<'_>) {
        if self.disposed {
            return;
        }
        for toggle in &mut self.focus_controls {
            toggle.dispose(&mut *ctx.focus);
        }
        if let Some(mount) = self.effect_mount.take() {
            ctx.scene.despawn(mount);
        }
        self.pending.clear();
        self.router.gesture_end();
        self.disposed = true;
        log::info!("session disposed");
    }

    fn focus_control_mut(&mut self, control: usize) -> Option<&mut FocusToggle> {
        let toggle = self.focus_controls.get_mut(control);
        if toggle.is_none() {
            log::debug!("no focus control at index {control}");
        }
        toggle
    }

    fn ensure_live(&self) -> Result<(), TeardownError> {
        if self.poisoned {
            Err(TeardownError::Poisoned)
        } else {
            Ok(())
        }
    }

    fn poison(&mut self, err: TeardownError) -> TeardownError {
        log::error!("teardown ordering violated: {err}");
        self.poisoned = true;
        err
    }
}
