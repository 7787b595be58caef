use crate::config::DriftConfig;
use crate::time::TimeGate;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Centre zone, compared against the squared stick magnitude. Landing here toggles the
/// view rather than being ignored.
pub const TOGGLE_ZONE_SQ: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCommand {
    ToggleView,
    SelectPrev,
    SelectNext,
    FetchWidget,
    ReleaseWidget,
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ToolCommand::ToggleView => "toggle_view",
            ToolCommand::SelectPrev => "select_prev",
            ToolCommand::SelectNext => "select_next",
            ToolCommand::FetchWidget => "fetch_widget",
            ToolCommand::ReleaseWidget => "release_widget",
        };
        f.write_str(label)
    }
}

pub fn classify(x: f32, y: f32) -> ToolCommand {
    if x * x + y * y < TOGGLE_ZONE_SQ {
        ToolCommand::ToggleView
    } else if x.abs() > y.abs() {
        if x > 0.0 {
            ToolCommand::SelectPrev
        } else {
            ToolCommand::SelectNext
        }
    } else if y > 0.0 {
        ToolCommand::FetchWidget
    } else {
        ToolCommand::ReleaseWidget
    }
}

/// Turns one physical stick gesture into at most one command.
#[derive(Debug, Default)]
pub struct GestureRouter {
    listening: bool,
    consumed: bool,
}

impl GestureRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture_start(&mut self) {
        self.listening = true;
        self.consumed = false;
    }

    /// Classifies the first usable sample of the current gesture; later samples are ignored.
    /// Non-finite samples are dropped without consuming the gesture. Overlong samples are scaled
    /// back onto the unit circle.
    pub fn gesture_move(&mut self, x: f32, y: f32) -> Option<ToolCommand> {
        if !self.listening || self.consumed {
            return None;
        }
        if !x.is_finite() || !y.is_finite() {
            log::debug!("dropping non-finite gesture sample ({x}, {y})");
            return None;
        }
        let stick = Vec2::new(x, y).clamp_length_max(1.0);
        let command = classify(stick.x, stick.y);
        self.consumed = true;
        self.listening = false;
        Some(command)
    }

    pub fn gesture_end(&mut self) {
        self.listening = false;
    }

    pub fn is_listening(&self) -> bool {
        self.listening && !self.consumed
    }
}

/// Slow exponential drift of a scalar offset while a stick axis is pushed past a threshold.
/// Pushing forward shrinks the offset, pulling back grows it.
#[derive(Debug, Clone)]
pub struct DistanceDrift {
    offset: f32,
    factor: f32,
    changing: bool,
    threshold: f32,
    step: f32,
    gate: TimeGate,
}

impl DistanceDrift {
    pub fn new(config: &DriftConfig) -> Self {
        Self {
            offset: config.initial_offset,
            factor: 1.0,
            changing: false,
            threshold: config.threshold,
            step: config.step,
            gate: TimeGate::new(config.interval_ms as f64),
        }
    }

    pub fn axis(&mut self, value: f32) {
        if value > self.threshold {
            self.factor = 1.0 - self.step;
            self.changing = true;
        } else if value < -self.threshold {
            self.factor = 1.0 + self.step;
            self.changing = true;
        } else {
            self.factor = 1.0;
            self.changing = false;
        }
    }

    /// Applies one drift step if the gate is open. Returns true when the offset changed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if !self.gate.ready(now_ms) {
            return false;
        }
        if self.changing {
            self.offset *= self.factor;
            return true;
        }
        false
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn is_changing(&self) -> bool {
        self.changing
    }
}
