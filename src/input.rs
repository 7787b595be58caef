use serde::Deserialize;

/// Raw controller events as delivered by the input driver.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControllerEvent {
    /// Tool hand: stick touched, a new gesture begins.
    GestureStart,
    /// Tool hand: stick sample in `[-1, 1]`.
    GestureMove { x: f32, y: f32 },
    GestureEnd,
    /// Focus hand buttons. `control` indexes the session's focus controls.
    MenuDown {
        #[serde(default)]
        control: usize,
    },
    TriggerDown {
        #[serde(default)]
        control: usize,
    },
    Thumbstick {
        #[serde(default)]
        control: usize,
        x: f32,
        y: f32,
    },
}

/// Events collected between frames, drained by the session's tick in arrival order.
#[derive(Debug, Default)]
pub struct ControllerInput {
    events: Vec<ControllerEvent>,
}

impl ControllerInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ControllerEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<ControllerEvent> {
        self.events.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_events() {
        let events: Vec<ControllerEvent> = serde_json::from_str(
            r#"[{"type":"gesture_start"},{"type":"gesture_move","x":0.8,"y":0.1},
                {"type":"trigger_down"},{"type":"thumbstick","control":1,"x":0.0,"y":-1.0}]"#,
        )
        .expect("parse events");
        assert_eq!(events[0], ControllerEvent::GestureStart);
        assert_eq!(events[1], ControllerEvent::GestureMove { x: 0.8, y: 0.1 });
        assert_eq!(events[2], ControllerEvent::TriggerDown { control: 0 });
        assert_eq!(events[3], ControllerEvent::Thumbstick { control: 1, x: 0.0, y: -1.0 });
    }

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut input = ControllerInput::new();
        input.push(ControllerEvent::GestureStart);
        input.push(ControllerEvent::GestureEnd);
        assert_eq!(input.drain(), vec![ControllerEvent::GestureStart, ControllerEvent::GestureEnd]);
        assert!(input.is_empty());
    }
}
