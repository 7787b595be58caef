use crate::config::{ToolSlotConfig, WheelConfig};
use crate::scene::SceneGraph;
use anyhow::{bail, Result};
use bevy_ecs::prelude::Entity;
use glam::Quat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Icon,
    Widget,
}

/// Scene entities backing one wheel slot.
#[derive(Debug, Clone, Copy)]
pub struct SlotEntities {
    pub icon: Entity,
    /// Auxiliary label shown only while the slot is active.
    pub info: Option<Entity>,
    /// Default widget content cloned into the hub on fresh selection.
    pub widget_template: Entity,
}

#[derive(Debug, Clone)]
pub struct ToolSlot {
    pub index: usize,
    pub name: String,
    pub icon: Entity,
    pub info: Option<Entity>,
    pub widget_template: Entity,
    pub multi_instance: bool,
    pub max_clones: Option<usize>,
}

impl ToolSlot {
    pub fn new(index: usize, config: &ToolSlotConfig, entities: SlotEntities) -> Self {
        Self {
            index,
            name: config.name.clone(),
            icon: entities.icon,
            info: entities.info,
            widget_template: entities.widget_template,
            multi_instance: config.multi_instance,
            max_clones: config.max_clones,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WheelLayout {
    /// Rotating parent of the icons.
    pub wheel: Entity,
    /// Where the active widget is mounted for live editing.
    pub hub: Entity,
    /// Reference point for nearest-widget recall.
    pub anchor: Entity,
}

pub struct ToolSelector {
    slots: Vec<ToolSlot>,
    layout: WheelLayout,
    angular_step: f32,
    current: usize,
    view: ViewMode,
}

impl ToolSelector {
    pub fn new(config: &WheelConfig, slots: Vec<ToolSlot>, layout: WheelLayout) -> Result<Self> {
        if slots.is_empty() {
            bail!("tool wheel needs at least one slot");
        }
        if !(config.wheel_radius > 0.0) {
            bail!("wheel_radius must be positive, got {}", config.wheel_radius);
        }
        Ok(Self {
            slots,
            layout,
            angular_step: config.icon_spacing / config.wheel_radius,
            current: 0,
            view: ViewMode::Icon,
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn active_slot(&self) -> &ToolSlot {
        &self.slots[self.current]
    }

    pub fn slot(&self, index: usize) -> Option<&ToolSlot> {
        self.slots.get(index)
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view
    }

    pub fn layout(&self) -> &WheelLayout {
        &self.layout
    }

    pub fn hub(&self) -> Entity {
        self.layout.hub
    }

    pub fn anchor(&self) -> Entity {
        self.layout.anchor
    }

    pub fn clamp_index(&self, index: i64) -> usize {
        index.clamp(0, self.slots.len() as i64 - 1) as usize
    }

    pub fn wheel_angle_radians(&self) -> f32 {
        -self.angular_step * self.current as f32
    }

    pub fn wheel_angle_degrees(&self) -> f32 {
        self.wheel_angle_radians().to_degrees()
    }

    /// Activates a slot and remounts the hub. With `source` the hub receives a copy of that
    /// widget's content; otherwise the slot's default template is cloned.
    pub fn set_active_icon(
        &mut self,
        index: i64,
        source: Option<Entity>,
        scene: &mut dyn SceneGraph,
    ) -> usize {
        let clamped = self.clamp_index(index);
        if clamped as i64 != index {
            log::debug!("tool index {index} clamped to {clamped}");
        }
        self.current = clamped;

        scene.set_rotation(self.layout.wheel, Quat::from_rotation_z(self.wheel_angle_radians()));
        for slot in &self.slots {
            if let Some(info) = slot.info {
                scene.set_visible(info, slot.index == clamped);
            }
        }

        let hub = self.layout.hub;
        scene.clear_children(hub);
        let content = source.unwrap_or(self.slots[clamped].widget_template);
        scene.clone_children_into(content, hub);
        scene.set_live_binding(hub, true);
        log::debug!(
            "tool {} '{}' active, wheel at {:.1} deg, {} content",
            clamped,
            self.slots[clamped].name,
            self.wheel_angle_degrees(),
            if source.is_some() { "recalled" } else { "fresh" }
        );
        clamped
    }

    pub fn select_next(&mut self, scene: &mut dyn SceneGraph) -> usize {
        self.set_active_icon(self.current as i64 + 1, None, scene)
    }

    pub fn select_prev(&mut self, scene: &mut dyn SceneGraph) -> usize {
        self.set_active_icon(self.current as i64 - 1, None, scene)
    }

    pub fn toggle_view(&mut self, scene: &mut dyn SceneGraph) -> ViewMode {
        self.view = match self.view {
            ViewMode::Icon => ViewMode::Widget,
            ViewMode::Widget => ViewMode::Icon,
        };
        scene.set_visible(self.layout.wheel, self.view == ViewMode::Icon);
        self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{SceneWorld, Transform3D};

    fn build(slot_count: usize) -> (SceneWorld, ToolSelector, Vec<Entity>) {
        let mut scene = SceneWorld::new();
        let wheel = scene.spawn(None, Transform3D::default());
        let hub = scene.spawn(None, Transform3D::default());
        let mut slots = Vec::new();
        let mut infos = Vec::new();
        for i in 0..slot_count {
            let icon = scene.spawn(Some(wheel), Transform3D::default());
            let info = scene.spawn(Some(icon), Transform3D::default());
            let template = scene.spawn(None, Transform3D::default());
            scene.spawn_labeled(&format!("widget-{i}"), Some(template), Transform3D::default());
            infos.push(info);
            slots.push(ToolSlot::new(
                i,
                &ToolSlotConfig::new(format!("tool-{i}")),
                SlotEntities { icon, info: Some(info), widget_template: template },
            ));
        }
        let config = WheelConfig { icon_spacing: 0.1, wheel_radius: 0.2, slots: Vec::new() };
        let selector = ToolSelector::new(&config, slots, WheelLayout { wheel, hub, anchor: hub }).unwrap();
        (scene, selector, infos)
    }

    #[test]
    fn rejects_empty_wheel() {
        let mut scene = SceneWorld::new();
        let e = scene.spawn(None, Transform3D::default());
        let layout = WheelLayout { wheel: e, hub: e, anchor: e };
        assert!(ToolSelector::new(&WheelConfig::default(), Vec::new(), layout).is_err());
    }

    #[test]
    fn index_is_clamped_without_wraparound() {
        let (mut scene, mut selector, _) = build(4);
        assert_eq!(selector.set_active_icon(-3, None, &mut scene), 0);
        assert_eq!(selector.set_active_icon(99, None, &mut scene), 3);
        assert_eq!(selector.select_next(&mut scene), 3);
        assert_eq!(selector.set_active_icon(0, None, &mut scene), 0);
        assert_eq!(selector.select_prev(&mut scene), 0);
    }

    #[test]
    fn wheel_rotates_by_angular_step() {
        let (mut scene, mut selector, _) = build(4);
        selector.set_active_icon(2, None, &mut scene);
        assert!((selector.wheel_angle_radians() + 1.0).abs() < 1e-6);
        assert!((selector.wheel_angle_degrees() + 57.29578).abs() < 1e-3);
        let rotation = scene.transform(selector.layout().wheel).unwrap().rotation;
        assert!(rotation.angle_between(Quat::from_rotation_z(-1.0)) < 1e-4);
    }

    #[test]
    fn only_active_slot_shows_info() {
        let (mut scene, mut selector, infos) = build(3);
        selector.set_active_icon(1, None, &mut scene);
        assert!(!scene.is_visible(infos[0]));
        assert!(scene.is_visible(infos[1]));
        assert!(!scene.is_visible(infos[2]));
    }

    #[test]
    fn hub_is_remounted_from_template() {
        let (mut scene, mut selector, _) = build(3);
        selector.set_active_icon(0, None, &mut scene);
        selector.set_active_icon(2, None, &mut scene);
        let mounted = scene.children(selector.hub());
        assert_eq!(mounted.len(), 1);
        assert_eq!(scene.label(mounted[0]), Some("widget-2"));
        assert!(scene.is_live_bound(mounted[0]));
    }

    #[test]
    fn toggle_view_flips_wheel_visibility() {
        let (mut scene, mut selector, _) = build(2);
        let wheel = selector.layout().wheel;
        assert_eq!(selector.toggle_view(&mut scene), ViewMode::Widget);
        assert!(!scene.is_visible(wheel));
        assert_eq!(selector.toggle_view(&mut scene), ViewMode::Icon);
        assert!(scene.is_visible(wheel));
    }
}
