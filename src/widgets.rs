//! Released widgets: copies of the hub's content parked in world space, and their recall.

use crate::error::TeardownError;
use crate::scene::{SceneGraph, Transform3D};
use crate::tool_wheel::ToolSelector;
use bevy_ecs::prelude::Entity;
use glam::Vec3;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetInstance {
    pub id: Uuid,
    pub tool_index: usize,
    pub entity: Entity,
    /// World pose at release time (rotation and translation only).
    pub world_transform: Transform3D,
    pub released: bool,
}

/// Registry of released widgets, in release order.
#[derive(Debug, Default)]
pub struct ReleasedWidgets {
    instances: Vec<WidgetInstance>,
}

impl ReleasedWidgets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, instance: WidgetInstance) {
        self.instances.push(instance);
    }

    pub fn unregister(&mut self, id: Uuid) -> Option<WidgetInstance> {
        let index = self.instances.iter().position(|w| w.id == id)?;
        Some(self.instances.remove(index))
    }

    pub fn get(&self, id: Uuid) -> Option<&WidgetInstance> {
        self.instances.iter().find(|w| w.id == id)
    }

    pub fn count_for(&self, tool_index: usize) -> usize {
        self.instances.iter().filter(|w| w.tool_index == tool_index).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WidgetInstance> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Removes an instance that is being destroyed by someone else. Must run before the
    /// entity goes away.
    pub fn teardown(&mut self, id: Uuid, scene: &mut dyn SceneGraph) -> bool {
        match self.unregister(id) {
            Some(instance) => {
                scene.despawn(instance.entity);
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released(Uuid),
    NotMultiInstance,
    AtCapacity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recalled {
    pub id: Uuid,
    pub tool_index: usize,
    pub distance: f32,
}

#[derive(Debug, Default)]
pub struct WidgetLifecycleManager;

impl WidgetLifecycleManager {
    pub fn new() -> Self {
        Self
    }

    /// Clones the hub's mounted widget into a standalone world entity.
    pub fn release(
        &mut self,
        selector: &ToolSelector,
        registry: &mut ReleasedWidgets,
        scene: &mut dyn SceneGraph,
    ) -> ReleaseOutcome {
        let hub = selector.hub();
        scene.commit(hub);

        let slot = selector.active_slot();
        if !slot.multi_instance {
            log::debug!("tool '{}' is single-instance, release ignored", slot.name);
            return ReleaseOutcome::NotMultiInstance;
        }
        let existing = registry.count_for(slot.index);
        if let Some(limit) = slot.max_clones {
            if existing >= limit {
                log::debug!("tool '{}' already has {existing}/{limit} released widgets", slot.name);
                return ReleaseOutcome::AtCapacity;
            }
        }

        let (rotation, translation) = scene.world_pose(hub).unwrap_or_default();
        let world_transform = Transform3D::from_rotation_translation(rotation, translation);
        let entity = scene.spawn(None, world_transform);
        scene.clone_children_into(hub, entity);
        scene.set_live_binding(entity, false);

        let id = Uuid::new_v4();
        registry.register(WidgetInstance {
            id,
            tool_index: slot.index,
            entity,
            world_transform,
            released: true,
        });
        log::info!("released widget {id} for tool {} ({} now)", slot.index, existing + 1);
        ReleaseOutcome::Released(id)
    }

    /// Recalls the released widget closest to the wheel anchor into the hub, consuming it.
    /// Ties keep the earliest released instance.
    pub fn fetch(
        &mut self,
        selector: &mut ToolSelector,
        registry: &mut ReleasedWidgets,
        scene: &mut dyn SceneGraph,
    ) -> Result<Option<Recalled>, TeardownError> {
        if registry.is_empty() {
            return Ok(None);
        }
        let anchor = scene.world_position(selector.anchor()).unwrap_or(Vec3::ZERO);

        let mut nearest: Option<(WidgetInstance, f32)> = None;
        for instance in registry.iter() {
            let position =
                scene.world_position(instance.entity).ok_or(TeardownError::StaleWidget(instance.id))?;
            let distance = anchor.distance(position);
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((*instance, distance));
            }
        }
        let Some((instance, distance)) = nearest else {
            return Ok(None);
        };

        scene.commit(instance.entity);
        selector.set_active_icon(instance.tool_index as i64, Some(instance.entity), scene);
        registry.unregister(instance.id);
        scene.despawn(instance.entity);
        log::info!("fetched widget {} for tool {} from {distance:.3}m", instance.id, instance.tool_index);
        Ok(Some(Recalled { id: instance.id, tool_index: instance.tool_index, distance }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ToolSlotConfig, WheelConfig};
    use crate::scene::SceneWorld;
    use crate::tool_wheel::{SlotEntities, ToolSlot, WheelLayout};
    use glam::Quat;

    struct Rig {
        scene: SceneWorld,
        selector: ToolSelector,
        registry: ReleasedWidgets,
        manager: WidgetLifecycleManager,
    }

    fn rig(configs: &[ToolSlotConfig]) -> Rig {
        let mut scene = SceneWorld::new();
        let wheel = scene.spawn(None, Transform3D::default());
        let hub = scene.spawn(
            None,
            Transform3D::from_rotation_translation(Quat::from_rotation_y(0.3), Vec3::new(0.0, 1.0, 0.0))
                .with_scale(Vec3::splat(0.5)),
        );
        let slots = configs
            .iter()
            .enumerate()
            .map(|(i, cfg)| {
                let icon = scene.spawn(Some(wheel), Transform3D::default());
                let template = scene.spawn(None, Transform3D::default());
                scene.spawn_labeled(&cfg.name, Some(template), Transform3D::default());
                ToolSlot::new(i, cfg, SlotEntities { icon, info: None, widget_template: template })
            })
            .collect();
        let mut selector =
            ToolSelector::new(&WheelConfig::default(), slots, WheelLayout { wheel, hub, anchor: hub })
                .unwrap();
        selector.set_active_icon(0, None, &mut scene);
        Rig { scene, selector, registry: ReleasedWidgets::new(), manager: WidgetLifecycleManager::new() }
    }

    #[test]
    fn single_instance_tools_do_not_release() {
        let mut r = rig(&[ToolSlotConfig::new("colormap")]);
        let outcome = r.manager.release(&r.selector, &mut r.registry, &mut r.scene);
        assert_eq!(outcome, ReleaseOutcome::NotMultiInstance);
        assert!(r.registry.is_empty());
    }

    #[test]
    fn release_respects_clone_cap() {
        let mut r = rig(&[ToolSlotConfig::new("slice").clonable(Some(2))]);
        for _ in 0..2 {
            assert!(matches!(
                r.manager.release(&r.selector, &mut r.registry, &mut r.scene),
                ReleaseOutcome::Released(_)
            ));
        }
        assert_eq!(r.manager.release(&r.selector, &mut r.registry, &mut r.scene), ReleaseOutcome::AtCapacity);
        assert_eq!(r.registry.len(), 2);
        assert_eq!(r.registry.count_for(0), 2);
    }

    #[test]
    fn released_copy_takes_hub_pose_without_scale() {
        let mut r = rig(&[ToolSlotConfig::new("slice").clonable(None)]);
        let outcome = r.manager.release(&r.selector, &mut r.registry, &mut r.scene);
        let ReleaseOutcome::Released(id) = outcome else {
            panic!("expected release");
        };
        let instance = *r.registry.get(id).unwrap();
        let t = r.scene.transform(instance.entity).unwrap();
        assert_eq!(t.scale, Vec3::ONE);
        assert!((t.translation - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        assert!(t.rotation.angle_between(Quat::from_rotation_y(0.3)) < 1e-4);
        assert!(r.scene.parent(instance.entity).is_none());
        let copy = r.scene.children(instance.entity)[0];
        assert_eq!(r.scene.label(copy), Some("slice"));
        assert!(!r.scene.is_live_bound(copy));
    }

    #[test]
    fn release_commits_pending_edits() {
        let mut r = rig(&[ToolSlotConfig::new("slice").clonable(None)]);
        let mounted = r.scene.children(r.selector.hub())[0];
        r.scene.edit_attribute(mounted, "depth", 0.4);
        let outcome = r.manager.release(&r.selector, &mut r.registry, &mut r.scene);
        let ReleaseOutcome::Released(id) = outcome else {
            panic!("expected release");
        };
        let entity = r.registry.get(id).unwrap().entity;
        let copy = r.scene.children(entity)[0];
        assert_eq!(r.scene.committed_attribute(copy, "depth"), Some(0.4));
    }

    #[test]
    fn fetch_on_empty_registry_is_silent() {
        let mut r = rig(&[ToolSlotConfig::new("slice").clonable(None)]);
        let before = r.scene.mutation_count();
        let hub_children = r.scene.children(r.selector.hub());
        let result = r.manager.fetch(&mut r.selector, &mut r.registry, &mut r.scene).unwrap();
        assert!(result.is_none());
        assert_eq!(r.scene.mutation_count(), before);
        assert_eq!(r.scene.children(r.selector.hub()), hub_children);
    }

    #[test]
    fn fetch_stale_instance_is_fatal() {
        let mut r = rig(&[ToolSlotConfig::new("slice").clonable(None)]);
        let outcome = r.manager.release(&r.selector, &mut r.registry, &mut r.scene);
        let ReleaseOutcome::Released(id) = outcome else {
            panic!("expected release");
        };
        let entity = r.registry.get(id).unwrap().entity;
        r.scene.despawn(entity);
        let err = r.manager.fetch(&mut r.selector, &mut r.registry, &mut r.scene).unwrap_err();
        assert_eq!(err, TeardownError::StaleWidget(id));
    }

    #[test]
    fn teardown_unregisters_before_despawn() {
        let mut r = rig(&[ToolSlotConfig::new("slice").clonable(None)]);
        let outcome = r.manager.release(&r.selector, &mut r.registry, &mut r.scene);
        let ReleaseOutcome::Released(id) = outcome else {
            panic!("expected release");
        };
        let entity = r.registry.get(id).unwrap().entity;
        assert!(r.registry.teardown(id, &mut r.scene));
        assert!(!r.scene.contains(entity));
        assert!(r.manager.fetch(&mut r.selector, &mut r.registry, &mut r.scene).unwrap().is_none());
    }
}
