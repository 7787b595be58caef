//! Scene-graph seam. The interaction layer only talks to [`SceneGraph`]; [`SceneWorld`] is the
//! in-memory implementation used by the replay tool and the tests.

use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec3};
use std::collections::BTreeMap;

pub trait SceneGraph {
    fn contains(&self, entity: Entity) -> bool;
    fn world_matrix(&self, entity: Entity) -> Option<Mat4>;
    fn world_position(&self, entity: Entity) -> Option<Vec3> {
        self.world_matrix(entity).map(|m| m.w_axis.truncate())
    }
    /// World rotation and translation, ignoring scale.
    fn world_pose(&self, entity: Entity) -> Option<(Quat, Vec3)> {
        self.world_matrix(entity).map(|m| {
            let (_, rotation, translation) = m.to_scale_rotation_translation();
            (rotation, translation)
        })
    }
    fn spawn(&mut self, parent: Option<Entity>, transform: Transform3D) -> Entity;
    /// Removes the entity and its whole subtree.
    fn despawn(&mut self, entity: Entity) -> bool;
    fn children(&self, entity: Entity) -> Vec<Entity>;
    fn clear_children(&mut self, entity: Entity);
    /// Deep-copies every child of `source` under `target`; returns how many roots were copied.
    fn clone_children_into(&mut self, source: Entity, target: Entity) -> usize;
    fn set_rotation(&mut self, entity: Entity, rotation: Quat);
    fn set_translation(&mut self, entity: Entity, translation: Vec3);
    fn set_visible(&mut self, entity: Entity, visible: bool);
    /// Flushes pending attribute edits on the subtree into its committed state.
    fn commit(&mut self, entity: Entity);
    /// Binds or unbinds the subtree from live hub editing.
    fn set_live_binding(&mut self, entity: Entity, bound: bool);
}

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform3D {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }

    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self { translation, rotation, scale: Vec3::ONE }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Component, Clone, Copy)]
pub struct Parent(pub Entity);
#[derive(Component, Default, Clone)]
pub struct Children(pub Vec<Entity>);
#[derive(Component, Clone, Copy)]
pub struct Visible(pub bool);
#[derive(Component, Clone)]
pub struct Label(pub String);
#[derive(Component, Clone, Copy)]
pub struct LiveBinding(pub bool);

/// Editable widget state. Edits land in `pending` until committed.
#[derive(Component, Clone, Default, Debug, PartialEq)]
pub struct WidgetAttributes {
    pub committed: BTreeMap<String, f32>,
    pub pending: BTreeMap<String, f32>,
}

pub struct SceneWorld {
    pub world: World,
    mutations: u64,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneWorld {
    pub fn new() -> Self {
        Self { world: World::new(), mutations: 0 }
    }

    /// Number of mutating calls made through [`SceneGraph`] so far.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    pub fn spawn_labeled(&mut self, label: &str, parent: Option<Entity>, transform: Transform3D) -> Entity {
        let entity = self.spawn(parent, transform);
        self.world.entity_mut(entity).insert(Label(label.to_string()));
        entity
    }

    pub fn label(&self, entity: Entity) -> Option<&str> {
        self.world.get::<Label>(entity).map(|l| l.0.as_str())
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform3D> {
        self.world.get::<Transform3D>(entity).copied()
    }

    pub fn is_visible(&self, entity: Entity) -> bool {
        self.world.get::<Visible>(entity).map_or(false, |v| v.0)
    }

    pub fn is_live_bound(&self, entity: Entity) -> bool {
        self.world.get::<LiveBinding>(entity).map_or(false, |b| b.0)
    }

    pub fn parent(&self, entity: Entity) -> Option<Entity> {
        self.world.get::<Parent>(entity).map(|p| p.0)
    }

    /// Stages an edit as a live tool interaction would.
    pub fn edit_attribute(&mut self, entity: Entity, key: &str, value: f32) {
        if let Ok(mut e) = self.world.get_entity_mut(entity) {
            if let Some(mut attrs) = e.get_mut::<WidgetAttributes>() {
                attrs.pending.insert(key.to_string(), value);
                return;
            }
            let mut attrs = WidgetAttributes::default();
            attrs.pending.insert(key.to_string(), value);
            e.insert(attrs);
        }
    }

    pub fn committed_attribute(&self, entity: Entity, key: &str) -> Option<f32> {
        self.world.get::<WidgetAttributes>(entity).and_then(|a| a.committed.get(key).copied())
    }

    /// Every entity in the subtree rooted at `entity`, depth first, root included.
    pub fn subtree(&self, entity: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack = vec![entity];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            if let Some(children) = self.world.get::<Children>(current) {
                stack.extend(children.0.iter().rev().copied());
            }
        }
        out
    }

    pub fn entity_count(&self) -> usize {
        self.world.entities().len() as usize
    }

    fn attach_child_to_parent(&mut self, child: Entity, parent: Entity) {
        self.world.entity_mut(child).insert(Parent(parent));
        if let Some(mut children) = self.world.get_mut::<Children>(parent) {
            if !children.0.contains(&child) {
                children.0.push(child);
            }
        } else {
            self.world.entity_mut(parent).insert(Children(vec![child]));
        }
    }

    fn despawn_recursive(&mut self, entity: Entity) -> bool {
        if let Some(parent) = self.world.get::<Parent>(entity).copied() {
            if let Some(mut siblings) = self.world.get_mut::<Children>(parent.0) {
                siblings.0.retain(|&child| child != entity);
            }
        }
        let child_ids = self.world.get::<Children>(entity).map(|c| c.0.clone()).unwrap_or_default();
        for child in child_ids {
            self.despawn_recursive(child);
        }
        self.world.despawn(entity)
    }

    fn clone_subtree(&mut self, source: Entity, parent: Entity) -> Option<Entity> {
        let transform = self.transform(source)?;
        let visible = self.world.get::<Visible>(source).copied();
        let label = self.world.get::<Label>(source).cloned();
        let attrs = self.world.get::<WidgetAttributes>(source).cloned();
        let live = self.world.get::<LiveBinding>(source).copied();
        let copy = self.world.spawn(transform).id();
        {
            let mut e = self.world.entity_mut(copy);
            if let Some(visible) = visible {
                e.insert(visible);
            }
            if let Some(label) = label {
                e.insert(label);
            }
            if let Some(attrs) = attrs {
                e.insert(attrs);
            }
            if let Some(live) = live {
                e.insert(live);
            }
        }
        self.attach_child_to_parent(copy, parent);
        for child in self.children(source) {
            self.clone_subtree(child, copy);
        }
        Some(copy)
    }
}

impl SceneGraph for SceneWorld {
    fn contains(&self, entity: Entity) -> bool {
        self.world.get_entity(entity).is_ok()
    }

    fn world_matrix(&self, entity: Entity) -> Option<Mat4> {
        let mut matrix = self.transform(entity)?.local_matrix();
        let mut current = entity;
        let mut depth = 0usize;
        while let Some(parent) = self.parent(current) {
            let parent_local = self.transform(parent)?.local_matrix();
            matrix = parent_local * matrix;
            current = parent;
            depth += 1;
            if depth > 1024 {
                log::warn!("scene hierarchy deeper than 1024 levels at {entity:?}; assuming a cycle");
                return None;
            }
        }
        Some(matrix)
    }

    fn spawn(&mut self, parent: Option<Entity>, transform: Transform3D) -> Entity {
        self.mutations += 1;
        let entity = self.world.spawn((transform, Visible(true))).id();
        if let Some(parent) = parent.filter(|p| self.contains(*p)) {
            self.attach_child_to_parent(entity, parent);
        }
        entity
    }

    fn despawn(&mut self, entity: Entity) -> bool {
        if !self.contains(entity) {
            return false;
        }
        self.mutations += 1;
        self.despawn_recursive(entity)
    }

    fn children(&self, entity: Entity) -> Vec<Entity> {
        self.world.get::<Children>(entity).map(|c| c.0.clone()).unwrap_or_default()
    }

    fn clear_children(&mut self, entity: Entity) {
        self.mutations += 1;
        for child in self.children(entity) {
            self.despawn_recursive(child);
        }
    }

    fn clone_children_into(&mut self, source: Entity, target: Entity) -> usize {
        if !self.contains(source) || !self.contains(target) {
            return 0;
        }
        self.mutations += 1;
        self.children(source).into_iter().filter_map(|child| self.clone_subtree(child, target)).count()
    }

    fn set_rotation(&mut self, entity: Entity, rotation: Quat) {
        if let Some(mut transform) = self.world.get_mut::<Transform3D>(entity) {
            transform.rotation = rotation;
            self.mutations += 1;
        }
    }

    fn set_translation(&mut self, entity: Entity, translation: Vec3) {
        if let Some(mut transform) = self.world.get_mut::<Transform3D>(entity) {
            transform.translation = translation;
            self.mutations += 1;
        }
    }

    fn set_visible(&mut self, entity: Entity, visible: bool) {
        if self.contains(entity) {
            self.world.entity_mut(entity).insert(Visible(visible));
            self.mutations += 1;
        }
    }

    fn commit(&mut self, entity: Entity) {
        self.mutations += 1;
        for node in self.subtree(entity) {
            if let Some(mut attrs) = self.world.get_mut::<WidgetAttributes>(node) {
                let pending = std::mem::take(&mut attrs.pending);
                attrs.committed.extend(pending);
            }
        }
    }

    fn set_live_binding(&mut self, entity: Entity, bound: bool) {
        self.mutations += 1;
        for node in self.subtree(entity) {
            self.world.entity_mut(node).insert(LiveBinding(bound));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_matrix_composes_parent_chain() {
        let mut scene = SceneWorld::new();
        let root_transform =
            Transform3D::from_translation(Vec3::new(1.0, 0.0, 0.0)).with_scale(Vec3::splat(2.0));
        let root = scene.spawn(None, root_transform);
        let child = scene.spawn(Some(root), Transform3D::from_translation(Vec3::new(0.0, 1.0, 0.0)));
        let pos = scene.world_position(child).unwrap();
        assert!((pos - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn despawn_removes_subtree_and_unlinks_parent() {
        let mut scene = SceneWorld::new();
        let root = scene.spawn(None, Transform3D::default());
        let child = scene.spawn(Some(root), Transform3D::default());
        let grandchild = scene.spawn(Some(child), Transform3D::default());
        assert!(scene.despawn(child));
        assert!(!scene.contains(grandchild));
        assert!(scene.children(root).is_empty());
        assert!(!scene.despawn(child));
    }

    #[test]
    fn clone_children_copies_committed_state() {
        let mut scene = SceneWorld::new();
        let template = scene.spawn(None, Transform3D::default());
        let knob = scene.spawn_labeled("knob", Some(template), Transform3D::default());
        scene.edit_attribute(knob, "gain", 0.7);
        scene.commit(template);
        let target = scene.spawn(None, Transform3D::default());
        assert_eq!(scene.clone_children_into(template, target), 1);
        let copy = scene.children(target)[0];
        assert_ne!(copy, knob);
        assert_eq!(scene.label(copy), Some("knob"));
        assert_eq!(scene.committed_attribute(copy, "gain"), Some(0.7));
    }

    #[test]
    fn world_pose_drops_scale() {
        let mut scene = SceneWorld::new();
        let rot = Quat::from_rotation_y(0.5);
        let transform = Transform3D::from_rotation_translation(rot, Vec3::new(0.0, 1.5, -2.0))
            .with_scale(Vec3::splat(3.0));
        let e = scene.spawn(None, transform);
        let (rotation, translation) = scene.world_pose(e).unwrap();
        assert!(rotation.angle_between(rot) < 1e-4);
        assert!((translation - Vec3::new(0.0, 1.5, -2.0)).length() < 1e-5);
    }
}
