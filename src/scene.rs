//! Minimal scene graph for the loaded asset.
//!
//! Parts live in an arena owned by [`Model`] and are addressed by [`PartId`]
//! handles, which stay valid for the model's lifetime since parts are never
//! removed.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::mesh::MeshData;

/// Stable handle to a part inside a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartId(usize);

impl PartId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Local translation/rotation/scale of a part relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// One named node of the asset tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub name: String,
    pub parent: Option<PartId>,
    pub children: Vec<PartId>,
    pub transform: Transform,
    pub mesh: Option<MeshData>,
    /// Linear base color.
    pub color: Vec3,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl Part {
    fn new(name: impl Into<String>, parent: Option<PartId>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            transform,
            mesh: None,
            color: Vec3::ONE,
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    /// Only parts with geometry take part in shadowing.
    pub fn supports_shadows(&self) -> bool {
        self.mesh.is_some()
    }
}

/// Tree of parts plus the transform placing the whole asset in the world.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    parts: Vec<Part>,
    roots: Vec<PartId>,
    pub transform: Transform,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a part under `parent` (or as a root) and returns its handle.
    pub fn add_part(
        &mut self,
        name: impl Into<String>,
        parent: Option<PartId>,
        transform: Transform,
    ) -> PartId {
        let id = PartId(self.parts.len());
        self.parts.push(Part::new(name, parent, transform));
        match parent {
            Some(parent) => self.parts[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn roots(&self) -> &[PartId] {
        &self.roots
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.0)
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(id.0)
    }

    /// First part with the given name in depth-first order.
    pub fn find(&self, name: &str) -> Option<PartId> {
        self.traverse().find(|&id| self.parts[id.0].name == name)
    }

    /// Depth-first, pre-order walk over every part.
    pub fn traverse(&self) -> impl Iterator<Item = PartId> + '_ {
        let mut stack: Vec<PartId> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            let id = stack.pop()?;
            stack.extend(self.parts[id.0].children.iter().rev().copied());
            Some(id)
        })
    }

    /// Composes the model transform with every ancestor's local transform.
    pub fn world_matrix(&self, id: PartId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(part_id) = current {
            let part = &self.parts[part_id.0];
            matrix = part.transform.matrix() * matrix;
            current = part.parent;
        }
        self.transform.matrix() * matrix
    }

    /// Enables cast/receive shadows on every part with geometry and returns
    /// how many parts were updated.
    pub fn enable_shadows(&mut self) -> usize {
        let mut count = 0;
        for part in self.parts.iter_mut().filter(|part| part.supports_shadows()) {
            part.cast_shadow = true;
            part.receive_shadow = true;
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(y: f32) -> Transform {
        Transform {
            translation: Vec3::new(0.0, y, 0.0),
            ..Transform::IDENTITY
        }
    }

    #[test]
    fn traversal_is_depth_first_pre_order() {
        let mut model = Model::new();
        let root = model.add_part("root", None, Transform::IDENTITY);
        let a = model.add_part("a", Some(root), Transform::IDENTITY);
        let _a1 = model.add_part("a1", Some(a), Transform::IDENTITY);
        let _b = model.add_part("b", Some(root), Transform::IDENTITY);
        let names: Vec<_> = model
            .traverse()
            .map(|id| model.part(id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, ["root", "a", "a1", "b"]);
    }

    #[test]
    fn find_resolves_nested_names() {
        let mut model = Model::new();
        let root = model.add_part("keycap", None, Transform::IDENTITY);
        let low = model.add_part("sa_low", Some(root), Transform::IDENTITY);
        assert_eq!(model.find("sa_low"), Some(low));
        assert_eq!(model.find("missing"), None);
    }

    #[test]
    fn world_matrix_composes_ancestors_and_model_transform() {
        let mut model = Model::new();
        let root = model.add_part("root", None, offset(1.0));
        let child = model.add_part("child", Some(root), offset(0.5));
        model.transform = offset(2.0);
        let position = model.world_matrix(child).transform_point3(Vec3::ZERO);
        assert!((position - Vec3::new(0.0, 3.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn shadows_only_enabled_on_mesh_parts() {
        let mut model = Model::new();
        let group = model.add_part("group", None, Transform::IDENTITY);
        let mesh = model.add_part("mesh", Some(group), Transform::IDENTITY);
        model.part_mut(mesh).unwrap().mesh = Some(MeshData::plane(1.0));
        assert_eq!(model.enable_shadows(), 1);
        let part = model.part(mesh).unwrap();
        assert!(part.cast_shadow && part.receive_shadow);
        assert!(!model.part(group).unwrap().cast_shadow);
    }
}
