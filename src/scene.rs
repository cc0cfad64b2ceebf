use std::fmt;

use glam::{DVec3, Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::geometry::{Geometry, Shape};

/// Identifier handed out for every mesh the viewer creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(pub u64);

impl fmt::Display for MeshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mesh#{}", self.0)
    }
}

/// Lit material parameterised by colour, roughness and metalness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardMaterial {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
}

impl StandardMaterial {
    pub fn new(color: Color, roughness: f32, metalness: f32) -> Self {
        Self {
            color,
            roughness: roughness.clamp(0.0, 1.0),
            metalness: metalness.clamp(0.0, 1.0),
        }
    }
}

/// Renderable object: a geometry, a material and a transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub id: MeshId,
    pub shape: Shape,
    pub geometry: Geometry,
    pub material: StandardMaterial,
    pub position: Vec3,
    /// Euler angles in radians, applied in X, Y, Z order. Kept in double
    /// precision because they grow without bound while the mesh spins.
    pub rotation: DVec3,
    pub scale: Vec3,
}

impl Mesh {
    pub fn new(id: MeshId, shape: Shape, geometry: Geometry, material: StandardMaterial) -> Self {
        Self {
            id,
            shape,
            geometry,
            material,
            position: Vec3::ZERO,
            rotation: DVec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn model_matrix(&self) -> Mat4 {
        let rotation = self.rotation.as_vec3();
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_x(rotation.x)
            * Mat4::from_rotation_y(rotation.y)
            * Mat4::from_rotation_z(rotation.z)
            * Mat4::from_scale(self.scale)
    }

    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.model_matrix()).inverse().transpose()
    }
}

/// Light sources supported by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Light {
    /// Parallel light shining from `position` towards the origin.
    Directional {
        color: Color,
        intensity: f32,
        position: Vec3,
    },
    Ambient {
        color: Color,
        intensity: f32,
    },
}

impl Light {
    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction(&self) -> Option<Vec3> {
        match self {
            Self::Directional { position, .. } => Some(position.normalize_or_zero()),
            Self::Ambient { .. } => None,
        }
    }

    /// Colour pre-multiplied by intensity.
    pub fn radiance(&self) -> Vec3 {
        match self {
            Self::Directional {
                color, intensity, ..
            }
            | Self::Ambient { color, intensity } => color.to_vec3() * *intensity,
        }
    }
}

/// Root container of meshes and lights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scene {
    pub background: Color,
    lights: Vec<Light>,
    meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            lights: Vec::new(),
            meshes: Vec::new(),
        }
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn add(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    /// Detaches the mesh from the scene and hands it back.
    pub fn remove(&mut self, id: MeshId) -> Option<Mesh> {
        let index = self.meshes.iter().position(|mesh| mesh.id == id)?;
        Some(self.meshes.remove(index))
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.iter().find(|mesh| mesh.id == id)
    }

    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut Mesh> {
        self.meshes.iter_mut().find(|mesh| mesh.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_mesh(id: u64, shape: Shape) -> Mesh {
        Mesh::new(
            MeshId(id),
            shape,
            shape.build(),
            StandardMaterial::new(Color::WHITE, 0.5, 0.1),
        )
    }

    #[test]
    fn remove_detaches_mesh() {
        let mut scene = Scene::new(Color::BLACK);
        scene.add(make_mesh(1, Shape::Box));
        scene.add(make_mesh(2, Shape::Cone));
        let removed = scene.remove(MeshId(1)).unwrap();
        assert_eq!(removed.shape, Shape::Box);
        assert_eq!(scene.meshes().len(), 1);
        assert!(scene.mesh(MeshId(1)).is_none());
        assert!(scene.remove(MeshId(1)).is_none());
    }

    #[test]
    fn model_matrix_applies_rotation_order() {
        let mut mesh = make_mesh(1, Shape::Box);
        mesh.rotation = DVec3::new(0.3, 0.7, 0.0);
        let expected = Mat4::from_rotation_x(0.3) * Mat4::from_rotation_y(0.7);
        assert!(mesh.model_matrix().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn material_clamps_parameters() {
        let material = StandardMaterial::new(Color::WHITE, 1.5, -0.2);
        assert_eq!(material.roughness, 1.0);
        assert_eq!(material.metalness, 0.0);
    }

    #[test]
    fn directional_light_points_at_source() {
        let light = Light::Directional {
            color: Color::WHITE,
            intensity: 2.0,
            position: Vec3::new(0.0, 4.0, 0.0),
        };
        assert_eq!(light.direction(), Some(Vec3::Y));
        assert_eq!(light.radiance(), Vec3::splat(2.0));
        let ambient = Light::Ambient {
            color: Color::WHITE,
            intensity: 0.4,
        };
        assert!(ambient.direction().is_none());
    }
}
