use std::cmp::Ordering;

use glam::{Vec2, Vec3};

use crate::camera::PerspectiveCamera;
use crate::color::Color;
use crate::scene::{Light, Scene, StandardMaterial};

/// Base reflectance of dielectrics at normal incidence.
const DIELECTRIC_F0: f32 = 0.04;

/// Lit colour of a surface point.
///
/// Ambient lights tint the base colour; directional lights add a Lambert
/// diffuse term and a Blinn-Phong highlight whose sharpness follows the
/// material roughness. Metalness moves energy from diffuse to a tinted
/// specular. The native shader mirrors this function.
pub fn shade(normal: Vec3, view_dir: Vec3, material: &StandardMaterial, lights: &[Light]) -> Vec3 {
    let n = normal.normalize_or_zero();
    let v = view_dir.normalize_or_zero();
    let base = material.color.to_vec3();
    let diffuse = base * (1.0 - material.metalness);
    let f0 = Vec3::splat(DIELECTRIC_F0).lerp(base, material.metalness);
    let shininess = specular_exponent(material.roughness);

    let mut lit = Vec3::ZERO;
    for light in lights {
        match light {
            Light::Ambient { .. } => lit += base * light.radiance(),
            Light::Directional { .. } => {
                let Some(l) = light.direction() else {
                    continue;
                };
                let n_dot_l = n.dot(l).max(0.0);
                if n_dot_l <= 0.0 {
                    continue;
                }
                let h = (l + v).normalize_or_zero();
                let highlight =
                    f0 * n.dot(h).max(0.0).powf(shininess) * (1.0 - material.roughness);
                lit += (diffuse * n_dot_l + highlight) * light.radiance();
            }
        }
    }
    lit.clamp(Vec3::ZERO, Vec3::ONE)
}

/// Blinn-Phong exponent for a roughness in `0..=1`.
pub fn specular_exponent(roughness: f32) -> f32 {
    let r = roughness.clamp(0.05, 1.0);
    (2.0 / r.powi(4) - 2.0).max(1.0)
}

/// A mount element's measured size, split into what the camera sees and what
/// a drawing surface can be allocated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountExtent {
    /// Raw client size; a zero height gives the camera an aspect of 1.
    pub viewport: (u32, u32),
    /// Backing-store size, at least one pixel on each axis.
    pub backing: (u32, u32),
}

impl MountExtent {
    pub fn from_client(width: i32, height: i32) -> Self {
        let viewport = (width.max(0) as u32, height.max(0) as u32);
        Self {
            viewport,
            backing: (viewport.0.max(1), viewport.1.max(1)),
        }
    }
}

/// A shaded triangle in pixel coordinates, ready for a 2D painter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenTriangle {
    pub points: [Vec2; 3],
    /// Mean normalised device depth; larger is farther away.
    pub depth: f32,
    pub color: Color,
}

/// Projects every front-facing triangle of the scene to pixel space,
/// sorted far to near so painting in order resolves visibility.
pub fn project_scene(
    scene: &Scene,
    camera: &PerspectiveCamera,
    (width, height): (u32, u32),
) -> Vec<ScreenTriangle> {
    let size = Vec2::new(width as f32, height as f32);
    let mut triangles = Vec::new();

    for mesh in scene.meshes() {
        let model = mesh.model_matrix();
        let normal_matrix = mesh.normal_matrix();
        let geometry = &mesh.geometry;

        for triangle in geometry.indices.chunks_exact(3) {
            let corners = [
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            ];
            let world = corners.map(|index| model.transform_point3(geometry.position(index)));
            let face = (world[1] - world[0]).cross(world[2] - world[0]);
            let centroid = (world[0] + world[1] + world[2]) / 3.0;
            let to_camera = camera.position - centroid;
            if face.dot(to_camera) <= 0.0 {
                continue;
            }

            let Some(ndc) = project_all(camera, world) else {
                continue;
            };

            let normal = normal_matrix
                * corners
                    .iter()
                    .map(|index| geometry.normal(*index))
                    .fold(Vec3::ZERO, |sum, n| sum + n);
            let lit = shade(normal, to_camera, &mesh.material, scene.lights());

            triangles.push(ScreenTriangle {
                points: ndc.map(|p| Vec2::new((p.x + 1.0) * 0.5, (1.0 - p.y) * 0.5) * size),
                depth: (ndc[0].z + ndc[1].z + ndc[2].z) / 3.0,
                color: Color::from_vec3(lit),
            });
        }
    }

    triangles.sort_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal));
    triangles
}

fn project_all(camera: &PerspectiveCamera, world: [Vec3; 3]) -> Option<[Vec3; 3]> {
    Some([
        camera.project(world[0])?,
        camera.project(world[1])?,
        camera.project(world[2])?,
    ])
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::config::{CameraConfig, ViewerConfig};
    use crate::geometry::Shape;
    use crate::scene::{Mesh, MeshId};

    fn material(metalness: f32) -> StandardMaterial {
        StandardMaterial::new(Color::from_hex(0xff0000), 0.5, metalness)
    }

    fn lit_scene(shape: Shape) -> Scene {
        let config = ViewerConfig::default();
        let mut scene = Scene::new(config.background_color());
        for light in config.lights() {
            scene.add_light(light);
        }
        let mut geometry = shape.build();
        geometry.center();
        scene.add(Mesh::new(MeshId(1), shape, geometry, material(0.1)));
        scene
    }

    #[test]
    fn ambient_only_scales_base_colour() {
        let lights = [Light::Ambient {
            color: Color::WHITE,
            intensity: 0.4,
        }];
        let lit = shade(Vec3::Z, Vec3::Z, &material(0.0), &lights);
        assert!((lit - Vec3::new(0.4, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn faces_towards_the_light_are_brighter() {
        let lights = ViewerConfig::default().lights();
        let towards = shade(Vec3::splat(1.0), Vec3::Z, &material(0.1), &lights);
        let away = shade(Vec3::splat(-1.0), Vec3::Z, &material(0.1), &lights);
        assert!(towards.x > away.x);
        assert!((away.x - 0.4).abs() < 1e-6);
    }

    #[test]
    fn metals_lose_their_diffuse_term() {
        let lights = [Light::Directional {
            color: Color::WHITE,
            intensity: 1.0,
            position: Vec3::X,
        }];
        // Grazing view so the highlight vanishes and only diffuse could remain.
        let lit = shade(Vec3::X, Vec3::NEG_X, &material(1.0), &lights);
        assert!(lit.length() < 1e-4);
    }

    #[test]
    fn rougher_surfaces_have_broader_highlights() {
        assert!(specular_exponent(0.2) > specular_exponent(0.5));
        assert!(specular_exponent(1.0) >= 1.0);
    }

    #[test]
    fn projects_box_with_backface_culling() {
        let scene = lit_scene(Shape::Box);
        let camera = PerspectiveCamera::new(&CameraConfig::default(), (400, 400));
        let triangles = project_scene(&scene, &camera, (400, 400));
        // Looking straight down -Z only the front face is visible.
        assert_eq!(triangles.len(), 2);
        for triangle in &triangles {
            for point in triangle.points {
                assert!(point.x > 0.0 && point.x < 400.0);
                assert!(point.y > 0.0 && point.y < 400.0);
            }
        }
    }

    #[test]
    fn triangles_are_sorted_far_to_near() {
        let mut scene = lit_scene(Shape::Sphere);
        if let Some(mesh) = scene.mesh_mut(MeshId(1)) {
            mesh.rotation = DVec3::new(0.4, 0.8, 0.0);
        }
        let camera = PerspectiveCamera::new(&CameraConfig::default(), (320, 240));
        let triangles = project_scene(&scene, &camera, (320, 240));
        assert!(!triangles.is_empty());
        assert!(triangles.windows(2).all(|pair| pair[0].depth >= pair[1].depth));
    }

    #[test]
    fn collapsed_mount_keeps_unit_aspect() {
        let extent = MountExtent::from_client(800, 0);
        assert_eq!(extent.viewport, (800, 0));
        assert_eq!(extent.backing, (800, 1));
        let camera = PerspectiveCamera::new(&CameraConfig::default(), extent.viewport);
        assert_eq!(camera.aspect, 1.0);

        let extent = MountExtent::from_client(-4, 300);
        assert_eq!(extent.viewport, (0, 300));
        assert_eq!(extent.backing, (1, 300));
    }

    #[test]
    fn rotated_box_shows_more_faces() {
        let mut scene = lit_scene(Shape::Box);
        if let Some(mesh) = scene.mesh_mut(MeshId(1)) {
            mesh.rotation = DVec3::new(0.5, 0.7, 0.0);
        }
        let camera = PerspectiveCamera::new(&CameraConfig::default(), (400, 400));
        assert_eq!(project_scene(&scene, &camera, (400, 400)).len(), 6);
    }
}
