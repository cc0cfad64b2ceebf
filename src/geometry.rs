use std::f32::consts::PI;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Floats per interleaved vertex: `position.xyz` followed by `normal.xyz`.
pub const VERTEX_STRIDE: usize = 6;

pub const BOX_SIZE: f32 = 1.0;
pub const SPHERE_RADIUS: f32 = 0.6;
pub const SPHERE_SEGMENTS: u32 = 32;
pub const CONE_RADIUS: f32 = 0.6;
pub const CONE_HEIGHT: f32 = 1.0;
pub const CONE_SEGMENTS: u32 = 32;

/// The primitives the viewer knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Box,
    Sphere,
    Cone,
}

impl Shape {
    /// Maps a shape tag to a primitive. Exact, case-sensitive match; anything
    /// unrecognised is a box.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "sphere" => Self::Sphere,
            "cone" => Self::Cone,
            _ => Self::Box,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Sphere => "sphere",
            Self::Cone => "cone",
        }
    }

    /// Builds the fixed-size geometry for this primitive.
    pub fn build(self) -> Geometry {
        match self {
            Self::Box => Geometry::cuboid(BOX_SIZE, BOX_SIZE, BOX_SIZE),
            Self::Sphere => Geometry::sphere(SPHERE_RADIUS, SPHERE_SEGMENTS, SPHERE_SEGMENTS),
            Self::Cone => Geometry::cone(CONE_RADIUS, CONE_HEIGHT, CONE_SEGMENTS),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Indexed triangle list with interleaved positions and normals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / VERTEX_STRIDE
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let base = index * VERTEX_STRIDE;
        Vec3::from_slice(&self.vertices[base..base + 3])
    }

    pub fn normal(&self, index: usize) -> Vec3 {
        let base = index * VERTEX_STRIDE + 3;
        Vec3::from_slice(&self.vertices[base..base + 3])
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .chunks_exact(VERTEX_STRIDE)
            .map(|chunk| Vec3::new(chunk[0], chunk[1], chunk[2]))
    }

    /// Returns `None` for a geometry without vertices.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let mut positions = self.positions();
        let first = positions.next()?;
        let (min, max) = positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Aabb { min, max })
    }

    pub fn translate(&mut self, offset: Vec3) {
        for chunk in self.vertices.chunks_exact_mut(VERTEX_STRIDE) {
            chunk[0] += offset.x;
            chunk[1] += offset.y;
            chunk[2] += offset.z;
        }
    }

    /// Moves the vertices so the bounding box is centred on the origin and
    /// returns the applied offset.
    pub fn center(&mut self) -> Vec3 {
        let Some(bounds) = self.bounding_box() else {
            return Vec3::ZERO;
        };
        let offset = -bounds.center();
        self.translate(offset);
        offset
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        let index = self.vertex_count() as u32;
        self.vertices
            .extend_from_slice(&[position.x, position.y, position.z, normal.x, normal.y, normal.z]);
        index
    }

    /// Box centred on the origin, one quad per face so each face keeps a flat normal.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let half = Vec3::new(width, height, depth) * 0.5;
        let mut geometry = Self::default();
        // (normal, u axis, v axis) per face; u × v == normal keeps the winding counter-clockwise.
        let faces = [
            (Vec3::X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        for (normal, u, v) in faces {
            let center = normal * half;
            let du = u * half;
            let dv = v * half;
            let a = geometry.push_vertex(center - du - dv, normal);
            let b = geometry.push_vertex(center + du - dv, normal);
            let c = geometry.push_vertex(center + du + dv, normal);
            let d = geometry.push_vertex(center - du + dv, normal);
            geometry.indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
        geometry
    }

    /// UV sphere centred on the origin; poles on the Y axis.
    pub fn sphere(radius: f32, width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);
        let mut geometry = Self::default();
        let mut grid = Vec::with_capacity(height_segments as usize + 1);

        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let theta = v * PI;
            let mut row = Vec::with_capacity(width_segments as usize + 1);
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * 2.0 * PI;
                let position = Vec3::new(
                    -radius * phi.cos() * theta.sin(),
                    radius * theta.cos(),
                    radius * phi.sin() * theta.sin(),
                );
                let normal = position.normalize_or_zero();
                row.push(geometry.push_vertex(position, normal));
            }
            grid.push(row);
        }

        for iy in 0..height_segments as usize {
            for ix in 0..width_segments as usize {
                let a = grid[iy][ix + 1];
                let b = grid[iy][ix];
                let c = grid[iy + 1][ix];
                let d = grid[iy + 1][ix + 1];
                // The pole rows collapse to a point; skip the degenerate half.
                if iy != 0 {
                    geometry.indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments as usize - 1 {
                    geometry.indices.extend_from_slice(&[b, c, d]);
                }
            }
        }
        geometry
    }

    /// Closed cone with its apex at `+height / 2` and its base at `-height / 2`.
    pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Self {
        let radial_segments = radial_segments.max(3);
        let half_height = height * 0.5;
        let slope = radius / height;
        let mut geometry = Self::default();

        let mut rows = [Vec::new(), Vec::new()];
        for (row_index, row) in rows.iter_mut().enumerate() {
            let v = row_index as f32;
            let ring_radius = v * radius;
            for x in 0..=radial_segments {
                let theta = x as f32 / radial_segments as f32 * 2.0 * PI;
                let (sin, cos) = theta.sin_cos();
                let position = Vec3::new(
                    ring_radius * sin,
                    -v * height + half_height,
                    ring_radius * cos,
                );
                let normal = Vec3::new(sin, slope, cos).normalize();
                row.push(geometry.push_vertex(position, normal));
            }
        }
        for x in 0..radial_segments as usize {
            let b = rows[1][x];
            let c = rows[1][x + 1];
            let d = rows[0][x + 1];
            // The apex row has zero radius, so only the lower triangle has area.
            geometry.indices.extend_from_slice(&[b, c, d]);
        }

        let base_y = -half_height;
        let center_start = geometry.vertex_count() as u32;
        for _ in 0..radial_segments {
            geometry.push_vertex(Vec3::new(0.0, base_y, 0.0), Vec3::NEG_Y);
        }
        let ring_start = geometry.vertex_count() as u32;
        for x in 0..=radial_segments {
            let theta = x as f32 / radial_segments as f32 * 2.0 * PI;
            let (sin, cos) = theta.sin_cos();
            geometry.push_vertex(
                Vec3::new(radius * sin, base_y, radius * cos),
                Vec3::NEG_Y,
            );
        }
        for x in 0..radial_segments {
            let center = center_start + x;
            let ring = ring_start + x;
            geometry.indices.extend_from_slice(&[ring + 1, ring, center]);
        }
        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn assert_outward_winding(geometry: &Geometry) {
        for triangle in geometry.indices.chunks_exact(3) {
            let p0 = geometry.position(triangle[0] as usize);
            let p1 = geometry.position(triangle[1] as usize);
            let p2 = geometry.position(triangle[2] as usize);
            let face = (p1 - p0).cross(p2 - p0);
            if face.length_squared() < 1e-12 {
                continue;
            }
            let centroid = (p0 + p1 + p2) / 3.0;
            assert!(
                face.dot(centroid) > 0.0,
                "triangle {triangle:?} faces inwards"
            );
        }
    }

    #[test]
    fn shape_tags_match_exactly() {
        assert_eq!(Shape::from_tag("sphere"), Shape::Sphere);
        assert_eq!(Shape::from_tag("cone"), Shape::Cone);
        assert_eq!(Shape::from_tag("box"), Shape::Box);
        assert_eq!(Shape::from_tag("Sphere"), Shape::Box);
        assert_eq!(Shape::from_tag(" cone"), Shape::Box);
        assert_eq!(Shape::from_tag(""), Shape::Box);
    }

    #[test]
    fn box_has_flat_faces() {
        let geometry = Shape::Box.build();
        assert_eq!(geometry.vertex_count(), 24);
        assert_eq!(geometry.triangle_count(), 12);
        let bounds = geometry.bounding_box().unwrap();
        assert_eq!(bounds.size(), Vec3::ONE);
        assert_outward_winding(&geometry);
    }

    #[test]
    fn sphere_matches_segment_counts() {
        let geometry = Shape::Sphere.build();
        assert_eq!(geometry.vertex_count(), 33 * 33);
        // Every band has two triangles per segment except the two pole bands.
        assert_eq!(geometry.triangle_count(), 32 * (2 * 32 - 2));
        for index in 0..geometry.vertex_count() {
            assert!((geometry.position(index).length() - SPHERE_RADIUS).abs() < EPS);
        }
        assert_outward_winding(&geometry);
    }

    #[test]
    fn cone_spans_its_height() {
        let geometry = Shape::Cone.build();
        let bounds = geometry.bounding_box().unwrap();
        assert!((bounds.min.y + 0.5).abs() < EPS);
        assert!((bounds.max.y - 0.5).abs() < EPS);
        assert!((bounds.max.x - CONE_RADIUS).abs() < EPS);
        assert_eq!(geometry.triangle_count(), 2 * CONE_SEGMENTS as usize);
        assert_outward_winding(&geometry);
    }

    #[test]
    fn center_moves_bounding_box_to_origin() {
        let mut geometry = Geometry::cuboid(2.0, 1.0, 1.0);
        geometry.translate(Vec3::new(3.0, -1.0, 0.25));
        let offset = geometry.center();
        assert!((offset - Vec3::new(-3.0, 1.0, -0.25)).length() < EPS);
        let center = geometry.bounding_box().unwrap().center();
        assert!(center.length() < EPS);
    }

    #[test]
    fn every_shape_is_centred_after_center() {
        for shape in [Shape::Box, Shape::Sphere, Shape::Cone] {
            let mut geometry = shape.build();
            geometry.center();
            let center = geometry.bounding_box().unwrap().center();
            assert!(center.length() < EPS, "{shape} centre {center}");
        }
    }

    #[test]
    fn empty_geometry_has_no_bounds() {
        let mut geometry = Geometry::default();
        assert!(geometry.bounding_box().is_none());
        assert_eq!(geometry.center(), Vec3::ZERO);
    }
}
