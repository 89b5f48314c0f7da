//! CPU side of the mesh path: flat buffers, smooth normals, material groups and bounds.

use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::PreviewError;
use crate::palette::{self, Rgb};
use crate::payload::MeshPayload;

/// Label used when the payload carries no surface categories.
pub const DEFAULT_SURFACE: &str = "default";

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn from_points<I: IntoIterator<Item = Point3<f32>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self { min: first, max: first }, |b, p| Self {
            min: b.min.inf(&p),
            max: b.max.sup(&p),
        }))
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Largest extent along any axis.
    pub fn max_dim(&self) -> f32 {
        self.size().max()
    }
}

/// Centre-then-scale transform applied to the raw payload coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub translation: Vector3<f32>,
    pub scale: f32,
}

impl ModelTransform {
    /// Move the declared `center` to the origin and scale the largest declared
    /// dimension to `reference_length`.
    pub fn fit(center: [f32; 3], size: [f32; 3], reference_length: f32) -> Result<Self, PreviewError> {
        let largest = size.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !largest.is_finite() || largest <= 0.0 {
            return Err(PreviewError::render(format!(
                "declared size {size:?} has no positive extent"
            )));
        }
        if center.iter().any(|c| !c.is_finite()) {
            return Err(PreviewError::render(format!("declared center {center:?} is not finite")));
        }
        Ok(Self {
            translation: -Vector3::from(center),
            scale: reference_length / largest,
        })
    }

    pub fn apply(&self, p: &Point3<f32>) -> Point3<f32> {
        Point3::from((p.coords + self.translation) * self.scale)
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_scaling(self.scale) * Matrix4::new_translation(&self.translation)
    }
}

/// A run of indices drawn with one material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialGroup {
    pub label: String,
    pub color: Rgb,
    /// Offset into [`MeshGeometry::indices`], in indices.
    pub start: usize,
    /// Number of indices (3 per triangle).
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshGeometry {
    /// xyz per vertex, payload coordinates.
    pub positions: Vec<f32>,
    /// Smooth per-vertex normals, xyz per vertex.
    pub normals: Vec<f32>,
    /// Triangle indices, ordered so each material group is contiguous.
    pub indices: Vec<u32>,
    pub groups: Vec<MaterialGroup>,
}

impl MeshGeometry {
    pub fn build(mesh: &MeshPayload) -> Result<Self, PreviewError> {
        if mesh.vertices.is_empty() {
            return Err(PreviewError::render("mesh has no vertices"));
        }
        if mesh.faces.is_empty() {
            return Err(PreviewError::render("mesh has no faces"));
        }
        if let Some(i) = mesh.vertices.iter().position(|v| v.iter().any(|c| !c.is_finite())) {
            return Err(PreviewError::render(format!("vertex {i} is not finite")));
        }
        let vertex_count = mesh.vertices.len();
        if let Some((i, face)) = mesh
            .faces
            .iter()
            .enumerate()
            .find(|(_, f)| f.iter().any(|&idx| idx as usize >= vertex_count))
        {
            return Err(PreviewError::render(format!(
                "face {i} {face:?} references a vertex past {vertex_count}"
            )));
        }

        let positions: Vec<f32> = mesh.vertices.iter().flatten().copied().collect();
        let normals = smooth_normals(&mesh.vertices, &mesh.faces);

        let (labels, face_labels) = face_labels(mesh.faces.len(), &mesh.surface_types);
        let colors = palette::assign(&labels);

        let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
        let mut groups = Vec::with_capacity(labels.len());
        for (slot, (label, color)) in labels.into_iter().zip(colors).enumerate() {
            let start = indices.len();
            for (face, _) in mesh.faces.iter().zip(&face_labels).filter(|(_, l)| **l == slot) {
                indices.extend_from_slice(face);
            }
            groups.push(MaterialGroup { label, color, start, count: indices.len() - start });
        }

        Ok(Self { positions, normals, indices, groups })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn points(&self) -> impl Iterator<Item = Point3<f32>> + '_ {
        self.positions.chunks_exact(3).map(|c| Point3::new(c[0], c[1], c[2]))
    }

    /// Bounds of the geometry as it is rendered, i.e. after `transform`.
    pub fn bounds_after(&self, transform: &ModelTransform) -> Option<Aabb> {
        Aabb::from_points(self.points().map(|p| transform.apply(&p)))
    }

    /// Position + normal, 6 floats per vertex, the layout the GPU program expects.
    pub fn interleaved(&self) -> Vec<f32> {
        self.positions
            .chunks_exact(3)
            .zip(self.normals.chunks_exact(3))
            .flat_map(|(p, n)| [p[0], p[1], p[2], n[0], n[1], n[2]])
            .collect()
    }
}

/// Average of the unit normals of every face touching a vertex.
pub fn smooth_normals(vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> Vec<f32> {
    let mut sums = vec![Vector3::<f32>::zeros(); vertices.len()];
    for face in faces {
        let [a, b, c] = face.map(|i| Point3::from(vertices[i as usize]));
        let Some(n) = (b - a).cross(&(c - a)).try_normalize(f32::EPSILON) else {
            continue; // degenerate triangle
        };
        for &i in face {
            sums[i as usize] += n;
        }
    }
    sums.into_iter()
        .flat_map(|s| {
            let n = s.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::z);
            [n.x, n.y, n.z]
        })
        .collect()
}

/// Distinct labels in first-seen order, and the label slot of every face.
///
/// With one label per face each face keeps its own; otherwise the faces are cut into
/// `labels.len()` contiguous runs of equal length (the last one may be shorter).
fn face_labels(face_count: usize, surface_types: &[String]) -> (Vec<String>, Vec<usize>) {
    if surface_types.is_empty() {
        return (vec![DEFAULT_SURFACE.to_owned()], vec![0; face_count]);
    }

    let mut distinct: Vec<String> = Vec::new();
    let slots: Vec<usize> = surface_types
        .iter()
        .map(|label| match distinct.iter().position(|d| d == label) {
            Some(slot) => slot,
            None => {
                distinct.push(label.clone());
                distinct.len() - 1
            }
        })
        .collect();

    let run = if surface_types.len() == face_count {
        1
    } else {
        face_count.div_ceil(surface_types.len()).max(1)
    };
    let per_face = (0..face_count).map(|face| slots[face / run]).collect();
    (distinct, per_face)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshPayload {
        MeshPayload {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![[0, 1, 2]],
            surface_types: vec!["planar".into()],
            center: [0.33, 0.33, 0.0],
            size: [1.0, 1.0, 0.0],
        }
    }

    fn cube() -> MeshPayload {
        let vertices = vec![
            [-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0],
        ];
        let faces = vec![
            [0, 2, 1], [0, 3, 2], // back
            [4, 5, 6], [4, 6, 7], // front
            [0, 1, 5], [0, 5, 4], // bottom
            [3, 7, 6], [3, 6, 2], // top
            [0, 4, 7], [0, 7, 3], // left
            [1, 2, 6], [1, 6, 5], // right
        ];
        MeshPayload {
            vertices,
            faces,
            surface_types: vec!["planar".into(); 6],
            center: [0.0; 3],
            size: [2.0; 3],
        }
    }

    #[test]
    fn flattens_three_components_per_vertex() {
        let g = MeshGeometry::build(&triangle()).unwrap();
        assert_eq!(g.positions, vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        assert_eq!(g.indices, vec![0, 1, 2]);
        assert_eq!(g.vertex_count(), 3);
        assert_eq!(g.triangle_count(), 1);
    }

    #[test]
    fn flat_triangle_normals_point_up_z() {
        let g = MeshGeometry::build(&triangle()).unwrap();
        for n in g.normals.chunks_exact(3) {
            assert!((n[2] - 1.0).abs() < 1e-6, "{n:?}");
        }
    }

    #[test]
    fn cube_corner_normals_point_outwards() {
        let g = MeshGeometry::build(&cube()).unwrap();
        for (p, n) in g.positions.chunks_exact(3).zip(g.normals.chunks_exact(3)) {
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            assert!((len - 1.0).abs() < 1e-5);
            for axis in 0..3 {
                assert_eq!(p[axis].signum(), n[axis].signum());
            }
        }
    }

    #[test]
    fn one_material_per_distinct_label() {
        let g = MeshGeometry::build(&triangle()).unwrap();
        assert_eq!(g.groups.len(), 1);
        assert_eq!(g.groups[0].label, "planar");
        assert_eq!((g.groups[0].start, g.groups[0].count), (0, 3));

        let g = MeshGeometry::build(&cube()).unwrap();
        assert_eq!(g.groups.len(), 1);
        assert_eq!(g.groups[0].count, 36);
    }

    #[test]
    fn labels_per_face_are_grouped_contiguously() {
        let mut mesh = cube();
        mesh.surface_types = (0..12)
            .map(|i| if i % 2 == 0 { "planar" } else { "cylindrical" }.to_string())
            .collect();
        let g = MeshGeometry::build(&mesh).unwrap();
        assert_eq!(g.groups.len(), 2);
        assert_eq!(g.groups[0].label, "planar");
        assert_eq!((g.groups[0].start, g.groups[0].count), (0, 18));
        assert_eq!((g.groups[1].start, g.groups[1].count), (18, 18));
        assert_ne!(g.groups[0].color, g.groups[1].color);
    }

    #[test]
    fn fewer_labels_than_faces_split_into_runs() {
        let (labels, per_face) = face_labels(5, &["a".into(), "b".into()]);
        assert_eq!(labels, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(per_face, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn missing_labels_fall_back_to_default() {
        let mut mesh = triangle();
        mesh.surface_types.clear();
        let g = MeshGeometry::build(&mesh).unwrap();
        assert_eq!(g.groups.len(), 1);
        assert_eq!(g.groups[0].label, DEFAULT_SURFACE);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut mesh = triangle();
        mesh.faces.push([0, 1, 3]);
        assert!(matches!(
            MeshGeometry::build(&mesh),
            Err(PreviewError::RenderConstruction(_))
        ));
    }

    #[test]
    fn empty_or_non_finite_meshes_are_rejected() {
        let mut mesh = triangle();
        mesh.faces.clear();
        assert!(MeshGeometry::build(&mesh).is_err());

        let mut mesh = triangle();
        mesh.vertices[1][0] = f32::NAN;
        assert!(MeshGeometry::build(&mesh).is_err());
    }

    #[test]
    fn transform_centres_then_scales() {
        let t = ModelTransform::fit([0.33, 0.33, 0.0], [1.0, 1.0, 0.0], 5.0).unwrap();
        assert_eq!(t.scale, 5.0);
        assert_eq!(t.translation, Vector3::new(-0.33, -0.33, 0.0));

        let p = t.apply(&Point3::new(0.33, 0.33, 0.0));
        assert!(p.coords.norm() < 1e-6);

        let m = t.matrix().transform_point(&Point3::new(1.0, 0.0, 0.0));
        let a = t.apply(&Point3::new(1.0, 0.0, 0.0));
        assert!((m - a).norm() < 1e-5);
    }

    #[test]
    fn zero_size_cannot_be_scaled() {
        assert!(ModelTransform::fit([0.0; 3], [0.0; 3], 5.0).is_err());
        assert!(ModelTransform::fit([0.0; 3], [-1.0, 0.0, 0.0], 5.0).is_err());
    }

    #[test]
    fn bounds_follow_the_transform() {
        let g = MeshGeometry::build(&cube()).unwrap();
        let t = ModelTransform::fit([1.0, 0.0, 0.0], [2.0; 3], 5.0).unwrap();
        let b = g.bounds_after(&t).unwrap();
        assert!((b.max_dim() - 5.0).abs() < 1e-5);
        assert!((b.center().x + 2.5).abs() < 1e-5);
    }
}
