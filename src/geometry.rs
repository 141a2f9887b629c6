//! CPU-side geometry shared between mesh components.
//!
//! A [`Geometry`] is immutable once built and handed around as `Arc<Geometry>`,
//! so any number of entities can reference one primitive. Each geometry carries a
//! process-unique [`GeometryId`]; the renderer keys its GPU buffers on that id and
//! uploads lazily the first time a geometry is drawn.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Vec3};

use crate::mesh::Vertex3d;

/// Identity of an uploaded-or-uploadable geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(u64);

impl GeometryId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        GeometryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Raw geometry data before it is frozen into a [`Geometry`].
///
/// This intermediate representation allows fix-ups (recentering, normals)
/// while a model is still being imported.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    /// Vertex positions, normals, and UVs.
    pub vertices: Vec<Vertex3d>,
    /// Triangle indices.
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Returns `(min, max)` corners of the axis-aligned bounding box.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    /// Returns the center point of the geometry.
    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.len() < 3
    }

    /// Translates all vertices by the given offset.
    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) + offset).into();
        }
    }

    /// Centers the geometry at the origin.
    pub fn recenter(&mut self) {
        let center = self.center();
        self.translate(-center);
    }

    /// Bake a matrix into positions and normals.
    pub fn transform(&mut self, matrix: Mat4) {
        let normal_matrix = matrix.inverse().transpose();
        for v in &mut self.vertices {
            v.position = matrix.transform_point3(Vec3::from(v.position)).into();
            v.normal = normal_matrix
                .transform_vector3(Vec3::from(v.normal))
                .normalize_or_zero()
                .into();
        }
    }

    /// Recalculates vertex normals from face geometry.
    ///
    /// Normals are the area-weighted average of the faces sharing each vertex.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0.max(i1).max(i2) >= self.vertices.len() {
                continue;
            }

            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            let face_normal = (p1 - p0).cross(p2 - p0);

            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face_normal;
                self.vertices[i].normal = n.into();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }
}

/// Immutable geometry referenced by mesh components.
#[derive(Debug)]
pub struct Geometry {
    id: GeometryId,
    name: String,
    raw: RawGeometry,
    bounds: (Vec3, Vec3),
}

impl Geometry {
    pub fn new(name: impl Into<String>, raw: RawGeometry) -> Arc<Self> {
        let bounds = raw.bounds();
        Arc::new(Self {
            id: GeometryId::next(),
            name: name.into(),
            raw,
            bounds,
        })
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[Vertex3d] {
        &self.raw.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.raw.indices
    }

    /// Local-space `(min, max)` corners.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.bounds
    }

    /// A unit cube centered at the origin, with per-face normals.
    pub fn cube() -> Arc<Self> {
        #[rustfmt::skip]
        let vertices = vec![
            // Front face (Z+)
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 0.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 0.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [1.0, 1.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  0.0,  1.0], [0.0, 1.0]),
            // Back face (Z-)
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 0.0]),
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 0.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  0.0, -1.0], [0.0, 1.0]),
            // Top face (Y+)
            Vertex3d::new([-0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [0.0, 0.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 0.0,  1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [ 0.0,  1.0,  0.0], [0.0, 1.0]),
            // Bottom face (Y-)
            Vertex3d::new([-0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [0.0, 0.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 0.0, -1.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [ 0.0, -1.0,  0.0], [0.0, 1.0]),
            // Right face (X+)
            Vertex3d::new([ 0.5, -0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 0.0]),
            Vertex3d::new([ 0.5, -0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([ 0.5,  0.5, -0.5], [ 1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([ 0.5,  0.5,  0.5], [ 1.0,  0.0,  0.0], [0.0, 1.0]),
            // Left face (X-)
            Vertex3d::new([-0.5, -0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 0.0]),
            Vertex3d::new([-0.5, -0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 0.0]),
            Vertex3d::new([-0.5,  0.5,  0.5], [-1.0,  0.0,  0.0], [1.0, 1.0]),
            Vertex3d::new([-0.5,  0.5, -0.5], [-1.0,  0.0,  0.0], [0.0, 1.0]),
        ];

        #[rustfmt::skip]
        let indices: Vec<u32> = vec![
            0,  1,  2,  2,  3,  0,  // front
            4,  5,  6,  6,  7,  4,  // back
            8,  9,  10, 10, 11, 8,  // top
            12, 13, 14, 14, 15, 12, // bottom
            16, 17, 18, 18, 19, 16, // right
            20, 21, 22, 22, 23, 20, // left
        ];

        Self::new("Cube", RawGeometry::new(vertices, indices))
    }

    /// A square on the XZ plane facing +Y.
    pub fn plane(size: f32) -> Arc<Self> {
        let half = size * 0.5;
        let vertices = vec![
            Vertex3d::new([-half, 0.0, -half], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([-half, 0.0, half], [0.0, 1.0, 0.0], [0.0, 1.0]),
            Vertex3d::new([half, 0.0, half], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex3d::new([half, 0.0, -half], [0.0, 1.0, 0.0], [1.0, 0.0]),
        ];
        let indices = vec![0, 1, 2, 2, 3, 0];

        Self::new("Plane", RawGeometry::new(vertices, indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_geometry_bounds() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([-1.0, -1.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let geom = RawGeometry::new(vertices, vec![0, 1, 2]);

        let (min, max) = geom.bounds();
        assert_eq!(min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn raw_geometry_recenter() {
        let vertices = vec![
            Vertex3d::new([2.0, 2.0, 2.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
            Vertex3d::new([4.0, 4.0, 4.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        let mut geom = RawGeometry::new(vertices, vec![0, 1, 0]);

        geom.recenter();

        assert!(geom.center().length() < 0.001);
    }

    #[test]
    fn recalculated_normals_follow_winding() {
        let vertices = vec![
            Vertex3d::new([0.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([1.0, 0.0, 0.0], [0.0; 3], [0.0, 0.0]),
            Vertex3d::new([0.0, 1.0, 0.0], [0.0; 3], [0.0, 0.0]),
        ];
        let mut geom = RawGeometry::new(vertices, vec![0, 1, 2]);
        geom.recalculate_normals();
        assert_eq!(geom.vertices[0].normal, [0.0, 0.0, 1.0]);
    }

    #[test]
    fn plane_winding_faces_up() {
        let plane = Geometry::plane(2.0);
        let v = plane.vertices();
        let i = plane.indices();
        let p = |k: usize| Vec3::from(v[i[k] as usize].position);
        let n = (p(1) - p(0)).cross(p(2) - p(0));
        assert!(n.y > 0.0);
    }

    #[test]
    fn each_geometry_gets_a_fresh_id() {
        let a = Geometry::cube();
        let b = Geometry::cube();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.bounds(), (Vec3::splat(-0.5), Vec3::splat(0.5)));
    }
}
