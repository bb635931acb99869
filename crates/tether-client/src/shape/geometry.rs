use glam::Vec3;
use tether_engine::scene::{MeshData, NORMAL_FLOATS, VERTEX_FLOATS};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    #[error("mesh has {0} floats, not a multiple of 5")]
    MeshStride(usize),

    #[error("mesh has {0} vertices, not a multiple of 3")]
    PartialTriangle(usize),

    #[error("mesh has {0} vertices, more than a draw can address")]
    TooManyVertices(usize),

    #[error("face index is empty")]
    NoFaces,

    #[error("face {face} starts at vertex {offset}, not a triangle boundary")]
    MisalignedFace { face: usize, offset: u32 },

    #[error("face {face} starts at vertex {offset}, before the previous face")]
    DescendingFace { face: usize, offset: u32 },

    #[error("face {face} starts at vertex {offset}, past the {vertex_count} vertices of the mesh")]
    FaceOutOfRange {
        face: usize,
        offset: u32,
        vertex_count: u32,
    },
}

/// Checks the raw vertex stream and returns its vertex count.
pub fn vertex_count(mesh: &[f32]) -> Result<u32, GeometryError> {
    if mesh.len() % VERTEX_FLOATS != 0 {
        return Err(GeometryError::MeshStride(mesh.len()));
    }
    let vertices = mesh.len() / VERTEX_FLOATS;
    if vertices % 3 != 0 {
        return Err(GeometryError::PartialTriangle(vertices));
    }
    u32::try_from(vertices).map_err(|_| GeometryError::TooManyVertices(vertices))
}

/// Flat per-triangle normals, one entry per vertex.
///
/// Each triangle `(p1, p2, p3)` gets `normalize(cross(p2 - p1, p3 - p1))` on all
/// three vertices. Degenerate triangles get the zero vector.
pub fn flat_normals(mesh: &[f32]) -> Vec<Vec3> {
    let positions: Vec<Vec3> = mesh
        .chunks_exact(VERTEX_FLOATS)
        .map(|v| Vec3::new(v[0], v[1], v[2]))
        .collect();

    let mut normals = Vec::with_capacity(positions.len());
    for tri in positions.chunks_exact(3) {
        let n = (tri[1] - tri[0]).cross(tri[2] - tri[0]).normalize_or_zero();
        normals.extend([n, n, n]);
    }
    normals
}

/// Builds the GPU-ready mesh: the raw vertex block followed by the normals block.
pub fn build_mesh(mesh: &[f32], vertex_count: u32) -> MeshData {
    let normals = flat_normals(mesh);

    let mut data = Vec::with_capacity(vertex_count as usize * (VERTEX_FLOATS + NORMAL_FLOATS));
    data.extend_from_slice(mesh);
    for n in &normals {
        data.extend_from_slice(&n.to_array());
    }

    MeshData::new(vertex_count, data)
}

/// Contiguous vertex range of one face.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FaceSpan {
    pub first: u32,
    pub count: u32,
}

/// Validated face start offsets of a leaf.
///
/// Face `i` covers `[offsets[i], offsets[i + 1])`; the last face runs to the
/// end of the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaceTable {
    offsets: Vec<u32>,
    vertex_count: u32,
}

impl FaceTable {
    pub fn new(offsets: Vec<u32>, vertex_count: u32) -> Result<Self, GeometryError> {
        if offsets.is_empty() {
            return Err(GeometryError::NoFaces);
        }

        let mut previous = 0;
        for (face, &offset) in offsets.iter().enumerate() {
            if offset % 3 != 0 {
                return Err(GeometryError::MisalignedFace { face, offset });
            }
            if offset < previous {
                return Err(GeometryError::DescendingFace { face, offset });
            }
            if offset > vertex_count {
                return Err(GeometryError::FaceOutOfRange {
                    face,
                    offset,
                    vertex_count,
                });
            }
            previous = offset;
        }

        Ok(Self {
            offsets,
            vertex_count,
        })
    }

    /// Number of faces.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn span(&self, face: usize) -> FaceSpan {
        let first = self.offsets[face];
        let end = self
            .offsets
            .get(face + 1)
            .copied()
            .unwrap_or(self.vertex_count);
        FaceSpan {
            first,
            count: end - first,
        }
    }

    pub fn spans(&self) -> impl Iterator<Item = FaceSpan> + '_ {
        (0..self.offsets.len()).map(|face| self.span(face))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(p: [f32; 3]) -> [f32; 5] {
        [p[0], p[1], p[2], 0.0, 0.0]
    }

    fn mesh_of(triangles: &[[[f32; 3]; 3]]) -> Vec<f32> {
        triangles
            .iter()
            .flat_map(|tri| tri.iter().flat_map(|p| vertex(*p)))
            .collect()
    }

    // ── normals ──────────────────────────────────────────────────────────

    #[test]
    fn unit_triangle_faces_positive_z() {
        let mesh = mesh_of(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        let normals = flat_normals(&mesh);
        assert_eq!(normals, vec![Vec3::Z; 3]);
    }

    #[test]
    fn one_normal_per_vertex_shared_within_each_triangle() {
        let mesh = mesh_of(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
            [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        ]);
        let normals = flat_normals(&mesh);

        assert_eq!(normals.len(), 9);
        for tri in normals.chunks_exact(3) {
            assert_eq!(tri[0], tri[1]);
            assert_eq!(tri[1], tri[2]);
        }
        assert_eq!(normals[3], Vec3::Y);
        assert_eq!(normals[6], Vec3::X);
    }

    #[test]
    fn adjacent_triangles_do_not_share_normals() {
        // Two triangles folded along the x axis.
        let mesh = mesh_of(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
        ]);
        let normals = flat_normals(&mesh);
        assert_ne!(normals[0], normals[3]);
    }

    #[test]
    fn degenerate_triangle_gets_zero_normal() {
        let mesh = mesh_of(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]]);
        assert_eq!(flat_normals(&mesh), vec![Vec3::ZERO; 3]);
    }

    // ── layout ───────────────────────────────────────────────────────────

    #[test]
    fn mesh_layout_is_vertices_then_normals() {
        let mut mesh = mesh_of(&[[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        mesh[3] = 0.25; // first vertex u
        let data = build_mesh(&mesh, 3);

        assert_eq!(data.vertex_count(), 3);
        assert_eq!(data.data().len(), 3 * 8);
        assert_eq!(&data.data()[..15], mesh.as_slice());
        assert_eq!(&data.data()[15..18], &[0.0, 0.0, 1.0]);
        assert_eq!(&data.data()[21..24], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn vertex_count_validates_stride_and_triangles() {
        assert_eq!(vertex_count(&[0.0; 15]), Ok(3));
        assert_eq!(vertex_count(&[]), Ok(0));
        assert_eq!(vertex_count(&[0.0; 14]), Err(GeometryError::MeshStride(14)));
        assert_eq!(vertex_count(&[0.0; 10]), Err(GeometryError::PartialTriangle(2)));
    }

    // ── faces ────────────────────────────────────────────────────────────

    #[test]
    fn spans_run_to_next_face_and_last_to_end() {
        let faces = FaceTable::new(vec![0, 3, 9], 12).unwrap();
        let spans: Vec<FaceSpan> = faces.spans().collect();
        assert_eq!(
            spans,
            vec![
                FaceSpan { first: 0, count: 3 },
                FaceSpan { first: 3, count: 6 },
                FaceSpan { first: 9, count: 3 },
            ]
        );
    }

    #[test]
    fn face_table_rejects_bad_offsets() {
        assert_eq!(FaceTable::new(vec![], 3), Err(GeometryError::NoFaces));
        assert_eq!(
            FaceTable::new(vec![0, 4], 6),
            Err(GeometryError::MisalignedFace { face: 1, offset: 4 })
        );
        assert_eq!(
            FaceTable::new(vec![3, 0], 6),
            Err(GeometryError::DescendingFace { face: 1, offset: 0 })
        );
        assert_eq!(
            FaceTable::new(vec![0, 9], 6),
            Err(GeometryError::FaceOutOfRange { face: 1, offset: 9, vertex_count: 6 })
        );
    }

    #[test]
    fn face_at_end_of_mesh_is_empty() {
        let faces = FaceTable::new(vec![0, 6], 6).unwrap();
        assert_eq!(faces.span(1), FaceSpan { first: 6, count: 0 });
    }
}
