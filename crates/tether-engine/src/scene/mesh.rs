use super::ResourceKey;

/// Floats per vertex in the interleaved block: position xyz + texcoord uv.
pub const VERTEX_FLOATS: usize = 5;

/// Floats per vertex in the normals block.
pub const NORMAL_FLOATS: usize = 3;

/// Unindexed triangle mesh in split layout.
///
/// `data` holds `vertex_count * 5` interleaved position/texcoord floats
/// followed by `vertex_count * 3` normal floats. Both blocks live in one GPU
/// buffer; the normals are bound as a second vertex stream at
/// [`MeshData::normals_offset`].
#[derive(Debug)]
pub struct MeshData {
    key: ResourceKey,
    vertex_count: u32,
    data: Vec<f32>,
}

impl MeshData {
    pub fn new(vertex_count: u32, data: Vec<f32>) -> Self {
        debug_assert_eq!(
            data.len(),
            vertex_count as usize * (VERTEX_FLOATS + NORMAL_FLOATS)
        );
        Self {
            key: ResourceKey::next(),
            vertex_count,
            data,
        }
    }

    #[inline]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Byte offset of the normals block.
    #[inline]
    pub fn normals_offset(&self) -> u64 {
        (self.vertex_count as usize * VERTEX_FLOATS * std::mem::size_of::<f32>()) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normals_follow_the_vertex_block() {
        let mesh = MeshData::new(3, vec![0.0; 3 * 8]);
        assert_eq!(mesh.normals_offset(), 3 * 5 * 4);
    }
}
