// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mesh geometry consumed by the material binder.
//!
//! Streams are named after the vertex attributes generated shaders declare
//! (`i_position`, `i_normal`, `i_tangent`, `i_texcoord_0`), so binding is a
//! lookup by name.

use indexmap::IndexMap;
use mxview_shadergen::implementation::{
    NORMAL_ATTRIBUTE, POSITION_ATTRIBUTE, TANGENT_ATTRIBUTE, TEXCOORD_ATTRIBUTE_PREFIX,
};

/// One vertex attribute stream
#[derive(Debug, Clone, PartialEq)]
pub struct MeshStream {
    /// Attribute name
    pub name: String,
    /// Components per vertex
    pub components: usize,
    /// Interleaved components
    pub data: Vec<f32>,
}

impl MeshStream {
    /// Create a stream
    pub fn new(name: impl Into<String>, components: usize, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            components,
            data,
        }
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.data.len() / self.components
        }
    }
}

/// Triangles drawn with one material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshPartition {
    /// Partition name
    pub name: String,
    /// Triangle list indices
    pub indices: Vec<u32>,
}

impl MeshPartition {
    /// Create a partition
    pub fn new(name: impl Into<String>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            indices,
        }
    }

    /// Number of triangles
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Geometry with named attribute streams and index partitions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    name: String,
    streams: IndexMap<String, MeshStream>,
    partitions: Vec<MeshPartition>,
}

impl Mesh {
    /// Create an empty mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Mesh name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a stream, replacing one of the same name
    pub fn add_stream(&mut self, stream: MeshStream) {
        self.streams.insert(stream.name.clone(), stream);
    }

    /// Add a partition
    pub fn add_partition(&mut self, partition: MeshPartition) {
        self.partitions.push(partition);
    }

    /// Look up a stream by attribute name
    pub fn stream(&self, name: &str) -> Option<&MeshStream> {
        self.streams.get(name)
    }

    /// Streams in insertion order
    pub fn streams(&self) -> impl Iterator<Item = &MeshStream> {
        self.streams.values()
    }

    /// Index partitions
    pub fn partitions(&self) -> &[MeshPartition] {
        &self.partitions
    }

    /// Number of vertices, from the position stream
    pub fn vertex_count(&self) -> usize {
        self.stream(POSITION_ATTRIBUTE)
            .map_or(0, MeshStream::vertex_count)
    }

    /// A square on the XZ plane facing +Y, centered at the origin
    pub fn plane(size: f32) -> Self {
        let half = size * 0.5;
        #[rustfmt::skip]
        let positions = vec![
            -half, 0.0, -half,
             half, 0.0, -half,
             half, 0.0,  half,
            -half, 0.0,  half,
        ];

        let mut mesh = Self::new("plane");
        mesh.add_stream(MeshStream::new(POSITION_ATTRIBUTE, 3, positions));
        mesh.add_stream(MeshStream::new(NORMAL_ATTRIBUTE, 3, [0.0, 1.0, 0.0].repeat(4)));
        mesh.add_stream(MeshStream::new(TANGENT_ATTRIBUTE, 3, [1.0, 0.0, 0.0].repeat(4)));
        mesh.add_stream(MeshStream::new(
            format!("{TEXCOORD_ATTRIBUTE_PREFIX}0"),
            2,
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
        ));
        mesh.add_partition(MeshPartition::new("plane", vec![0, 1, 2, 2, 3, 0]));
        mesh
    }

    /// A unit cube centered at the origin
    pub fn cube() -> Self {
        // Each face has its own vertices for correct normals
        #[rustfmt::skip]
        let faces: [([f32; 3], [f32; 3], [[f32; 3]; 4]); 6] = [
            ([ 0.0,  0.0,  1.0], [ 1.0, 0.0,  0.0], [[-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5]]),
            ([ 0.0,  0.0, -1.0], [-1.0, 0.0,  0.0], [[ 0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5]]),
            ([ 0.0,  1.0,  0.0], [ 1.0, 0.0,  0.0], [[-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5], [-0.5,  0.5, -0.5]]),
            ([ 0.0, -1.0,  0.0], [ 1.0, 0.0,  0.0], [[-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5]]),
            ([ 1.0,  0.0,  0.0], [ 0.0, 0.0, -1.0], [[ 0.5, -0.5,  0.5], [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5]]),
            ([-1.0,  0.0,  0.0], [ 0.0, 0.0,  1.0], [[-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5]]),
        ];

        let mut positions = Vec::with_capacity(72);
        let mut normals = Vec::with_capacity(72);
        let mut tangents = Vec::with_capacity(72);
        let mut texcoords = Vec::with_capacity(48);
        let mut indices = Vec::with_capacity(36);
        for (face, (normal, tangent, corners)) in faces.iter().enumerate() {
            for (corner, uv) in corners.iter().zip([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]) {
                positions.extend_from_slice(corner);
                normals.extend_from_slice(normal);
                tangents.extend_from_slice(tangent);
                texcoords.extend_from_slice(&uv);
            }
            let base = (face * 4) as u32;
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        let mut mesh = Self::new("cube");
        mesh.add_stream(MeshStream::new(POSITION_ATTRIBUTE, 3, positions));
        mesh.add_stream(MeshStream::new(NORMAL_ATTRIBUTE, 3, normals));
        mesh.add_stream(MeshStream::new(TANGENT_ATTRIBUTE, 3, tangents));
        mesh.add_stream(MeshStream::new(format!("{TEXCOORD_ATTRIBUTE_PREFIX}0"), 2, texcoords));
        mesh.add_partition(MeshPartition::new("cube", indices));
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_are_consistent() {
        for mesh in [Mesh::plane(2.0), Mesh::cube()] {
            let count = mesh.vertex_count();
            assert!(count > 0);
            for stream in mesh.streams() {
                assert_eq!(stream.vertex_count(), count, "{} {}", mesh.name(), stream.name);
            }
            for partition in mesh.partitions() {
                assert!(partition.indices.iter().all(|&i| (i as usize) < count));
            }
        }
        assert_eq!(Mesh::cube().partitions()[0].face_count(), 12);
        assert!(Mesh::plane(1.0).stream("i_texcoord_0").is_some());
    }
}
