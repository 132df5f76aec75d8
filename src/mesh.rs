//! The streaming "triangle source" abstraction and its two in-memory
//! representations.
//!
//! Grounded on `original_source/arraybuffer.go`, `indexbuffer.go` and
//! `src/mesh.go`: the source spawns a goroutine per stream and hands
//! triangles down an unbuffered channel. Spec §5/§9 both call that a
//! stylistic choice with no throughput benefit — every stream has
//! exactly one consumer, so a pull-based iterator replaces it here with
//! no behavioral change and no risk of a leaked producer goroutine if a
//! consumer stops early.

use std::collections::HashMap;

use crate::geom::{vertex_hash_key, Triangle, Vec3};

/// A finite, possibly single-use, source of triangles.
///
/// `num_triangles` and `stream` may be called any number of times on
/// [`ArrayBuffer`] and [`IndexBuffer`] (and on [`crate::stl::StlFile`]),
/// each `stream()` call producing a fresh, independent iterator — but
/// nothing requires a given iterator itself to be restarted once
/// partially consumed.
///
/// `populate-from`/`convert-from` is deliberately not part of this trait:
/// [`ArrayBuffer`] and [`IndexBuffer`] can always drain a stream
/// in-memory and infallibly, but [`crate::stl::StlFile`]'s equivalent
/// does file I/O and must be able to fail. Each concrete type exposes
/// its own `convert_from` with the signature that fits (spec §9: model
/// the capability set, not a shared base class).
pub trait TriangleSource {
    fn num_triangles(&self) -> usize;

    fn stream(&self) -> Box<dyn Iterator<Item = Triangle> + '_>;
}

/// A contiguous, ordered, restartable sequence of triangles.
#[derive(Debug, Clone, Default)]
pub struct ArrayBuffer {
    triangles: Vec<Triangle>,
}

impl ArrayBuffer {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn from_source(source: &dyn TriangleSource) -> Self {
        let mut buf = ArrayBuffer::default();
        buf.convert_from(source);
        buf
    }

    /// Preallocates to the source's triangle count, drains its stream,
    /// and appends each triangle (spec §4.4).
    pub fn convert_from(&mut self, source: &dyn TriangleSource) {
        let mut triangles = Vec::with_capacity(source.num_triangles());
        triangles.extend(source.stream());
        self.triangles = triangles;
    }
}

impl TriangleSource for ArrayBuffer {
    fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    fn stream(&self) -> Box<dyn Iterator<Item = Triangle> + '_> {
        Box::new(self.triangles.iter().copied())
    }
}

/// A single face: three indices into [`IndexBuffer::vertices`].
pub type Face = [u32; 3];

/// A pool of unique vertices plus an ordered list of faces referencing
/// them by index. Vertex pooling uses bitwise float equality, not
/// tolerant equality — see [`crate::geom::vertex_eq`].
#[derive(Debug, Clone, Default)]
pub struct IndexBuffer {
    vertices: Vec<Vec3>,
    faces: Vec<Face>,
}

impl IndexBuffer {
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn from_source(source: &dyn TriangleSource) -> Self {
        let mut buf = IndexBuffer::default();
        buf.convert_from(source);
        buf
    }

    /// Maintains a mapping from vertex (by exact equality) to a
    /// small-integer index; for each incoming triangle's three
    /// vertices, inserts-if-absent and appends the index to a new face
    /// (spec §4.4). Face count always equals the source's triangle
    /// count.
    pub fn convert_from(&mut self, source: &dyn TriangleSource) {
        let mut vertices = Vec::new();
        let mut faces = Vec::with_capacity(source.num_triangles());
        let mut seen: HashMap<(u64, u64, u64), u32> = HashMap::new();

        let mut index_of = |v: Vec3, vertices: &mut Vec<Vec3>| -> u32 {
            let key = vertex_hash_key(&v);
            *seen.entry(key).or_insert_with(|| {
                vertices.push(v);
                (vertices.len() - 1) as u32
            })
        };

        for tri in source.stream() {
            let [v0, v1, v2] = tri.0;
            let face = [
                index_of(v0, &mut vertices),
                index_of(v1, &mut vertices),
                index_of(v2, &mut vertices),
            ];
            faces.push(face);
        }

        self.vertices = vertices;
        self.faces = faces;
    }
}

impl TriangleSource for IndexBuffer {
    fn num_triangles(&self) -> usize {
        self.faces.len()
    }

    fn stream(&self) -> Box<dyn Iterator<Item = Triangle> + '_> {
        Box::new(self.faces.iter().map(move |face| {
            Triangle::new(
                self.vertices[face[0] as usize],
                self.vertices[face[1] as usize],
                self.vertices[face[2] as usize],
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_array_buffer() -> ArrayBuffer {
        // A unit cube, two triangles per face, vertices shared across
        // triangles within a face (deliberately, to exercise dedup).
        let p = |x: f64, y: f64, z: f64| Vec3::new(x, y, z);
        let v = [
            p(0.0, 0.0, 0.0), // 0
            p(1.0, 0.0, 0.0), // 1
            p(1.0, 1.0, 0.0), // 2
            p(0.0, 1.0, 0.0), // 3
            p(0.0, 0.0, 1.0), // 4
            p(1.0, 0.0, 1.0), // 5
            p(1.0, 1.0, 1.0), // 6
            p(0.0, 1.0, 1.0), // 7
        ];
        let faces: [[usize; 3]; 12] = [
            [0, 1, 2],
            [0, 2, 3], // bottom
            [4, 6, 5],
            [4, 7, 6], // top
            [0, 5, 1],
            [0, 4, 5], // front
            [1, 5, 6],
            [1, 6, 2], // right
            [2, 6, 7],
            [2, 7, 3], // back
            [3, 7, 4],
            [3, 4, 0], // left
        ];
        let triangles = faces
            .iter()
            .map(|f| Triangle::new(v[f[0]], v[f[1]], v[f[2]]))
            .collect();
        ArrayBuffer::new(triangles)
    }

    #[test]
    fn array_buffer_round_trips_triangle_count() {
        let cube = cube_array_buffer();
        let copy = ArrayBuffer::from_source(&cube);
        assert_eq!(copy.num_triangles(), cube.num_triangles());
        assert_eq!(copy.triangles(), cube.triangles());
    }

    #[test]
    fn index_buffer_dedups_shared_vertices() {
        let cube = cube_array_buffer();
        let indexed = IndexBuffer::from_source(&cube);
        assert_eq!(indexed.num_triangles(), cube.num_triangles());
        // A cube has exactly 8 unique vertices, reused by 12 triangles.
        assert_eq!(indexed.vertices().len(), 8);
    }

    #[test]
    fn array_from_index_round_trips_triangle_sequence() {
        let cube = cube_array_buffer();
        let indexed = IndexBuffer::from_source(&cube);
        let round_tripped = ArrayBuffer::from_source(&indexed);
        assert_eq!(round_tripped.triangles(), cube.triangles());
    }

    #[test]
    fn index_buffer_face_indices_are_in_bounds() {
        let cube = cube_array_buffer();
        let indexed = IndexBuffer::from_source(&cube);
        for face in indexed.faces() {
            for &idx in face {
                assert!((idx as usize) < indexed.vertices().len());
            }
        }
    }
}
