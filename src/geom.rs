//! Triangle geometry kernel: point-in-triangle tests, plane/line and
//! plane/triangle intersection, and axis-aligned bounding boxes.
//!
//! All comparisons use a fixed tolerance, matching the source's `epsilon`
//! in `original_source/src/geometry.go`.

use nalgebra::{Vector2, Vector3};
use thiserror::Error;

/// Zero band used by [`sign`] and every tolerance comparison in this module.
pub const EPSILON: f64 = 1e-5;

/// A 3-component point/vector in mesh space (millimeters).
pub type Vec3 = Vector3<f64>;

/// A 2-component point in a slice plane.
pub type Vec2 = Vector2<f64>;

/// Errors a geometric predicate can signal instead of a result.
///
/// These are not failures in the usual sense (see spec §7): callers are
/// expected to branch on them, not propagate them with `?`.
#[derive(Debug, Error, PartialEq)]
pub enum GeomError {
    #[error("no intersection found")]
    DontIntersect,
    #[error("the triangles are coplanar")]
    Coplanar,
}

/// Classifies `f` as -1, 0, or +1 with a zero band of width [`EPSILON`].
pub fn sign(f: f64) -> i32 {
    if f.abs() < EPSILON {
        0
    } else if f > 0.0 {
        1
    } else {
        -1
    }
}

fn vertex_key(v: &Vec3) -> (u64, u64, u64) {
    (v.x.to_bits(), v.y.to_bits(), v.z.to_bits())
}

/// Exact-equality key for vertex pooling. Deliberately bitwise, not
/// tolerant: STL meshes have exact repeated vertices at triangle joins,
/// and [`crate::mesh::IndexBuffer`] relies on that (spec §9).
pub fn vertex_eq(a: &Vec3, b: &Vec3) -> bool {
    vertex_key(a) == vertex_key(b)
}

pub(crate) fn vertex_hash_key(v: &Vec3) -> (u64, u64, u64) {
    vertex_key(v)
}

/// An ordered pair of points; winding is meaningful to [`Line::same_side`]
/// and to the directed segments produced by the slicer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line(pub Vec3, pub Vec3);

impl Line {
    /// True iff `p0` and `p1` lie on the same side of (or on) the
    /// infinite line through this segment.
    pub fn same_side(&self, p0: Vec3, p1: Vec3) -> bool {
        let line_vec = self.1 - self.0;
        let p0_vec = p0 - self.0;
        let p1_vec = p1 - self.0;

        let cp0 = p0_vec.cross(&line_vec);
        let cp1 = p1_vec.cross(&line_vec);

        cp0.dot(&cp1) >= 0.0
    }
}

/// An ordered triple of vertices. Winding order encodes the outward
/// normal via the right-hand rule; this orientation is load-bearing for
/// the scanline fill (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle(pub [Vec3; 3]);

impl Triangle {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self([v0, v1, v2])
    }

    pub fn vertices(&self) -> &[Vec3; 3] {
        &self.0
    }

    /// The plane through this triangle, using the *inward*-pointing
    /// cross product: the normal is negated before the offset is
    /// computed. This convention is load-bearing for
    /// [`Plane::intersect_line`] (spec §4.1) and must not be "fixed".
    pub fn plane(&self) -> Plane {
        let v0 = self.0[0];
        let normal = (self.0[1] - v0).cross(&(self.0[2] - v0));
        let inv_normal = -normal;
        let offset = inv_normal.dot(&v0);
        Plane {
            normal: inv_normal,
            offset,
        }
    }

    /// Three-edge same-side test (assumes `p` is coplanar with `self`).
    /// Boundary points count as inside.
    pub fn contains_point(&self, p: Vec3) -> bool {
        let [v0, v1, v2] = self.0;
        Line(v0, v1).same_side(v2, p) && Line(v0, v2).same_side(v1, p) && Line(v1, v2).same_side(v0, p)
    }

    /// Computes the bounding box of this triangle's three vertices.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_points(&self.0)
    }

    /// Intersects `self` with `other`, returning the shared segment.
    ///
    /// Computes each triangle's plane, intersects each triangle with the
    /// other's plane, then classifies containment of the four resulting
    /// endpoints to pick the two that bound the overlap (spec §4.1
    /// selection table). Coplanar triangles are out of scope for the
    /// slicer (which drives intersection through [`crate::slice::ZPlane`]
    /// directly) and, as in the source, this routine never actually
    /// produces [`GeomError::Coplanar`] — it is retained for API parity.
    pub fn intersect_triangle(&self, other: &Triangle) -> Result<Line, GeomError> {
        let plane_a = self.plane();
        let plane_b = other.plane();

        let tri_a_pts = plane_b.intersect_triangle(self);
        let tri_b_pts = plane_a.intersect_triangle(other);
        if tri_a_pts.len() != 2 || tri_b_pts.len() != 2 {
            return Err(GeomError::DontIntersect);
        }

        let a_has_b0 = self.contains_point(tri_b_pts[0]);
        let a_has_b1 = self.contains_point(tri_b_pts[1]);
        let b_has_a0 = other.contains_point(tri_a_pts[0]);
        let b_has_a1 = other.contains_point(tri_a_pts[1]);

        let line = if a_has_b0 && a_has_b1 {
            Some(Line(tri_b_pts[0], tri_b_pts[1]))
        } else if a_has_b0 && b_has_a0 {
            Some(Line(tri_b_pts[0], tri_a_pts[0]))
        } else if a_has_b0 && b_has_a1 {
            Some(Line(tri_b_pts[0], tri_a_pts[1]))
        } else if a_has_b1 && b_has_a0 {
            Some(Line(tri_b_pts[1], tri_a_pts[0]))
        } else if a_has_b1 && b_has_a1 {
            Some(Line(tri_b_pts[1], tri_a_pts[1]))
        } else if b_has_a0 && b_has_a1 {
            Some(Line(tri_a_pts[0], tri_a_pts[1]))
        } else {
            None
        };

        match line {
            Some(line) if vertex_eq(&line.0, &line.1) => Err(GeomError::DontIntersect),
            Some(line) => Ok(line),
            None => Err(GeomError::DontIntersect),
        }
    }
}

/// A plane `dot(n, p) + offset = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f64,
}

impl Plane {
    /// Intersects the infinite plane with the segment `line`,
    /// parameterized as `L(t) = a + t(b - a)`, `t` in `[0, 1]`.
    ///
    /// Returns `None` if the segment is parallel to the plane or the
    /// intersection falls outside the segment.
    pub fn intersect_line(&self, line: Line) -> Option<Vec3> {
        let line_vec = line.1 - line.0;
        let inv_line_vec = line.0 - line.1;

        let denom = self.normal.dot(&inv_line_vec);
        if denom.abs() < EPSILON {
            return None;
        }

        let numer = self.normal.dot(&line.0) + self.offset;
        let t = numer / denom;
        if !(0.0..=1.0).contains(&t) {
            return None;
        }

        Some(line.0 + line_vec * t)
    }

    /// True iff `tri`'s three vertices are not all strictly on the same
    /// side of the plane. A triangle with any vertex on the plane counts
    /// as crossing.
    pub fn triangle_crosses(&self, tri: &Triangle) -> bool {
        let s0 = sign(self.normal.dot(&tri.0[0]) + self.offset);
        let s1 = sign(self.normal.dot(&tri.0[1]) + self.offset);
        let s2 = sign(self.normal.dot(&tri.0[2]) + self.offset);
        !(s0 == s1 && s1 == s2 && s0 != 0)
    }

    /// Intersects each of `tri`'s three edges with this plane, returning
    /// 0, 1, or 2 hit points. If all three edges report a hit (one edge
    /// was parallel and coincided with a shared endpoint), the duplicate
    /// endpoint is dropped so the result always has length 0, 1, or 2.
    pub fn intersect_triangle(&self, tri: &Triangle) -> Vec<Vec3> {
        let [v0, v1, v2] = tri.0;
        let mut points = Vec::with_capacity(2);
        if let Some(p) = self.intersect_line(Line(v0, v1)) {
            points.push(p);
        }
        if let Some(p) = self.intersect_line(Line(v1, v2)) {
            points.push(p);
        }
        if let Some(p) = self.intersect_line(Line(v2, v0)) {
            points.push(p);
        }

        if points.len() != 3 {
            return points;
        }

        if vertex_eq(&points[0], &points[1]) || vertex_eq(&points[0], &points[2]) {
            return points[1..].to_vec();
        }
        if vertex_eq(&points[1], &points[2]) {
            return points[..2].to_vec();
        }

        points
    }
}

/// Axis-aligned bounding box with invariant `lower[i] <= upper[i]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lower: Vec3,
    pub upper: Vec3,
}

impl BoundingBox {
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut lower = points[0];
        let mut upper = points[0];
        for p in &points[1..] {
            lower = lower.zip_map(p, f64::min);
            upper = upper.zip_map(p, f64::max);
        }
        Self { lower, upper }
    }

    /// Union of several triangles' bounding boxes.
    pub fn from_triangles(tris: &[Triangle]) -> Option<Self> {
        let mut iter = tris.iter();
        let first = iter.next()?;
        let mut bbox = first.bounds();
        for tri in iter {
            bbox = bbox.union(&tri.bounds());
        }
        Some(bbox)
    }

    pub fn center(&self) -> Vec3 {
        (self.lower + self.upper) / 2.0
    }

    /// Pads this box in place so all three extents equal the largest
    /// extent, centered on the original center.
    pub fn expand_to_cube(&mut self) -> &mut Self {
        let dims = self.upper - self.lower;
        let radius = dims.x.max(dims.y).max(dims.z) / 2.0;
        let center = self.center();
        let r = Vec3::new(radius, radius, radius);
        self.lower = center - r;
        self.upper = center + r;
        self
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.lower.x > other.upper.x
            || self.upper.x < other.lower.x
            || self.lower.y > other.upper.y
            || self.upper.y < other.lower.y
            || self.lower.z > other.upper.z
            || self.upper.z < other.lower.z)
    }

    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            lower: self.lower.zip_map(&other.lower, f64::min),
            upper: self.upper.zip_map(&other.upper, f64::max),
        }
    }

    /// True iff `z` strictly lies within this box's Z extent, excluding
    /// the boundary (used to skip triangles a slicing plane can't cross).
    pub fn contains_z_strict(&self, z: f64) -> bool {
        z > self.lower.z && z < self.upper.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_point_own_vertices() {
        let tri = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        for v in tri.vertices() {
            assert!(tri.contains_point(*v));
        }
    }

    #[test]
    fn contains_point_inside_and_outside() {
        let tri = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert!(tri.contains_point(Vec3::new(0.0, 0.0, 0.0)));
        assert!(!tri.contains_point(Vec3::new(0.0, 3.0, 0.0)));
    }

    #[test]
    fn plane_line_intersection_cases() {
        let plane = Plane {
            normal: Vec3::new(1.0, 1.0, 1.0),
            offset: 0.0,
        };

        let hit = plane.intersect_line(Line(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(2.0, 2.0, 2.0)));
        assert_eq!(hit, Some(Vec3::new(0.0, 0.0, 0.0)));

        let parallel = plane.intersect_line(Line(Vec3::new(2.0, 0.0, -2.0), Vec3::new(-2.0, 0.0, 2.0)));
        assert_eq!(parallel, None);

        let off_segment = plane.intersect_line(Line(Vec3::new(2.0, 2.0, 2.0), Vec3::new(5.0, 5.0, 5.0)));
        assert_eq!(off_segment, None);

        let off_segment_other_side =
            plane.intersect_line(Line(Vec3::new(-2.0, -2.0, -2.0), Vec3::new(-5.0, -5.0, -5.0)));
        assert_eq!(off_segment_other_side, None);
    }

    #[test]
    fn plane_of_triangle_uses_inward_normal() {
        let tri = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let plane = tri.plane();
        // Outward normal via RH rule is +Z; the plane stores its negation.
        assert!(plane.normal.z < 0.0);
        for v in tri.vertices() {
            assert!((plane.normal.dot(v) + plane.offset).abs() < EPSILON);
        }
    }

    #[test]
    fn bounding_box_from_triangle() {
        let tri = Triangle::new(
            Vec3::new(-1.0, 2.0, 0.0),
            Vec3::new(3.0, -1.0, 5.0),
            Vec3::new(0.0, 0.0, -2.0),
        );
        let bbox = tri.bounds();
        assert_eq!(bbox.lower, Vec3::new(-1.0, -1.0, -2.0));
        assert_eq!(bbox.upper, Vec3::new(3.0, 2.0, 5.0));
    }

    #[test]
    fn expand_to_cube_centers_and_equalizes_extents() {
        let mut bbox = BoundingBox {
            lower: Vec3::new(0.0, 0.0, 0.0),
            upper: Vec3::new(2.0, 4.0, 6.0),
        };
        bbox.expand_to_cube();
        let dims = bbox.upper - bbox.lower;
        assert!((dims.x - dims.y).abs() < EPSILON);
        assert!((dims.y - dims.z).abs() < EPSILON);
        assert_eq!(bbox.center(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn intersect_triangle_returns_crossing_segment() {
        // A lies in the z=0 plane; B lies in the x=0 plane. Both pass
        // through the origin region, so they cross along x=0, z=0,
        // bounded by A's apex (0,1,0) and the point where A's base edge
        // crosses x=0, i.e. (0,-1,0).
        let a = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let b = Triangle::new(
            Vec3::new(0.0, -2.0, -1.0),
            Vec3::new(0.0, -2.0, 1.0),
            Vec3::new(0.0, 2.0, 0.0),
        );

        let line = a.intersect_triangle(&b).expect("triangles should cross");
        let expected_lo = Vec3::new(0.0, -1.0, 0.0);
        let expected_hi = Vec3::new(0.0, 1.0, 0.0);
        let (lo, hi) = if line.0.y <= line.1.y {
            (line.0, line.1)
        } else {
            (line.1, line.0)
        };
        assert!((lo - expected_lo).norm() < 1e-9);
        assert!((hi - expected_hi).norm() < 1e-9);
    }

    #[test]
    fn intersect_triangle_returns_none_for_disjoint_triangles() {
        // Same configuration as above, but B is shifted far down the Y
        // axis so the two triangles' planes still cross, yet neither
        // triangle's interior reaches the other's.
        let a = Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let b = Triangle::new(
            Vec3::new(0.0, 98.0, -1.0),
            Vec3::new(0.0, 98.0, 1.0),
            Vec3::new(0.0, 102.0, 0.0),
        );

        assert_eq!(a.intersect_triangle(&b), Err(GeomError::DontIntersect));
    }

    #[test]
    fn triangle_crosses_respects_on_plane_vertices() {
        let plane = Plane {
            normal: Vec3::new(0.0, 0.0, 1.0),
            offset: 0.0,
        };
        let tri_touching = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert!(plane.triangle_crosses(&tri_touching));

        let tri_away = Triangle::new(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 3.0),
        );
        assert!(!plane.triangle_crosses(&tri_away));
    }
}
