//! Intersects triangles with a single axis-aligned Z-plane, producing
//! the directed 2D segments the rasterizer fills.
//!
//! Grounded on `original_source/src/svx/svx.go` (`zPlane`, `planeLine`,
//! `intersectTriangle`/`intersectsLine`/`intersectLine`).

use crate::geom::{Line, Triangle, Vec2};

/// A single Z-intercept slicing plane.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ZPlane(pub f64);

impl ZPlane {
    /// True iff this plane's Z strictly lies between `line`'s two
    /// endpoint Z values. Both ends are excluded: a line endpoint
    /// exactly on the plane does not count as a crossing.
    pub fn intersects_line(&self, line: &Line) -> bool {
        let z = self.0;
        (z > line.0.z && z < line.1.z) || (z > line.1.z && z < line.0.z)
    }

    /// Linear interpolation in Z, producing the 2D point on this plane
    /// where `line` crosses it. Caller must ensure the line actually
    /// crosses (see [`Self::intersects_line`]).
    pub fn intersect_line(&self, line: &Line) -> Vec2 {
        let scale = (self.0 - line.0.z) / (line.1.z - line.0.z);
        Vec2::new(
            scale * (line.1.x - line.0.x) + line.0.x,
            scale * (line.1.y - line.0.y) + line.0.y,
        )
    }

    /// Slices `tri` with this plane, returning the directed segment
    /// from the "submerging" edge crossing to the "emerging" edge
    /// crossing, or `None` if no edge crosses strictly.
    ///
    /// Iterates the three directed edges `v0->v1`, `v1->v2`, `v2->v0`.
    /// An edge whose destination Z exceeds its source Z "emerges" and
    /// contributes the segment's head; one whose destination Z is
    /// lower "submerges" and contributes the tail. A non-degenerate
    /// slicing crosses exactly two edges.
    pub fn intersect_triangle(&self, tri: &Triangle) -> Option<PlaneLine> {
        let verts = tri.vertices();
        let mut tail = None;
        let mut head = None;
        let mut found = false;

        for i in 0..3 {
            let next = (i + 1) % 3;
            let edge = Line(verts[i], verts[next]);
            if !self.intersects_line(&edge) {
                continue;
            }
            found = true;
            let pt = self.intersect_line(&edge);

            if verts[next].z > verts[i].z {
                head = Some(pt);
            } else {
                tail = Some(pt);
            }
        }

        if !found {
            return None;
        }

        Some(PlaneLine(tail.unwrap_or_default(), head.unwrap_or_default()))
    }
}

/// A directed 2D segment produced by slicing one triangle with one
/// Z-plane: `.0` is the tail (submerging edge), `.1` is the head
/// (emerging edge). The direction encodes which side is interior, for a
/// right-hand-winding outward-facing mesh: the left-hand side of the
/// segment is inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneLine(pub Vec2, pub Vec2);

impl PlaneLine {
    /// True iff horizontal scanline `y` brackets this segment's Y range,
    /// inclusive on both ends. Deliberately inclusive (unlike
    /// [`ZPlane::intersects_line`]'s strict exclusion) — the scanline
    /// rasterizer depends on the inclusive form at exact scanline
    /// coincidence (spec §9, Open Questions).
    pub fn intersects_horiz_line(&self, y: f64) -> bool {
        (y >= self.0.y && y <= self.1.y) || (y >= self.1.y && y <= self.0.y)
    }

    /// X coordinate where this segment crosses horizontal line `y`.
    pub fn intersect_horiz_line(&self, y: f64) -> f64 {
        let delta_x = self.1.x - self.0.x;
        let delta_y = self.1.y - self.0.y;
        let dy = self.0.y - y;
        self.0.x - dy * delta_x / delta_y
    }

    /// True iff this segment's head Y exceeds its tail Y.
    pub fn points_up(&self) -> bool {
        self.1.y > self.0.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec3;

    #[test]
    fn vertex_on_plane_does_not_count_as_crossing() {
        let plane = ZPlane(0.0);
        let line = Line(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0));
        assert!(!plane.intersects_line(&line));
    }

    #[test]
    fn intersect_triangle_requires_two_crossings() {
        let plane = ZPlane(50.0);
        let tri = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 100.0, 0.0),
        );
        let line = plane.intersect_triangle(&tri).expect("plane should cross triangle");
        // Tail is the submerging edge (v1->v2, z: 100 -> 0), head is the
        // emerging edge (v2->v0 wraps... actually v0->v1 emerges 0->100).
        assert!(line.0 != line.1);
    }

    #[test]
    fn no_crossing_returns_none() {
        let plane = ZPlane(500.0);
        let tri = Triangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 100.0),
            Vec3::new(0.0, 100.0, 0.0),
        );
        assert!(plane.intersect_triangle(&tri).is_none());
    }

    #[test]
    fn intersect_line_interpolates_midpoint() {
        let plane = ZPlane(50.0);
        let line = Line(Vec3::new(100.0, 0.0, 0.0), Vec3::new(100.0, 100.0, 100.0));
        let pt = plane.intersect_line(&line);
        assert!((pt.x - 100.0).abs() < 1e-9);
        assert!((pt.y - 50.0).abs() < 1e-9);
    }

    #[test]
    fn points_up_and_horiz_intersection() {
        let seg = PlaneLine(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
        assert!(seg.points_up());
        assert!(seg.intersects_horiz_line(1.0));
        assert_eq!(seg.intersect_horiz_line(1.0), 1.0);
    }
}
