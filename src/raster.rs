//! Scanline rasterizer: turns a layer's directed segments into a filled
//! 2D bitmap via an even-odd/non-zero winding walk.
//!
//! Grounded on `original_source/src/svx/svx.go` (`layer`, `intercept`,
//! `fill`, `fillStrip`). The source uses `image.NRGBA` with a
//! `image.Rectangle` whose `Min`/`Max` can sit anywhere in pixel space
//! (not just at the origin); this port keeps that with [`PixelRect`] and
//! a flat pixel buffer instead of pulling in `image::RgbaImage` (which
//! always starts at the origin) for the working bitmap. The `svx` module
//! is what hands the final buffer to the `image` crate for PNG encoding.

use crate::slice::PlaneLine;

/// Pixel-space rectangle with `max` exclusive on both axes, mirroring
/// Go's `image.Rectangle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl PixelRect {
    pub fn width(&self) -> i64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i64 {
        self.max_y - self.min_y
    }

    fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }
}

/// A scanline record: an X position where a [`PlaneLine`] crosses a
/// horizontal line, plus the direction of that crossing.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Intercept {
    x: f64,
    points_up: bool,
}

/// A mutable 2D bitmap plus the directed segments accumulated for one Z
/// value.
pub struct Layer {
    rect: PixelRect,
    voxel_size: f64,
    plane_lines: Vec<PlaneLine>,
    pixels: Vec<bool>,
}

impl Layer {
    /// Builds an empty layer sized to `rect`, discretized at
    /// `voxel_size` (already in mesh units, i.e. millimeters).
    pub fn new(rect: PixelRect, voxel_size: f64) -> Self {
        let width = rect.width().max(0) as usize;
        let height = rect.height().max(0) as usize;
        Self {
            rect,
            voxel_size,
            plane_lines: Vec::new(),
            pixels: vec![false; width * height],
        }
    }

    pub fn rect(&self) -> PixelRect {
        self.rect
    }

    pub fn add_line(&mut self, line: PlaneLine) {
        self.plane_lines.push(line);
    }

    pub fn plane_lines(&self) -> &[PlaneLine] {
        &self.plane_lines
    }

    /// True iff pixel `(x, y)` is inside the filled region. Panics if
    /// out of `rect`'s bounds (callers index via `rect()`).
    pub fn is_filled(&self, x: i64, y: i64) -> bool {
        assert!(self.rect.contains(x, y), "pixel out of layer bounds");
        let local_x = (x - self.rect.min_x) as usize;
        let local_y = (y - self.rect.min_y) as usize;
        self.pixels[local_y * self.rect.width() as usize + local_x]
    }

    /// Silently ignores out-of-range coordinates, matching Go's
    /// `image.NRGBA.Set` behavior for points outside its rectangle
    /// (spec §9, Open Questions: the source's one-row overrun in `fill`
    /// lands here and is dropped rather than panicking).
    fn set_pixel(&mut self, x: i64, y: i64) {
        if !self.rect.contains(x, y) {
            return;
        }
        let local_x = (x - self.rect.min_x) as usize;
        let local_y = (y - self.rect.min_y) as usize;
        self.pixels[local_y * self.rect.width() as usize + local_x] = true;
    }

    /// Runs the even-odd/non-zero scanline fill over every row in
    /// `rect`, including one row beyond `max_y` (spec §4.3/§9): for each
    /// integer row `y`, compute `plane_y = y * voxel_size`, collect
    /// every segment whose Y range brackets `plane_y` inclusively as an
    /// [`Intercept`], sort by X, and walk left to right accumulating a
    /// signed winding depth. Between consecutive intercepts with
    /// `depth > 0`, fill the horizontal pixel strip between them.
    ///
    /// Idempotent: fills only ever set pixels, never clear them, so
    /// running this twice on the same layer is a no-op the second time.
    pub fn fill(&mut self) {
        for img_y in self.rect.min_y..=self.rect.max_y {
            let plane_y = img_y as f64 * self.voxel_size;

            let mut intercepts: Vec<Intercept> = self
                .plane_lines
                .iter()
                .filter(|line| line.intersects_horiz_line(plane_y))
                .map(|line| Intercept {
                    x: line.intersect_horiz_line(plane_y),
                    points_up: line.points_up(),
                })
                .collect();
            // `total_cmp`, not `partial_cmp().unwrap()`: a perfectly
            // horizontal segment intersected exactly on its own scanline
            // makes `PlaneLine::intersect_horiz_line` divide 0.0/0.0, and
            // a NaN here must sort somewhere, not panic.
            intercepts.sort_by(|a, b| a.x.total_cmp(&b.x));

            let mut depth = 0i32;
            for i in 0..intercepts.len() {
                if intercepts[i].points_up {
                    depth -= 1;
                } else {
                    depth += 1;
                }

                if i + 1 < intercepts.len() && depth > 0 {
                    let x0 = (intercepts[i].x / self.voxel_size).floor() as i64;
                    let x1 = (intercepts[i + 1].x / self.voxel_size).floor() as i64;
                    self.fill_strip(x0, x1, img_y);
                }
            }
        }
    }

    fn fill_strip(&mut self, img_x0: i64, img_x1: i64, img_y: i64) {
        let real_y = self.rect.max_y - img_y + self.rect.min_y;
        for x in img_x0..=img_x1 {
            self.set_pixel(x, real_y);
        }
    }
}
