//! Export driver: slices a mesh into a stack of PNG raster layers.
//!
//! Grounded on `original_source/src/svx/svx.go` (`Export`) for the slice
//! loop's shape — compute the total bounding box, step Z by the voxel
//! size, skip triangles whose own bounding box can't cross the current
//! plane, fill one [`crate::raster::Layer`] per step — and on the
//! teacher's `src/renderer.rs` for how a finished raster becomes an
//! `image::RgbaImage` ready for PNG encoding. The source hands slices to
//! a manifest/PNG writer pair it also defines; this module keeps the
//! writers as `SliceSink`/`ManifestSink` traits and leaves concrete
//! filesystem/XML implementations out, since both the manifest format and
//! file layout are out of scope here.

use image::{ImageError, RgbaImage};
use thiserror::Error;

use crate::geom::BoundingBox;
use crate::mesh::TriangleSource;
use crate::raster::{Layer, PixelRect};
use crate::slice::ZPlane;

/// Errors raised while exporting a mesh.
#[derive(Debug, Error)]
pub enum SvxError {
    #[error("mesh has no triangles to slice")]
    EmptyMesh,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Voxel grid size in voxel counts per axis, handed to a [`ManifestSink`]
/// alongside the voxel size so it can describe the stack it did not
/// itself write to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDimensions {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

/// Receives one PNG-encoded slice at a time, in increasing Z order.
///
/// No filesystem implementation ships here: where slices land (a
/// directory of numbered PNGs, a zip archive, something else) is a
/// concern of the caller, not this crate.
pub trait SliceSink {
    fn write_slice(&mut self, index: usize, png_bytes: &[u8]) -> Result<(), SvxError>;
}

/// Receives the stack's final dimensions once every slice has been
/// produced. Manifest XML generation itself is out of scope; this trait
/// only carries the values an implementation would need to write one —
/// grid size, voxel size, and the run's author string (spec §6's
/// `metadata>entry` `author` key).
pub trait ManifestSink {
    fn write_manifest(&mut self, grid: GridDimensions, voxel_size_mm: f64, author: &str);
}

/// Free parameters of an export run, mirroring the teacher's
/// `Camera`/`Renderer` constructor-argument idiom (`src/scene.rs`,
/// `src/renderer.rs`) rather than a file-based config format — the
/// source takes these as direct call arguments too.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Edge length of one voxel, in meters.
    pub voxel_size_m: f64,
    pub author: String,
}

impl ExportOptions {
    pub fn new(voxel_size_m: f64, author: impl Into<String>) -> Self {
        Self {
            voxel_size_m,
            author: author.into(),
        }
    }

    fn voxel_size_mm(&self) -> f64 {
        self.voxel_size_m / 1e-3
    }
}

/// Drives a full mesh-to-SVX slicing run.
pub struct SvxExporter {
    options: ExportOptions,
}

impl SvxExporter {
    pub fn new(options: ExportOptions) -> Self {
        Self { options }
    }

    /// Slices every triangle `source` streams into a stack of filled
    /// raster layers, handing each slice's PNG bytes to `slices` and the
    /// stack's final dimensions to `manifest`.
    ///
    /// Mirrors the source's loop: compute the mesh's total bounding box,
    /// convert the voxel size to millimeters, step a [`ZPlane`] from the
    /// box's lower Z to its upper Z, and at each step build a layer from
    /// only the triangles whose own bounding box can still cross that
    /// plane.
    pub fn export(
        &self,
        source: &dyn TriangleSource,
        slices: &mut dyn SliceSink,
        manifest: &mut dyn ManifestSink,
    ) -> Result<(), SvxError> {
        let triangles: Vec<_> = source.stream().collect();
        if triangles.is_empty() {
            return Err(SvxError::EmptyMesh);
        }

        let total_box = BoundingBox::from_triangles(&triangles).expect("checked non-empty above");

        let voxel_size_mm = self.options.voxel_size_mm();
        let bounds: Vec<BoundingBox> = triangles.iter().map(|tri| tri.bounds()).collect();

        // Truncated, not floored: matches the source's `int(x / voxelSize)`
        // cast building a layer's `image.Rectangle` (spec §4.6).
        let rect = PixelRect {
            min_x: (total_box.lower.x / voxel_size_mm) as i64,
            min_y: (total_box.lower.y / voxel_size_mm) as i64,
            max_x: (total_box.upper.x / voxel_size_mm) as i64,
            max_y: (total_box.upper.y / voxel_size_mm) as i64,
        };

        tracing::info!(
            triangles = triangles.len(),
            voxel_size_mm,
            width = rect.width(),
            height = rect.height(),
            "starting svx export"
        );

        let mut index = 0usize;
        let mut z = total_box.lower.z;
        while z <= total_box.upper.z {
            let plane = ZPlane(z);
            let mut layer = Layer::new(rect, voxel_size_mm);

            let mut crossing = 0usize;
            for (tri, bbox) in triangles.iter().zip(bounds.iter()) {
                if !bbox.contains_z_strict(z) {
                    continue;
                }
                if let Some(line) = plane.intersect_triangle(tri) {
                    layer.add_line(line);
                    crossing += 1;
                }
            }
            layer.fill();

            tracing::debug!(index, z, crossing, "sliced layer");

            let image = layer_to_image(&layer);
            let png_bytes = encode_png(&image)?;
            slices.write_slice(index, &png_bytes)?;

            index += 1;
            z += voxel_size_mm;
        }

        let grid = GridDimensions {
            x: rect.width().max(0) as u32,
            y: rect.height().max(0) as u32,
            z: index as u32,
        };
        manifest.write_manifest(grid, voxel_size_mm, &self.options.author);

        tracing::info!(layers = index, "finished svx export");
        Ok(())
    }
}

/// Converts a filled [`Layer`] into an RGBA image: white and opaque
/// where filled, fully transparent where not (spec §4.6).
fn layer_to_image(layer: &Layer) -> RgbaImage {
    let rect = layer.rect();
    let width = rect.width().max(0) as u32;
    let height = rect.height().max(0) as u32;
    let mut image = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let px = rect.min_x + x as i64;
            let py = rect.min_y + y as i64;
            let pixel = if layer.is_filled(px, py) {
                image::Rgba([255, 255, 255, 255])
            } else {
                image::Rgba([0, 0, 0, 0])
            };
            image.put_pixel(x, y, pixel);
        }
    }

    image
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SvxError> {
    let mut bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Triangle, Vec3};
    use crate::mesh::ArrayBuffer;

    struct CollectingSink {
        slices: Vec<(usize, Vec<u8>)>,
    }

    impl SliceSink for CollectingSink {
        fn write_slice(&mut self, index: usize, png_bytes: &[u8]) -> Result<(), SvxError> {
            self.slices.push((index, png_bytes.to_vec()));
            Ok(())
        }
    }

    struct CapturingManifest {
        grid: Option<GridDimensions>,
        voxel_size_mm: f64,
        author: String,
    }

    impl ManifestSink for CapturingManifest {
        fn write_manifest(&mut self, grid: GridDimensions, voxel_size_mm: f64, author: &str) {
            self.grid = Some(grid);
            self.voxel_size_mm = voxel_size_mm;
            self.author = author.to_string();
        }
    }

    fn tetrahedron() -> ArrayBuffer {
        let p = |x: f64, y: f64, z: f64| Vec3::new(x, y, z);
        let v0 = p(0.0, 0.0, 0.0);
        let v1 = p(10.0, 0.0, 0.0);
        let v2 = p(5.0, 10.0, 0.0);
        let apex = p(5.0, 3.0, 10.0);
        ArrayBuffer::new(vec![
            Triangle::new(v0, v1, v2),
            Triangle::new(v0, apex, v1),
            Triangle::new(v1, apex, v2),
            Triangle::new(v2, apex, v0),
        ])
    }

    #[test]
    fn export_rejects_empty_mesh() {
        let exporter = SvxExporter::new(ExportOptions::new(1e-3, "test"));
        let empty = ArrayBuffer::default();
        let mut sink = CollectingSink { slices: Vec::new() };
        let mut manifest = CapturingManifest {
            grid: None,
            voxel_size_mm: 0.0,
            author: String::new(),
        };
        let result = exporter.export(&empty, &mut sink, &mut manifest);
        assert!(matches!(result, Err(SvxError::EmptyMesh)));
    }

    #[test]
    fn export_produces_one_slice_per_layer_and_a_manifest() {
        let exporter = SvxExporter::new(ExportOptions::new(1e-3, "test"));
        let mesh = tetrahedron();
        let mut sink = CollectingSink { slices: Vec::new() };
        let mut manifest = CapturingManifest {
            grid: None,
            voxel_size_mm: 0.0,
            author: String::new(),
        };

        exporter.export(&mesh, &mut sink, &mut manifest).unwrap();

        assert!(!sink.slices.is_empty());
        for (i, (index, bytes)) in sink.slices.iter().enumerate() {
            assert_eq!(*index, i);
            assert!(!bytes.is_empty());
        }

        let grid = manifest.grid.expect("manifest should have been written");
        assert_eq!(grid.z as usize, sink.slices.len());
        assert!(grid.x > 0);
        assert!(grid.y > 0);
        assert_eq!(manifest.author, "test");
    }
}
