//! Slices a triangulated surface mesh into a stack of SVX voxel raster
//! layers.
//!
//! A mesh arrives through a [`mesh::TriangleSource`] (an in-memory
//! [`mesh::ArrayBuffer`]/[`mesh::IndexBuffer`], or a [`stl::StlFile`] read
//! from disk), gets cut by a horizontal [`slice::ZPlane`] at each voxel
//! height into directed 2D segments, and each plane's segments are
//! rasterized by [`raster::Layer`] into a filled bitmap. [`svx::SvxExporter`]
//! drives that loop end to end and hands finished PNG-encoded layers to a
//! caller-supplied [`svx::SliceSink`].

pub mod geom;
pub mod mesh;
pub mod raster;
pub mod slice;
pub mod stl;
pub mod svx;

pub use geom::{BoundingBox, GeomError, Line, Plane, Triangle, Vec2, Vec3};
pub use mesh::{ArrayBuffer, Face, IndexBuffer, TriangleSource};
pub use raster::{Layer, PixelRect};
pub use slice::{PlaneLine, ZPlane};
pub use stl::{StlError, StlFile};
pub use svx::{ExportOptions, GridDimensions, ManifestSink, SliceSink, SvxError, SvxExporter};
