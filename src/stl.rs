//! Binary STL codec.
//!
//! Grounded on `original_source/src/stl.go` (`StlFile`, `NewStlFile`,
//! `ConvertFrom`) and the teacher's `parse_binary_stl`/`Cursor` +
//! `byteorder` idiom in `src/lib.rs`. Only the binary variant is in
//! scope; ASCII STL (files starting with `solid`) is rejected as a
//! format error, matching spec §4.5/§6.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::geom::{Triangle, Vec3};
use crate::mesh::TriangleSource;

const HEADER_LEN: u64 = 80;
const ASCII_ID: &[u8; 5] = b"solid";
const TRIANGLE_RECORD_LEN: u64 = 50;

/// Errors raised by [`StlFile::open`], its triangle stream, or
/// [`StlFile::convert_from`].
#[derive(Debug, Error)]
pub enum StlError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("wrong file format (ASCII STL is not supported)")]
    Format,
    #[error("reported face count does not match file size: expected {expected} bytes, found {found}")]
    Size { expected: u64, found: u64 },
}

/// A path to a binary STL file, plus a cached triangle count.
///
/// Either refers to a nonexistent (or empty) path, ready to be written,
/// or to a well-formed binary STL file on disk. `StlFile` owns only the
/// path: every read re-opens the file, so instances may be streamed from
/// repeatedly.
pub struct StlFile {
    path: PathBuf,
    num_triangles: u32,
}

impl StlFile {
    /// Opens `path` for reading, or prepares a fresh target if it
    /// doesn't exist yet (or is empty).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StlError> {
        let path = path.into();

        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    num_triangles: 0,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let file_len = file.metadata()?.len();
        if file_len == 0 {
            return Ok(Self {
                path,
                num_triangles: 0,
            });
        }

        let mut marker = [0u8; 5];
        file.read_exact(&mut marker)?;
        if &marker == ASCII_ID {
            return Err(StlError::Format);
        }

        file.seek(SeekFrom::Start(HEADER_LEN))?;
        let num_triangles = file.read_u32::<LittleEndian>()?;

        let expected = HEADER_LEN + 4 + num_triangles as u64 * TRIANGLE_RECORD_LEN;
        if file_len != expected {
            return Err(StlError::Size {
                expected,
                found: file_len,
            });
        }

        Ok(Self {
            path,
            num_triangles,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_triangles(&self) -> usize {
        self.num_triangles as usize
    }

    /// Deletes and recreates this file, writing an 80-byte blank
    /// header, the triangle count, and one 50-byte record per triangle
    /// drained from `source`'s stream (spec §4.4/§4.5). Unlike the
    /// source, which panics on any write failure, errors are surfaced
    /// through the return value (spec §7).
    pub fn convert_from(&mut self, source: &dyn TriangleSource) -> Result<(), StlError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(&[0x20u8; HEADER_LEN as usize])?;

        let num_triangles = source.num_triangles() as u32;
        writer.write_u32::<LittleEndian>(num_triangles)?;

        for tri in source.stream() {
            write_triangle_record(&mut writer, &tri)?;
        }

        writer.flush()?;
        self.num_triangles = num_triangles;
        Ok(())
    }
}

fn write_triangle_record<W: Write>(writer: &mut W, tri: &Triangle) -> Result<(), StlError> {
    // Normal is ignored on read and written as zero (spec §4.5).
    writer.write_all(&[0u8; 12])?;
    for vertex in tri.vertices() {
        writer.write_f32::<LittleEndian>(vertex.x as f32)?;
        writer.write_f32::<LittleEndian>(vertex.y as f32)?;
        writer.write_f32::<LittleEndian>(vertex.z as f32)?;
    }
    // Attribute byte count: ignored on read, written as zero. Some
    // tools stash color data here; this port does not interpret it.
    writer.write_u16::<LittleEndian>(0)?;
    Ok(())
}

fn read_triangle_record<R: Read>(reader: &mut R) -> io::Result<Triangle> {
    let mut normal = [0f32; 3];
    reader.read_f32_into::<LittleEndian>(&mut normal)?;

    let mut read_vertex = || -> io::Result<Vec3> {
        let x = reader.read_f32::<LittleEndian>()? as f64;
        let y = reader.read_f32::<LittleEndian>()? as f64;
        let z = reader.read_f32::<LittleEndian>()? as f64;
        Ok(Vec3::new(x, y, z))
    };
    let v0 = read_vertex()?;
    let v1 = read_vertex()?;
    let v2 = read_vertex()?;

    reader.read_u16::<LittleEndian>()?; // attribute, ignored

    Ok(Triangle::new(v0, v1, v2))
}

impl TriangleSource for StlFile {
    fn num_triangles(&self) -> usize {
        self.num_triangles as usize
    }

    /// Seeks to byte 84 and emits triangles in file order. Opens a
    /// fresh file handle per call so the stream can be consumed
    /// independently of (and repeatedly after) other reads.
    fn stream(&self) -> Box<dyn Iterator<Item = Triangle> + '_> {
        Box::new(StlTriangleIter::new(&self.path, self.num_triangles))
    }
}

struct StlTriangleIter {
    reader: Option<BufReader<File>>,
    remaining: u32,
}

impl StlTriangleIter {
    fn new(path: &Path, num_triangles: u32) -> Self {
        if num_triangles == 0 {
            return Self {
                reader: None,
                remaining: 0,
            };
        }

        let reader = File::open(path).ok().and_then(|mut f| {
            f.seek(SeekFrom::Start(HEADER_LEN + 4)).ok()?;
            Some(BufReader::new(f))
        });

        Self {
            reader,
            remaining: num_triangles,
        }
    }
}

impl Iterator for StlTriangleIter {
    type Item = Triangle;

    fn next(&mut self) -> Option<Triangle> {
        if self.remaining == 0 {
            return None;
        }
        let reader = self.reader.as_mut()?;
        match read_triangle_record(reader) {
            Ok(tri) => {
                self.remaining -= 1;
                Some(tri)
            }
            Err(_) => {
                self.remaining = 0;
                None
            }
        }
    }
}
