//! Core data types for mesh combining.

use glam::{Mat4, Vec3};

/// Triangle-list index buffer borrowed from a source mesh.
///
/// Source meshes declare either 16-bit or 32-bit indices; the combined output
/// is always 32-bit.
#[derive(Clone, Copy, Debug)]
pub enum IndexBuffer<'a> {
  U16(&'a [u16]),
  U32(&'a [u32]),
}

impl<'a> IndexBuffer<'a> {
  #[inline]
  pub fn len(&self) -> usize {
    match self {
      IndexBuffer::U16(indices) => indices.len(),
      IndexBuffer::U32(indices) => indices.len(),
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Read the index at `position`, widened to `u32`.
  #[inline]
  pub fn get(&self, position: usize) -> Option<u32> {
    match self {
      IndexBuffer::U16(indices) => indices.get(position).map(|&i| i as u32),
      IndexBuffer::U32(indices) => indices.get(position).copied(),
    }
  }

  /// Iterate all indices widened to `u32`.
  pub fn iter(&self) -> impl Iterator<Item = u32> + 'a {
    let (narrow, wide): (&'a [u16], &'a [u32]) = match *self {
      IndexBuffer::U16(indices) => (indices, &[]),
      IndexBuffer::U32(indices) => (&[], indices),
    };
    narrow
      .iter()
      .map(|&i| i as u32)
      .chain(wide.iter().copied())
  }

  /// True for 32-bit source buffers.
  pub fn is_wide(&self) -> bool {
    matches!(self, IndexBuffer::U32(_))
  }
}

/// Read-only view of one source mesh and its world transform.
///
/// The combine pipeline only ever reads through this view; the caller keeps
/// ownership of the buffers.
#[derive(Clone, Copy, Debug)]
pub struct InputMesh<'a> {
  /// Vertex positions in mesh-local space.
  pub positions: &'a [Vec3],

  /// Vertex normals, parallel to `positions`.
  pub normals: &'a [Vec3],

  /// Triangle list indices into `positions`.
  pub indices: IndexBuffer<'a>,

  /// Local-to-target affine transform.
  pub transform: Mat4,
}

impl<'a> InputMesh<'a> {
  pub fn new(
    positions: &'a [Vec3],
    normals: &'a [Vec3],
    indices: IndexBuffer<'a>,
    transform: Mat4,
  ) -> Self {
    Self {
      positions,
      normals,
      indices,
      transform,
    }
  }

  #[inline]
  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  #[inline]
  pub fn index_count(&self) -> usize {
    self.indices.len()
  }
}

/// Owned index storage for [`MeshData`].
#[derive(Clone, Debug, PartialEq)]
pub enum Indices {
  U16(Vec<u16>),
  U32(Vec<u32>),
}

impl Indices {
  pub fn as_buffer(&self) -> IndexBuffer<'_> {
    match self {
      Indices::U16(indices) => IndexBuffer::U16(indices),
      Indices::U32(indices) => IndexBuffer::U32(indices),
    }
  }

  pub fn len(&self) -> usize {
    self.as_buffer().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Pick the narrowest width able to address `vertex_count` vertices.
  ///
  /// Stays 32-bit when any value does not fit in `u16`, so out-of-range
  /// indices reach the combiner unchanged and are reported there.
  pub fn from_u32(indices: Vec<u32>, vertex_count: usize) -> Self {
    let fits_u16 = indices.iter().all(|&i| i <= u16::MAX as u32);
    if vertex_count <= u16::MAX as usize + 1 && fits_u16 {
      Indices::U16(indices.into_iter().map(|i| i as u16).collect())
    } else {
      Indices::U32(indices)
    }
  }
}

impl Default for Indices {
  fn default() -> Self {
    Indices::U16(Vec::new())
  }
}

/// Owned mesh buffers plus transform, for callers that hand meshes off to
/// another thread (see [`crate::queue::CombineQueue`]).
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
  pub positions: Vec<Vec3>,
  pub normals: Vec<Vec3>,
  pub indices: Indices,
  pub transform: Mat4,
}

impl MeshData {
  pub fn new(positions: Vec<Vec3>, normals: Vec<Vec3>, indices: Indices) -> Self {
    Self {
      positions,
      normals,
      indices,
      transform: Mat4::IDENTITY,
    }
  }

  pub fn with_transform(mut self, transform: Mat4) -> Self {
    self.transform = transform;
    self
  }

  /// Borrow as a combine input.
  pub fn as_input(&self) -> InputMesh<'_> {
    InputMesh::new(
      &self.positions,
      &self.normals,
      self.indices.as_buffer(),
      self.transform,
    )
  }
}

impl Default for MeshData {
  fn default() -> Self {
    Self::new(Vec::new(), Vec::new(), Indices::default())
  }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  pub min: Vec3,
  pub max: Vec3,
}

impl Aabb {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub const fn empty() -> Self {
    Self {
      min: Vec3::INFINITY,
      max: Vec3::NEG_INFINITY,
    }
  }

  /// Create AABB from min/max corners.
  pub const fn new(min: Vec3, max: Vec3) -> Self {
    Self { min, max }
  }

  /// Smallest box containing every point; empty for no points.
  pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
    let mut aabb = Self::empty();
    for point in points {
      aabb.encapsulate(point);
    }
    aabb
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: Vec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Component-wise union of two boxes.
  #[inline]
  pub fn union(self, other: Self) -> Self {
    Self {
      min: self.min.min(other.min),
      max: self.max.max(other.max),
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }

  /// True for the seed box (or anything inverted on some axis).
  pub fn is_empty(&self) -> bool {
    !self.is_valid()
  }

  pub fn center(&self) -> Vec3 {
    (self.min + self.max) * 0.5
  }

  pub fn size(&self) -> Vec3 {
    self.max - self.min
  }

  pub fn contains(&self, point: Vec3) -> bool {
    point.cmpge(self.min).all() && point.cmple(self.max).all()
  }
}

impl Default for Aabb {
  fn default() -> Self {
    Self::empty()
  }
}

/// Combined mesh handed back to the caller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputMesh {
  /// Transformed positions, one slice per input mesh in enumeration order.
  pub positions: Vec<Vec3>,

  /// Transformed unit normals (zero where the source normal was degenerate).
  pub normals: Vec<Vec3>,

  /// Triangle indices remapped into the combined vertex buffer.
  pub indices: Vec<u32>,

  /// Bounding box of all transformed positions.
  pub bounds: Aabb,
}

impl OutputMesh {
  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  pub fn index_count(&self) -> usize {
    self.indices.len()
  }

  /// Number of triangles in the mesh.
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Returns true if no geometry was combined.
  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
