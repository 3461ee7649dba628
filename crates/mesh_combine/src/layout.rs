//! Stage 1: Layout Planner
//!
//! Prefix-sums per-mesh vertex and index counts in enumeration order, giving
//! every mesh a fixed, non-overlapping slice of the combined buffers.
//!
//! ```text
//! meshes:        A(3v,3i)   B(0v,0i)   C(4v,6i)
//! vertex_offset:    0          3          3        total 7
//! index_offset:     0          3          3        total 9
//!
//! positions: [A A A|C C C C]
//! indices:   [A A A|C C C C C C]
//! ```
//!
//! All descriptor validation happens here so malformed input fails before any
//! parallel work is scheduled.

use crate::error::{CombineError, InvalidInputReason};
use crate::types::InputMesh;

/// Highest vertex count addressable by a `u32` index buffer.
pub const MAX_COMBINED_VERTICES: u64 = u32::MAX as u64 + 1;

/// Offsets of one input mesh inside the combined buffers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutEntry {
  pub vertex_offset: usize,
  pub index_offset: usize,
  pub vertex_count: usize,
  pub index_count: usize,
}

impl LayoutEntry {
  /// Range owned in the combined vertex buffers.
  #[inline]
  pub fn vertex_range(&self) -> std::ops::Range<usize> {
    self.vertex_offset..self.vertex_offset + self.vertex_count
  }

  /// Range owned in the combined index buffer.
  #[inline]
  pub fn index_range(&self) -> std::ops::Range<usize> {
    self.index_offset..self.index_offset + self.index_count
  }
}

/// Immutable partition of the output buffers, one entry per input mesh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layout {
  pub entries: Vec<LayoutEntry>,
  pub total_vertex_count: usize,
  pub total_index_count: usize,
}

impl Layout {
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn entry(&self, mesh: usize) -> Option<&LayoutEntry> {
    self.entries.get(mesh)
  }

  pub fn iter(&self) -> std::slice::Iter<'_, LayoutEntry> {
    self.entries.iter()
  }
}

/// Validate one descriptor without touching its contents.
pub fn validate_mesh(mesh_index: usize, mesh: &InputMesh<'_>) -> Result<(), CombineError> {
  let positions = mesh.positions.len();
  let normals = mesh.normals.len();
  if positions != normals {
    return Err(CombineError::invalid(
      mesh_index,
      InvalidInputReason::NormalCountMismatch { positions, normals },
    ));
  }

  let index_count = mesh.index_count();
  if index_count % 3 != 0 {
    return Err(CombineError::invalid(
      mesh_index,
      InvalidInputReason::PartialTriangle { index_count },
    ));
  }

  Ok(())
}

/// Convert a signed count reported by a host into a length.
///
/// Hosts that describe meshes with signed integers (C#, C) go through this
/// before building an [`InputMesh`].
pub fn checked_count(
  mesh_index: usize,
  field: &'static str,
  value: i64,
) -> Result<usize, CombineError> {
  usize::try_from(value)
    .map_err(|_| CombineError::invalid(mesh_index, InvalidInputReason::NegativeCount { field, value }))
}

/// Compute per-mesh offsets and grand totals.
///
/// Offsets depend only on enumeration order. Empty meshes get zero-width
/// entries at the current running totals.
pub fn plan_layout(meshes: &[InputMesh<'_>]) -> Result<Layout, CombineError> {
  let mut entries = Vec::with_capacity(meshes.len());
  let mut vertex_total = 0u64;
  let mut index_total = 0u64;

  for (mesh_index, mesh) in meshes.iter().enumerate() {
    validate_mesh(mesh_index, mesh)?;

    let vertex_count = mesh.vertex_count();
    let index_count = mesh.index_count();

    entries.push(LayoutEntry {
      vertex_offset: vertex_total as usize,
      index_offset: index_total as usize,
      vertex_count,
      index_count,
    });

    vertex_total += vertex_count as u64;
    index_total += index_count as u64;

    if vertex_total > MAX_COMBINED_VERTICES {
      return Err(CombineError::invalid(
        mesh_index,
        InvalidInputReason::VertexCountOverflow {
          total: vertex_total,
        },
      ));
    }
  }

  log::debug!(
    "planned layout for {} meshes: {} vertices, {} indices",
    entries.len(),
    vertex_total,
    index_total
  );

  Ok(Layout {
    entries,
    total_vertex_count: vertex_total as usize,
    total_index_count: index_total as usize,
  })
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;
