//! Stage 2: Parallel Transformer
//!
//! The per-mesh unit of work. Each call owns exactly one [`MeshSlices`]
//! region carved out of the combined buffers by [`split_regions`], so any
//! number of calls can run concurrently without synchronization.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ transform_mesh(mesh i)                                                  │
//! │                                                                         │
//! │  positions[k] ── M·(p,1) ──────────────► out.positions[k] ──► bounds    │
//! │  normals[k]   ── M·(n,0) ── normalize ─► out.normals[k]                 │
//! │  indices[j]   ── + vertex_offset ──────► out.indices[j]                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Normals are transformed by the same matrix as positions, not its inverse
//! transpose. Under non-uniform scale the resulting normals are skewed; this
//! matches the behavior hosts already rely on.

use glam::{Mat4, Vec3};

use crate::error::CombineError;
use crate::layout::{Layout, LayoutEntry};
use crate::types::{Aabb, InputMesh};

/// Mutable output region owned by a single mesh task.
pub struct MeshSlices<'o> {
  pub positions: &'o mut [Vec3],
  pub normals: &'o mut [Vec3],
  pub indices: &'o mut [u32],
}

/// Apply an affine transform to a point (w = 1).
#[inline(always)]
pub fn transform_point(transform: &Mat4, point: Vec3) -> Vec3 {
  transform.transform_point3(point)
}

/// Apply an affine transform to a direction (w = 0) and renormalize.
#[inline(always)]
pub fn transform_normal(transform: &Mat4, normal: Vec3) -> Vec3 {
  safe_normalize(transform.transform_vector3(normal))
}

/// Unit-length copy of `v`, or zero when `v` has no usable direction
/// (zero length, infinite or NaN components).
#[inline(always)]
pub fn safe_normalize(v: Vec3) -> Vec3 {
  v.normalize_or_zero()
}

/// Carve the combined buffers into one disjoint region per layout entry.
///
/// Buffer lengths must equal the layout totals.
pub fn split_regions<'o>(
  layout: &Layout,
  positions: &'o mut [Vec3],
  normals: &'o mut [Vec3],
  indices: &'o mut [u32],
) -> Vec<MeshSlices<'o>> {
  debug_assert_eq!(positions.len(), layout.total_vertex_count);
  debug_assert_eq!(normals.len(), layout.total_vertex_count);
  debug_assert_eq!(indices.len(), layout.total_index_count);

  let mut positions = positions;
  let mut normals = normals;
  let mut indices = indices;
  let mut regions = Vec::with_capacity(layout.len());

  for entry in layout.iter() {
    let (p, rest) = std::mem::take(&mut positions).split_at_mut(entry.vertex_count);
    positions = rest;
    let (n, rest) = std::mem::take(&mut normals).split_at_mut(entry.vertex_count);
    normals = rest;
    let (i, rest) = std::mem::take(&mut indices).split_at_mut(entry.index_count);
    indices = rest;

    regions.push(MeshSlices {
      positions: p,
      normals: n,
      indices: i,
    });
  }

  regions
}

/// Transform one mesh into its output region and return its local bounds.
///
/// Fails if any remapped index lands at or past `total_vertex_count`. On
/// failure the region may be partially written; the caller discards it.
pub fn transform_mesh(
  mesh_index: usize,
  mesh: &InputMesh<'_>,
  entry: &LayoutEntry,
  total_vertex_count: usize,
  out: MeshSlices<'_>,
) -> Result<Aabb, CombineError> {
  debug_assert_eq!(out.positions.len(), mesh.vertex_count());
  debug_assert_eq!(out.indices.len(), mesh.index_count());

  let transform = mesh.transform;
  let mut bounds = Aabb::empty();

  let sources = mesh.positions.iter().zip(mesh.normals);
  let targets = out.positions.iter_mut().zip(out.normals.iter_mut());
  for ((&position, &normal), (dst_position, dst_normal)) in sources.zip(targets) {
    let world = transform_point(&transform, position);
    *dst_position = world;
    *dst_normal = transform_normal(&transform, normal);
    bounds.encapsulate(world);
  }

  let base = entry.vertex_offset as u64;
  let limit = total_vertex_count as u64;
  for (position, (source, dst)) in mesh.indices.iter().zip(out.indices.iter_mut()).enumerate() {
    let remapped = base + source as u64;
    if remapped >= limit {
      return Err(CombineError::IndexOutOfRange {
        mesh: mesh_index,
        position,
        index: remapped,
        limit: total_vertex_count,
      });
    }
    *dst = remapped as u32;
  }

  Ok(bounds)
}

#[cfg(test)]
#[path = "transform_test.rs"]
mod transform_test;
