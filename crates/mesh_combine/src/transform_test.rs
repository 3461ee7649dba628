//! Tests for Stage 2: Parallel Transformer

use glam::{Mat4, Quat, Vec3};

use super::*;
use crate::layout::plan_layout;
use crate::test_utils::*;
use crate::types::{IndexBuffer, MeshData};

fn run_single(mesh: &MeshData) -> (Result<Aabb, CombineError>, Vec<Vec3>, Vec<Vec3>, Vec<u32>) {
  let input = mesh.as_input();
  let layout = plan_layout(&[input]).unwrap();
  let mut positions = vec![Vec3::ZERO; layout.total_vertex_count];
  let mut normals = vec![Vec3::ZERO; layout.total_vertex_count];
  let mut indices = vec![0u32; layout.total_index_count];

  let result = {
    let mut regions = split_regions(&layout, &mut positions, &mut normals, &mut indices);
    let region = regions.remove(0);
    transform_mesh(0, &input, &layout.entries[0], layout.total_vertex_count, region)
  };

  (result, positions, normals, indices)
}

// =============================================================================
// Batch 1: Point / Normal Math
// =============================================================================

#[test]
fn test_transform_point_applies_translation() {
  let m = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
  assert_eq!(transform_point(&m, Vec3::new(1.0, 2.0, 3.0)), Vec3::new(11.0, 2.0, 3.0));
}

#[test]
fn test_transform_normal_ignores_translation() {
  let m = Mat4::from_translation(Vec3::new(10.0, -4.0, 2.0));
  assert_eq!(transform_normal(&m, Vec3::Y), Vec3::Y);
}

#[test]
fn test_transform_normal_rotates_and_renormalizes() {
  let m = Mat4::from_scale_rotation_translation(
    Vec3::splat(3.0),
    Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
    Vec3::ZERO,
  );
  let n = transform_normal(&m, Vec3::X);
  assert_vec3_near(n, Vec3::Y, "rotated +X normal");
  assert!((n.length() - 1.0).abs() < 1e-6);
}

/// Non-uniform scale skews normals: the same matrix is used, not the
/// inverse transpose.
#[test]
fn test_non_uniform_scale_uses_forward_matrix() {
  let m = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
  let n = transform_normal(&m, Vec3::new(1.0, 1.0, 0.0).normalize());
  assert_vec3_near(n, Vec3::new(2.0, 1.0, 0.0).normalize(), "forward-scaled normal");
}

#[test]
fn test_safe_normalize_degenerate_inputs() {
  assert_eq!(safe_normalize(Vec3::ZERO), Vec3::ZERO);
  assert_eq!(safe_normalize(Vec3::new(f32::NAN, 0.0, 1.0)), Vec3::ZERO);
  assert_eq!(safe_normalize(Vec3::new(f32::INFINITY, 0.0, 0.0)), Vec3::ZERO);
  assert_eq!(safe_normalize(Vec3::new(0.0, 0.0, 5.0)), Vec3::Z);
}

// =============================================================================
// Batch 2: Region Splitting
// =============================================================================

#[test]
fn test_split_regions_matches_layout() {
  let meshes = vec![make_triangle(), make_empty_mesh(), make_cube()];
  let inputs: Vec<_> = meshes.iter().map(MeshData::as_input).collect();
  let layout = plan_layout(&inputs).unwrap();

  let mut positions = vec![Vec3::ZERO; layout.total_vertex_count];
  let mut normals = vec![Vec3::ZERO; layout.total_vertex_count];
  let mut indices = vec![0u32; layout.total_index_count];
  let regions = split_regions(&layout, &mut positions, &mut normals, &mut indices);

  assert_eq!(regions.len(), 3);
  for (region, entry) in regions.iter().zip(layout.iter()) {
    assert_eq!(region.positions.len(), entry.vertex_count);
    assert_eq!(region.normals.len(), entry.vertex_count);
    assert_eq!(region.indices.len(), entry.index_count);
  }
}

// =============================================================================
// Batch 3: Per-mesh Unit of Work
// =============================================================================

#[test]
fn test_identity_transform_reproduces_mesh() {
  let mesh = make_cube();
  let (bounds, positions, normals, indices) = run_single(&mesh);

  assert_eq!(positions, mesh.positions);
  assert_eq!(normals, mesh.normals);
  assert_eq!(indices, mesh.indices.as_buffer().iter().collect::<Vec<_>>());
  assert_eq!(bounds.unwrap(), Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)));
}

#[test]
fn test_bounds_track_transformed_positions() {
  let mesh = translated(make_triangle(), Vec3::new(10.0, 0.0, 0.0));
  let (bounds, positions, _, _) = run_single(&mesh);

  assert_eq!(positions[1], Vec3::new(11.0, 0.0, 0.0));
  assert_eq!(
    bounds.unwrap(),
    Aabb::new(Vec3::new(10.0, 0.0, 0.0), Vec3::new(11.0, 1.0, 0.0))
  );
}

#[test]
fn test_wide_indices_are_read_as_u32() {
  let (_, _, _, indices) = run_single(&make_wide_triangle());
  assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_index_past_vertex_count_fails() {
  let mesh = MeshData {
    indices: crate::types::Indices::U16(vec![0, 1, 3]),
    ..make_triangle()
  };
  let (result, _, _, _) = run_single(&mesh);

  match result {
    Err(CombineError::IndexOutOfRange {
      mesh,
      position,
      index,
      limit,
    }) => {
      assert_eq!(mesh, 0);
      assert_eq!(position, 2);
      assert_eq!(index, 3);
      assert_eq!(limit, 3);
    }
    other => panic!("expected IndexOutOfRange, got {other:?}"),
  }
}

#[test]
fn test_degenerate_normal_does_not_leak_nan() {
  let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
  let normals = [Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0), Vec3::Z];
  let indices = [0u16, 1, 2];
  let mesh = InputMesh::new(&positions, &normals, IndexBuffer::U16(&indices), Mat4::IDENTITY);
  let layout = plan_layout(&[mesh]).unwrap();

  let mut out_positions = vec![Vec3::ZERO; 3];
  let mut out_normals = vec![Vec3::ZERO; 3];
  let mut out_indices = vec![0u32; 3];
  let bounds = {
    let region = split_regions(&layout, &mut out_positions, &mut out_normals, &mut out_indices)
      .remove(0);
    transform_mesh(0, &mesh, &layout.entries[0], 3, region).unwrap()
  };

  assert_eq!(out_normals[0], Vec3::ZERO);
  assert_eq!(out_normals[1], Vec3::ZERO);
  assert_eq!(out_normals[2], Vec3::Z);
  assert!(out_positions.iter().all(|p| p.is_finite()));
  assert!(bounds.min.is_finite() && bounds.max.is_finite());
  assert_eq!(out_indices, vec![0, 1, 2]);
}
