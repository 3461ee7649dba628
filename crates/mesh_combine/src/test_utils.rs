//! Test utilities for combine tests.
//!
//! Fixture generators for small meshes with known geometry.

use glam::{Mat4, Vec3};

use crate::types::{Indices, MeshData};

// =============================================================================
// Mesh Fixtures
// =============================================================================

/// Single right triangle in the XY plane facing +Z.
pub fn make_triangle() -> MeshData {
  MeshData::new(
    vec![Vec3::ZERO, Vec3::X, Vec3::Y],
    vec![Vec3::Z; 3],
    Indices::U16(vec![0, 1, 2]),
  )
}

/// Same triangle stored with 32-bit indices.
pub fn make_wide_triangle() -> MeshData {
  MeshData::new(
    vec![Vec3::ZERO, Vec3::X, Vec3::Y],
    vec![Vec3::Z; 3],
    Indices::U32(vec![0, 1, 2]),
  )
}

/// Unit cube centered at origin: 24 vertices (4 per face), 36 indices.
pub fn make_cube() -> MeshData {
  const FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::Y, Vec3::Z),
    (Vec3::NEG_X, Vec3::Y, Vec3::NEG_Z),
    (Vec3::Y, Vec3::Z, Vec3::X),
    (Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::X, Vec3::NEG_Y),
  ];

  let mut positions = Vec::with_capacity(24);
  let mut normals = Vec::with_capacity(24);
  let mut indices = Vec::with_capacity(36);

  for (normal, u, v) in FACES {
    let base = positions.len() as u16;
    let center = normal * 0.5;
    for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
      positions.push(center + u * su + v * sv);
      normals.push(normal);
    }
    indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
  }

  MeshData::new(positions, normals, Indices::U16(indices))
}

/// Mesh with no vertices and no indices.
pub fn make_empty_mesh() -> MeshData {
  MeshData::default()
}

/// Translate a fixture.
pub fn translated(mesh: MeshData, offset: Vec3) -> MeshData {
  mesh.with_transform(Mat4::from_translation(offset))
}

/// Grid of `count` cubes with varied transforms (rotation, scale, translation).
pub fn make_cube_field(count: usize) -> Vec<MeshData> {
  (0..count)
    .map(|i| {
      let f = i as f32;
      let transform = Mat4::from_scale_rotation_translation(
        Vec3::splat(0.5 + (i % 4) as f32 * 0.25),
        glam::Quat::from_rotation_y(f * 0.37) * glam::Quat::from_rotation_x(f * 0.11),
        Vec3::new((i % 16) as f32 * 3.0, (i / 256) as f32 * 3.0, ((i / 16) % 16) as f32 * 3.0),
      );
      make_cube().with_transform(transform)
    })
    .collect()
}

/// Bit patterns of a vector slice, for exact comparisons.
pub fn vec3_bits(values: &[Vec3]) -> Vec<[u32; 3]> {
  values
    .iter()
    .map(|v| v.to_array().map(f32::to_bits))
    .collect()
}

/// Approximate vector equality.
pub fn assert_vec3_near(actual: Vec3, expected: Vec3, context: &str) {
  assert!(
    actual.abs_diff_eq(expected, 1e-5),
    "{context}: expected {expected:?}, got {actual:?}"
  );
}
