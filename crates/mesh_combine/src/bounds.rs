//! Stage 3: Bounds Reducer
//!
//! Folds per-mesh boxes into one with component-wise min/max. Min and max are
//! associative and commutative, so sequential and parallel folds agree for
//! any order. The fold is seeded with [`Aabb::empty`]; reducing nothing yields
//! that degenerate box and callers must check [`Aabb::is_empty`].

use rayon::prelude::*;

use crate::types::Aabb;

/// Sequential fold over per-mesh bounds.
pub fn reduce_bounds(bounds: &[Aabb]) -> Aabb {
  bounds.iter().copied().fold(Aabb::empty(), Aabb::union)
}

/// Parallel reduction over per-mesh bounds.
pub fn par_reduce_bounds(bounds: &[Aabb]) -> Aabb {
  bounds.par_iter().copied().reduce(Aabb::empty, Aabb::union)
}

#[cfg(test)]
mod tests {
  use glam::Vec3;
  use rand::rngs::StdRng;
  use rand::seq::SliceRandom;
  use rand::{Rng, SeedableRng};

  use super::*;

  fn random_boxes(count: usize, seed: u64) -> Vec<Aabb> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
      .map(|_| {
        let a = Vec3::new(
          rng.random_range(-100.0..100.0),
          rng.random_range(-100.0..100.0),
          rng.random_range(-100.0..100.0),
        );
        let b = a + Vec3::new(
          rng.random_range(0.0..10.0),
          rng.random_range(0.0..10.0),
          rng.random_range(0.0..10.0),
        );
        Aabb::new(a, b)
      })
      .collect()
  }

  #[test]
  fn test_reduce_empty_is_degenerate() {
    assert!(reduce_bounds(&[]).is_empty());
    assert!(par_reduce_bounds(&[]).is_empty());
    assert_eq!(reduce_bounds(&[]), Aabb::empty());
  }

  #[test]
  fn test_reduce_is_union() {
    let a = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0));
    let b = Aabb::new(Vec3::new(10.0, -2.0, 0.0), Vec3::new(11.0, 1.0, 3.0));

    let expected = Aabb::new(Vec3::new(0.0, -2.0, 0.0), Vec3::new(11.0, 1.0, 3.0));
    assert_eq!(reduce_bounds(&[a, b]), expected);
    assert_eq!(reduce_bounds(&[b, a]), expected);
  }

  #[test]
  fn test_empty_mesh_bounds_are_neutral() {
    let a = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    assert_eq!(reduce_bounds(&[Aabb::empty(), a, Aabb::empty()]), a);
  }

  #[test]
  fn test_parallel_matches_sequential_any_order() {
    let mut boxes = random_boxes(1000, 7);
    let expected = reduce_bounds(&boxes);

    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..5 {
      boxes.shuffle(&mut rng);
      assert_eq!(reduce_bounds(&boxes), expected);
      assert_eq!(par_reduce_bounds(&boxes), expected);
    }
  }
}
