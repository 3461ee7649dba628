//! Combine Orchestrator
//!
//! Runs layout → transform → bounds as a one-shot call. This is the main entry
//! point for hosts.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │ combine(meshes, config)                                                  │
//! │                                                                          │
//! │  plan_layout ──► allocate outputs ──► split_regions                      │
//! │                                            │                             │
//! │                    ┌───────────────┬───────┴───────┬───────────────┐     │
//! │                    ▼               ▼               ▼               ▼     │
//! │              transform_mesh  transform_mesh  transform_mesh       ...    │
//! │                    │               │               │               │     │
//! │                    └───────────────┴──── join ─────┴───────────────┘     │
//! │                                            │                             │
//! │                               collect failures / reduce bounds           │
//! │                                            │                             │
//! │                                            ▼                             │
//! │                                       OutputMesh                         │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let inputs: Vec<InputMesh> = meshes.iter().map(MeshData::as_input).collect();
//! let output = combine(&inputs, &CombineConfig::default().with_threads(4))?;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::Vec3;
use rayon::prelude::*;
use smallvec::SmallVec;
use web_time::Instant;

use crate::bounds::{par_reduce_bounds, reduce_bounds};
use crate::config::{CombineConfig, ExecutionStrategy};
use crate::error::CombineError;
use crate::layout::{plan_layout, Layout, LayoutEntry};
use crate::transform::{split_regions, transform_mesh, MeshSlices};
use crate::types::{Aabb, InputMesh, OutputMesh};

/// Cooperative cancellation flag, checked before each mesh task starts.
///
/// Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Relaxed);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Relaxed)
  }
}

/// Outcome of one mesh task. `None` means the task was skipped after
/// cancellation.
type TaskOutcome = Option<Result<Aabb, CombineError>>;

/// Combine `meshes` into a single buffer set.
pub fn combine(meshes: &[InputMesh<'_>], config: &CombineConfig) -> Result<OutputMesh, CombineError> {
  combine_with_cancel(meshes, config, &CancelToken::new())
}

/// Combine `meshes`, abandoning the work if `cancel` is raised.
///
/// On cancellation, failure, or invalid input no output is returned; any
/// partially written buffers are dropped.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "combine::combine", fields(meshes = meshes.len())))]
pub fn combine_with_cancel(
  meshes: &[InputMesh<'_>],
  config: &CombineConfig,
  cancel: &CancelToken,
) -> Result<OutputMesh, CombineError> {
  if meshes.is_empty() {
    return if config.allow_empty {
      Ok(OutputMesh::default())
    } else {
      Err(CombineError::EmptyInput)
    };
  }

  if cancel.is_cancelled() {
    return Err(CombineError::Cancelled);
  }

  let start = Instant::now();

  let layout = {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("plan_layout").entered();
    plan_layout(meshes)?
  };

  let strategy = config.effective_strategy(meshes.len());
  log::debug!(
    "combining {} meshes ({} vertices, {} indices) with {:?}",
    meshes.len(),
    layout.total_vertex_count,
    layout.total_index_count,
    strategy
  );

  let mut positions = vec![Vec3::ZERO; layout.total_vertex_count];
  let mut normals = vec![Vec3::ZERO; layout.total_vertex_count];
  let mut indices = vec![0u32; layout.total_index_count];

  let outcomes = {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("transform_meshes").entered();
    let regions = split_regions(&layout, &mut positions, &mut normals, &mut indices);
    run_tasks(meshes, &layout, regions, strategy, cancel)?
  };

  // Every task has joined; per-mesh bounds are safe to read.
  let per_mesh_bounds = collect_outcomes(outcomes)?;

  let bounds = {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("reduce_bounds").entered();
    match strategy {
      ExecutionStrategy::Sequential => reduce_bounds(&per_mesh_bounds),
      ExecutionStrategy::Parallel { .. } => par_reduce_bounds(&per_mesh_bounds),
    }
  };

  log::debug!(
    "combined {} meshes in {}us",
    meshes.len(),
    start.elapsed().as_micros()
  );

  Ok(OutputMesh {
    positions,
    normals,
    indices,
    bounds,
  })
}

/// Run one task per mesh under `strategy`. Returns outcomes in mesh order.
fn run_tasks(
  meshes: &[InputMesh<'_>],
  layout: &Layout,
  regions: Vec<MeshSlices<'_>>,
  strategy: ExecutionStrategy,
  cancel: &CancelToken,
) -> Result<Vec<TaskOutcome>, CombineError> {
  let total = layout.total_vertex_count;

  let outcomes = match strategy {
    ExecutionStrategy::Sequential => regions
      .into_iter()
      .zip(meshes.iter().zip(layout.iter()))
      .enumerate()
      .map(|(i, (region, (mesh, entry)))| run_task(cancel, total, i, mesh, entry, region))
      .collect(),
    ExecutionStrategy::Parallel { threads: None } => par_run_tasks(meshes, layout, regions, cancel),
    ExecutionStrategy::Parallel {
      threads: Some(threads),
    } => {
      let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;
      pool.install(|| par_run_tasks(meshes, layout, regions, cancel))
    }
  };

  Ok(outcomes)
}

fn par_run_tasks(
  meshes: &[InputMesh<'_>],
  layout: &Layout,
  regions: Vec<MeshSlices<'_>>,
  cancel: &CancelToken,
) -> Vec<TaskOutcome> {
  let total = layout.total_vertex_count;
  regions
    .into_par_iter()
    .zip(meshes.par_iter().zip(layout.entries.par_iter()))
    .enumerate()
    .map(|(i, (region, (mesh, entry)))| run_task(cancel, total, i, mesh, entry, region))
    .collect()
}

#[inline]
fn run_task(
  cancel: &CancelToken,
  total_vertex_count: usize,
  mesh_index: usize,
  mesh: &InputMesh<'_>,
  entry: &LayoutEntry,
  region: MeshSlices<'_>,
) -> TaskOutcome {
  if cancel.is_cancelled() {
    return None;
  }
  Some(transform_mesh(mesh_index, mesh, entry, total_vertex_count, region))
}

/// Split joined outcomes into bounds, or the failure of the lowest mesh index.
///
/// Bounds from a failed or skipped task never reach the reducer.
fn collect_outcomes(outcomes: Vec<TaskOutcome>) -> Result<Vec<Aabb>, CombineError> {
  let mut bounds = Vec::with_capacity(outcomes.len());
  let mut failures: SmallVec<[CombineError; 4]> = SmallVec::new();
  let mut skipped = 0usize;

  for outcome in outcomes {
    match outcome {
      Some(Ok(mesh_bounds)) => bounds.push(mesh_bounds),
      Some(Err(err)) => {
        log::warn!("mesh task failed: {err}");
        failures.push(err);
      }
      None => skipped += 1,
    }
  }

  if let Some(first) = failures.into_iter().next() {
    return Err(first);
  }
  if skipped > 0 {
    log::debug!("combine cancelled, {skipped} mesh tasks skipped");
    return Err(CombineError::Cancelled);
  }

  Ok(bounds)
}

#[cfg(test)]
#[path = "combine_test.rs"]
mod combine_test;
