//! mesh_combine - Framework/engine independent mesh combining
//!
//! Merges many independently authored triangle meshes, each with its own
//! world transform, into a single vertex/index buffer set with a correct
//! bounding box. Work is fanned out per mesh over rayon, every task writing
//! into a disjoint region of the shared output buffers.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────────────┐     ┌────────────────┐
//! │ InputMesh[]  ├────►│ Layout Planner ├────►│ Parallel Transformer├────►│ Bounds Reducer │
//! └──────────────┘     └────────────────┘     └─────────────────────┘     └────────────────┘
//!                        prefix sums            one task per mesh           min/max fold
//!                        (fail fast)            disjoint slices             after barrier
//! ```
//!
//! # Features
//!
//! - **Disjoint-region writes**: output slices are split up front, no locks or
//!   atomics guard the buffers
//! - **Execution strategies**: sequential loop, rayon global pool, or a
//!   dedicated pool with a fixed worker count, all producing identical bytes
//! - **Cancellation**: cooperative, checked between mesh tasks
//! - **Batch queue**: non-blocking submit/tick/drain driver for per-frame hosts
//!
//! # Example
//!
//! ```ignore
//! use glam::{Mat4, Vec3};
//! use mesh_combine::{combine, CombineConfig, IndexBuffer, InputMesh};
//!
//! let positions = [Vec3::ZERO, Vec3::X, Vec3::Y];
//! let normals = [Vec3::Z; 3];
//! let indices = [0u16, 1, 2];
//!
//! let mesh = InputMesh::new(&positions, &normals, IndexBuffer::U16(&indices), Mat4::IDENTITY);
//! let output = combine(&[mesh], &CombineConfig::default())?;
//!
//! println!("Combined {} vertices, {} triangles",
//!     output.vertex_count(), output.triangle_count());
//! ```

pub mod error;
pub mod types;

pub use error::{CombineError, InvalidInputReason};
pub use types::{Aabb, IndexBuffer, Indices, InputMesh, MeshData, OutputMesh};

// Stage 1: offsets into the combined buffers
pub mod layout;
pub use layout::{plan_layout, Layout, LayoutEntry};

// Stage 2: per-mesh transform into disjoint output regions
pub mod transform;

// Stage 3: bounds reduction
pub mod bounds;
pub use bounds::{par_reduce_bounds, reduce_bounds};

// Configuration and orchestration
pub mod config;
pub use config::{CombineConfig, ExecutionStrategy};

pub mod combine;
pub use combine::{combine, combine_with_cancel, CancelToken};

// Non-blocking batch driver
pub mod queue;
pub use queue::{CombineCompletion, CombineQueue};

pub mod metrics;

#[cfg(test)]
pub mod test_utils;
