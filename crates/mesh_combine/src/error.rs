//! Error taxonomy for the combine pipeline.

/// Why a mesh descriptor was rejected by the layout planner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidInputReason {
  /// Normal buffer length differs from position buffer length.
  NormalCountMismatch { positions: usize, normals: usize },

  /// A host supplied a signed count below zero.
  NegativeCount { field: &'static str, value: i64 },

  /// A host supplied no buffer for a non-empty count.
  MissingBuffer { field: &'static str },

  /// Index width tag not recognized by a host adapter.
  UnknownIndexFormat { format: u8 },

  /// Triangle list whose length is not a multiple of 3.
  PartialTriangle { index_count: usize },

  /// Combined vertex count cannot be addressed by a `u32` index.
  VertexCountOverflow { total: u64 },
}

impl std::fmt::Display for InvalidInputReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::NormalCountMismatch { positions, normals } => {
        write!(f, "{normals} normals for {positions} positions")
      }
      Self::NegativeCount { field, value } => write!(f, "{field} is negative ({value})"),
      Self::MissingBuffer { field } => write!(f, "{field} buffer is missing"),
      Self::UnknownIndexFormat { format } => write!(f, "unknown index format {format}"),
      Self::PartialTriangle { index_count } => {
        write!(f, "index count {index_count} is not a multiple of 3")
      }
      Self::VertexCountOverflow { total } => {
        write!(f, "combined vertex count {total} exceeds u32 index range")
      }
    }
  }
}

/// Failure of a combine invocation. No output is produced alongside an error.
#[derive(Debug, thiserror::Error)]
pub enum CombineError {
  #[error("mesh {mesh}: invalid input: {reason}")]
  InvalidInput {
    mesh: usize,
    reason: InvalidInputReason,
  },

  #[error("mesh {mesh}: index {index} at position {position} remaps past vertex limit {limit}")]
  IndexOutOfRange {
    mesh: usize,
    /// Position within the source index buffer.
    position: usize,
    /// Remapped value (vertex offset + source index).
    index: u64,
    /// Total combined vertex count.
    limit: usize,
  },

  #[error("no meshes to combine")]
  EmptyInput,

  #[error("combine cancelled")]
  Cancelled,

  #[error("failed to build worker pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl CombineError {
  pub fn invalid(mesh: usize, reason: InvalidInputReason) -> Self {
    Self::InvalidInput { mesh, reason }
  }

  /// Index of the offending input mesh, when the error is tied to one.
  pub fn mesh_index(&self) -> Option<usize> {
    match self {
      Self::InvalidInput { mesh, .. } | Self::IndexOutOfRange { mesh, .. } => Some(*mesh),
      _ => None,
    }
  }

  pub fn is_empty_input(&self) -> bool {
    matches!(self, Self::EmptyInput)
  }
}
