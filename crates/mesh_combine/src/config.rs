//! CombineConfig - execution strategy and empty-input policy.

/// Task-scheduling substrate for the per-mesh transform stage.
///
/// Every strategy honors the same contract and produces byte-identical
/// output; only the scheduling differs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStrategy {
  /// Plain loop on the calling thread.
  Sequential,

  /// Fan out one task per mesh over rayon.
  Parallel {
    /// Worker count for a dedicated pool. `None` uses rayon's global pool.
    threads: Option<usize>,
  },
}

impl Default for ExecutionStrategy {
  fn default() -> Self {
    ExecutionStrategy::Parallel { threads: None }
  }
}

/// Configuration for a combine invocation.
#[derive(Clone, Debug)]
pub struct CombineConfig {
  /// How mesh tasks are scheduled.
  pub strategy: ExecutionStrategy,

  /// Return an empty mesh (with degenerate bounds) instead of
  /// `CombineError::EmptyInput` when there is nothing to combine.
  pub allow_empty: bool,

  /// Below this many meshes the parallel strategy runs sequentially.
  pub parallel_threshold: usize,
}

impl Default for CombineConfig {
  fn default() -> Self {
    Self {
      strategy: ExecutionStrategy::default(),
      allow_empty: false,
      parallel_threshold: 1,
    }
  }
}

impl CombineConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn sequential() -> Self {
    Self::default().with_strategy(ExecutionStrategy::Sequential)
  }

  pub fn parallel() -> Self {
    Self::default()
  }

  pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
    self.strategy = strategy;
    self
  }

  /// Parallel strategy on a dedicated pool of `threads` workers.
  pub fn with_threads(mut self, threads: usize) -> Self {
    self.strategy = ExecutionStrategy::Parallel {
      threads: Some(threads),
    };
    self
  }

  pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
    self.allow_empty = allow_empty;
    self
  }

  pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
    self.parallel_threshold = threshold;
    self
  }

  /// Strategy actually used for `mesh_count` meshes.
  pub fn effective_strategy(&self, mesh_count: usize) -> ExecutionStrategy {
    match self.strategy {
      ExecutionStrategy::Parallel { .. } if mesh_count < self.parallel_threshold => {
        ExecutionStrategy::Sequential
      }
      strategy => strategy,
    }
  }
}
