//! Batch queue for combine requests.
//!
//! Enqueue → Tick → Completions
//!
//! Hosts with a per-frame update loop submit owned meshes, call [`tick`]
//! once per frame, and drain whatever finished. Ticking never blocks: each
//! request is handed to rayon and its completion comes back over a channel.
//! Requests run concurrently with one another; inside a request the combine
//! config decides how meshes are scheduled.
//!
//! ```ignore
//! let mut queue = CombineQueue::new();
//! let id = queue.enqueue(meshes, CombineConfig::default());
//!
//! // Each frame:
//! queue.tick();
//! for done in queue.drain_completions() {
//!     // Use done.result
//! }
//!
//! // On teardown:
//! queue.shutdown();
//! ```
//!
//! [`tick`]: CombineQueue::tick

use crossbeam_channel::{unbounded, Receiver, Sender};
use web_time::Instant;

use crate::combine::{combine_with_cancel, CancelToken};
use crate::config::CombineConfig;
use crate::error::CombineError;
use crate::metrics::CombineMetrics;
use crate::types::{InputMesh, MeshData, OutputMesh};

/// Request to combine a set of owned meshes.
#[derive(Clone)]
pub struct CombineRequest {
  /// Unique identifier for this request
  pub id: u64,
  /// Meshes in enumeration order (already filtered by the host)
  pub meshes: Vec<MeshData>,
  /// Combine configuration
  pub config: CombineConfig,
}

/// Finished combine request.
#[derive(Debug)]
pub struct CombineCompletion {
  /// Request ID this completion corresponds to
  pub id: u64,
  /// Combined mesh, or why there is none
  pub result: Result<OutputMesh, CombineError>,
  /// Number of meshes in the request
  pub mesh_count: usize,
  /// Raw combine time in microseconds
  pub timing_us: u64,
}

/// Non-blocking driver that runs combine requests on rayon.
pub struct CombineQueue {
  /// Requests waiting for the next tick
  pending: Vec<CombineRequest>,
  /// Completions received but not yet drained
  completed: Vec<CombineCompletion>,
  sender: Sender<CombineCompletion>,
  receiver: Receiver<CombineCompletion>,
  /// Requests dispatched whose completion has not arrived
  in_flight: usize,
  /// Next request ID
  next_id: u64,
  cancel: CancelToken,
  metrics: CombineMetrics,
}

impl Default for CombineQueue {
  fn default() -> Self {
    Self::new()
  }
}

impl CombineQueue {
  /// Create an empty queue.
  pub fn new() -> Self {
    let (sender, receiver) = unbounded();
    Self {
      pending: Vec::new(),
      completed: Vec::new(),
      sender,
      receiver,
      in_flight: 0,
      next_id: 0,
      cancel: CancelToken::new(),
      metrics: CombineMetrics::default(),
    }
  }

  /// Enqueue a combine request, returning the assigned ID.
  pub fn enqueue(&mut self, meshes: Vec<MeshData>, config: CombineConfig) -> u64 {
    let id = self.next_id;
    self.next_id += 1;

    self.pending.push(CombineRequest { id, meshes, config });

    id
  }

  /// Dispatch pending requests and collect any that finished.
  /// Returns the number of requests dispatched this tick.
  pub fn tick(&mut self) -> usize {
    self.poll();

    if self.pending.is_empty() {
      return 0;
    }

    let requests = std::mem::take(&mut self.pending);
    let count = requests.len();

    for request in requests {
      let sender = self.sender.clone();
      let cancel = self.cancel.clone();
      self.in_flight += 1;

      rayon::spawn(move || {
        let completion = run_request(request, &cancel);
        // Receiver lives as long as the queue; a send error means it was dropped.
        let _ = sender.send(completion);
      });
    }

    log::debug!("dispatched {count} combine requests ({} in flight)", self.in_flight);
    count
  }

  /// Move finished completions into the drain buffer without blocking.
  pub fn poll(&mut self) -> usize {
    let mut received = 0;
    while let Ok(completion) = self.receiver.try_recv() {
      self.accept(completion);
      received += 1;
    }
    received
  }

  /// Block until every dispatched request has completed.
  pub fn wait_idle(&mut self) {
    while self.in_flight > 0 {
      match self.receiver.recv() {
        Ok(completion) => self.accept(completion),
        Err(_) => break,
      }
    }
  }

  /// Take all completed requests.
  pub fn drain_completions(&mut self) -> Vec<CombineCompletion> {
    self.poll();
    std::mem::take(&mut self.completed)
  }

  /// Cancel in-flight work, drop pending requests and undrained results.
  ///
  /// The queue is reusable afterwards.
  pub fn shutdown(&mut self) {
    self.cancel.cancel();
    self.pending.clear();
    self.wait_idle();
    self.completed.clear();
    self.cancel = CancelToken::new();
  }

  /// Number of requests waiting for the next tick.
  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  /// Number of dispatched requests not yet completed.
  pub fn in_flight_count(&self) -> usize {
    self.in_flight
  }

  /// Number of completed results waiting to be drained.
  pub fn completed_count(&self) -> usize {
    self.completed.len()
  }

  /// True when no work remains.
  pub fn is_idle(&self) -> bool {
    self.pending.is_empty() && self.in_flight == 0 && self.completed.is_empty()
  }

  pub fn metrics(&self) -> &CombineMetrics {
    &self.metrics
  }

  fn accept(&mut self, completion: CombineCompletion) {
    self.in_flight = self.in_flight.saturating_sub(1);
    self.metrics.record_completion(&completion);
    if let Err(err) = &completion.result {
      log::warn!("combine request {} failed: {err}", completion.id);
    }
    self.completed.push(completion);
  }
}

fn run_request(request: CombineRequest, cancel: &CancelToken) -> CombineCompletion {
  let start = Instant::now();
  let inputs: Vec<InputMesh<'_>> = request.meshes.iter().map(MeshData::as_input).collect();
  let result = combine_with_cancel(&inputs, &request.config, cancel);
  let timing_us = start.elapsed().as_micros() as u64;

  CombineCompletion {
    id: request.id,
    result,
    mesh_count: request.meshes.len(),
    timing_us,
  }
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
