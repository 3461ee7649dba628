//! Unity FFI bridge for mesh_combine.
//!
//! C# enumerates renderers, applies its own inclusion filter, and passes raw
//! mesh buffers plus `localToWorldMatrix` for each survivor. Rust combines
//! them and retains the result behind a handle until C# has copied it into a
//! `Mesh`.
//!
//! # Architecture
//!
//! ```text
//! C# (Unity)                              Rust (mesh_combine_unity)
//! ┌──────────────────────┐                ┌──────────────────────────────┐
//! │ MeshCombiner         │                │ RESULTS: handle → output     │
//! │                      │  mesh_combine_ │                              │
//! │ Combine():           │──run()───────► │ 1. Validate descriptors      │
//! │   FfiMeshDesc[]      │                │ 2. mesh_combine::combine()   │
//! │                      │ ◄── handle ────│ 3. Retain OutputMesh         │
//! │ Apply():             │  mesh_combine_ │                              │
//! │   SetVertices/...    │──get_result()─►│ Pointers into retained data  │
//! │                      │  mesh_combine_ │                              │
//! │   Done               │──release()───► │ Drop retained output         │
//! └──────────────────────┘                └──────────────────────────────┘
//! ```
//!
//! # Errors
//!
//! A failed run returns a negative status. `mesh_combine_last_error_mesh()`
//! and `mesh_combine_last_error_message()` describe the most recent failure on
//! the calling thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::os::raw::c_char;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use glam::{Mat4, Vec3};
use web_time::Instant;

use mesh_combine::{
    combine,
    layout::checked_count,
    metrics::CombineMetrics,
    Aabb, CombineConfig, CombineError, ExecutionStrategy, IndexBuffer, InputMesh,
    InvalidInputReason, OutputMesh,
};

// =============================================================================
// FFI Types
// =============================================================================

/// `FfiMeshDesc::index_format` for 16-bit indices.
pub const INDEX_FORMAT_U16: u8 = 0;
/// `FfiMeshDesc::index_format` for 32-bit indices.
pub const INDEX_FORMAT_U32: u8 = 1;

/// `FfiCombineConfig::strategy` values.
pub const STRATEGY_SEQUENTIAL: u8 = 0;
pub const STRATEGY_PARALLEL: u8 = 1;

/// Status codes returned by the FFI functions.
pub const STATUS_OK: i32 = 0;
pub const STATUS_NULL_POINTER: i32 = -1;
pub const STATUS_LOCK_FAILED: i32 = -2;
pub const STATUS_UNKNOWN_HANDLE: i32 = -3;
pub const STATUS_INVALID_INPUT: i32 = -10;
pub const STATUS_INDEX_OUT_OF_RANGE: i32 = -11;
pub const STATUS_EMPTY_INPUT: i32 = -12;
pub const STATUS_CANCELLED: i32 = -13;
pub const STATUS_THREAD_POOL: i32 = -14;
pub const STATUS_RESULT_TOO_LARGE: i32 = -15;
pub const STATUS_METRICS_DISABLED: i32 = -4;

/// One source mesh as laid out by C#.
/// Matches C# FfiMeshDesc exactly.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiMeshDesc {
    /// Pointer to `vertex_count` Vector3 positions.
    pub positions: *const [f32; 3],
    /// Pointer to `vertex_count` Vector3 normals.
    pub normals: *const [f32; 3],
    pub vertex_count: i32,
    /// Pointer to `index_count` indices, width given by `index_format`.
    pub indices: *const c_void,
    pub index_count: i32,
    /// INDEX_FORMAT_U16 or INDEX_FORMAT_U32
    pub index_format: u8,
    pub _pad: [u8; 3],
    /// Column-major local-to-world matrix (Unity Matrix4x4 memory order).
    pub transform: [f32; 16],
}

/// Combine options passed from Unity.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FfiCombineConfig {
    /// STRATEGY_SEQUENTIAL or STRATEGY_PARALLEL
    pub strategy: u8,
    /// Non-zero: zero meshes produce an empty result instead of an error
    pub allow_empty: u8,
    pub _pad: [u8; 2],
    /// Dedicated worker count for the parallel strategy (0 = shared pool)
    pub threads: u32,
}

/// Combined mesh view. Pointers are valid until `mesh_combine_release`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct FfiCombineResult {
    pub positions_ptr: *const [f32; 3],
    pub normals_ptr: *const [f32; 3],
    pub vertex_count: u32,
    pub indices_ptr: *const u32,
    pub index_count: u32,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
    /// 1 if no positions contributed to the bounds
    pub bounds_empty: u8,
    pub _pad: [u8; 3],
}

impl Default for FfiCombineResult {
    fn default() -> Self {
        Self {
            positions_ptr: std::ptr::null(),
            normals_ptr: std::ptr::null(),
            vertex_count: 0,
            indices_ptr: std::ptr::null(),
            index_count: 0,
            bounds_min: [0.0; 3],
            bounds_max: [0.0; 3],
            bounds_empty: 1,
            _pad: [0; 3],
        }
    }
}

/// Timing histogram stats (from RollingWindow).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FfiTimingStats {
    /// Most recent sample in microseconds.
    pub last_us: u64,
    /// Mean of window in microseconds.
    pub avg_us: u64,
    /// Minimum in window in microseconds.
    pub min_us: u64,
    /// Maximum in window in microseconds.
    pub max_us: u64,
    /// Number of samples in window (up to 128).
    pub sample_count: u32,
    pub _pad: u32,
}

/// Rust-side metrics snapshot for FFI export.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FfiMetricsSnapshot {
    pub combine: FfiTimingStats,
    pub total_combines: u64,
    pub total_failures: u64,
    pub total_meshes: u64,
    pub total_vertices: u64,
    pub total_indices: u64,
}

// =============================================================================
// Descriptor Conversion
// =============================================================================

impl FfiCombineConfig {
    fn to_config(self) -> CombineConfig {
        let strategy = match (self.strategy, self.threads) {
            (STRATEGY_SEQUENTIAL, _) => ExecutionStrategy::Sequential,
            (_, 0) => ExecutionStrategy::Parallel { threads: None },
            (_, n) => ExecutionStrategy::Parallel {
                threads: Some(n as usize),
            },
        };
        CombineConfig::default()
            .with_strategy(strategy)
            .with_allow_empty(self.allow_empty != 0)
    }
}

/// Borrow `count` elements, tolerating null only when there is nothing to read.
///
/// # Safety
/// A non-null `ptr` must point to `count` readable, initialized elements that
/// outlive `'a`.
unsafe fn borrow_slice<'a, T>(
    mesh_index: usize,
    field: &'static str,
    ptr: *const T,
    count: usize,
) -> Result<&'a [T], CombineError> {
    if count == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(CombineError::invalid(
            mesh_index,
            InvalidInputReason::MissingBuffer { field },
        ));
    }
    Ok(std::slice::from_raw_parts(ptr, count))
}

/// Build a read-only mesh view over C#-owned buffers.
///
/// # Safety
/// Every pointer in `desc` must satisfy [`borrow_slice`] for its count.
unsafe fn read_mesh<'a>(mesh_index: usize, desc: &'a FfiMeshDesc) -> Result<InputMesh<'a>, CombineError> {
    let vertex_count = checked_count(mesh_index, "vertex_count", desc.vertex_count as i64)?;
    let index_count = checked_count(mesh_index, "index_count", desc.index_count as i64)?;

    // Vec3 is three packed f32s, same as Unity's Vector3.
    let positions: &[Vec3] =
        borrow_slice(mesh_index, "positions", desc.positions.cast::<Vec3>(), vertex_count)?;
    let normals: &[Vec3] =
        borrow_slice(mesh_index, "normals", desc.normals.cast::<Vec3>(), vertex_count)?;

    let indices = match desc.index_format {
        INDEX_FORMAT_U16 => IndexBuffer::U16(borrow_slice(
            mesh_index,
            "indices",
            desc.indices.cast::<u16>(),
            index_count,
        )?),
        INDEX_FORMAT_U32 => IndexBuffer::U32(borrow_slice(
            mesh_index,
            "indices",
            desc.indices.cast::<u32>(),
            index_count,
        )?),
        format => {
            return Err(CombineError::invalid(
                mesh_index,
                InvalidInputReason::UnknownIndexFormat { format },
            ))
        }
    };

    Ok(InputMesh::new(
        positions,
        normals,
        indices,
        Mat4::from_cols_array(&desc.transform),
    ))
}

fn status_for(err: &CombineError) -> i32 {
    match err {
        CombineError::InvalidInput { .. } => STATUS_INVALID_INPUT,
        CombineError::IndexOutOfRange { .. } => STATUS_INDEX_OUT_OF_RANGE,
        CombineError::EmptyInput => STATUS_EMPTY_INPUT,
        CombineError::Cancelled => STATUS_CANCELLED,
        CombineError::ThreadPool(_) => STATUS_THREAD_POOL,
    }
}

// =============================================================================
// Global State
// =============================================================================

/// Retained combine results keyed by handle, so pointers stay valid.
static RESULTS: Mutex<Option<HashMap<i32, OutputMesh>>> = Mutex::new(None);
static NEXT_HANDLE: AtomicI32 = AtomicI32::new(1);

/// Session-wide combine statistics.
static METRICS: Mutex<Option<CombineMetrics>> = Mutex::new(None);

/// Most recent failure on this thread.
struct LastError {
    mesh: Option<usize>,
    message: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

fn set_last_error(err: &CombineError) {
    set_last_error_message(err.mesh_index(), err.to_string());
}

fn set_last_error_message(mesh: Option<usize>, message: String) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(LastError { mesh, message }));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn record_metrics(result: &Result<OutputMesh, CombineError>, mesh_count: usize, timing_us: u64) {
    if let Ok(mut guard) = METRICS.lock() {
        guard
            .get_or_insert_with(CombineMetrics::default)
            .record(result, mesh_count, timing_us);
    }
}

// =============================================================================
// FFI Functions
// =============================================================================

/// Returns the library version as a packed u32: 0xMMmmpp (major.minor.patch).
#[no_mangle]
pub extern "C" fn mesh_combine_version() -> u32 {
    0x000100 // v0.1.0
}

/// Combine `count` meshes and retain the result.
///
/// # Safety
/// - `descs` must point to `count` valid FfiMeshDesc structs (may be null if
///   `count` is 0), each satisfying its own pointer/count contract.
/// - `config` may be null (defaults) or point to a valid FfiCombineConfig.
/// - `out_handle` must point to writable memory for one i32.
///
/// # Returns
/// - 0 on success, `*out_handle` set to a positive handle
/// - -1 if `out_handle` is null, or `descs` is null with a positive count
/// - -2 if failed to acquire lock
/// - -10 invalid input, -11 index out of range, -12 empty input,
///   -13 cancelled, -14 worker pool failure, -15 combined counts do not
///   fit the u32 result fields
#[no_mangle]
pub unsafe extern "C" fn mesh_combine_run(
    descs: *const FfiMeshDesc,
    count: i32,
    config: *const FfiCombineConfig,
    out_handle: *mut i32,
) -> i32 {
    if out_handle.is_null() {
        return STATUS_NULL_POINTER;
    }
    *out_handle = 0;

    // Not tied to any mesh, so reported without an index.
    let Ok(count) = usize::try_from(count) else {
        set_last_error_message(None, format!("mesh count is negative ({count})"));
        return STATUS_INVALID_INPUT;
    };
    if count > 0 && descs.is_null() {
        set_last_error_message(None, format!("descriptor array is null for {count} meshes"));
        return STATUS_NULL_POINTER;
    }

    let config = if config.is_null() {
        CombineConfig::default()
    } else {
        (*config).to_config()
    };

    let descs: &[FfiMeshDesc] = if count == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(descs, count)
    };

    let start = Instant::now();
    let result = descs
        .iter()
        .enumerate()
        .map(|(i, desc)| read_mesh(i, desc))
        .collect::<Result<Vec<_>, _>>()
        .and_then(|inputs| combine(&inputs, &config));
    record_metrics(&result, count, start.elapsed().as_micros() as u64);

    let output = match result {
        Ok(output) => output,
        Err(err) => {
            log::warn!("mesh_combine_run failed: {err}");
            set_last_error(&err);
            return status_for(&err);
        }
    };

    if ffi_len(output.vertex_count()).is_none() || ffi_len(output.index_count()).is_none() {
        set_last_error_message(
            None,
            format!(
                "combined mesh too large for u32 counts ({} vertices, {} indices)",
                output.vertex_count(),
                output.index_count()
            ),
        );
        return STATUS_RESULT_TOO_LARGE;
    }

    let Ok(mut guard) = RESULTS.lock() else {
        return STATUS_LOCK_FAILED;
    };

    let handle = NEXT_HANDLE.fetch_add(1, Ordering::SeqCst);
    guard.get_or_insert_with(HashMap::new).insert(handle, output);
    clear_last_error();

    *out_handle = handle;
    STATUS_OK
}

/// Fill `out` with pointers into a retained result.
///
/// # Safety
/// - `out` must point to a valid FfiCombineResult struct.
///
/// # Returns
/// - 0 on success
/// - -1 if out is null
/// - -2 if failed to acquire lock
/// - -3 if handle not found
#[no_mangle]
pub unsafe extern "C" fn mesh_combine_get_result(handle: i32, out: *mut FfiCombineResult) -> i32 {
    if out.is_null() {
        return STATUS_NULL_POINTER;
    }

    let Ok(guard) = RESULTS.lock() else {
        return STATUS_LOCK_FAILED;
    };

    let Some(output) = guard.as_ref().and_then(|results| results.get(&handle)) else {
        return STATUS_UNKNOWN_HANDLE;
    };

    (*out) = result_view(output);
    STATUS_OK
}

/// Buffer length as a result-field count, if it fits.
fn ffi_len(len: usize) -> Option<u32> {
    u32::try_from(len).ok()
}

/// Only called for outputs that passed the [`ffi_len`] check in `mesh_combine_run`.
fn result_view(output: &OutputMesh) -> FfiCombineResult {
    let Aabb { min, max } = output.bounds;
    let empty = output.bounds.is_empty();

    FfiCombineResult {
        positions_ptr: output.positions.as_ptr().cast::<[f32; 3]>(),
        normals_ptr: output.normals.as_ptr().cast::<[f32; 3]>(),
        vertex_count: ffi_len(output.positions.len()).unwrap_or(u32::MAX),
        indices_ptr: output.indices.as_ptr(),
        index_count: ffi_len(output.indices.len()).unwrap_or(u32::MAX),
        bounds_min: if empty { [0.0; 3] } else { min.to_array() },
        bounds_max: if empty { [0.0; 3] } else { max.to_array() },
        bounds_empty: empty as u8,
        _pad: [0; 3],
    }
}

/// Drop a retained result. Pointers from `mesh_combine_get_result` become
/// dangling.
///
/// # Returns
/// - 0 on success
/// - -2 if failed to acquire lock
/// - -3 if handle not found
#[no_mangle]
pub extern "C" fn mesh_combine_release(handle: i32) -> i32 {
    let Ok(mut guard) = RESULTS.lock() else {
        return STATUS_LOCK_FAILED;
    };

    let Some(ref mut results) = *guard else {
        return STATUS_UNKNOWN_HANDLE;
    };

    if results.remove(&handle).is_some() {
        STATUS_OK
    } else {
        STATUS_UNKNOWN_HANDLE
    }
}

/// Mesh index named by the last failure on this thread, or -1.
#[no_mangle]
pub extern "C" fn mesh_combine_last_error_mesh() -> i32 {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .and_then(|err| err.mesh)
            .map_or(-1, |mesh| mesh as i32)
    })
}

/// Copy the last failure message on this thread into `buf` (NUL-terminated,
/// truncated to `len - 1` bytes).
///
/// # Safety
/// - `buf` must point to `len` writable bytes.
///
/// # Returns
/// Number of message bytes written (excluding NUL), 0 if there is no error,
/// -1 if `buf` is null or `len` is not positive.
#[no_mangle]
pub unsafe extern "C" fn mesh_combine_last_error_message(buf: *mut c_char, len: i32) -> i32 {
    if buf.is_null() || len <= 0 {
        return STATUS_NULL_POINTER;
    }

    LAST_ERROR.with(|slot| {
        let slot = slot.borrow();
        let message = slot.as_ref().map_or("", |err| err.message.as_str());
        let written = message.len().min(len as usize - 1);
        std::ptr::copy_nonoverlapping(message.as_ptr().cast::<c_char>(), buf, written);
        *buf.add(written) = 0;
        written as i32
    })
}

/// Get the session metrics snapshot.
///
/// # Safety
/// - `out` must point to a valid FfiMetricsSnapshot struct.
///
/// # Returns
/// - 0 on success
/// - -1 if out is null
/// - -2 if failed to acquire lock
/// - -4 if metrics feature not enabled (compile-time)
#[no_mangle]
pub unsafe extern "C" fn mesh_combine_get_metrics(out: *mut FfiMetricsSnapshot) -> i32 {
    #[cfg(not(feature = "metrics"))]
    {
        let _ = out;
        return STATUS_METRICS_DISABLED;
    }

    #[cfg(feature = "metrics")]
    {
        if out.is_null() {
            return STATUS_NULL_POINTER;
        }

        let Ok(guard) = METRICS.lock() else {
            return STATUS_LOCK_FAILED;
        };

        let snapshot = guard
            .as_ref()
            .map(CombineMetrics::snapshot)
            .unwrap_or_default();

        (*out) = FfiMetricsSnapshot {
            combine: FfiTimingStats {
                last_us: snapshot.combine.last_us,
                avg_us: snapshot.combine.avg_us,
                min_us: snapshot.combine.min_us,
                max_us: snapshot.combine.max_us,
                sample_count: snapshot.combine.sample_count,
                _pad: 0,
            },
            total_combines: snapshot.total_combines,
            total_failures: snapshot.total_failures,
            total_meshes: snapshot.total_meshes,
            total_vertices: snapshot.total_vertices,
            total_indices: snapshot.total_indices,
        };
        STATUS_OK
    }
}

// =============================================================================
// Tests
// =============================================================================
