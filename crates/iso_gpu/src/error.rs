//! Error types.
//!
//! Preconditions ([`GridError`]) fail before any GPU allocation and are kept
//! apart from device-side failures ([`ContextError`], [`ReadbackError`]) so
//! callers can tell a bad request from a broken device.

use std::time::Duration;

use thiserror::Error;

use crate::readback::ReadbackStage;
use crate::types::GridSize;

/// Grid configuration and allocation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
  #[error("grid dimension {axis} must be positive, got {value}")]
  NonPositiveDimension { axis: char, value: i32 },

  #[error("triangle budget for {voxels} voxels does not fit 32-bit GPU counters")]
  BudgetOverflow { voxels: u64 },

  #[error("{label} needs {bytes} bytes, device limit is {limit}")]
  BufferTooLarge {
    label: &'static str,
    bytes: u64,
    limit: u64,
  },

  #[error("dispatch of {groups} workgroups on one axis exceeds device limit {limit}")]
  DispatchTooLarge { groups: u32, limit: u32 },

  #[error("field has {actual} samples, grid needs {expected}")]
  FieldLength { expected: usize, actual: usize },

  #[error("field was generated for a {field} grid but settings ask for {settings}")]
  StaleField { field: GridSize, settings: GridSize },

  #[error("{0} has not been generated yet")]
  NotGenerated(&'static str),
}

/// GPU adapter/device acquisition failures.
#[derive(Debug, Error)]
pub enum ContextError {
  #[error("no compatible GPU adapter: {0}")]
  NoAdapter(String),

  #[error("device request failed: {0}")]
  Device(String),
}

/// Collision readback failures. Any of these aborts the run and leaves the
/// previously installed collision mesh untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadbackError {
  #[error("{stage} readback failed on device: {message}")]
  Device {
    stage: ReadbackStage,
    message: String,
  },

  #[error("{stage} readback returned {actual} bytes, expected {expected}")]
  Truncated {
    stage: ReadbackStage,
    expected: u64,
    actual: u64,
  },

  #[error("{requested} triangles reserved but only {capacity} fit the mesh buffers")]
  ResourceExhaustion { requested: u64, capacity: u64 },

  #[error("{stage} readback timed out after {elapsed:?}")]
  Timeout {
    stage: ReadbackStage,
    elapsed: Duration,
  },

  #[error("readback cancelled before {stage} stage")]
  Cancelled { stage: ReadbackStage },

  #[error("a collision readback is already in flight")]
  InFlight,

  #[error("no mesh has been generated to read back")]
  NoSource,
}
