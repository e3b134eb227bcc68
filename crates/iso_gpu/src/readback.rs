//! Asynchronous collision readback.
//!
//! Three strictly sequential device-to-host round trips:
//!
//! ```text
//!   start()
//!     │
//!     ▼
//! ┌─────────┐ 8 bytes   ┌──────────┐ n·24 bytes ┌─────────┐ n·4 bytes  ┌───────┐
//! │ Counter ├──────────►│ Vertices ├───────────►│ Indices ├───────────►│ Ready │
//! └────┬────┘           └────┬─────┘            └────┬────┘            └───────┘
//!      │                     │                       │
//!      └─────────────────────┴───────────────────────┴──► Failed(ReadbackError)
//!
//! n = emitted triangles · 3
//! ```
//!
//! The next stage is issued only after the previous one resolved. A
//! [`CancelToken`] is checked before every stage and on every poll; an
//! optional per-stage timeout aborts stalled requests. Any failure ends the
//! run without producing a mesh, so whatever collision mesh the caller had
//! installed stays in place.
//!
//! The machine is generic over [`ReadbackDevice`] so it can be driven by a
//! real GPU queue or a scripted fake.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use web_time::Instant;

use crate::constants::COUNTER_READBACK_BYTES;
use crate::error::ReadbackError;
use crate::mesh::CollisionMesh;
use crate::types::{TriangleBudget, TriangleCount, Vertex};

/// Stage of a collision readback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadbackStage {
  /// Emitted and reserved triangle counters.
  Counter,
  /// Emitted vertex range.
  Vertices,
  /// Emitted index range.
  Indices,
}

impl std::fmt::Display for ReadbackStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      ReadbackStage::Counter => "counter",
      ReadbackStage::Vertices => "vertex",
      ReadbackStage::Indices => "index",
    })
  }
}

/// Handle to an issued device copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Device-level failure reported by a [`ReadbackDevice`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceFailure(pub String);

impl std::fmt::Display for DeviceFailure {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

/// Source of asynchronous device-to-host copies.
pub trait ReadbackDevice {
  /// Start copying the first `byte_len` bytes of the buffer backing `stage`.
  ///
  /// `byte_len` is never zero.
  fn request(&mut self, stage: ReadbackStage, byte_len: u64) -> Result<RequestId, DeviceFailure>;

  /// Non-blocking completion check. `None` while the copy is in flight.
  fn poll_request(&mut self, id: RequestId) -> Option<Result<Vec<u8>, DeviceFailure>>;

  /// Drop an issued request; its result is never delivered.
  fn discard(&mut self, id: RequestId);
}

/// Cooperative cancellation shared between the requester and the readback.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn cancel(&self) {
    self.0.store(true, Ordering::Release);
  }

  pub fn is_cancelled(&self) -> bool {
    self.0.load(Ordering::Acquire)
  }
}

/// Readback tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReadbackConfig {
  /// Abort a stage that has not resolved within this duration.
  pub stage_timeout: Option<Duration>,
}

impl Default for ReadbackConfig {
  fn default() -> Self {
    Self {
      stage_timeout: Some(Duration::from_secs(5)),
    }
  }
}

/// Result of polling a [`CollisionReadback`].
#[derive(Debug, PartialEq)]
pub enum ReadbackPoll {
  /// Nothing in flight.
  Idle,
  /// Waiting on the given stage.
  Pending(ReadbackStage),
  /// All three stages succeeded.
  Ready(CollisionMesh),
  /// The run aborted.
  Failed(ReadbackError),
}

enum Request {
  /// Zero-length range: resolved without touching the device.
  Empty,
  Issued(RequestId),
}

struct InFlight {
  stage: ReadbackStage,
  request: Request,
  expected_bytes: u64,
  issued_at: Instant,
  budget: TriangleBudget,
  count: TriangleCount,
  vertices: Vec<Vertex>,
  cancel: CancelToken,
}

/// Three-stage collision readback state machine.
pub struct CollisionReadback {
  config: ReadbackConfig,
  in_flight: Option<InFlight>,
}

impl CollisionReadback {
  pub fn new(config: ReadbackConfig) -> Self {
    Self {
      config,
      in_flight: None,
    }
  }

  pub fn config(&self) -> &ReadbackConfig {
    &self.config
  }

  /// True while a run is in flight.
  pub fn is_busy(&self) -> bool {
    self.in_flight.is_some()
  }

  /// Stage currently awaited, if any.
  pub fn stage(&self) -> Option<ReadbackStage> {
    self.in_flight.as_ref().map(|f| f.stage)
  }

  /// Begin a run against buffers sized for `budget`.
  ///
  /// Overlapping runs are rejected with [`ReadbackError::InFlight`]; cancel
  /// first to restart. The returned token cancels this run only.
  pub fn start<D: ReadbackDevice + ?Sized>(
    &mut self,
    device: &mut D,
    budget: TriangleBudget,
  ) -> Result<CancelToken, ReadbackError> {
    if self.is_busy() {
      return Err(ReadbackError::InFlight);
    }

    let cancel = CancelToken::new();
    let request = issue(device, ReadbackStage::Counter, COUNTER_READBACK_BYTES)?;
    tracing::debug!(capacity = budget.triangles(), "collision readback started");

    self.in_flight = Some(InFlight {
      stage: ReadbackStage::Counter,
      request,
      expected_bytes: COUNTER_READBACK_BYTES,
      issued_at: Instant::now(),
      budget,
      count: TriangleCount::default(),
      vertices: Vec::new(),
      cancel: cancel.clone(),
    });
    Ok(cancel)
  }

  /// Abort the current run, discarding its outstanding device request.
  pub fn cancel<D: ReadbackDevice + ?Sized>(&mut self, device: &mut D) {
    if let Some(flight) = self.in_flight.take() {
      flight.cancel.cancel();
      if let Request::Issued(id) = flight.request {
        device.discard(id);
      }
      tracing::debug!(stage = %flight.stage, "collision readback cancelled");
    }
  }

  /// Advance the run without blocking.
  ///
  /// Stages that resolve immediately (zero-length ranges) are chained within
  /// the same call.
  pub fn poll<D: ReadbackDevice + ?Sized>(&mut self, device: &mut D) -> ReadbackPoll {
    loop {
      let Some(flight) = self.in_flight.as_mut() else {
        return ReadbackPoll::Idle;
      };
      let stage = flight.stage;

      if flight.cancel.is_cancelled() {
        self.cancel(device);
        return ReadbackPoll::Failed(ReadbackError::Cancelled { stage });
      }

      let pending_id = match flight.request {
        Request::Empty => None,
        Request::Issued(id) => Some(id),
      };
      let resolved = match pending_id {
        None => Ok(Vec::new()),
        Some(id) => match device.poll_request(id) {
          Some(result) => result,
          None => {
            let elapsed = flight.issued_at.elapsed();
            if self.config.stage_timeout.is_some_and(|limit| elapsed > limit) {
              self.cancel(device);
              return self.fail(ReadbackError::Timeout { stage, elapsed });
            }
            return ReadbackPoll::Pending(stage);
          }
        },
      };

      let bytes = match resolved {
        Ok(bytes) => bytes,
        Err(failure) => {
          self.in_flight = None;
          return self.fail(ReadbackError::Device {
            stage,
            message: failure.0,
          });
        }
      };

      if bytes.len() as u64 != flight.expected_bytes {
        let expected = flight.expected_bytes;
        self.in_flight = None;
        return self.fail(ReadbackError::Truncated {
          stage,
          expected,
          actual: bytes.len() as u64,
        });
      }

      match self.advance(device, bytes) {
        Ok(Some(mesh)) => return ReadbackPoll::Ready(mesh),
        Ok(None) => continue,
        Err(err) => {
          self.in_flight = None;
          return self.fail(err);
        }
      }
    }
  }

  /// Consume a resolved payload and issue the following stage.
  fn advance<D: ReadbackDevice + ?Sized>(
    &mut self,
    device: &mut D,
    bytes: Vec<u8>,
  ) -> Result<Option<CollisionMesh>, ReadbackError> {
    let Some(flight) = self.in_flight.as_mut() else {
      return Ok(None);
    };

    let next = match flight.stage {
      ReadbackStage::Counter => {
        let counters: Vec<u32> = bytemuck::pod_collect_to_vec(&bytes);
        let (emitted, reserved) = (counters[0], counters[1]);
        let capacity = flight.budget.triangles();
        if reserved > capacity || emitted > capacity {
          return Err(ReadbackError::ResourceExhaustion {
            requested: reserved.max(emitted) as u64,
            capacity: capacity as u64,
          });
        }
        flight.count = TriangleCount(emitted);
        tracing::debug!(triangles = emitted, "collision readback counter resolved");
        (ReadbackStage::Vertices, flight.count.vertex_bytes())
      }
      ReadbackStage::Vertices => {
        flight.vertices = bytemuck::pod_collect_to_vec(&bytes);
        (ReadbackStage::Indices, flight.count.index_bytes())
      }
      ReadbackStage::Indices => {
        let indices: Vec<u32> = bytemuck::pod_collect_to_vec(&bytes);
        let Some(done) = self.in_flight.take() else {
          return Ok(None);
        };
        tracing::debug!(
          triangles = done.count.triangles(),
          "collision readback complete"
        );
        return Ok(Some(CollisionMesh::from_parts(
          done.vertices,
          indices,
          done.budget.vertex_capacity(),
        )));
      }
    };

    let (stage, byte_len) = next;
    if flight.cancel.is_cancelled() {
      return Err(ReadbackError::Cancelled { stage });
    }
    flight.request = issue(device, stage, byte_len)?;
    flight.stage = stage;
    flight.expected_bytes = byte_len;
    flight.issued_at = Instant::now();
    Ok(None)
  }

  fn fail(&self, err: ReadbackError) -> ReadbackPoll {
    tracing::warn!(error = %err, "collision readback failed");
    ReadbackPoll::Failed(err)
  }
}

impl Default for CollisionReadback {
  fn default() -> Self {
    Self::new(ReadbackConfig::default())
  }
}

fn issue<D: ReadbackDevice + ?Sized>(
  device: &mut D,
  stage: ReadbackStage,
  byte_len: u64,
) -> Result<Request, ReadbackError> {
  if byte_len == 0 {
    return Ok(Request::Empty);
  }
  device
    .request(stage, byte_len)
    .map(Request::Issued)
    .map_err(|failure| ReadbackError::Device {
      stage,
      message: failure.0,
    })
}

#[cfg(test)]
#[path = "readback_test.rs"]
mod readback_test;
