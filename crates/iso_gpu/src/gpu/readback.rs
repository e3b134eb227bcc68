//! Staging-buffer implementation of [`ReadbackDevice`].
//!
//! Each request copies a prefix of a source buffer into a fresh
//! `MAP_READ` staging buffer, submits, and starts `map_async`. The map
//! callback reports through a channel; polling drives the device without
//! blocking and picks the result up once it lands.

use std::collections::HashMap;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::constants::COUNTER_STRIDE;
use crate::gpu::{GpuContext, OwnedBuffer};
use crate::readback::{DeviceFailure, ReadbackDevice, ReadbackStage, RequestId};

type MapResult = Result<(), wgpu::BufferAsyncError>;

struct PendingCopy {
  staging: OwnedBuffer,
  byte_len: u64,
  mapped: Receiver<MapResult>,
}

/// Outstanding staging copies owned by one grid.
///
/// Dropping the queue destroys every in-flight staging buffer.
#[derive(Default)]
pub struct StagingQueue {
  pending: HashMap<RequestId, PendingCopy>,
  next_id: u64,
}

impl StagingQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Destroy every outstanding staging buffer.
  pub fn clear(&mut self) {
    self.pending.clear();
  }
}

/// Borrowed view of a grid's buffers that serves collision readbacks.
pub struct GridReadbackDevice<'a> {
  pub ctx: &'a GpuContext,
  pub queue: &'a mut StagingQueue,
  pub counter: &'a wgpu::Buffer,
  pub internal_counter: &'a wgpu::Buffer,
  pub vertices: &'a wgpu::Buffer,
  pub indices: &'a wgpu::Buffer,
}

impl GridReadbackDevice<'_> {
  fn record_copy(
    &self,
    encoder: &mut wgpu::CommandEncoder,
    stage: ReadbackStage,
    dst: &wgpu::Buffer,
    byte_len: u64,
  ) {
    match stage {
      ReadbackStage::Counter => {
        // [emitted, reserved]
        encoder.copy_buffer_to_buffer(self.counter, 0, dst, 0, COUNTER_STRIDE);
        encoder.copy_buffer_to_buffer(
          self.internal_counter,
          0,
          dst,
          COUNTER_STRIDE,
          byte_len - COUNTER_STRIDE,
        );
      }
      ReadbackStage::Vertices => {
        encoder.copy_buffer_to_buffer(self.vertices, 0, dst, 0, byte_len);
      }
      ReadbackStage::Indices => {
        encoder.copy_buffer_to_buffer(self.indices, 0, dst, 0, byte_len);
      }
    }
  }

  fn source_size(&self, stage: ReadbackStage) -> u64 {
    match stage {
      ReadbackStage::Counter => self.counter.size() + self.internal_counter.size(),
      ReadbackStage::Vertices => self.vertices.size(),
      ReadbackStage::Indices => self.indices.size(),
    }
  }
}

impl ReadbackDevice for GridReadbackDevice<'_> {
  fn request(&mut self, stage: ReadbackStage, byte_len: u64) -> Result<RequestId, DeviceFailure> {
    let available = self.source_size(stage);
    if byte_len > available || byte_len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
      return Err(DeviceFailure(format!(
        "cannot copy {} bytes from a {} byte {} buffer",
        byte_len, available, stage
      )));
    }

    let staging = self.ctx.create_buffer(
      "iso_gpu.readback.staging",
      byte_len,
      wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
    );

    let mut encoder = self
      .ctx
      .device
      .create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("iso_gpu.readback"),
      });
    self.record_copy(&mut encoder, stage, &staging, byte_len);
    self.ctx.queue.submit(Some(encoder.finish()));

    let (tx, rx) = crossbeam_channel::bounded(1);
    staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
      let _ = tx.send(result);
    });

    let id = RequestId(self.queue.next_id);
    self.queue.next_id += 1;
    self.queue.pending.insert(
      id,
      PendingCopy {
        staging,
        byte_len,
        mapped: rx,
      },
    );
    Ok(id)
  }

  fn poll_request(&mut self, id: RequestId) -> Option<Result<Vec<u8>, DeviceFailure>> {
    if let Err(err) = self.ctx.poll() {
      self.queue.pending.remove(&id);
      return Some(Err(poll_failure(&err)));
    }

    let copy = self.queue.pending.get(&id)?;
    let outcome = match copy.mapped.try_recv() {
      Err(TryRecvError::Empty) => return None,
      Err(TryRecvError::Disconnected) => Err(DeviceFailure("map callback dropped".into())),
      Ok(Err(err)) => Err(DeviceFailure(err.to_string())),
      Ok(Ok(())) => {
        let view = copy.staging.slice(..copy.byte_len).get_mapped_range();
        let bytes = view.to_vec();
        drop(view);
        copy.staging.unmap();
        Ok(bytes)
      }
    };

    self.queue.pending.remove(&id);
    Some(outcome)
  }

  fn discard(&mut self, id: RequestId) {
    self.queue.pending.remove(&id);
  }
}

fn poll_failure(err: &wgpu::PollError) -> DeviceFailure {
  tracing::warn!(error = %err, "device poll failed");
  DeviceFailure(format!("device poll failed: {}", err))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn poll_error_becomes_device_failure() {
    let failure = poll_failure(&wgpu::PollError::Timeout);
    assert!(
      failure.0.starts_with("device poll failed"),
      "unexpected message: {}",
      failure
    );
  }
}
