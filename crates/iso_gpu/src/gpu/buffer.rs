//! Singly-owned GPU buffer.

use std::ops::Deref;

use crate::lifecycle::LedgerEntry;

/// A `wgpu::Buffer` with exactly one owner. Dropping it destroys the GPU
/// allocation immediately instead of waiting for the last handle clone.
#[derive(Debug)]
pub struct OwnedBuffer {
  buffer: wgpu::Buffer,
  _entry: LedgerEntry,
}

impl OwnedBuffer {
  pub(crate) fn new(buffer: wgpu::Buffer, entry: LedgerEntry) -> Self {
    Self {
      buffer,
      _entry: entry,
    }
  }
}

impl Deref for OwnedBuffer {
  type Target = wgpu::Buffer;

  fn deref(&self) -> &wgpu::Buffer {
    &self.buffer
  }
}

impl Drop for OwnedBuffer {
  fn drop(&mut self) {
    self.buffer.destroy();
  }
}
