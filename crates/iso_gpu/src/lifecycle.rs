//! Ownership discipline for GPU resources.
//!
//! Every GPU allocation lives in exactly one [`Slot`]. Replacing a slot's
//! content releases the old value *before* the new one is created, so peak
//! memory never holds two generations of the same buffer. Each live
//! allocation holds a [`LedgerEntry`]; the shared [`ResourceLedger`] is how
//! callers (and tests) observe that nothing leaks.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared count of live GPU allocations.
#[derive(Clone, Debug, Default)]
pub struct ResourceLedger {
  live: Arc<AtomicUsize>,
  bytes: Arc<AtomicU64>,
}

impl ResourceLedger {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an allocation. Released when the entry drops.
  pub fn acquire(&self, bytes: u64) -> LedgerEntry {
    self.live.fetch_add(1, Ordering::AcqRel);
    self.bytes.fetch_add(bytes, Ordering::AcqRel);
    LedgerEntry {
      ledger: self.clone(),
      bytes,
    }
  }

  /// Number of allocations currently alive.
  pub fn live(&self) -> usize {
    self.live.load(Ordering::Acquire)
  }

  /// Bytes held by live allocations.
  pub fn live_bytes(&self) -> u64 {
    self.bytes.load(Ordering::Acquire)
  }
}

/// Proof of a live allocation.
#[derive(Debug)]
pub struct LedgerEntry {
  ledger: ResourceLedger,
  bytes: u64,
}

impl LedgerEntry {
  pub fn bytes(&self) -> u64 {
    self.bytes
  }
}

impl Drop for LedgerEntry {
  fn drop(&mut self) {
    self.ledger.live.fetch_sub(1, Ordering::AcqRel);
    self.ledger.bytes.fetch_sub(self.bytes, Ordering::AcqRel);
  }
}

/// Single-owner holder for a replaceable resource.
#[derive(Debug)]
pub struct Slot<T> {
  value: Option<T>,
}

impl<T> Slot<T> {
  pub const fn empty() -> Self {
    Self { value: None }
  }

  /// Release the current value, then create and store a new one.
  pub fn replace(&mut self, create: impl FnOnce() -> T) -> &mut T {
    self.value = None;
    self.value.insert(create())
  }

  /// Fallible [`Slot::replace`]. If `create` fails the slot stays empty.
  pub fn try_replace<E>(&mut self, create: impl FnOnce() -> Result<T, E>) -> Result<&mut T, E> {
    self.value = None;
    let value = create()?;
    Ok(self.value.insert(value))
  }

  pub fn get(&self) -> Option<&T> {
    self.value.as_ref()
  }

  pub fn get_mut(&mut self) -> Option<&mut T> {
    self.value.as_mut()
  }

  pub fn take(&mut self) -> Option<T> {
    self.value.take()
  }

  /// Release the current value, if any.
  pub fn clear(&mut self) {
    self.value = None;
  }

  pub fn is_occupied(&self) -> bool {
    self.value.is_some()
  }
}

impl<T> Default for Slot<T> {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_test;
