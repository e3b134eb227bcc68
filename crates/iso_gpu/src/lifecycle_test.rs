use super::*;

/// Stand-in for a GPU buffer: registers itself on creation.
struct FakeBuffer {
  _entry: LedgerEntry,
  generation: u32,
}

fn fake(ledger: &ResourceLedger, bytes: u64, generation: u32) -> FakeBuffer {
  FakeBuffer {
    _entry: ledger.acquire(bytes),
    generation,
  }
}

#[test]
fn test_ledger_tracks_live_allocations() {
  let ledger = ResourceLedger::new();
  let a = ledger.acquire(100);
  let b = ledger.acquire(28);
  assert_eq!(ledger.live(), 2);
  assert_eq!(ledger.live_bytes(), 128);

  drop(a);
  assert_eq!(ledger.live(), 1);
  assert_eq!(ledger.live_bytes(), 28);

  drop(b);
  assert_eq!(ledger.live(), 0);
  assert_eq!(ledger.live_bytes(), 0);
}

#[test]
fn test_slot_releases_before_create() {
  let ledger = ResourceLedger::new();
  let mut slot = Slot::empty();
  slot.replace(|| fake(&ledger, 64, 0));

  let mut live_during_create = usize::MAX;
  let replaced = slot
    .try_replace(|| {
      live_during_create = ledger.live();
      Ok::<_, ()>(fake(&ledger, 64, 1))
    })
    .unwrap();
  assert_eq!(replaced.generation, 1);
  assert_eq!(
    live_during_create, 0,
    "Old value must be released before creating the new one"
  );
  assert_eq!(ledger.live(), 1);
}

#[test]
fn test_slot_failed_create_leaves_empty() {
  let ledger = ResourceLedger::new();
  let mut slot = Slot::empty();
  slot.replace(|| fake(&ledger, 8, 0));

  let result = slot.try_replace(|| Err::<FakeBuffer, _>("out of memory"));
  assert_eq!(result.err(), Some("out of memory"));
  assert!(!slot.is_occupied());
  assert_eq!(ledger.live(), 0, "Old value released even when the replacement fails");
}

#[test]
fn test_repeated_replacement_never_accumulates() {
  let ledger = ResourceLedger::new();
  let mut slot = Slot::empty();
  for generation in 0..16 {
    slot.replace(|| fake(&ledger, 32, generation));
    assert_eq!(ledger.live(), 1);
  }
  slot.clear();
  assert_eq!(ledger.live(), 0);
}

#[test]
fn test_take_transfers_ownership() {
  let ledger = ResourceLedger::new();
  let mut slot = Slot::empty();
  slot.replace(|| fake(&ledger, 4, 3));

  let taken = slot.take().unwrap();
  assert!(!slot.is_occupied());
  assert_eq!(ledger.live(), 1, "Taken value still owns its allocation");
  drop(taken);
  assert_eq!(ledger.live(), 0);
}
