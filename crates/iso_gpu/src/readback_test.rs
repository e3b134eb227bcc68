use std::collections::HashMap;

use super::*;
use crate::types::GridSize;

/// Scripted response for one stage.
#[derive(Clone)]
struct Script {
  polls_until_ready: u32,
  result: Result<Vec<u8>, DeviceFailure>,
}

/// Fake device: answers each stage from a script after a number of polls.
#[derive(Default)]
struct ScriptedDevice {
  scripts: HashMap<ReadbackStage, Script>,
  pending: HashMap<RequestId, (ReadbackStage, u32)>,
  issued: Vec<(ReadbackStage, u64)>,
  discarded: Vec<RequestId>,
  next_id: u64,
  refuse_requests: bool,
}

impl ScriptedDevice {
  fn respond(mut self, stage: ReadbackStage, polls: u32, bytes: Vec<u8>) -> Self {
    self.scripts.insert(
      stage,
      Script {
        polls_until_ready: polls,
        result: Ok(bytes),
      },
    );
    self
  }

  fn fail(mut self, stage: ReadbackStage, message: &str) -> Self {
    self.scripts.insert(
      stage,
      Script {
        polls_until_ready: 0,
        result: Err(DeviceFailure(message.to_string())),
      },
    );
    self
  }

  fn stages_issued(&self) -> Vec<ReadbackStage> {
    self.issued.iter().map(|(s, _)| *s).collect()
  }
}

impl ReadbackDevice for ScriptedDevice {
  fn request(&mut self, stage: ReadbackStage, byte_len: u64) -> Result<RequestId, DeviceFailure> {
    if self.refuse_requests {
      return Err(DeviceFailure("device lost".into()));
    }
    assert!(byte_len > 0, "Zero-length ranges must not reach the device");
    assert!(
      self.pending.is_empty(),
      "Stage {} issued while another request is outstanding",
      stage
    );
    let id = RequestId(self.next_id);
    self.next_id += 1;
    self.issued.push((stage, byte_len));
    self.pending.insert(id, (stage, 0));
    Ok(id)
  }

  fn poll_request(&mut self, id: RequestId) -> Option<Result<Vec<u8>, DeviceFailure>> {
    let (stage, polls) = self.pending.get_mut(&id)?;
    let script = self.scripts.get(stage).cloned()?;
    if *polls < script.polls_until_ready {
      *polls += 1;
      return None;
    }
    self.pending.remove(&id);
    Some(script.result)
  }

  fn discard(&mut self, id: RequestId) {
    self.pending.remove(&id);
    self.discarded.push(id);
  }
}

fn counters(emitted: u32, reserved: u32) -> Vec<u8> {
  bytemuck::cast_slice(&[emitted, reserved]).to_vec()
}

fn triangle_payload(triangles: u32) -> (Vec<u8>, Vec<u8>) {
  let vertices: Vec<Vertex> = (0..triangles * 3)
    .map(|i| Vertex {
      position: [i as f32, 0.0, 0.0],
      normal: [0.0, 1.0, 0.0],
    })
    .collect();
  let indices: Vec<u32> = (0..triangles * 3).collect();
  (
    bytemuck::cast_slice(&vertices).to_vec(),
    bytemuck::cast_slice(&indices).to_vec(),
  )
}

fn budget() -> TriangleBudget {
  GridSize::cube(2).unwrap().triangle_budget().unwrap()
}

fn drive(readback: &mut CollisionReadback, device: &mut ScriptedDevice) -> ReadbackPoll {
  for _ in 0..64 {
    match readback.poll(device) {
      ReadbackPoll::Pending(_) => continue,
      other => return other,
    }
  }
  panic!("Readback did not settle");
}

#[test]
fn test_three_stages_in_order() {
  let (vertex_bytes, index_bytes) = triangle_payload(2);
  let mut device = ScriptedDevice::default()
    .respond(ReadbackStage::Counter, 1, counters(2, 2))
    .respond(ReadbackStage::Vertices, 2, vertex_bytes)
    .respond(ReadbackStage::Indices, 1, index_bytes);
  let mut readback = CollisionReadback::default();

  readback.start(&mut device, budget()).unwrap();
  let ReadbackPoll::Ready(mesh) = drive(&mut readback, &mut device) else {
    panic!("Expected a collision mesh");
  };

  assert_eq!(
    device.stages_issued(),
    vec![
      ReadbackStage::Counter,
      ReadbackStage::Vertices,
      ReadbackStage::Indices
    ]
  );
  assert_eq!(device.issued[0].1, 8, "Counter stage reads both counters");
  assert_eq!(device.issued[1].1, 6 * 24, "Vertex stage reads counter×3 vertices");
  assert_eq!(device.issued[2].1, 6 * 4, "Index stage reads counter×3 indices");
  assert_eq!(mesh.vertices.len(), 6);
  assert_eq!(mesh.triangle_count(), 2);
  assert_eq!(mesh.triangles()[1], [3, 4, 5]);
  assert_eq!(mesh.vertex_capacity(), budget().vertex_capacity());
  assert!(!readback.is_busy());
}

#[test]
fn test_pending_reports_current_stage() {
  let mut device = ScriptedDevice::default().respond(ReadbackStage::Counter, 3, counters(0, 0));
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  assert_eq!(
    readback.poll(&mut device),
    ReadbackPoll::Pending(ReadbackStage::Counter)
  );
  assert_eq!(readback.stage(), Some(ReadbackStage::Counter));
}

#[test]
fn test_zero_triangles_skip_device_copies() {
  let mut device = ScriptedDevice::default().respond(ReadbackStage::Counter, 0, counters(0, 0));
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  let ReadbackPoll::Ready(mesh) = readback.poll(&mut device) else {
    panic!("Zero-length stages should resolve in the same poll");
  };
  assert!(mesh.is_empty());
  assert!(mesh.vertices.is_empty());
  assert_eq!(device.stages_issued(), vec![ReadbackStage::Counter]);
}

#[test]
fn test_counter_failure_aborts_before_vertices() {
  let mut device = ScriptedDevice::default().fail(ReadbackStage::Counter, "map failed");
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  assert_eq!(
    drive(&mut readback, &mut device),
    ReadbackPoll::Failed(ReadbackError::Device {
      stage: ReadbackStage::Counter,
      message: "map failed".into()
    })
  );
  assert_eq!(device.stages_issued(), vec![ReadbackStage::Counter]);
  assert!(!readback.is_busy());
}

#[test]
fn test_vertex_failure_aborts_before_indices() {
  let mut device = ScriptedDevice::default()
    .respond(ReadbackStage::Counter, 0, counters(1, 1))
    .fail(ReadbackStage::Vertices, "device lost");
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  let result = drive(&mut readback, &mut device);
  assert!(matches!(
    result,
    ReadbackPoll::Failed(ReadbackError::Device {
      stage: ReadbackStage::Vertices,
      ..
    })
  ));
  assert!(!device.stages_issued().contains(&ReadbackStage::Indices));
}

#[test]
fn test_index_failure_produces_no_mesh() {
  let (vertex_bytes, _) = triangle_payload(1);
  let mut device = ScriptedDevice::default()
    .respond(ReadbackStage::Counter, 0, counters(1, 1))
    .respond(ReadbackStage::Vertices, 0, vertex_bytes)
    .fail(ReadbackStage::Indices, "timeout");
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  assert!(matches!(
    drive(&mut readback, &mut device),
    ReadbackPoll::Failed(ReadbackError::Device {
      stage: ReadbackStage::Indices,
      ..
    })
  ));
}

#[test]
fn test_reservation_beyond_budget_is_exhaustion() {
  let capacity = budget().triangles();
  let mut device =
    ScriptedDevice::default().respond(ReadbackStage::Counter, 0, counters(capacity, capacity + 7));
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  assert_eq!(
    readback.poll(&mut device),
    ReadbackPoll::Failed(ReadbackError::ResourceExhaustion {
      requested: capacity as u64 + 7,
      capacity: capacity as u64
    })
  );
  assert_eq!(device.stages_issued(), vec![ReadbackStage::Counter]);
}

#[test]
fn test_short_payload_is_truncated() {
  let (vertex_bytes, _) = triangle_payload(1);
  let mut device = ScriptedDevice::default()
    .respond(ReadbackStage::Counter, 0, counters(2, 2))
    .respond(ReadbackStage::Vertices, 0, vertex_bytes);
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  assert_eq!(
    drive(&mut readback, &mut device),
    ReadbackPoll::Failed(ReadbackError::Truncated {
      stage: ReadbackStage::Vertices,
      expected: 6 * 24,
      actual: 3 * 24
    })
  );
}

#[test]
fn test_overlapping_start_rejected() {
  let mut device = ScriptedDevice::default().respond(ReadbackStage::Counter, 10, counters(0, 0));
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  assert_eq!(
    readback.start(&mut device, budget()).err(),
    Some(ReadbackError::InFlight)
  );
  assert_eq!(device.issued.len(), 1, "Rejected start must not issue anything");
}

#[test]
fn test_cancel_discards_request_and_allows_restart() {
  let mut device = ScriptedDevice::default().respond(ReadbackStage::Counter, 10, counters(0, 0));
  let mut readback = CollisionReadback::default();
  readback.start(&mut device, budget()).unwrap();

  readback.cancel(&mut device);
  assert!(!readback.is_busy());
  assert_eq!(device.discarded, vec![RequestId(0)]);
  assert_eq!(readback.poll(&mut device), ReadbackPoll::Idle);
  assert!(readback.start(&mut device, budget()).is_ok());
}

#[test]
fn test_token_cancellation_observed_on_poll() {
  let mut device = ScriptedDevice::default().respond(ReadbackStage::Counter, 10, counters(0, 0));
  let mut readback = CollisionReadback::default();
  let token = readback.start(&mut device, budget()).unwrap();

  token.cancel();
  assert_eq!(
    readback.poll(&mut device),
    ReadbackPoll::Failed(ReadbackError::Cancelled {
      stage: ReadbackStage::Counter
    })
  );
  assert_eq!(device.discarded.len(), 1);
  assert!(!readback.is_busy());
}

#[test]
fn test_stalled_stage_times_out() {
  let mut device = ScriptedDevice::default().respond(ReadbackStage::Counter, u32::MAX, counters(0, 0));
  let mut readback = CollisionReadback::new(ReadbackConfig {
    stage_timeout: Some(Duration::ZERO),
  });
  readback.start(&mut device, budget()).unwrap();
  std::thread::sleep(Duration::from_millis(2));

  assert!(matches!(
    readback.poll(&mut device),
    ReadbackPoll::Failed(ReadbackError::Timeout {
      stage: ReadbackStage::Counter,
      ..
    })
  ));
  assert_eq!(device.discarded.len(), 1);
}

#[test]
fn test_refused_request_fails_start() {
  let mut device = ScriptedDevice {
    refuse_requests: true,
    ..Default::default()
  };
  let mut readback = CollisionReadback::default();

  assert!(matches!(
    readback.start(&mut device, budget()),
    Err(ReadbackError::Device {
      stage: ReadbackStage::Counter,
      ..
    })
  ));
  assert!(!readback.is_busy());
}

#[test]
fn test_idle_when_never_started() {
  let mut device = ScriptedDevice::default();
  let mut readback = CollisionReadback::default();
  assert_eq!(readback.poll(&mut device), ReadbackPoll::Idle);
}
