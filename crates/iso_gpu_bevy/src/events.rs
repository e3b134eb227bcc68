//! Grid events.

use bevy::prelude::*;
use iso_gpu::ReadbackError;

/// Cancel any in-flight readback for `entity` and start a new one.
#[derive(Event, Clone, Copy, Debug)]
pub struct RequestCollisionMesh {
  pub entity: Entity,
}

/// A collision readback finished and its collider was installed.
#[derive(Event, Clone, Copy, Debug)]
pub struct CollisionMeshReady {
  pub entity: Entity,
  pub triangles: usize,
}

/// A collision readback aborted; the previous collider stays.
#[derive(Event, Clone, Debug)]
pub struct CollisionMeshFailed {
  pub entity: Entity,
  pub error: ReadbackError,
}
