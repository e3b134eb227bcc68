//! Host-side mesh outputs.

use crate::types::{MinMaxAABB, TriangleBudget, Vertex};

/// Collision geometry pulled back from the GPU.
///
/// Sized for the same budget as the render mesh; populated only by a
/// successful collision readback.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionMesh {
  /// Emitted vertices, three per triangle.
  pub vertices: Vec<Vertex>,

  /// Flat triangle list (3 indices per triangle).
  pub indices: Vec<u32>,

  /// Fixed bounds; scale comes from the owner's transform.
  pub bounds: MinMaxAABB,

  vertex_capacity: u64,
}

impl CollisionMesh {
  /// Empty mesh with room for `budget`.
  pub fn with_budget(budget: TriangleBudget) -> Self {
    Self {
      vertices: Vec::new(),
      indices: Vec::new(),
      bounds: MinMaxAABB::UNIT_CUBE,
      vertex_capacity: budget.vertex_capacity(),
    }
  }

  pub(crate) fn from_parts(vertices: Vec<Vertex>, indices: Vec<u32>, vertex_capacity: u64) -> Self {
    Self {
      vertices,
      indices,
      bounds: MinMaxAABB::UNIT_CUBE,
      vertex_capacity,
    }
  }

  pub fn vertex_capacity(&self) -> u64 {
    self.vertex_capacity
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Vertex positions, for physics backends that ignore normals.
  pub fn positions(&self) -> Vec<[f32; 3]> {
    self.vertices.iter().map(|v| v.position).collect()
  }

  /// Index list grouped into triangles.
  pub fn triangles(&self) -> Vec<[u32; 3]> {
    self
      .indices
      .chunks_exact(3)
      .map(|t| [t[0], t[1], t[2]])
      .collect()
  }
}
