//! Render and collision mesh allocation.
//!
//! Both meshes share one layout (position f32×3 + normal f32×3, u32 index)
//! and one worst-case budget. The render mesh lives on the GPU only, in raw
//! storage buffers the reconstruction kernel writes directly and the
//! renderer binds as vertex/index buffers. The collision mesh is host memory
//! filled later by the readback.

use crate::error::GridError;
use crate::gpu::{GpuContext, OwnedBuffer};
use crate::mesh::CollisionMesh;
use crate::types::{MinMaxAABB, TriangleBudget, Vertex};

/// Draw range of a mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMesh {
  pub index_start: u32,
  pub index_count: u32,
  pub topology: wgpu::PrimitiveTopology,
}

/// GPU-resident render mesh.
///
/// The single submesh spans the whole index capacity; the compaction pass
/// zeroes the unused tail, so the surplus collapses to degenerate triangles.
#[derive(Debug)]
pub struct RenderMesh {
  vertices: OwnedBuffer,
  indices: OwnedBuffer,
  submesh: SubMesh,
  bounds: MinMaxAABB,
  budget: TriangleBudget,
}

impl RenderMesh {
  pub fn vertex_buffer(&self) -> &OwnedBuffer {
    &self.vertices
  }

  pub fn index_buffer(&self) -> &OwnedBuffer {
    &self.indices
  }

  pub fn index_format(&self) -> wgpu::IndexFormat {
    wgpu::IndexFormat::Uint32
  }

  pub fn vertex_layout(&self) -> wgpu::VertexBufferLayout<'static> {
    Vertex::buffer_layout()
  }

  pub fn submesh(&self) -> SubMesh {
    self.submesh
  }

  pub fn bounds(&self) -> MinMaxAABB {
    self.bounds
  }

  pub fn budget(&self) -> TriangleBudget {
    self.budget
  }
}

/// Render mesh plus the collision mesh sized for the same budget.
#[derive(Debug)]
pub struct MeshBufferSet {
  pub render: RenderMesh,
  pub collider: CollisionMesh,
}

impl MeshBufferSet {
  /// Allocate both meshes for `budget`. Sizes are validated against device
  /// limits before anything is created.
  pub fn allocate(ctx: &GpuContext, budget: TriangleBudget) -> Result<Self, GridError> {
    check_mesh_limits(&ctx.limits(), budget)?;

    let vertices = ctx.create_buffer(
      "iso_gpu.render.vertices",
      budget.vertex_bytes(),
      wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_SRC,
    );
    let indices = ctx.create_buffer(
      "iso_gpu.render.indices",
      budget.index_bytes(),
      wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_SRC,
    );

    tracing::debug!(
      triangles = budget.triangles(),
      vertex_bytes = budget.vertex_bytes(),
      index_bytes = budget.index_bytes(),
      "mesh buffers allocated"
    );

    Ok(Self {
      render: RenderMesh {
        vertices,
        indices,
        submesh: SubMesh {
          index_start: 0,
          index_count: budget.vertex_capacity() as u32,
          topology: wgpu::PrimitiveTopology::TriangleList,
        },
        bounds: MinMaxAABB::UNIT_CUBE,
        budget,
      },
      collider: CollisionMesh::with_budget(budget),
    })
  }

  pub fn budget(&self) -> TriangleBudget {
    self.render.budget
  }
}

/// Reject a budget whose vertex or index buffer exceeds device limits.
pub(crate) fn check_mesh_limits(
  limits: &wgpu::Limits,
  budget: TriangleBudget,
) -> Result<(), GridError> {
  check_storage_size(limits, "vertex buffer", budget.vertex_bytes())?;
  check_storage_size(limits, "index buffer", budget.index_bytes())
}

/// Reject a storage buffer the device cannot create or bind.
pub(crate) fn check_storage_size(
  limits: &wgpu::Limits,
  label: &'static str,
  bytes: u64,
) -> Result<(), GridError> {
  let limit = limits
    .max_buffer_size
    .min(limits.max_storage_buffer_binding_size as u64);
  if bytes > limit {
    return Err(GridError::BufferTooLarge {
      label,
      bytes,
      limit,
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::GridSize;

  #[test]
  fn storage_size_within_limits() {
    let limits = wgpu::Limits::default();
    assert!(check_storage_size(&limits, "field", 1024).is_ok());
  }

  #[test]
  fn storage_size_over_binding_limit() {
    let limits = wgpu::Limits::default();
    let bytes = limits.max_storage_buffer_binding_size as u64 + 4;
    assert!(matches!(
      check_storage_size(&limits, "vertex buffer", bytes),
      Err(GridError::BufferTooLarge {
        label: "vertex buffer",
        ..
      })
    ));
  }

  #[test]
  fn mesh_limits_checked_before_field_limits() {
    // A 16³ field is 16 KiB, its vertex buffer 1.4 MiB.
    let limits = wgpu::Limits {
      max_storage_buffer_binding_size: 1 << 20,
      ..wgpu::Limits::default()
    };
    let grid = GridSize::cube(16).unwrap();
    assert!(check_storage_size(&limits, "scalar field", grid.field_bytes()).is_ok());

    let budget = grid.triangle_budget().unwrap();
    assert!(matches!(
      check_mesh_limits(&limits, budget),
      Err(GridError::BufferTooLarge {
        label: "vertex buffer",
        ..
      })
    ));
    let small = GridSize::cube(4).unwrap().triangle_budget().unwrap();
    assert!(check_mesh_limits(&limits, small).is_ok());
  }
}
