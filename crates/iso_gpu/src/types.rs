//! Core data types for GPU isosurface extraction.

use bytemuck::{Pod, Zeroable};
use glam::UVec3;

use crate::constants::{
  FIELD_SAMPLE_STRIDE, INDEX_STRIDE, MAX_TRIANGLES_PER_CELL, VERTEX_STRIDE, VERTICES_PER_TRIANGLE,
};
use crate::error::GridError;

/// Grid dimensions in voxels. Every axis is at least 1.
///
/// Only constructible through [`GridSize::new`], which rejects non-positive
/// values before anything touches the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSize {
  x: u32,
  y: u32,
  z: u32,
}

impl GridSize {
  /// Validate signed dimensions as handed over by editors and config files.
  pub fn new(x: i32, y: i32, z: i32) -> Result<Self, GridError> {
    for (axis, value) in [('x', x), ('y', y), ('z', z)] {
      if value <= 0 {
        return Err(GridError::NonPositiveDimension { axis, value });
      }
    }
    Ok(Self {
      x: x as u32,
      y: y as u32,
      z: z as u32,
    })
  }

  /// Cubic grid with `n` voxels per axis.
  pub fn cube(n: i32) -> Result<Self, GridError> {
    Self::new(n, n, n)
  }

  #[inline]
  pub fn x(&self) -> u32 {
    self.x
  }

  #[inline]
  pub fn y(&self) -> u32 {
    self.y
  }

  #[inline]
  pub fn z(&self) -> u32 {
    self.z
  }

  #[inline]
  pub fn dims(&self) -> [u32; 3] {
    [self.x, self.y, self.z]
  }

  #[inline]
  pub fn as_uvec3(&self) -> UVec3 {
    UVec3::new(self.x, self.y, self.z)
  }

  /// X·Y·Z.
  #[inline]
  pub fn voxel_count(&self) -> u64 {
    self.x as u64 * self.y as u64 * self.z as u64
  }

  /// Grid center in voxel coordinates, integer-divided per axis.
  #[inline]
  pub fn center(&self) -> UVec3 {
    self.as_uvec3() / 2
  }

  /// Bytes needed for the scalar field.
  pub fn field_bytes(&self) -> u64 {
    self.voxel_count() * FIELD_SAMPLE_STRIDE
  }

  /// Worst-case triangle budget for this grid.
  ///
  /// Fails when the vertex capacity would not be addressable by `u32`
  /// indices and counters.
  pub fn triangle_budget(&self) -> Result<TriangleBudget, GridError> {
    let voxels = self.voxel_count();
    let triangles = voxels * MAX_TRIANGLES_PER_CELL;
    if triangles * VERTICES_PER_TRIANGLE > u32::MAX as u64 {
      return Err(GridError::BudgetOverflow { voxels });
    }
    Ok(TriangleBudget {
      triangles: triangles as u32,
    })
  }
}

impl Default for GridSize {
  fn default() -> Self {
    Self { x: 8, y: 8, z: 8 }
  }
}

impl std::fmt::Display for GridSize {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}x{}x{}", self.x, self.y, self.z)
  }
}

/// Per-generation configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSettings {
  /// Grid dimensions in voxels.
  pub grid_size: GridSize,

  /// Threshold the surface is extracted at.
  pub iso_surface: f32,

  /// Reverse triangle winding and negate normals.
  pub invert_normals: bool,
}

impl Default for GridSettings {
  fn default() -> Self {
    Self {
      grid_size: GridSize::default(),
      iso_surface: 0.0,
      invert_normals: false,
    }
  }
}

/// Static worst-case sizing of the mesh buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriangleBudget {
  triangles: u32,
}

impl TriangleBudget {
  /// Maximum triangles the buffers can hold.
  #[inline]
  pub fn triangles(&self) -> u32 {
    self.triangles
  }

  /// Vertex (and index) capacity: 3 per triangle.
  #[inline]
  pub fn vertex_capacity(&self) -> u64 {
    self.triangles as u64 * VERTICES_PER_TRIANGLE
  }

  pub fn vertex_bytes(&self) -> u64 {
    self.vertex_capacity() * VERTEX_STRIDE
  }

  pub fn index_bytes(&self) -> u64 {
    self.vertex_capacity() * INDEX_STRIDE
  }
}

/// Host view of the GPU emitted-triangle counter.
///
/// The kernel increments once per *triangle*; vertex and index counts are
/// derived here and nowhere else.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TriangleCount(pub u32);

impl TriangleCount {
  #[inline]
  pub fn triangles(&self) -> u32 {
    self.0
  }

  /// Emitted vertices (= emitted indices).
  #[inline]
  pub fn vertex_count(&self) -> u64 {
    self.0 as u64 * VERTICES_PER_TRIANGLE
  }

  #[inline]
  pub fn index_count(&self) -> u64 {
    self.vertex_count()
  }

  pub fn vertex_bytes(&self) -> u64 {
    self.vertex_count() * VERTEX_STRIDE
  }

  pub fn index_bytes(&self) -> u64 {
    self.index_count() * INDEX_STRIDE
  }

  pub fn is_empty(&self) -> bool {
    self.0 == 0
  }
}

/// Mesh vertex as written by the reconstruction kernel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
  /// Position in grid units; world scale comes from the owner's transform.
  pub position: [f32; 3],

  /// Outward surface normal (unit vector, or zero on a flat gradient).
  pub normal: [f32; 3],
}

impl Vertex {
  const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

  /// Layout for binding the render mesh vertex buffer in a render pipeline.
  pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &Self::ATTRIBUTES,
    }
  }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Fixed bounds of both meshes; scale is applied by the owner's transform.
  pub const UNIT_CUBE: Self = Self {
    min: [0.0; 3],
    max: [1.0; 3],
  };
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::UNIT_CUBE
  }
}

/// Uniform block shared by both kernels. Layout mirrors `Params` in
/// `marching_cubes.wgsl` (32 bytes, 16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ExtractParams {
  pub grid_size: [u32; 3],
  pub max_triangles: u32,
  pub iso_surface: f32,
  pub invert_normals: u32,
  pub vertex_capacity: u32,
  pub _pad: u32,
}

impl ExtractParams {
  pub fn new(settings: &GridSettings, budget: TriangleBudget) -> Self {
    Self {
      grid_size: settings.grid_size.dims(),
      max_triangles: budget.triangles(),
      iso_surface: settings.iso_surface,
      invert_normals: settings.invert_normals as u32,
      vertex_capacity: budget.vertex_capacity() as u32,
      _pad: 0,
    }
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
