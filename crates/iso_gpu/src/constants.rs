//! Buffer layout and dispatch constants.
//!
//! # Buffer Budget
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  voxels      = X · Y · Z                                         │
//! │  triangles   = voxels · MAX_TRIANGLES_PER_CELL        (budget)   │
//! │  vertices    = triangles · VERTICES_PER_TRIANGLE     (capacity)  │
//! │  indices     = vertices                         (triangle soup)  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  field bytes    = voxels   · FIELD_SAMPLE_STRIDE                 │
//! │  vertex bytes   = vertices · VERTEX_STRIDE                       │
//! │  index bytes    = vertices · INDEX_STRIDE                        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The budget counts one cell per voxel even though the last slice on each
//! axis has no cube to march; the over-allocation keeps the formula simple.
//!
//! # Field Layout
//!
//! ```text
//! index = (z · Y + y) · X + x        (X innermost)
//! ```

/// Worst-case triangles emitted by a single marching cubes cell.
pub const MAX_TRIANGLES_PER_CELL: u64 = 5;

/// Unindexed triangle soup: every triangle owns three vertices.
pub const VERTICES_PER_TRIANGLE: u64 = 3;

/// Bytes per vertex (position f32×3 + normal f32×3).
pub const VERTEX_STRIDE: u64 = 24;

/// Floats per vertex as laid out in the raw vertex buffer.
pub const VERTEX_FLOATS: u64 = VERTEX_STRIDE / 4;

/// Bytes per index (u32).
pub const INDEX_STRIDE: u64 = 4;

/// Bytes per scalar field sample (f32).
pub const FIELD_SAMPLE_STRIDE: u64 = 4;

/// Bytes per GPU counter (atomic u32).
pub const COUNTER_STRIDE: u64 = 4;

/// Counter stage payload: emitted counter followed by the reservation counter.
pub const COUNTER_READBACK_BYTES: u64 = 2 * COUNTER_STRIDE;

/// Workgroups launched by the compaction pass.
pub const COMPACT_WORKGROUPS: u32 = 1024;

/// Invocations per compaction workgroup (must match `compact` in the shader).
pub const COMPACT_WORKGROUP_SIZE: u32 = 64;

/// Linear field index for a voxel coordinate.
#[inline(always)]
pub fn voxel_index(x: u32, y: u32, z: u32, dims: [u32; 3]) -> usize {
  ((z as usize * dims[1] as usize + y as usize) * dims[0] as usize) + x as usize
}

/// Inverse of [`voxel_index`].
#[inline(always)]
pub fn index_to_voxel(index: usize, dims: [u32; 3]) -> (u32, u32, u32) {
  let x = index % dims[0] as usize;
  let rest = index / dims[0] as usize;
  let y = rest % dims[1] as usize;
  let z = rest / dims[1] as usize;
  (x as u32, y as u32, z as u32)
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
