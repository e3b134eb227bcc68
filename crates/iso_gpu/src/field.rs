//! Scalar field generation.
//!
//! The field is a dense `f32` array, one sample per voxel, positive inside
//! the surface. Shapes are pluggable through [`FieldShape`]; the grid only
//! cares about the resulting samples.

use glam::UVec3;
use rayon::prelude::*;

use crate::constants::voxel_index;
use crate::error::GridError;
use crate::types::GridSize;

/// Density source for a grid.
///
/// `density` must be deterministic: regenerating the same grid twice has to
/// produce identical fields.
pub trait FieldShape: Send + Sync {
  /// Signed density at a voxel. Positive = inside.
  fn density(&self, voxel: UVec3, grid: GridSize) -> f32;
}

/// Sphere centered on the grid (integer-divided center).
///
/// Density = `radius - distance(center, voxel)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereShape {
  pub radius: f32,
}

impl SphereShape {
  pub fn new(radius: f32) -> Self {
    Self { radius }
  }
}

impl Default for SphereShape {
  fn default() -> Self {
    Self { radius: 3.0 }
  }
}

impl FieldShape for SphereShape {
  #[inline]
  fn density(&self, voxel: UVec3, grid: GridSize) -> f32 {
    self.radius - grid.center().as_vec3().distance(voxel.as_vec3())
  }
}

/// Same value everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantShape(pub f32);

impl FieldShape for ConstantShape {
  #[inline]
  fn density(&self, _voxel: UVec3, _grid: GridSize) -> f32 {
    self.0
  }
}

/// Axis-aligned half space: inside below `height` on Y.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneShape {
  pub height: f32,
}

impl FieldShape for PlaneShape {
  #[inline]
  fn density(&self, voxel: UVec3, _grid: GridSize) -> f32 {
    self.height - voxel.y as f32
  }
}

/// Dense host-side scalar field.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
  grid: GridSize,
  values: Vec<f32>,
}

impl ScalarField {
  /// Fill a field from a shape. Z slices are filled in parallel.
  #[tracing::instrument(level = "debug", skip_all, fields(grid = %grid))]
  pub fn generate<S: FieldShape + ?Sized>(grid: GridSize, shape: &S) -> Self {
    let [nx, ny, _] = grid.dims();
    let slice_len = nx as usize * ny as usize;
    let mut values = vec![0.0f32; grid.voxel_count() as usize];

    values
      .par_chunks_mut(slice_len)
      .enumerate()
      .for_each(|(z, slice)| {
        for y in 0..ny {
          for x in 0..nx {
            let local = (y * nx + x) as usize;
            slice[local] = shape.density(UVec3::new(x, y, z as u32), grid);
          }
        }
      });

    Self { grid, values }
  }

  /// Wrap externally authored samples.
  pub fn from_values(grid: GridSize, values: Vec<f32>) -> Result<Self, GridError> {
    let expected = grid.voxel_count() as usize;
    if values.len() != expected {
      return Err(GridError::FieldLength {
        expected,
        actual: values.len(),
      });
    }
    Ok(Self { grid, values })
  }

  #[inline]
  pub fn grid(&self) -> GridSize {
    self.grid
  }

  #[inline]
  pub fn values(&self) -> &[f32] {
    &self.values
  }

  /// Sample at a voxel coordinate.
  #[inline]
  pub fn sample(&self, x: u32, y: u32, z: u32) -> f32 {
    self.values[voxel_index(x, y, z, self.grid.dims())]
  }

  /// Raw bytes for GPU upload.
  pub fn as_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.values)
  }

  /// Smallest and largest sample.
  pub fn range(&self) -> (f32, f32) {
    self
      .values
      .iter()
      .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
      })
  }

  /// True when every sample is on one side of `iso_surface`, in which case
  /// extraction yields nothing.
  pub fn is_homogeneous(&self, iso_surface: f32) -> bool {
    let (lo, hi) = self.range();
    lo >= iso_surface || hi < iso_surface
  }
}

#[cfg(test)]
#[path = "field_test.rs"]
mod field_test;
