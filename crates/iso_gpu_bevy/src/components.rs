//! Bevy components for isosurface grids.

use bevy::prelude::*;
use iso_gpu::{GridError, GridSettings, GridSize, IsoGrid};

/// Authoring settings of a grid entity.
///
/// The field is a sphere centered in the grid; mesh positions are in voxel
/// units, so the entity's `Transform` scale sets the world size.
///
/// # Example
/// ```ignore
/// commands.spawn((
///     IsoSurfaceGrid::default(),
///     IsoPreviewMesh,
///     Transform::from_scale(Vec3::splat(0.5)),
/// ));
/// ```
#[derive(Component, Clone, Debug, PartialEq)]
pub struct IsoSurfaceGrid {
  /// Voxels per axis. Non-positive values are rejected at regeneration.
  pub grid_size: IVec3,
  pub sphere_radius: f32,
  pub iso_surface: f32,
  pub invert_normals: bool,
  /// Start a collision readback after every regeneration.
  pub auto_collider: bool,
}

impl Default for IsoSurfaceGrid {
  fn default() -> Self {
    Self {
      grid_size: IVec3::splat(16),
      sphere_radius: 6.0,
      iso_surface: 0.0,
      invert_normals: false,
      auto_collider: true,
    }
  }
}

impl IsoSurfaceGrid {
  /// Validate into core settings.
  pub fn to_settings(&self) -> Result<GridSettings, GridError> {
    Ok(GridSettings {
      grid_size: GridSize::new(self.grid_size.x, self.grid_size.y, self.grid_size.z)?,
      iso_surface: self.iso_surface,
      invert_normals: self.invert_normals,
    })
  }
}

/// GPU state of a grid entity, inserted on first regeneration.
#[derive(Component)]
pub struct IsoGridState {
  pub grid: IsoGrid,
  /// Sphere radius the current field was generated with.
  pub field_radius: Option<f32>,
}

impl IsoGridState {
  pub fn new(grid: IsoGrid) -> Self {
    Self {
      grid,
      field_radius: None,
    }
  }

  /// True when the field must be regenerated for `authoring`, as opposed to
  /// only re-extracting with a new threshold or winding.
  pub fn needs_field(&self, authoring: &IsoSurfaceGrid, settings: &GridSettings) -> bool {
    let field_grid = self.grid.field().map(|f| f.grid());
    field_grid != Some(settings.grid_size) || self.field_radius != Some(authoring.sphere_radius)
  }
}

/// Marker: mirror each installed collision mesh into a Bevy mesh for
/// on-screen inspection.
#[derive(Component, Default)]
pub struct IsoPreviewMesh;

/// Collision mesh generation counter, bumped on every installation.
#[derive(Component, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionRevision(pub u32);

#[cfg(test)]
#[path = "components_test.rs"]
mod components_test;
