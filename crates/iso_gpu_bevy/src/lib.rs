//! Bevy bridge for iso_gpu.
//!
//! Grids are entities carrying an [`IsoSurfaceGrid`] settings component.
//! Adding or changing it regenerates the field and GPU mesh, then restarts
//! the collision readback; finished readbacks become avian3d trimesh
//! colliders on the same entity.

pub mod collider;
pub mod components;
pub mod events;
pub mod resources;
pub mod systems;

use bevy::prelude::*;
pub use components::*;
pub use events::*;
pub use resources::*;

/// Bevy plugin for GPU isosurface grids.
#[derive(Default)]
pub struct IsoGpuPlugin {
  /// Headless device configuration used at startup.
  pub context: iso_gpu::ContextConfig,
}

impl Plugin for IsoGpuPlugin {
  fn build(&self, app: &mut App) {
    app
      .insert_resource(MeshingSettings {
        context: self.context.clone(),
        ..Default::default()
      })
      .add_event::<RequestCollisionMesh>()
      .add_event::<CollisionMeshReady>()
      .add_event::<CollisionMeshFailed>()
      .add_systems(Startup, systems::setup_meshing_context)
      .add_systems(
        Update,
        (
          systems::regenerate_changed_grids,
          systems::handle_collision_requests,
          systems::poll_collision_readbacks,
          systems::update_preview_meshes,
        )
          .chain(),
      );
  }
}
