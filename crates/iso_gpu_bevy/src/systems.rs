//! Grid regeneration and collision readback systems.

use std::sync::Arc;

use avian3d::prelude::Collider;
use bevy::prelude::*;
use iso_gpu::{GpuContext, IsoGrid, ReadbackPoll, SphereShape, SurfaceExtractor};

use crate::collider::{collision_to_bevy_mesh, collision_to_collider};
use crate::components::{CollisionRevision, IsoGridState, IsoPreviewMesh, IsoSurfaceGrid};
use crate::events::{CollisionMeshFailed, CollisionMeshReady, RequestCollisionMesh};
use crate::resources::{MeshingContext, MeshingSettings};

/// Acquire a headless device and compile the kernels.
pub fn setup_meshing_context(mut commands: Commands, settings: Res<MeshingSettings>) {
  match GpuContext::new_headless(&settings.context) {
    Ok(ctx) => {
      let ctx = Arc::new(ctx);
      let extractor = Arc::new(SurfaceExtractor::new(&ctx));
      commands.insert_resource(MeshingContext { ctx, extractor });
      info!("[IsoGpu] Meshing context ready");
    }
    Err(err) => {
      error!("[IsoGpu] GPU meshing unavailable: {}", err);
    }
  }
}

/// Regenerate grids whose settings were added or changed, cancelling and
/// restarting any collision readback in flight.
pub fn regenerate_changed_grids(
  mut commands: Commands,
  context: Option<Res<MeshingContext>>,
  settings: Res<MeshingSettings>,
  mut grids: Query<(Entity, &IsoSurfaceGrid, Option<&mut IsoGridState>), Changed<IsoSurfaceGrid>>,
  mut failed: EventWriter<CollisionMeshFailed>,
) {
  let Some(context) = context else {
    return;
  };

  for (entity, authoring, state) in &mut grids {
    let grid_settings = match authoring.to_settings() {
      Ok(grid_settings) => grid_settings,
      Err(err) => {
        warn!("[IsoGpu] {:?}: invalid grid settings: {}", entity, err);
        continue;
      }
    };

    let mut fresh = None;
    let state = match state {
      Some(state) => state.into_inner(),
      None => fresh.insert(IsoGridState::new(IsoGrid::with_readback_config(
        context.ctx.clone(),
        context.extractor.clone(),
        grid_settings,
        settings.readback,
      ))),
    };

    state.grid.cancel_collision_mesh();
    let needs_field = state.needs_field(authoring, &grid_settings);
    state.grid.set_settings(grid_settings);

    if needs_field {
      if let Err(err) = state
        .grid
        .generate_data(&SphereShape::new(authoring.sphere_radius))
      {
        error!("[IsoGpu] {:?}: generate_data failed: {}", entity, err);
        continue;
      }
      state.field_radius = Some(authoring.sphere_radius);
    }

    if let Err(err) = state.grid.generate_mesh() {
      error!("[IsoGpu] {:?}: generate_mesh failed: {}", entity, err);
      continue;
    }

    if authoring.auto_collider {
      if let Err(error) = state.grid.request_collision_mesh() {
        failed.write(CollisionMeshFailed { entity, error });
      }
    }

    if let Some(state) = fresh {
      commands.entity(entity).insert(state);
    }
  }
}

/// Explicit collision requests: cancel and restart.
pub fn handle_collision_requests(
  mut requests: EventReader<RequestCollisionMesh>,
  mut grids: Query<&mut IsoGridState>,
  mut failed: EventWriter<CollisionMeshFailed>,
) {
  for request in requests.read() {
    let Ok(mut state) = grids.get_mut(request.entity) else {
      warn!("[IsoGpu] {:?}: collision requested for an ungenerated grid", request.entity);
      continue;
    };
    state.grid.cancel_collision_mesh();
    if let Err(error) = state.grid.request_collision_mesh() {
      failed.write(CollisionMeshFailed {
        entity: request.entity,
        error,
      });
    }
  }
}

/// Advance readbacks; install finished collision meshes as colliders.
pub fn poll_collision_readbacks(
  mut commands: Commands,
  mut grids: Query<(Entity, &mut IsoGridState, Option<&mut CollisionRevision>)>,
  mut ready: EventWriter<CollisionMeshReady>,
  mut failed: EventWriter<CollisionMeshFailed>,
) {
  for (entity, mut state, revision) in &mut grids {
    if !state.grid.is_collision_pending() {
      continue;
    }

    match state.grid.poll_collision_mesh() {
      ReadbackPoll::Ready(mesh) => {
        match collision_to_collider(&mesh) {
          Some(collider) => {
            commands.entity(entity).insert(collider);
          }
          None => {
            commands.entity(entity).remove::<Collider>();
          }
        }
        match revision {
          Some(mut revision) => revision.0 += 1,
          None => {
            commands.entity(entity).insert(CollisionRevision(1));
          }
        }
        debug!(
          "[IsoGpu] {:?}: collider installed ({} triangles)",
          entity,
          mesh.triangle_count()
        );
        ready.write(CollisionMeshReady {
          entity,
          triangles: mesh.triangle_count(),
        });
      }
      ReadbackPoll::Failed(error) => {
        warn!("[IsoGpu] {:?}: collision readback failed: {}", entity, error);
        failed.write(CollisionMeshFailed { entity, error });
      }
      ReadbackPoll::Pending(_) | ReadbackPoll::Idle => {}
    }
  }
}

/// Rebuild preview meshes after each collision installation.
pub fn update_preview_meshes(
  mut commands: Commands,
  mut meshes: ResMut<Assets<Mesh>>,
  mut materials: ResMut<Assets<StandardMaterial>>,
  grids: Query<
    (
      Entity,
      &IsoGridState,
      Option<&Mesh3d>,
      Option<&MeshMaterial3d<StandardMaterial>>,
    ),
    (With<IsoPreviewMesh>, Changed<CollisionRevision>),
  >,
) {
  for (entity, state, mesh3d, material) in &grids {
    let Some(collision) = state.grid.collision_mesh() else {
      continue;
    };
    let mesh = collision_to_bevy_mesh(collision);

    match mesh3d {
      Some(handle) => {
        meshes.insert(&handle.0, mesh);
      }
      None => {
        let handle = meshes.add(mesh);
        commands.entity(entity).insert(Mesh3d(handle));
      }
    }
    if material.is_none() {
      let handle = materials.add(StandardMaterial::default());
      commands.entity(entity).insert(MeshMaterial3d(handle));
    }
  }
}

#[cfg(test)]
#[path = "systems_test.rs"]
mod systems_test;
