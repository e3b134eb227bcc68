//! Conversion from readback output to physics and preview geometry.

use avian3d::prelude::Collider;
use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use iso_gpu::CollisionMesh;

/// Trimesh collider for a collision mesh, or `None` when it has no
/// triangles (trimesh colliders cannot be empty).
pub fn collision_to_collider(mesh: &CollisionMesh) -> Option<Collider> {
  if mesh.is_empty() {
    return None;
  }
  let vertices: Vec<Vec3> = mesh.vertices.iter().map(|v| Vec3::from(v.position)).collect();
  Some(Collider::trimesh(vertices, mesh.triangles()))
}

/// Bevy mesh mirroring a collision mesh (positions, normals, u32 indices).
pub fn collision_to_bevy_mesh(mesh: &CollisionMesh) -> Mesh {
  let positions: Vec<[f32; 3]> = mesh.positions();
  let normals: Vec<[f32; 3]> = mesh.vertices.iter().map(|v| v.normal).collect();

  Mesh::new(
    PrimitiveTopology::TriangleList,
    RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
  )
  .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
  .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
  .with_inserted_indices(Indices::U32(mesh.indices.clone()))
}

#[cfg(test)]
#[path = "collider_test.rs"]
mod collider_test;
