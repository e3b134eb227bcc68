use super::*;
use iso_gpu::{GridSize, Vertex};

fn quad_mesh() -> CollisionMesh {
  let budget = GridSize::cube(1).unwrap().triangle_budget().unwrap();
  let mut mesh = CollisionMesh::with_budget(budget);
  let corners = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
  ];
  mesh.vertices = corners
    .iter()
    .map(|&position| Vertex {
      position,
      normal: [0.0, 0.0, 1.0],
    })
    .collect();
  mesh.indices = (0..6).collect();
  mesh
}

#[test]
fn test_empty_mesh_has_no_collider() {
  let budget = GridSize::cube(2).unwrap().triangle_budget().unwrap();
  assert!(collision_to_collider(&CollisionMesh::with_budget(budget)).is_none());
}

#[test]
fn test_trimesh_collider_built() {
  let collider = collision_to_collider(&quad_mesh());
  assert!(collider.is_some(), "Two triangles should produce a collider");
}

#[test]
fn test_preview_mesh_attributes() {
  let mesh = collision_to_bevy_mesh(&quad_mesh());
  assert_eq!(mesh.count_vertices(), 6);
  assert_eq!(mesh.indices().map(|i| i.len()), Some(6));
  assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
}
