use super::*;

#[test]
fn test_grid_size_rejects_non_positive() {
  assert_eq!(
    GridSize::new(0, 4, 4),
    Err(GridError::NonPositiveDimension {
      axis: 'x',
      value: 0
    })
  );
  assert_eq!(
    GridSize::new(4, -2, 4),
    Err(GridError::NonPositiveDimension {
      axis: 'y',
      value: -2
    })
  );
  assert_eq!(
    GridSize::new(4, 4, 0),
    Err(GridError::NonPositiveDimension {
      axis: 'z',
      value: 0
    })
  );
}

#[test]
fn test_triangle_budget_formula() {
  let grid = GridSize::new(3, 4, 5).unwrap();
  let budget = grid.triangle_budget().unwrap();
  assert_eq!(grid.voxel_count(), 60);
  assert_eq!(budget.triangles(), 60 * 5, "Budget is five triangles per voxel");
  assert_eq!(budget.vertex_capacity(), 3 * 300, "Three vertices per triangle");
  assert_eq!(budget.vertex_bytes(), 900 * 24);
  assert_eq!(budget.index_bytes(), 900 * 4);
}

#[test]
fn test_smallest_grid_has_budget() {
  let grid = GridSize::new(1, 1, 1).unwrap();
  assert_eq!(grid.triangle_budget().unwrap().triangles(), 5);
}

#[test]
fn test_budget_overflow_detected() {
  // 1024³ · 15 vertices overflows u32.
  let grid = GridSize::cube(1024).unwrap();
  assert!(matches!(
    grid.triangle_budget(),
    Err(GridError::BudgetOverflow { .. })
  ));
}

#[test]
fn test_center_uses_integer_division() {
  let grid = GridSize::new(5, 4, 7).unwrap();
  assert_eq!(grid.center(), UVec3::new(2, 2, 3));
}

#[test]
fn test_triangle_count_units() {
  let count = TriangleCount(7);
  assert_eq!(count.vertex_count(), 21);
  assert_eq!(count.index_count(), 21);
  assert_eq!(count.vertex_bytes(), 21 * 24);
  assert_eq!(count.index_bytes(), 21 * 4);
  assert!(TriangleCount(0).is_empty());
}

#[test]
fn test_vertex_layout_size() {
  assert_eq!(std::mem::size_of::<Vertex>(), 24);
  let layout = Vertex::buffer_layout();
  assert_eq!(layout.array_stride, 24);
  assert_eq!(layout.attributes.len(), 2);
  assert_eq!(layout.attributes[1].offset, 12);
}

#[test]
fn test_extract_params_layout() {
  assert_eq!(std::mem::size_of::<ExtractParams>(), 32);

  let settings = GridSettings {
    grid_size: GridSize::new(2, 3, 4).unwrap(),
    iso_surface: 0.25,
    invert_normals: true,
  };
  let budget = settings.grid_size.triangle_budget().unwrap();
  let params = ExtractParams::new(&settings, budget);
  assert_eq!(params.grid_size, [2, 3, 4]);
  assert_eq!(params.max_triangles, 24 * 5);
  assert_eq!(params.vertex_capacity, 24 * 15);
  assert_eq!(params.invert_normals, 1);
  assert_eq!(params.iso_surface, 0.25);
}

#[test]
fn test_unit_cube_bounds() {
  let bounds = MinMaxAABB::default();
  assert_eq!(bounds, MinMaxAABB::UNIT_CUBE);
}
