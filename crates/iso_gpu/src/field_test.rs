use super::*;

#[test]
fn test_sphere_values_at_center_and_edge() {
  let grid = GridSize::cube(8).unwrap();
  let field = ScalarField::generate(grid, &SphereShape::new(2.0));

  assert_eq!(field.values().len(), 512);
  assert_eq!(field.sample(4, 4, 4), 2.0, "Center holds the radius");
  assert_eq!(field.sample(6, 4, 4), 0.0, "Surface crosses at radius");
  assert!(field.sample(0, 0, 0) < 0.0, "Corner is outside");
}

#[test]
fn test_generation_is_deterministic() {
  let grid = GridSize::new(7, 5, 9).unwrap();
  let shape = SphereShape::new(2.5);
  assert_eq!(
    ScalarField::generate(grid, &shape),
    ScalarField::generate(grid, &shape)
  );
}

#[test]
fn test_parallel_fill_matches_layout() {
  let grid = GridSize::new(3, 4, 5).unwrap();
  let field = ScalarField::generate(grid, &SphereShape::new(1.0));
  let center = grid.center().as_vec3();

  for z in 0..5 {
    for y in 0..4 {
      for x in 0..3 {
        let expected = 1.0 - center.distance(glam::Vec3::new(x as f32, y as f32, z as f32));
        assert_eq!(
          field.sample(x, y, z),
          expected,
          "Mismatch at ({}, {}, {})",
          x,
          y,
          z
        );
      }
    }
  }
}

#[test]
fn test_from_values_checks_length() {
  let grid = GridSize::cube(2).unwrap();
  assert!(ScalarField::from_values(grid, vec![0.0; 8]).is_ok());
  assert_eq!(
    ScalarField::from_values(grid, vec![0.0; 7]),
    Err(GridError::FieldLength {
      expected: 8,
      actual: 7
    })
  );
}

#[test]
fn test_homogeneous_detection() {
  let grid = GridSize::cube(4).unwrap();
  assert!(ScalarField::generate(grid, &ConstantShape(1.0)).is_homogeneous(0.0));
  assert!(ScalarField::generate(grid, &ConstantShape(-1.0)).is_homogeneous(0.0));
  assert!(!ScalarField::generate(grid, &SphereShape::new(1.5)).is_homogeneous(0.0));
}

#[test]
fn test_byte_view_length() {
  let grid = GridSize::new(2, 3, 4).unwrap();
  let field = ScalarField::generate(grid, &PlaneShape { height: 1.5 });
  assert_eq!(field.as_bytes().len() as u64, grid.field_bytes());
}
