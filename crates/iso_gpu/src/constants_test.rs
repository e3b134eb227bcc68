use super::*;

#[test]
fn test_vertex_stride_matches_floats() {
  assert_eq!(VERTEX_FLOATS, 6);
  assert_eq!(VERTEX_STRIDE, 24);
}

#[test]
fn test_voxel_index_roundtrip() {
  let dims = [3, 5, 7];
  for z in 0..dims[2] {
    for y in 0..dims[1] {
      for x in 0..dims[0] {
        let idx = voxel_index(x, y, z, dims);
        assert_eq!(
          index_to_voxel(idx, dims),
          (x, y, z),
          "Roundtrip failed for ({}, {}, {})",
          x,
          y,
          z
        );
      }
    }
  }
}

#[test]
fn test_x_is_innermost() {
  let dims = [4, 4, 4];
  assert_eq!(voxel_index(1, 0, 0, dims), 1);
  assert_eq!(voxel_index(0, 1, 0, dims), 4);
  assert_eq!(voxel_index(0, 0, 1, dims), 16);
  assert_eq!(voxel_index(3, 3, 3, dims), 63);
}
