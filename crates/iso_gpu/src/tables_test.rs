use super::*;

#[test]
fn test_no_case_exceeds_triangle_budget() {
  assert_eq!(
    max_triangles_per_case() as u64,
    MAX_TRIANGLES_PER_CELL,
    "Worst-case cell must emit exactly the per-cell budget"
  );
}

#[test]
fn test_uniform_cases_emit_nothing() {
  assert_eq!(triangle_count(0), 0, "All corners inside");
  assert_eq!(triangle_count(255), 0, "All corners outside");
}

#[test]
fn test_rows_are_terminated_triples() {
  for (case, row) in TRI_TABLE.iter().enumerate() {
    let len = row.iter().position(|&e| e < 0).unwrap_or(TRI_TABLE_ROW);
    assert_eq!(len % 3, 0, "Case {} has a partial triangle", case);
    assert!(
      row[len..].iter().all(|&e| e == -1),
      "Case {} has data after its terminator",
      case
    );
    for &edge in &row[..len] {
      assert!(
        (0..12).contains(&edge),
        "Case {} references invalid edge {}",
        case,
        edge
      );
    }
  }
}

#[test]
fn test_referenced_edges_cross_the_surface() {
  for case in 0..=255usize {
    let inside = |corner: usize| case & (1 << corner) == 0;
    for &edge in TRI_TABLE[case].iter().take_while(|&&e| e >= 0) {
      let [a, b] = EDGE_CORNERS[edge as usize];
      assert_ne!(
        inside(a),
        inside(b),
        "Case {} places a vertex on edge {} which has no sign change",
        case,
        edge
      );
    }
  }
}

#[test]
fn test_single_corner_case_cuts_adjacent_edges() {
  // Corner 0 below threshold: the surface crosses edges 0, 3 and 8.
  let corners = [-1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
  let case = case_index(&corners, 0.0);
  assert_eq!(case, 1);
  assert_eq!(triangle_count(case), 1);

  let mut edges: Vec<i8> = TRI_TABLE[case as usize][..3].to_vec();
  edges.sort();
  assert_eq!(edges, vec![0, 3, 8]);
}

#[test]
fn test_single_corner_winding_faces_outside() {
  // Corner 0 is outside; the triangle normal should point back toward it.
  let edge_midpoint = |edge: usize| {
    let [a, b] = EDGE_CORNERS[edge];
    let pa = CORNER_OFFSETS[a];
    let pb = CORNER_OFFSETS[b];
    [
      (pa[0] + pb[0]) as f32 * 0.5,
      (pa[1] + pb[1]) as f32 * 0.5,
      (pa[2] + pb[2]) as f32 * 0.5,
    ]
  };
  let row = &TRI_TABLE[1];
  let a = glam::Vec3::from(edge_midpoint(row[0] as usize));
  let b = glam::Vec3::from(edge_midpoint(row[1] as usize));
  let c = glam::Vec3::from(edge_midpoint(row[2] as usize));
  let face_normal = (b - a).cross(c - a);
  let toward_outside = glam::Vec3::ZERO - a;
  assert!(
    face_normal.dot(toward_outside) > 0.0,
    "Counter-clockwise winding should face the outside corner"
  );
}

#[test]
fn test_edge_corners_are_unit_steps() {
  for (edge, [a, b]) in EDGE_CORNERS.iter().enumerate() {
    let pa = CORNER_OFFSETS[*a];
    let pb = CORNER_OFFSETS[*b];
    let manhattan: u32 = (0..3).map(|i| pa[i].abs_diff(pb[i])).sum();
    assert_eq!(manhattan, 1, "Edge {} must connect neighboring corners", edge);
  }
}

#[test]
fn test_gpu_table_layout() {
  let flat = gpu_tri_table();
  assert_eq!(flat.len(), 256 * TRI_TABLE_ROW);
  assert_eq!(&flat[16..19], &[0, 8, 3]);
  assert_eq!(flat[19], -1);
}
