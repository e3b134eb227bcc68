//! iso_gpu - Engine independent GPU isosurface meshing
//!
//! Converts a dense scalar field into a marching cubes triangle mesh with
//! wgpu compute kernels, then pulls a collision mesh back to the host with a
//! non-blocking three-stage readback.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │ ScalarField  ├────►│ MeshBufferSet  ├────►│ SurfaceExtractor ├────►│ CollisionReadback│
//! │ (rayon fill) │     │ (budget sized) │     │ reconstruct +    │     │ counter → verts │
//! └──────────────┘     └────────────────┘     │ compact          │     │ → indices       │
//!                                             └──────────────────┘     └─────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use iso_gpu::{GpuContext, ContextConfig, SurfaceExtractor, IsoGrid, GridSettings, SphereShape};
//!
//! let ctx = Arc::new(GpuContext::new_headless(&ContextConfig::default())?);
//! let extractor = Arc::new(SurfaceExtractor::new(&ctx));
//! let mut grid = IsoGrid::new(ctx, extractor, GridSettings::default());
//!
//! grid.generate_data(&SphereShape::new(3.0))?;
//! grid.generate_mesh()?;
//!
//! // Each frame:
//! grid.request_collision_mesh()?;
//! match grid.poll_collision_mesh() {
//!     ReadbackPoll::Ready(mesh) => println!("{} triangles", mesh.triangle_count()),
//!     ReadbackPoll::Pending(_) | ReadbackPoll::Idle => {}
//!     ReadbackPoll::Failed(err) => eprintln!("{err}"),
//! }
//! ```

pub mod constants;
pub mod error;
pub mod field;
pub mod gpu;
pub mod grid;
pub mod lifecycle;
pub mod mesh;
pub mod readback;
pub mod tables;
pub mod types;

// Re-export commonly used items
pub use error::{ContextError, GridError, ReadbackError};
pub use field::{ConstantShape, FieldShape, PlaneShape, ScalarField, SphereShape};
pub use gpu::{ContextConfig, GpuContext, MeshBufferSet, OwnedBuffer, RenderMesh, SurfaceExtractor};
pub use grid::{GridTimings, IsoGrid};
pub use lifecycle::{ResourceLedger, Slot};
pub use mesh::CollisionMesh;
pub use readback::{
  CancelToken, CollisionReadback, ReadbackConfig, ReadbackDevice, ReadbackPoll, ReadbackStage,
};
pub use types::{
  ExtractParams, GridSettings, GridSize, MinMaxAABB, TriangleBudget, TriangleCount, Vertex,
};
