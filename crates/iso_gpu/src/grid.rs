//! Isosurface grid instance.
//!
//! Owns every GPU resource of one grid and exposes the three user-facing
//! operations:
//!
//! ```text
//! generate_data(shape)      field → GPU, (re)allocate mesh buffers
//! generate_mesh()           reset counters, configure, reconstruct, compact
//! request_collision_mesh()  start the 3-stage readback; poll to finish
//! ```
//!
//! Render mesh and collision mesh are independent failure domains: a failed
//! readback never touches the render buffers, and the previously installed
//! collision mesh is only replaced by a successful run.

use std::sync::Arc;
use std::time::Duration;

use web_time::Instant;

use crate::error::{GridError, ReadbackError};
use crate::field::{FieldShape, ScalarField};
use crate::gpu::mesh_buffers::check_mesh_limits;
use crate::gpu::{
  ExtractionResources, GpuContext, GridReadbackDevice, MeshBufferSet, OwnedBuffer, RenderMesh,
  StagingQueue, SurfaceExtractor,
};
use crate::lifecycle::Slot;
use crate::mesh::CollisionMesh;
use crate::readback::{CancelToken, CollisionReadback, ReadbackConfig, ReadbackPoll};
use crate::types::{ExtractParams, GridSettings, GridSize, TriangleBudget};

/// Wall-clock duration of the last run of each operation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridTimings {
  pub generate_data: Option<Duration>,
  pub generate_mesh: Option<Duration>,
  /// Request to installation, spanning all three readback stages.
  pub collision_mesh: Option<Duration>,
}

/// One isosurface grid and its GPU resources.
pub struct IsoGrid {
  ctx: Arc<GpuContext>,
  extractor: Arc<SurfaceExtractor>,
  settings: GridSettings,

  field: Option<ScalarField>,
  field_buffer: Slot<OwnedBuffer>,
  mesh: Slot<MeshBufferSet>,
  resources: ExtractionResources,
  mesh_generated: bool,

  readback: CollisionReadback,
  staging: StagingQueue,
  readback_started: Option<Instant>,

  timings: GridTimings,
}

impl IsoGrid {
  pub fn new(ctx: Arc<GpuContext>, extractor: Arc<SurfaceExtractor>, settings: GridSettings) -> Self {
    Self::with_readback_config(ctx, extractor, settings, ReadbackConfig::default())
  }

  pub fn with_readback_config(
    ctx: Arc<GpuContext>,
    extractor: Arc<SurfaceExtractor>,
    settings: GridSettings,
    readback: ReadbackConfig,
  ) -> Self {
    Self {
      ctx,
      extractor,
      settings,
      field: None,
      field_buffer: Slot::empty(),
      mesh: Slot::empty(),
      resources: ExtractionResources::new(),
      mesh_generated: false,
      readback: CollisionReadback::new(readback),
      staging: StagingQueue::new(),
      readback_started: None,
      timings: GridTimings::default(),
    }
  }

  pub fn settings(&self) -> &GridSettings {
    &self.settings
  }

  /// Replace the settings. Threshold and inversion apply on the next
  /// `generate_mesh`; a new grid size needs `generate_data` first.
  pub fn set_settings(&mut self, settings: GridSettings) {
    self.settings = settings;
  }

  pub fn context(&self) -> &Arc<GpuContext> {
    &self.ctx
  }

  /// Fill the field from `shape`, upload it and (re)allocate mesh buffers
  /// for the current grid size.
  pub fn generate_data<S: FieldShape + ?Sized>(&mut self, shape: &S) -> Result<(), GridError> {
    let started = Instant::now();
    let grid = self.settings.grid_size;
    let budget = self.validate_grid(grid)?;

    let field = ScalarField::generate(grid, shape);
    let (min, max) = field.range();
    self.install_field(field, budget)?;

    let elapsed = started.elapsed();
    self.timings.generate_data = Some(elapsed);
    tracing::info!(grid = %grid, min, max, ?elapsed, "[TIME] generate_data");
    Ok(())
  }

  /// Use an externally authored field. Adopts the field's grid size.
  pub fn set_field(&mut self, field: ScalarField) -> Result<(), GridError> {
    let grid = field.grid();
    let budget = self.validate_grid(grid)?;
    self.settings.grid_size = grid;
    self.install_field(field, budget)
  }

  /// Every size check the field and mesh buffers depend on. Runs before
  /// anything is released, so a rejected grid leaves the current state intact.
  fn validate_grid(&self, grid: GridSize) -> Result<TriangleBudget, GridError> {
    let budget = grid.triangle_budget()?;
    self.extractor.validate(&self.ctx, grid)?;
    check_mesh_limits(&self.ctx.limits(), budget)?;
    Ok(budget)
  }

  fn install_field(&mut self, field: ScalarField, budget: TriangleBudget) -> Result<(), GridError> {
    self.cancel_collision_mesh();

    let ctx = &self.ctx;
    self.field_buffer.replace(|| {
      ctx.create_buffer_init(
        "iso_gpu.field",
        field.as_bytes(),
        wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
      )
    });
    self.field = Some(field);
    self.reallocate_mesh(budget)
  }

  /// Dispose and recreate the render and collision mesh buffers for the
  /// current field. The previous extraction and any readback of it are
  /// discarded; run `generate_mesh` before requesting a collision mesh.
  pub fn allocate_mesh(&mut self) -> Result<(), GridError> {
    let Some(field) = self.field.as_ref() else {
      return Err(GridError::NotGenerated("scalar field"));
    };
    let budget = self.validate_grid(field.grid())?;
    self.reallocate_mesh(budget)
  }

  fn reallocate_mesh(&mut self, budget: TriangleBudget) -> Result<(), GridError> {
    self.cancel_collision_mesh();
    self.mesh_generated = false;
    let ctx = &self.ctx;
    self
      .mesh
      .try_replace(|| MeshBufferSet::allocate(ctx, budget))?;
    Ok(())
  }

  /// Run the extraction protocol on the current field.
  ///
  /// Cancels any collision readback in flight, since its remaining stages
  /// would read the new buffers with the old counter.
  pub fn generate_mesh(&mut self) -> Result<(), GridError> {
    let started = Instant::now();
    let Some(field) = self.field.as_ref() else {
      return Err(GridError::NotGenerated("scalar field"));
    };
    let grid = field.grid();
    if grid != self.settings.grid_size {
      return Err(GridError::StaleField {
        field: grid,
        settings: self.settings.grid_size,
      });
    }
    if field.is_homogeneous(self.settings.iso_surface) {
      tracing::debug!(grid = %grid, "field does not cross the isosurface");
    }
    let budget = grid.triangle_budget()?;

    self.cancel_collision_mesh();
    self.resources.reset_counters(&self.ctx);
    self
      .resources
      .configure(&self.ctx, &ExtractParams::new(&self.settings, budget));

    let (Some(field_buffer), Some(mesh)) = (self.field_buffer.get(), self.mesh.get()) else {
      return Err(GridError::NotGenerated("mesh buffers"));
    };
    self
      .extractor
      .dispatch(&self.ctx, grid, field_buffer, &mesh.render, &self.resources)?;
    self.mesh_generated = true;

    let elapsed = started.elapsed();
    self.timings.generate_mesh = Some(elapsed);
    tracing::info!(
      grid = %grid,
      iso_surface = self.settings.iso_surface,
      invert_normals = self.settings.invert_normals,
      ?elapsed,
      "[TIME] generate_mesh"
    );
    Ok(())
  }

  /// Start the collision readback. Finish it with [`IsoGrid::poll_collision_mesh`].
  pub fn request_collision_mesh(&mut self) -> Result<CancelToken, ReadbackError> {
    if !self.mesh_generated {
      return Err(ReadbackError::NoSource);
    }
    let Some(budget) = self.mesh.get().map(MeshBufferSet::budget) else {
      return Err(ReadbackError::NoSource);
    };
    let Some(mut device) =
      readback_device(&self.ctx, &self.mesh, &self.resources, &mut self.staging)
    else {
      return Err(ReadbackError::NoSource);
    };
    let token = self.readback.start(&mut device, budget)?;
    self.readback_started = Some(Instant::now());
    Ok(token)
  }

  /// Advance the collision readback without blocking. A successful run is
  /// installed as the active collision mesh before it is returned.
  pub fn poll_collision_mesh(&mut self) -> ReadbackPoll {
    if !self.readback.is_busy() {
      return ReadbackPoll::Idle;
    }
    let Some(mut device) =
      readback_device(&self.ctx, &self.mesh, &self.resources, &mut self.staging)
    else {
      self.staging.clear();
      self.readback = CollisionReadback::new(*self.readback.config());
      return ReadbackPoll::Failed(ReadbackError::NoSource);
    };
    let result = self.readback.poll(&mut device);

    match &result {
      ReadbackPoll::Ready(collision) => {
        let elapsed = self.readback_started.take().map(|s| s.elapsed());
        self.timings.collision_mesh = elapsed;
        tracing::info!(
          triangles = collision.triangle_count(),
          ?elapsed,
          "[TIME] generate_collider"
        );
        if let Some(mesh) = self.mesh.get_mut() {
          mesh.collider = collision.clone();
        }
      }
      ReadbackPoll::Failed(_) => {
        self.readback_started = None;
      }
      ReadbackPoll::Idle | ReadbackPoll::Pending(_) => {}
    }
    result
  }

  /// Abort an in-flight collision readback, if any.
  pub fn cancel_collision_mesh(&mut self) {
    if !self.readback.is_busy() {
      return;
    }
    if let Some(mut device) =
      readback_device(&self.ctx, &self.mesh, &self.resources, &mut self.staging)
    {
      self.readback.cancel(&mut device);
    }
    self.staging.clear();
    self.readback_started = None;
  }

  /// Request and drive a collision readback to completion, blocking on the
  /// device between polls. Intended for tools and tests.
  pub fn collision_mesh_blocking(&mut self) -> Result<CollisionMesh, ReadbackError> {
    self.request_collision_mesh()?;
    loop {
      match self.poll_collision_mesh() {
        ReadbackPoll::Ready(mesh) => return Ok(mesh),
        ReadbackPoll::Failed(err) => return Err(err),
        ReadbackPoll::Idle => return Err(ReadbackError::NoSource),
        ReadbackPoll::Pending(stage) => {
          if let Err(err) = self.ctx.wait() {
            self.cancel_collision_mesh();
            return Err(ReadbackError::Device {
              stage,
              message: err.to_string(),
            });
          }
        }
      }
    }
  }

  pub fn is_collision_pending(&self) -> bool {
    self.readback.is_busy()
  }

  /// Host copy of the current field.
  pub fn field(&self) -> Option<&ScalarField> {
    self.field.as_ref()
  }

  /// GPU render mesh, once buffers are allocated.
  pub fn render_mesh(&self) -> Option<&RenderMesh> {
    self.mesh.get().map(|m| &m.render)
  }

  /// True once `generate_mesh` has run on the current buffers.
  pub fn has_mesh(&self) -> bool {
    self.mesh_generated
  }

  /// Collision mesh of the current buffers; empty until a readback
  /// succeeds, then holds the last successful run.
  pub fn collision_mesh(&self) -> Option<&CollisionMesh> {
    self.mesh.get().map(|m| &m.collider)
  }

  pub fn timings(&self) -> &GridTimings {
    &self.timings
  }

  /// Release every GPU resource this grid owns.
  pub fn dispose(&mut self) {
    self.cancel_collision_mesh();
    self.staging.clear();
    self.resources.clear();
    self.mesh.clear();
    self.field_buffer.clear();
    self.field = None;
    self.mesh_generated = false;
  }
}

fn readback_device<'a>(
  ctx: &'a GpuContext,
  mesh: &'a Slot<MeshBufferSet>,
  resources: &'a ExtractionResources,
  staging: &'a mut StagingQueue,
) -> Option<GridReadbackDevice<'a>> {
  let mesh = mesh.get()?;
  Some(GridReadbackDevice {
    ctx,
    queue: staging,
    counter: resources.counter()?,
    internal_counter: resources.internal_counter()?,
    vertices: mesh.render.vertex_buffer(),
    indices: mesh.render.index_buffer(),
  })
}

impl Drop for IsoGrid {
  fn drop(&mut self) {
    self.dispose();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn timings_start_empty() {
    let timings = GridTimings::default();
    assert!(timings.generate_data.is_none());
    assert!(timings.generate_mesh.is_none());
    assert!(timings.collision_mesh.is_none());
  }
}
