//! Compute dispatch protocol.
//!
//! ```text
//! ┌────────────────┐   ┌───────────┐   ┌──────────────────┐   ┌─────────────────┐
//! │ Reset counters ├──►│ Configure ├──►│ Reconstruct      ├──►│ Compact         │
//! │ (recreate, 0)  │   │ (params)  │   │ X·Y·Z workgroups │   │ 1024 workgroups │
//! └────────────────┘   └───────────┘   └──────────────────┘   └─────────────────┘
//!                                        same encoder, reconstruct pass first
//! ```
//!
//! Pipelines and the case table are shared by every grid; per-grid state
//! (params, counters) lives in [`ExtractionResources`]. A dispatch is fire
//! and forget: nothing is read back until a collision readback asks.

use crate::constants::{COMPACT_WORKGROUPS, COUNTER_STRIDE};
use crate::error::GridError;
use crate::gpu::mesh_buffers::check_storage_size;
use crate::gpu::{GpuContext, OwnedBuffer, RenderMesh};
use crate::lifecycle::Slot;
use crate::tables;
use crate::types::{ExtractParams, GridSize};

const SHADER_SOURCE: &str = include_str!("shaders/marching_cubes.wgsl");

/// Per-grid kernel parameters and counters.
#[derive(Debug, Default)]
pub struct ExtractionResources {
  params: Slot<OwnedBuffer>,
  counter: Slot<OwnedBuffer>,
  internal_counter: Slot<OwnedBuffer>,
}

impl ExtractionResources {
  pub fn new() -> Self {
    Self::default()
  }

  /// Dispose both counters and recreate them zeroed.
  pub fn reset_counters(&mut self, ctx: &GpuContext) {
    let usage =
      wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
    self
      .counter
      .replace(|| ctx.create_buffer("iso_gpu.counter", COUNTER_STRIDE, usage));
    self
      .internal_counter
      .replace(|| ctx.create_buffer("iso_gpu.internal_counter", COUNTER_STRIDE, usage));
  }

  /// Upload kernel parameters for the next dispatch.
  pub fn configure(&mut self, ctx: &GpuContext, params: &ExtractParams) {
    self.params.replace(|| {
      ctx.create_buffer_init(
        "iso_gpu.params",
        bytemuck::bytes_of(params),
        wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
      )
    });
  }

  /// Emitted-triangle counter.
  pub fn counter(&self) -> Option<&OwnedBuffer> {
    self.counter.get()
  }

  /// Slot reservation counter.
  pub fn internal_counter(&self) -> Option<&OwnedBuffer> {
    self.internal_counter.get()
  }

  pub fn params(&self) -> Option<&OwnedBuffer> {
    self.params.get()
  }

  pub fn clear(&mut self) {
    self.params.clear();
    self.counter.clear();
    self.internal_counter.clear();
  }
}

/// Compiled kernels plus the uploaded case table.
pub struct SurfaceExtractor {
  layout: wgpu::BindGroupLayout,
  reconstruct: wgpu::ComputePipeline,
  compact: wgpu::ComputePipeline,
  tri_table: OwnedBuffer,
}

impl SurfaceExtractor {
  pub fn new(ctx: &GpuContext) -> Self {
    let device = &ctx.device;
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("iso_gpu.marching_cubes"),
      source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
    });

    use wgpu::BufferBindingType::{Storage, Uniform};
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
      label: Some("iso_gpu.extract_layout"),
      entries: &[
        bgl_entry(0, Uniform),
        bgl_entry(1, Storage { read_only: true }),
        bgl_entry(2, Storage { read_only: true }),
        bgl_entry(3, Storage { read_only: false }),
        bgl_entry(4, Storage { read_only: false }),
        bgl_entry(5, Storage { read_only: false }),
        bgl_entry(6, Storage { read_only: false }),
      ],
    });

    let reconstruct = create_pipeline(device, &layout, &shader, "reconstruct");
    let compact = create_pipeline(device, &layout, &shader, "compact");

    let table = tables::gpu_tri_table();
    let tri_table = ctx.create_buffer_init(
      "iso_gpu.tri_table",
      bytemuck::cast_slice(&table),
      wgpu::BufferUsages::STORAGE,
    );

    Self {
      layout,
      reconstruct,
      compact,
      tri_table,
    }
  }

  /// Check a grid against the device's dispatch and buffer limits.
  pub fn validate(&self, ctx: &GpuContext, grid: GridSize) -> Result<(), GridError> {
    let limits = ctx.limits();
    let max_groups = limits.max_compute_workgroups_per_dimension;
    for groups in grid.dims().into_iter().chain([COMPACT_WORKGROUPS]) {
      if groups > max_groups {
        return Err(GridError::DispatchTooLarge {
          groups,
          limit: max_groups,
        });
      }
    }
    check_storage_size(&limits, "scalar field", grid.field_bytes())
  }

  /// Record reconstruction then compaction and submit.
  pub fn dispatch(
    &self,
    ctx: &GpuContext,
    grid: GridSize,
    field: &OwnedBuffer,
    mesh: &RenderMesh,
    resources: &ExtractionResources,
  ) -> Result<wgpu::SubmissionIndex, GridError> {
    self.validate(ctx, grid)?;
    let (Some(params), Some(counter), Some(internal)) = (
      resources.params(),
      resources.counter(),
      resources.internal_counter(),
    ) else {
      return Err(GridError::NotGenerated("extraction parameters"));
    };

    let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
      label: Some("iso_gpu.extract_bind_group"),
      layout: &self.layout,
      entries: &[
        wgpu::BindGroupEntry {
          binding: 0,
          resource: params.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
          binding: 1,
          resource: field.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
          binding: 2,
          resource: self.tri_table.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
          binding: 3,
          resource: mesh.vertex_buffer().as_entire_binding(),
        },
        wgpu::BindGroupEntry {
          binding: 4,
          resource: mesh.index_buffer().as_entire_binding(),
        },
        wgpu::BindGroupEntry {
          binding: 5,
          resource: counter.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
          binding: 6,
          resource: internal.as_entire_binding(),
        },
      ],
    });

    let mut encoder = ctx
      .device
      .create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("iso_gpu.extract"),
      });
    {
      let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("iso_gpu.reconstruct"),
        timestamp_writes: None,
      });
      pass.set_pipeline(&self.reconstruct);
      pass.set_bind_group(0, &bind_group, &[]);
      pass.dispatch_workgroups(grid.x(), grid.y(), grid.z());
    }
    {
      let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
        label: Some("iso_gpu.compact"),
        timestamp_writes: None,
      });
      pass.set_pipeline(&self.compact);
      pass.set_bind_group(0, &bind_group, &[]);
      pass.dispatch_workgroups(COMPACT_WORKGROUPS, 1, 1);
    }

    let submission = ctx.queue.submit(Some(encoder.finish()));
    tracing::debug!(grid = %grid, "extraction dispatched");
    Ok(submission)
  }
}

fn bgl_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
  wgpu::BindGroupLayoutEntry {
    binding,
    visibility: wgpu::ShaderStages::COMPUTE,
    ty: wgpu::BindingType::Buffer {
      ty,
      has_dynamic_offset: false,
      min_binding_size: None,
    },
    count: None,
  }
}

fn create_pipeline(
  device: &wgpu::Device,
  layout: &wgpu::BindGroupLayout,
  shader: &wgpu::ShaderModule,
  entry_point: &'static str,
) -> wgpu::ComputePipeline {
  let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
    label: Some(entry_point),
    bind_group_layouts: &[layout],
    push_constant_ranges: &[],
  });

  device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
    label: Some(entry_point),
    layout: Some(&pipeline_layout),
    module: shader,
    entry_point: Some(entry_point),
    compilation_options: wgpu::PipelineCompilationOptions::default(),
    cache: None,
  })
}
