//! Bevy resources for GPU meshing.

use std::sync::Arc;

use bevy::prelude::*;
use iso_gpu::{ContextConfig, GpuContext, ReadbackConfig, SurfaceExtractor};

/// Shared device and compiled kernels. Absent when no adapter was found.
#[derive(Resource, Clone)]
pub struct MeshingContext {
  pub ctx: Arc<GpuContext>,
  pub extractor: Arc<SurfaceExtractor>,
}

/// Startup and readback configuration.
#[derive(Resource, Clone, Default)]
pub struct MeshingSettings {
  pub context: ContextConfig,
  pub readback: ReadbackConfig,
}
