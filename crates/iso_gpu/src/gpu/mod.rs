//! GPU side: device context, owned buffers, mesh buffers, the compute
//! extraction protocol and the staging readback device.

pub mod buffer;
pub mod extractor;
pub mod mesh_buffers;
pub mod readback;

pub use buffer::OwnedBuffer;
pub use extractor::{ExtractionResources, SurfaceExtractor};
pub use mesh_buffers::{MeshBufferSet, RenderMesh, SubMesh};
pub use readback::{GridReadbackDevice, StagingQueue};

use crate::error::ContextError;
use crate::lifecycle::ResourceLedger;

/// Adapter selection for headless contexts.
#[derive(Clone, Debug)]
pub struct ContextConfig {
  pub label: &'static str,
  pub power_preference: wgpu::PowerPreference,
  /// Accept a software adapter (useful on CI).
  pub force_fallback_adapter: bool,
}

impl Default for ContextConfig {
  fn default() -> Self {
    Self {
      label: "iso_gpu",
      power_preference: wgpu::PowerPreference::HighPerformance,
      force_fallback_adapter: false,
    }
  }
}

/// Device, queue and the ledger of every buffer created through them.
pub struct GpuContext {
  pub device: wgpu::Device,
  pub queue: wgpu::Queue,
  ledger: ResourceLedger,
}

impl GpuContext {
  /// Wrap a device owned by a host renderer.
  pub fn from_device(device: wgpu::Device, queue: wgpu::Queue) -> Self {
    Self {
      device,
      queue,
      ledger: ResourceLedger::new(),
    }
  }

  /// Acquire an adapter and device without a surface, blocking the caller.
  pub fn new_headless(config: &ContextConfig) -> Result<Self, ContextError> {
    pollster::block_on(Self::new_headless_async(config))
  }

  pub async fn new_headless_async(config: &ContextConfig) -> Result<Self, ContextError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
      backends: wgpu::Backends::all(),
      ..Default::default()
    });

    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: config.power_preference,
        force_fallback_adapter: config.force_fallback_adapter,
        compatible_surface: None,
      })
      .await
      .map_err(|e| ContextError::NoAdapter(e.to_string()))?;

    let info = adapter.get_info();
    tracing::info!(
      adapter = %info.name,
      backend = ?info.backend,
      "GPU adapter acquired"
    );

    let (device, queue) = adapter
      .request_device(&wgpu::DeviceDescriptor {
        label: Some(config.label),
        required_features: wgpu::Features::empty(),
        required_limits: adapter.limits(),
        ..Default::default()
      })
      .await
      .map_err(|e| ContextError::Device(e.to_string()))?;

    Ok(Self::from_device(device, queue))
  }

  /// Number of buffers currently alive.
  pub fn live_buffers(&self) -> usize {
    self.ledger.live()
  }

  pub fn limits(&self) -> wgpu::Limits {
    self.device.limits()
  }

  /// Zero-initialized buffer.
  pub fn create_buffer(
    &self,
    label: &'static str,
    size: u64,
    usage: wgpu::BufferUsages,
  ) -> OwnedBuffer {
    let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
      label: Some(label),
      size,
      usage,
      mapped_at_creation: false,
    });
    OwnedBuffer::new(buffer, self.ledger.acquire(size))
  }

  /// Buffer initialized from `contents`.
  pub fn create_buffer_init(
    &self,
    label: &'static str,
    contents: &[u8],
    usage: wgpu::BufferUsages,
  ) -> OwnedBuffer {
    use wgpu::util::DeviceExt;

    let buffer = self
      .device
      .create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage,
      });
    let size = buffer.size();
    OwnedBuffer::new(buffer, self.ledger.acquire(size))
  }

  /// Drive callbacks without blocking.
  pub fn poll(&self) -> Result<(), wgpu::PollError> {
    self.device.poll(wgpu::PollType::Poll).map(|_| ())
  }

  /// Block until all submitted work is done.
  pub fn wait(&self) -> Result<(), wgpu::PollError> {
    self.device.poll(wgpu::PollType::Wait).map(|_| ())
  }
}
