//! Core GPU context and device management.
//!
//! [`GpuContext`] bundles the wgpu device, queue and the color format used for all
//! transition render targets. It either creates its own headless device or wraps a
//! device the host application already owns, so transitions render on the same GPU as
//! the rest of the frame.
//!
//! # Example
//!
//! ```no_run
//! use camswap::GpuContext;
//!
//! // Standalone device, no window or surface required
//! let gpu = GpuContext::new_headless().expect("no GPU adapter");
//!
//! // Or share the host application's device
//! // let gpu = GpuContext::from_parts(device, queue, surface_config.format);
//! ```

use crate::backend::{BackendError, BackendResult};

/// Core GPU context holding wgpu resources.
///
/// All fields are public to allow direct access to wgpu APIs when needed.
pub struct GpuContext {
    /// The logical GPU device for creating resources and pipelines.
    pub device: wgpu::Device,
    /// The command queue for submitting work to the GPU.
    pub queue: wgpu::Queue,
    /// Color format of transition render targets and blend pipelines.
    pub format: wgpu::TextureFormat,
}

impl GpuContext {
    /// Color format used by [`new_headless`](Self::new_headless).
    pub const HEADLESS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Create a GPU context without a window.
    ///
    /// 1. Creates a wgpu instance with primary backends (Vulkan, Metal, DX12)
    /// 2. Requests a suitable GPU adapter
    /// 3. Creates the logical device and command queue
    pub fn new_headless() -> BackendResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        let info = adapter.get_info();
        log::info!("Selected GPU: {} ({:?} backend)", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Camswap Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: Default::default(),
            trace: Default::default(),
            experimental_features: Default::default(),
        }))
        .map_err(|e| BackendError::InitializationFailed(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            format: Self::HEADLESS_FORMAT,
        })
    }

    /// Wrap a device and queue owned by the host application.
    ///
    /// `format` should match whatever the host presents, typically its surface format.
    pub fn from_parts(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            format,
        }
    }
}
