use std::cell::Cell;
use std::sync::{Arc, OnceLock};

use crate::device::{
    AdapterIdentity, ApiError, Backend, CapabilityLevel, ClearValues, CreatedDevice, DepthDesc,
    DiagnosticOptions, Extent, SurfaceDesc, WindowTarget,
};

use super::format;

/// Backend-specific knobs.
#[derive(Debug, Clone)]
pub struct WgpuOptions {
    /// Native APIs wgpu may pick from.
    pub backends: wgpu::Backends,

    pub power_preference: wgpu::PowerPreference,
}

impl Default for WgpuOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// A wgpu device with the instance and adapter it was created from.
///
/// The instance is the owning factory used to create surfaces for this device.
pub struct WgpuDevice {
    /// Surface the adapter was matched against; taken by the first
    /// `create_surface` for this device.
    matched_surface: Cell<Option<wgpu::Surface<'static>>>,

    device: wgpu::Device,
    adapter: wgpu::Adapter,
    instance: wgpu::Instance,

    /// Set by the device-lost callback.
    lost: Arc<OnceLock<String>>,
}

impl WgpuDevice {
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    fn check_lost(&self) -> Result<(), ApiError> {
        if self.lost.get().is_some() {
            Err(ApiError::DeviceRemoved)
        } else {
            Ok(())
        }
    }
}

/// Surface bound to a window, plus its active configuration.
pub struct WgpuSurface {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl WgpuSurface {
    /// The format actually in use (may differ from the requested one).
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn config(&self) -> &wgpu::SurfaceConfiguration {
        &self.config
    }
}

/// [`Backend`] on top of wgpu.
///
/// Adapters are always chosen for their ability to present to the window the
/// last device was created for.
#[derive(Debug, Clone, Default)]
pub struct WgpuBackend {
    options: WgpuOptions,
    window: Option<WindowTarget>,
}

impl WgpuBackend {
    pub fn new(options: WgpuOptions) -> Self {
        Self {
            options,
            window: None,
        }
    }

    fn instance(&self, diagnostics: Option<&DiagnosticOptions>) -> wgpu::Instance {
        let flags = match diagnostics {
            Some(d) if d.enabled => wgpu::InstanceFlags::DEBUG | wgpu::InstanceFlags::VALIDATION,
            _ => wgpu::InstanceFlags::empty(),
        };

        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: self.options.backends,
            flags,
            ..Default::default()
        })
    }

    fn request_adapter(
        &self,
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<wgpu::Adapter, ApiError> {
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: self.options.power_preference,
            compatible_surface: surface,
            force_fallback_adapter: false,
        }))
        .map_err(|e| ApiError::other(format!("no suitable GPU adapter: {e}")))
    }
}

fn surface_for(
    instance: &wgpu::Instance,
    window: &WindowTarget,
) -> Result<wgpu::Surface<'static>, ApiError> {
    instance
        .create_surface(window.clone())
        .map_err(|e| ApiError::other(format!("failed to create wgpu surface: {e}")))
}

fn identity(info: &wgpu::AdapterInfo) -> AdapterIdentity {
    AdapterIdentity {
        vendor: info.vendor,
        device: info.device,
        backend: format!("{:?}", info.backend),
        name: info.name.clone(),
    }
}

fn install_diagnostics(device: &wgpu::Device, diagnostics: &DiagnosticOptions) {
    if !diagnostics.enabled {
        return;
    }

    let diagnostics = diagnostics.clone();
    device.on_uncaptured_error(Arc::new(move |err: wgpu::Error| {
        let message = err.to_string();
        if diagnostics.is_suppressed(&message) {
            log::trace!("suppressed wgpu message: {message}");
        } else if diagnostics.break_on_error {
            panic!("wgpu error: {message}");
        } else {
            log::error!("wgpu error: {message}");
        }
    }));
}

impl Backend for WgpuBackend {
    type Device = WgpuDevice;
    type Context = wgpu::Queue;
    type Surface = WgpuSurface;
    type BackBuffer = wgpu::SurfaceTexture;
    type RenderTargetView = wgpu::TextureView;
    type DepthBuffer = wgpu::Texture;
    type DepthStencilView = wgpu::TextureView;

    fn create_device(
        &mut self,
        level: CapabilityLevel,
        window: &WindowTarget,
        diagnostics: &DiagnosticOptions,
    ) -> Result<CreatedDevice<Self>, ApiError> {
        self.window = Some(window.clone());

        let instance = self.instance(Some(diagnostics));
        let surface = surface_for(&instance, window)?;
        let adapter = self.request_adapter(&instance, Some(&surface))?;
        let info = adapter.get_info();

        if !adapter.is_surface_supported(&surface) {
            return Err(ApiError::Unsupported(format!(
                "{} cannot present to a {:?} window",
                info.name,
                window.kind()
            )));
        }

        if level == CapabilityLevel::Full
            && !adapter.get_downlevel_capabilities().is_webgpu_compliant()
        {
            return Err(ApiError::Unsupported(format!(
                "{} is not WebGPU compliant",
                info.name
            )));
        }

        let required_limits = format::limits_for(level);
        if !required_limits.check_limits(&adapter.limits()) {
            return Err(ApiError::Unsupported(format!(
                "{} does not meet the `{level}` limits",
                info.name
            )));
        }

        // Optional depth format; enabled whenever the adapter has it.
        let required_features = adapter.features() & wgpu::Features::DEPTH32FLOAT_STENCIL8;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("rekindle device"),
            required_features,
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| ApiError::other(format!("failed to create wgpu device/queue: {e}")))?;

        let lost = Arc::new(OnceLock::new());
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            match reason {
                wgpu::DeviceLostReason::Destroyed => log::debug!("wgpu device destroyed"),
                _ => log::warn!("wgpu device lost ({reason:?}): {message}"),
            }
            let _ = flag.set(message);
        });

        install_diagnostics(&device, diagnostics);

        Ok(CreatedDevice {
            device: WgpuDevice {
                matched_surface: Cell::new(Some(surface)),
                device,
                adapter,
                instance,
                lost,
            },
            context: queue,
            adapter: identity(&info),
        })
    }

    fn default_adapter(&mut self) -> Result<AdapterIdentity, ApiError> {
        let instance = self.instance(None);
        let surface = match self.window.as_ref() {
            Some(window) => Some(surface_for(&instance, window)?),
            None => None,
        };
        let adapter = self.request_adapter(&instance, surface.as_ref())?;
        Ok(identity(&adapter.get_info()))
    }

    fn device_removed_reason(&self, device: &WgpuDevice) -> Option<String> {
        device.lost.get().cloned()
    }

    fn create_surface(
        &mut self,
        device: &WgpuDevice,
        _context: &wgpu::Queue,
        window: &WindowTarget,
        desc: &SurfaceDesc,
    ) -> Result<WgpuSurface, ApiError> {
        device.check_lost()?;

        let surface = match device.matched_surface.take() {
            Some(surface) => surface,
            None => surface_for(&device.instance, window)?,
        };

        let caps = surface.get_capabilities(&device.adapter);
        let format = format::choose_surface_format(&caps.formats, format::texture_format(desc.format))
            .ok_or_else(|| ApiError::other("no supported surface formats"))?;
        let alpha_mode = format::choose_alpha_mode(&caps.alpha_modes, window.kind());

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: desc.extent.width,
            height: desc.extent.height,
            present_mode: format::present_mode(desc.vsync),
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: desc.buffer_count,
        };

        surface.configure(&device.device, &config);
        device.check_lost()?;

        log::debug!("surface format {format:?}, alpha {alpha_mode:?}");
        Ok(WgpuSurface { surface, config })
    }

    fn resize_surface(
        &mut self,
        device: &WgpuDevice,
        surface: &mut WgpuSurface,
        extent: Extent,
    ) -> Result<(), ApiError> {
        device.check_lost()?;

        surface.config.width = extent.width;
        surface.config.height = extent.height;
        surface.surface.configure(&device.device, &surface.config);

        device.check_lost()
    }

    fn flush(&mut self, context: &wgpu::Queue) {
        context.submit(std::iter::empty());
    }

    fn acquire_back_buffer(
        &mut self,
        device: &WgpuDevice,
        surface: &mut WgpuSurface,
    ) -> Result<wgpu::SurfaceTexture, ApiError> {
        device.check_lost()?;

        let mut retried = false;
        loop {
            match surface.surface.get_current_texture() {
                Ok(texture) => {
                    if texture.suboptimal {
                        log::trace!("acquired a suboptimal back buffer");
                    }
                    return Ok(texture);
                }
                Err(wgpu::SurfaceError::Outdated) if !retried => {
                    log::debug!("surface outdated; reconfiguring");
                    surface.surface.configure(&device.device, &surface.config);
                    retried = true;
                }
                Err(wgpu::SurfaceError::Outdated) => {
                    return Err(ApiError::other("surface outdated after reconfigure"));
                }
                Err(wgpu::SurfaceError::Lost) => return Err(ApiError::DeviceReset),
                Err(wgpu::SurfaceError::Timeout) => return Err(ApiError::Timeout),
                Err(wgpu::SurfaceError::OutOfMemory) => return Err(ApiError::other("out of memory")),
                Err(_) => {
                    device.check_lost()?;
                    return Err(ApiError::other("surface acquire failed"));
                }
            }
        }
    }

    fn create_render_target_view(
        &mut self,
        device: &WgpuDevice,
        back_buffer: &wgpu::SurfaceTexture,
    ) -> Result<wgpu::TextureView, ApiError> {
        device.check_lost()?;
        Ok(back_buffer.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("BackBuffer"),
            ..Default::default()
        }))
    }

    fn create_depth_buffer(
        &mut self,
        device: &WgpuDevice,
        desc: &DepthDesc,
    ) -> Result<wgpu::Texture, ApiError> {
        device.check_lost()?;

        let format = format::depth_format(desc.format);
        let needed = format.required_features();
        if !device.device.features().contains(needed) {
            return Err(ApiError::Unsupported(format!("{format:?} needs {needed:?}")));
        }

        Ok(device.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("DepthStencil"),
            size: wgpu::Extent3d {
                width: desc.extent.width,
                height: desc.extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        }))
    }

    fn create_depth_stencil_view(
        &mut self,
        device: &WgpuDevice,
        depth_buffer: &wgpu::Texture,
    ) -> Result<wgpu::TextureView, ApiError> {
        device.check_lost()?;
        Ok(depth_buffer.create_view(&wgpu::TextureViewDescriptor {
            label: Some("DepthStencil"),
            ..Default::default()
        }))
    }

    fn clear_views(
        &mut self,
        device: &WgpuDevice,
        context: &wgpu::Queue,
        render_target: &wgpu::TextureView,
        depth_stencil: &wgpu::TextureView,
        clear: &ClearValues,
    ) {
        let mut encoder = device
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("rekindle clear encoder"),
            });

        // Pass is dropped before the encoder is finished.
        {
            let [r, g, b, a] = clear.color;
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rekindle clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view:           render_target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load:  wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_stencil,
                    depth_ops: Some(wgpu::Operations {
                        load:  wgpu::LoadOp::Clear(clear.depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: clear.stencil.map(|value| wgpu::Operations {
                        load:  wgpu::LoadOp::Clear(value),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes:    None,
                occlusion_query_set: None,
                multiview_mask:      None,
            });
        }

        context.submit(std::iter::once(encoder.finish()));
    }

    fn present(
        &mut self,
        device: &WgpuDevice,
        _context: &wgpu::Queue,
        _surface: &mut WgpuSurface,
        back_buffer: wgpu::SurfaceTexture,
    ) -> Result<(), ApiError> {
        device.check_lost()?;
        back_buffer.present();
        device.check_lost()
    }
}
