use crate::device::{CapabilityLevel, DepthFormat, SurfaceFormat, WindowKind};

pub fn texture_format(format: SurfaceFormat) -> wgpu::TextureFormat {
    match format {
        SurfaceFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        SurfaceFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        SurfaceFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
        SurfaceFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// wgpu format of the depth/stencil buffer. Pipelines must use the same one.
pub fn depth_format(format: DepthFormat) -> wgpu::TextureFormat {
    match format {
        DepthFormat::Depth24PlusStencil8 => wgpu::TextureFormat::Depth24PlusStencil8,
        DepthFormat::Depth32Float => wgpu::TextureFormat::Depth32Float,
        DepthFormat::Depth32FloatStencil8 => wgpu::TextureFormat::Depth32FloatStencil8,
    }
}

/// FIFO waits for vertical sync and is supported everywhere.
pub fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

pub fn limits_for(level: CapabilityLevel) -> wgpu::Limits {
    match level {
        CapabilityLevel::Full => wgpu::Limits::default(),
        CapabilityLevel::Downlevel => wgpu::Limits::downlevel_defaults(),
        CapabilityLevel::WebGl2 => wgpu::Limits::downlevel_webgl2_defaults(),
    }
}

/// Picks `preferred` if the surface supports it, otherwise its first format.
pub(crate) fn choose_surface_format(
    supported: &[wgpu::TextureFormat],
    preferred: wgpu::TextureFormat,
) -> Option<wgpu::TextureFormat> {
    if supported.contains(&preferred) {
        return Some(preferred);
    }
    supported.first().copied()
}

/// CoreWindow swap chains only composite opaquely.
pub(crate) fn choose_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    kind: WindowKind,
) -> wgpu::CompositeAlphaMode {
    let requested = (kind == WindowKind::CoreWindow).then_some(wgpu::CompositeAlphaMode::Opaque);

    requested
        .filter(|m| supported.contains(m))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{CompositeAlphaMode, TextureFormat};

    #[test]
    fn configured_format_wins_when_supported() {
        let supported = [TextureFormat::Rgba8Unorm, TextureFormat::Bgra8Unorm];
        assert_eq!(
            choose_surface_format(&supported, TextureFormat::Bgra8Unorm),
            Some(TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn falls_back_to_the_first_supported_format() {
        let supported = [TextureFormat::Rgba8UnormSrgb];
        assert_eq!(
            choose_surface_format(&supported, TextureFormat::Bgra8Unorm),
            Some(TextureFormat::Rgba8UnormSrgb)
        );
        assert_eq!(choose_surface_format(&[], TextureFormat::Bgra8Unorm), None);
    }

    #[test]
    fn core_window_prefers_opaque_alpha() {
        let supported = [CompositeAlphaMode::PreMultiplied, CompositeAlphaMode::Opaque];
        assert_eq!(
            choose_alpha_mode(&supported, WindowKind::CoreWindow),
            CompositeAlphaMode::Opaque
        );
        assert_eq!(
            choose_alpha_mode(&supported, WindowKind::Win32),
            CompositeAlphaMode::PreMultiplied
        );
        assert_eq!(choose_alpha_mode(&[], WindowKind::Native), CompositeAlphaMode::Auto);
    }

    #[test]
    fn tiers_request_decreasing_limits() {
        let full = limits_for(CapabilityLevel::Full);
        let webgl2 = limits_for(CapabilityLevel::WebGl2);
        assert!(webgl2.max_texture_dimension_2d <= full.max_texture_dimension_2d);
    }

    #[test]
    fn vsync_maps_to_fifo() {
        assert_eq!(present_mode(true), wgpu::PresentMode::Fifo);
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
    }
}
