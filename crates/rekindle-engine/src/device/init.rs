use super::{CapabilityLevel, Extent};

/// Back-buffer pixel format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SurfaceFormat {
    Bgra8Unorm,
    Rgba8Unorm,
    Bgra8UnormSrgb,
    Rgba8UnormSrgb,
}

/// Depth/stencil buffer format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DepthFormat {
    Depth24PlusStencil8,
    Depth32Float,
    Depth32FloatStencil8,
}

impl DepthFormat {
    pub fn has_stencil(self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8)
    }
}

/// Debug-layer messages that are harmless and dropped by default.
///
/// Re-applying a debug label to an object that already has one is reported on
/// every recreated generation.
pub const BENIGN_MESSAGES: &[&str] = &["SETPRIVATEDATA_CHANGINGPARAMS"];

/// Diagnostic options handed to the device factory.
///
/// When enabled, the backend turns on API validation and installs a message
/// filter: messages containing any of `suppressed_messages` are dropped, the
/// rest are logged (or abort execution if `break_on_error` is set).
#[derive(Debug, Clone)]
pub struct DiagnosticOptions {
    pub enabled: bool,

    /// Panic on error-severity messages instead of logging them.
    pub break_on_error: bool,

    /// Substrings of known-benign messages.
    pub suppressed_messages: Vec<String>,
}

impl DiagnosticOptions {
    pub fn is_suppressed(&self, message: &str) -> bool {
        self.suppressed_messages
            .iter()
            .any(|needle| message.contains(needle.as_str()))
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            enabled: cfg!(debug_assertions),
            break_on_error: false,
            suppressed_messages: BENIGN_MESSAGES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Configuration for the device lifecycle.
///
/// Keep this structure stable and minimal. Backend-specific knobs (adapter
/// power preference, API selection) live on the backend itself.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Acceptable capability levels, highest preference first.
    pub capability_levels: Vec<CapabilityLevel>,

    pub diagnostics: DiagnosticOptions,

    /// Requested back-buffer format. The backend may fall back to a supported one.
    pub back_buffer_format: SurfaceFormat,

    pub depth_format: DepthFormat,

    /// Number of swap buffers (2 = double buffering).
    pub buffer_count: u32,

    /// Block in present until the next vertical sync.
    pub vsync: bool,

    /// Color the render target is cleared to before the scene draws.
    pub clear_color: [f64; 4],
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            capability_levels: CapabilityLevel::ALL.to_vec(),
            diagnostics: DiagnosticOptions::default(),
            back_buffer_format: SurfaceFormat::Bgra8Unorm,
            depth_format: DepthFormat::Depth24PlusStencil8,
            buffer_count: 2,
            vsync: true,
            // cornflower blue
            clear_color: [0.392, 0.584, 0.929, 1.0],
        }
    }
}

/// Parameters for creating a presentation surface.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SurfaceDesc {
    pub extent: Extent,
    pub format: SurfaceFormat,
    pub buffer_count: u32,
    pub vsync: bool,
}

/// Parameters for the depth/stencil buffer backing the derived views.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DepthDesc {
    pub extent: Extent,
    pub format: DepthFormat,
}

/// Values the derived views are cleared to at the start of a frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearValues {
    pub color: [f64; 4],
    pub depth: f32,
    /// `None` when the depth format has no stencil aspect.
    pub stencil: Option<u32>,
}

impl ClearValues {
    pub(crate) fn for_config(config: &DeviceConfig) -> Self {
        Self {
            color: config.clear_color,
            depth: 1.0,
            stencil: config.depth_format.has_stencil().then_some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_request_every_tier_with_double_buffering() {
        let config = DeviceConfig::default();
        assert_eq!(config.capability_levels, CapabilityLevel::ALL.to_vec());
        assert_eq!(config.buffer_count, 2);
        assert!(config.vsync);
    }

    #[test]
    fn default_diagnostics_drop_relabel_warnings() {
        let diagnostics = DiagnosticOptions::default();
        assert!(diagnostics.is_suppressed(
            "D3D12 WARNING: ID3D12Resource::SetName: SETPRIVATEDATA_CHANGINGPARAMS"
        ));
        assert!(!diagnostics.is_suppressed("Validation Error: buffer is destroyed"));
    }

    #[test]
    fn suppression_matches_substrings() {
        let diagnostics = DiagnosticOptions {
            enabled: true,
            break_on_error: false,
            suppressed_messages: vec!["SetPrivateData".to_string()],
        };
        assert!(diagnostics.is_suppressed("warning: SetPrivateData changing params"));
        assert!(!diagnostics.is_suppressed("buffer overflow"));
    }

    #[test]
    fn clear_values_skip_stencil_for_depth_only_formats() {
        let mut config = DeviceConfig::default();
        assert_eq!(ClearValues::for_config(&config).stencil, Some(0));

        config.depth_format = DepthFormat::Depth32Float;
        assert_eq!(ClearValues::for_config(&config).stencil, None);
    }
}
