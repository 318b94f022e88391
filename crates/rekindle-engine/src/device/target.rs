use std::fmt;
use std::sync::Arc;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawWindowHandle, WindowHandle,
};

/// Anything that can hand out raw window and display handles.
pub trait WindowSource: HasWindowHandle + HasDisplayHandle + Send + Sync {}

impl<T> WindowSource for T where T: HasWindowHandle + HasDisplayHandle + Send + Sync {}

/// Platform family of a window target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WindowKind {
    /// Classic desktop window (`HWND`).
    Win32,
    /// Modern app window (`CoreWindow`).
    CoreWindow,
    /// Any other native window (X11, Wayland, AppKit, ...).
    Native,
}

impl WindowKind {
    pub fn classify(raw: &RawWindowHandle) -> Self {
        match raw {
            RawWindowHandle::Win32(_) => Self::Win32,
            RawWindowHandle::WinRt(_) => Self::CoreWindow,
            _ => Self::Native,
        }
    }
}

/// The window a presentation surface is bound to.
///
/// Cloning shares the underlying window.
#[derive(Clone)]
pub struct WindowTarget {
    kind: WindowKind,
    source: Arc<dyn WindowSource>,
}

impl WindowTarget {
    /// Wraps a window, classifying its kind from the raw handle.
    pub fn new(source: Arc<dyn WindowSource>) -> Result<Self, HandleError> {
        let kind = WindowKind::classify(&source.window_handle()?.as_raw());
        Ok(Self { kind, source })
    }

    /// Wraps a window with an explicitly chosen kind.
    pub fn with_kind(source: Arc<dyn WindowSource>, kind: WindowKind) -> Self {
        Self { kind, source }
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }
}

impl fmt::Debug for WindowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowTarget")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl HasWindowHandle for WindowTarget {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.source.window_handle()
    }
}

impl HasDisplayHandle for WindowTarget {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.source.display_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::sim::SimWindow;

    #[test]
    fn win32_handles_classify_as_win32() {
        let target = WindowTarget::new(Arc::new(SimWindow::win32())).unwrap();
        assert_eq!(target.kind(), WindowKind::Win32);
    }

    #[test]
    fn winrt_handles_classify_as_core_window() {
        let target = WindowTarget::new(Arc::new(SimWindow::core_window())).unwrap();
        assert_eq!(target.kind(), WindowKind::CoreWindow);
    }

    #[test]
    fn explicit_kind_overrides_classification() {
        let target = WindowTarget::with_kind(Arc::new(SimWindow::win32()), WindowKind::Native);
        assert_eq!(target.kind(), WindowKind::Native);
        assert!(target.window_handle().is_ok());
    }
}
