//! Headless backend that records every call.
//!
//! Objects are plain ids; creating one logs [`SimEvent::Created`] and dropping
//! it logs [`SimEvent::Released`], so tests can assert on release order and on
//! leaked objects. Failures are scripted one call at a time.

use std::cell::RefCell;
use std::collections::HashMap;
use std::num::NonZeroIsize;
use std::ptr::NonNull;
use std::rc::Rc;

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle,
    RawWindowHandle, Win32WindowHandle, WinRtWindowHandle, WindowHandle, WindowsDisplayHandle,
};

use super::{
    AdapterIdentity, ApiError, Backend, CapabilityLevel, ClearValues, CreatedDevice, DepthDesc,
    DiagnosticOptions, Extent, SurfaceDesc, WindowKind, WindowTarget,
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ObjectKind {
    Device,
    Context,
    Surface,
    BackBuffer,
    RenderTargetView,
    DepthBuffer,
    DepthStencilView,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Created { kind: ObjectKind, id: u64 },
    Released { kind: ObjectKind, id: u64 },
    LevelRejected(CapabilityLevel),
    SurfaceResized { id: u64, extent: Extent },
    Flushed,
    Cleared { render_target: u64, depth_stencil: u64 },
    Presented { back_buffer: u64 },
    /// Free-form marker, e.g. from a test scene.
    Note(String),
}

/// A simulated native object. Released on drop.
#[derive(Debug)]
pub struct SimObject {
    kind: ObjectKind,
    id: u64,
    state: Rc<RefCell<SimState>>,
}

impl SimObject {
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for SimObject {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if let Some(count) = state.live.get_mut(&self.kind) {
                *count = count.saturating_sub(1);
            }
            state.events.push(SimEvent::Released {
                kind: self.kind,
                id: self.id,
            });
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    next_id: u64,
    events: Vec<SimEvent>,
    live: HashMap<ObjectKind, usize>,

    last_device: Option<u64>,
    accepted: Option<Vec<CapabilityLevel>>,
    unpresentable: Vec<CapabilityLevel>,
    adapter_revision: u32,
    removed: Option<(u64, String)>,

    fail_device_creation: Option<ApiError>,
    fail_surface_creation: Option<ApiError>,
    fail_resize: Option<ApiError>,
    fail_acquire: Option<ApiError>,
    fail_present: Option<ApiError>,
    fail_enumeration: Option<ApiError>,

    surface_extent: Option<Extent>,
    depth_extent: Option<Extent>,
    window_kind: Option<WindowKind>,
}

impl SimState {
    fn adapter(&self) -> AdapterIdentity {
        AdapterIdentity {
            vendor: 0x1de5,
            device: 0x0100 + self.adapter_revision,
            backend: "sim".to_string(),
            name: format!("Sim Adapter {}", self.adapter_revision),
        }
    }

    fn check_device(&self, device: &SimObject) -> Result<(), ApiError> {
        match &self.removed {
            Some((id, _)) if *id == device.id => Err(ApiError::DeviceRemoved),
            _ => Ok(()),
        }
    }
}

/// Recording backend. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SimBackend {
    state: Rc<RefCell<SimState>>,
}

impl SimBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn spawn(&self, kind: ObjectKind) -> SimObject {
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_id += 1;
            let id = state.next_id;
            *state.live.entry(kind).or_default() += 1;
            if kind == ObjectKind::Device {
                state.last_device = Some(id);
            }
            state.events.push(SimEvent::Created { kind, id });
            id
        };
        SimObject {
            kind,
            id,
            state: Rc::clone(&self.state),
        }
    }

    /// Restricts device creation to `levels`; anything else is unsupported.
    pub fn accept_only(&self, levels: &[CapabilityLevel]) {
        self.state.borrow_mut().accepted = Some(levels.to_vec());
    }

    /// Devices at `levels` land on an adapter that cannot present to the
    /// window; creation there reports unsupported.
    pub fn cannot_present_at(&self, levels: &[CapabilityLevel]) {
        self.state.borrow_mut().unpresentable = levels.to_vec();
    }

    pub fn fail_next_device_creation(&self, err: ApiError) {
        self.state.borrow_mut().fail_device_creation = Some(err);
    }

    pub fn fail_next_surface_creation(&self, err: ApiError) {
        self.state.borrow_mut().fail_surface_creation = Some(err);
    }

    pub fn fail_next_resize(&self, err: ApiError) {
        self.state.borrow_mut().fail_resize = Some(err);
    }

    pub fn fail_next_acquire(&self, err: ApiError) {
        self.state.borrow_mut().fail_acquire = Some(err);
    }

    pub fn fail_next_present(&self, err: ApiError) {
        self.state.borrow_mut().fail_present = Some(err);
    }

    pub fn fail_next_enumeration(&self, err: ApiError) {
        self.state.borrow_mut().fail_enumeration = Some(err);
    }

    /// Marks the most recently created device as removed.
    ///
    /// Every later call against that device fails with
    /// [`ApiError::DeviceRemoved`]. Devices created afterwards are unaffected.
    pub fn remove_device(&self, reason: &str) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = state.last_device {
            state.removed = Some((id, reason.to_string()));
        }
    }

    /// Makes a different adapter the system default.
    pub fn switch_default_adapter(&self) {
        self.state.borrow_mut().adapter_revision += 1;
    }

    pub fn current_adapter(&self) -> AdapterIdentity {
        self.state.borrow().adapter()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn note(&self, text: impl Into<String>) {
        self.state.borrow_mut().events.push(SimEvent::Note(text.into()));
    }

    /// Number of live objects of `kind`.
    pub fn live(&self, kind: ObjectKind) -> usize {
        self.state.borrow().live.get(&kind).copied().unwrap_or(0)
    }

    pub fn live_total(&self) -> usize {
        self.state.borrow().live.values().sum()
    }

    pub fn surface_extent(&self) -> Option<Extent> {
        self.state.borrow().surface_extent
    }

    pub fn depth_extent(&self) -> Option<Extent> {
        self.state.borrow().depth_extent
    }

    /// Kind of the window the last surface was created for.
    pub fn window_kind(&self) -> Option<WindowKind> {
        self.state.borrow().window_kind
    }
}

impl Backend for SimBackend {
    type Device = SimObject;
    type Context = SimObject;
    type Surface = SimObject;
    type BackBuffer = SimObject;
    type RenderTargetView = SimObject;
    type DepthBuffer = SimObject;
    type DepthStencilView = SimObject;

    fn create_device(
        &mut self,
        level: CapabilityLevel,
        window: &WindowTarget,
        _diagnostics: &DiagnosticOptions,
    ) -> Result<CreatedDevice<Self>, ApiError> {
        let adapter = {
            let mut state = self.state.borrow_mut();
            if let Some(err) = state.fail_device_creation.take() {
                return Err(err);
            }
            let accepted = state
                .accepted
                .as_ref()
                .is_none_or(|levels| levels.contains(&level));
            if !accepted {
                state.events.push(SimEvent::LevelRejected(level));
                return Err(ApiError::Unsupported(format!("level `{level}`")));
            }
            if state.unpresentable.contains(&level) {
                state.events.push(SimEvent::LevelRejected(level));
                return Err(ApiError::Unsupported(format!(
                    "adapter at `{level}` cannot present to a {:?} window",
                    window.kind()
                )));
            }
            state.adapter()
        };

        let device = self.spawn(ObjectKind::Device);
        let context = self.spawn(ObjectKind::Context);
        Ok(CreatedDevice {
            device,
            context,
            adapter,
        })
    }

    fn default_adapter(&mut self) -> Result<AdapterIdentity, ApiError> {
        let mut state = self.state.borrow_mut();
        match state.fail_enumeration.take() {
            Some(err) => Err(err),
            None => Ok(state.adapter()),
        }
    }

    fn device_removed_reason(&self, device: &SimObject) -> Option<String> {
        match &self.state.borrow().removed {
            Some((id, reason)) if *id == device.id => Some(reason.clone()),
            _ => None,
        }
    }

    fn create_surface(
        &mut self,
        device: &SimObject,
        _context: &SimObject,
        window: &WindowTarget,
        desc: &SurfaceDesc,
    ) -> Result<SimObject, ApiError> {
        {
            let mut state = self.state.borrow_mut();
            state.check_device(device)?;
            if let Some(err) = state.fail_surface_creation.take() {
                return Err(err);
            }
            state.surface_extent = Some(desc.extent);
            state.window_kind = Some(window.kind());
        }
        Ok(self.spawn(ObjectKind::Surface))
    }

    fn resize_surface(
        &mut self,
        device: &SimObject,
        surface: &mut SimObject,
        extent: Extent,
    ) -> Result<(), ApiError> {
        let mut state = self.state.borrow_mut();
        state.check_device(device)?;
        if let Some(err) = state.fail_resize.take() {
            return Err(err);
        }
        let outstanding = [ObjectKind::BackBuffer, ObjectKind::RenderTargetView]
            .iter()
            .map(|kind| state.live.get(kind).copied().unwrap_or(0))
            .sum::<usize>();
        if outstanding > 0 {
            return Err(ApiError::other(format!(
                "{outstanding} outstanding back buffer reference(s)"
            )));
        }
        state.surface_extent = Some(extent);
        state.events.push(SimEvent::SurfaceResized {
            id: surface.id,
            extent,
        });
        Ok(())
    }

    fn flush(&mut self, _context: &SimObject) {
        self.state.borrow_mut().events.push(SimEvent::Flushed);
    }

    fn acquire_back_buffer(
        &mut self,
        device: &SimObject,
        _surface: &mut SimObject,
    ) -> Result<SimObject, ApiError> {
        {
            let mut state = self.state.borrow_mut();
            state.check_device(device)?;
            if let Some(err) = state.fail_acquire.take() {
                return Err(err);
            }
        }
        Ok(self.spawn(ObjectKind::BackBuffer))
    }

    fn create_render_target_view(
        &mut self,
        device: &SimObject,
        _back_buffer: &SimObject,
    ) -> Result<SimObject, ApiError> {
        self.state.borrow().check_device(device)?;
        Ok(self.spawn(ObjectKind::RenderTargetView))
    }

    fn create_depth_buffer(
        &mut self,
        device: &SimObject,
        desc: &DepthDesc,
    ) -> Result<SimObject, ApiError> {
        {
            let mut state = self.state.borrow_mut();
            state.check_device(device)?;
            state.depth_extent = Some(desc.extent);
        }
        Ok(self.spawn(ObjectKind::DepthBuffer))
    }

    fn create_depth_stencil_view(
        &mut self,
        device: &SimObject,
        _depth_buffer: &SimObject,
    ) -> Result<SimObject, ApiError> {
        self.state.borrow().check_device(device)?;
        Ok(self.spawn(ObjectKind::DepthStencilView))
    }

    fn clear_views(
        &mut self,
        _device: &SimObject,
        _context: &SimObject,
        render_target: &SimObject,
        depth_stencil: &SimObject,
        _clear: &ClearValues,
    ) {
        self.state.borrow_mut().events.push(SimEvent::Cleared {
            render_target: render_target.id,
            depth_stencil: depth_stencil.id,
        });
    }

    fn present(
        &mut self,
        device: &SimObject,
        _context: &SimObject,
        _surface: &mut SimObject,
        back_buffer: SimObject,
    ) -> Result<(), ApiError> {
        let result = {
            let mut state = self.state.borrow_mut();
            state.check_device(device).and_then(|()| {
                match state.fail_present.take() {
                    Some(err) => Err(err),
                    None => {
                        state.events.push(SimEvent::Presented {
                            back_buffer: back_buffer.id,
                        });
                        Ok(())
                    }
                }
            })
        };
        drop(back_buffer);
        result
    }
}

/// A fake window handing out Win32 or WinRT handles.
///
/// The handles are never dereferenced by [`SimBackend`].
#[derive(Debug, Copy, Clone)]
pub struct SimWindow {
    kind: WindowKind,
}

impl SimWindow {
    pub fn win32() -> Self {
        Self {
            kind: WindowKind::Win32,
        }
    }

    pub fn core_window() -> Self {
        Self {
            kind: WindowKind::CoreWindow,
        }
    }

    /// Wraps this window as a [`WindowTarget`].
    pub fn target(self) -> WindowTarget {
        WindowTarget::with_kind(std::sync::Arc::new(self), self.kind)
    }
}

impl HasWindowHandle for SimWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        let raw = match self.kind {
            WindowKind::CoreWindow => {
                RawWindowHandle::WinRt(WinRtWindowHandle::new(NonNull::dangling()))
            }
            WindowKind::Win32 | WindowKind::Native => {
                RawWindowHandle::Win32(Win32WindowHandle::new(NonZeroIsize::MIN))
            }
        };
        // SAFETY: the handle is only classified and passed to SimBackend, which
        // never dereferences it.
        Ok(unsafe { WindowHandle::borrow_raw(raw) })
    }
}

impl HasDisplayHandle for SimWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        let raw = RawDisplayHandle::Windows(WindowsDisplayHandle::new());
        // SAFETY: see `window_handle`.
        Ok(unsafe { DisplayHandle::borrow_raw(raw) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_an_object_logs_its_release() {
        let sim = SimBackend::new();
        let object = sim.spawn(ObjectKind::DepthBuffer);
        let id = object.id();
        assert_eq!(sim.live(ObjectKind::DepthBuffer), 1);

        drop(object);

        assert_eq!(sim.live_total(), 0);
        assert_eq!(
            sim.events().last(),
            Some(&SimEvent::Released {
                kind: ObjectKind::DepthBuffer,
                id
            })
        );
    }

    #[test]
    fn removal_only_affects_the_removed_device() {
        let mut sim = SimBackend::new();
        let diagnostics = DiagnosticOptions::default();
        let window = SimWindow::win32().target();
        let first = sim
            .create_device(CapabilityLevel::Full, &window, &diagnostics)
            .unwrap();
        sim.remove_device("hung");
        let second = sim
            .create_device(CapabilityLevel::Full, &window, &diagnostics)
            .unwrap();

        assert_eq!(sim.device_removed_reason(&first.device).as_deref(), Some("hung"));
        assert_eq!(sim.device_removed_reason(&second.device), None);
    }

    #[test]
    fn window_target_records_its_kind() {
        let target = SimWindow::core_window().target();
        assert_eq!(target.kind(), WindowKind::CoreWindow);
    }
}
