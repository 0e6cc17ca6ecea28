//! Application state management.
//!
//! The AppState holds one context per open window plus the pieces every
//! window shares, and is reachable from all Tauri commands and event hooks.

use crate::platform::TauriPlatform;
use crate::webview::{CaptureRegistry, WebviewDisplay, WebviewRasterizer};
use mdview_core::Host;
use mdview_prefs::SettingsStore;
use mdview_protocol::Sender;
use mdview_render::Renderer;
use mdview_surface::Surface;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub type WindowSurface = Surface<WebviewDisplay, WebviewRasterizer>;

/// Everything that belongs to a single viewer window.
pub struct WindowContext {
    pub host: Host<TauriPlatform>,
    pub surface: WindowSurface,
    /// Sends to the host, for requests the webview issues in wire form.
    pub to_host: Sender,
    /// The two inbox loops. Aborted when the window goes away.
    pub tasks: Vec<JoinHandle<()>>,
}

impl Drop for WindowContext {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Label of the window that last gained focus. The menu bar follows it.
#[derive(Debug, Default)]
pub struct FocusTracker {
    label: Mutex<Option<String>>,
}

impl FocusTracker {
    pub fn set(&self, label: &str) {
        *lock(&self.label) = Some(label.to_string());
    }

    pub fn get(&self) -> Option<String> {
        lock(&self.label).clone()
    }

    pub fn is_focused(&self, label: &str) -> bool {
        lock(&self.label).as_deref() == Some(label)
    }

    /// Forget `label` if it held focus.
    pub fn clear(&self, label: &str) {
        let mut focused = lock(&self.label);
        if focused.as_deref() == Some(label) {
            *focused = None;
        }
    }
}

/// Shared application state.
///
/// This is managed by Tauri and accessible from all commands.
pub struct AppState {
    pub windows: Mutex<HashMap<String, WindowContext>>,
    pub focus: Arc<FocusTracker>,
    pub captures: Arc<CaptureRegistry>,
    pub renderer: Arc<Renderer>,
    pub settings: SettingsStore,
    pub runtime: Handle,
    /// Process exit status once the last window closes.
    pub exit_code: i32,
    next_window: AtomicU64,
}

pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    pub fn new(runtime: Handle, settings: SettingsStore, exit_code: i32) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            focus: Arc::new(FocusTracker::default()),
            captures: Arc::new(CaptureRegistry::default()),
            renderer: Arc::new(Renderer::new()),
            settings,
            runtime,
            exit_code,
            next_window: AtomicU64::new(1),
        }
    }

    pub fn next_label(&self) -> String {
        let n = self.next_window.fetch_add(1, Ordering::Relaxed);
        format!("viewer-{n}")
    }

    pub fn host(&self, label: &str) -> Option<Host<TauriPlatform>> {
        lock(&self.windows).get(label).map(|ctx| ctx.host.clone())
    }

    pub fn surface(&self, label: &str) -> Option<WindowSurface> {
        lock(&self.windows).get(label).map(|ctx| ctx.surface.clone())
    }

    pub fn to_host(&self, label: &str) -> Option<Sender> {
        lock(&self.windows).get(label).map(|ctx| ctx.to_host.clone())
    }

    /// Host of the focused window, falling back to any open window.
    pub fn focused_host(&self) -> Option<Host<TauriPlatform>> {
        let windows = lock(&self.windows);
        self.focus
            .get()
            .and_then(|label| windows.get(&label))
            .or_else(|| windows.values().next())
            .map(|ctx| ctx.host.clone())
    }

    pub fn remove(&self, label: &str) -> Option<WindowContext> {
        self.focus.clear(label);
        self.captures.cancel(label);
        lock(&self.windows).remove(label)
    }
}
