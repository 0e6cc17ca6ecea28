//! Tauri commands the page inside each window calls.
//!
//! The window is always taken from the invoking webview, so a page can only
//! reach its own host and surface.

use crate::dto::SurfaceEventDto;
use crate::state::AppState;
use mdview_protocol::IpcError;
use serde_json::Value;
use tauri::ipc::{InvokeBody, Request};
use tauri::{State, WebviewWindow};

type CommandResult<T> = Result<T, String>;

fn unknown_window(label: &str) -> String {
    format!("no viewer is attached to window '{label}'")
}

// ============================================================================
// Lifecycle
// ============================================================================

/// The page has its listeners installed; load preferences and the first
/// document.
#[tauri::command]
pub fn surface_ready(window: WebviewWindow, state: State<AppState>) -> CommandResult<()> {
    let surface = state
        .surface(window.label())
        .ok_or_else(|| unknown_window(window.label()))?;
    state.runtime.spawn(async move { surface.start().await });
    Ok(())
}

/// Shortcuts, link clicks and drops the page could not hand off natively.
#[tauri::command]
pub fn surface_event(
    window: WebviewWindow,
    event: SurfaceEventDto,
    state: State<AppState>,
) -> CommandResult<()> {
    let surface = state
        .surface(window.label())
        .ok_or_else(|| unknown_window(window.label()))?;
    surface.dispatch(event.into());
    Ok(())
}

// ============================================================================
// Wire Requests
// ============================================================================

/// Forward a catalog request in its wire form to this window's host.
///
/// Failures come back as the message a user would see.
#[tauri::command]
pub async fn ipc_request(
    window: WebviewWindow,
    name: String,
    payload: Option<Value>,
    state: State<'_, AppState>,
) -> CommandResult<Value> {
    let host = state
        .to_host(window.label())
        .ok_or_else(|| unknown_window(window.label()))?;
    host.request_wire(&name, payload.unwrap_or(Value::Null))
        .await
        .map_err(|e: IpcError| e.user_message())
}

// ============================================================================
// Export
// ============================================================================

/// PNG of the full page, sent as the raw request body.
#[tauri::command]
pub fn capture_result(
    window: WebviewWindow,
    request: Request<'_>,
    state: State<AppState>,
) -> CommandResult<()> {
    let InvokeBody::Raw(png) = request.body() else {
        return Err("capture_result expects a binary body".to_string());
    };
    if !state.captures.complete(window.label(), Ok(png.clone())) {
        log::warn!("{}: capture arrived with no export waiting", window.label());
    }
    Ok(())
}

#[tauri::command]
pub fn capture_failed(
    window: WebviewWindow,
    reason: String,
    state: State<AppState>,
) -> CommandResult<()> {
    state.captures.complete(window.label(), Err(reason));
    Ok(())
}
