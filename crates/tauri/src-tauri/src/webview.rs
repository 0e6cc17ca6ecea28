//! The render surface's view: a webview window driven through events.

use crate::dto::{ContentPayload, FontPayload, SizePayload};
use crate::state::lock;
use image::{ImageFormat, RgbaImage};
use mdview_protocol::{FontId, Size};
use mdview_surface::{Display, Rasterizer};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tauri::{AppHandle, Emitter, Manager};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tokio::sync::oneshot;

pub const CONTENT_EVENT: &str = "mdview://content";
pub const FONT_EVENT: &str = "mdview://font";
pub const SIZE_EVENT: &str = "mdview://size";
pub const CAPTURE_EVENT: &str = "mdview://capture";

/// Stays under the IPC timeout so the export reports the real cause.
const CAPTURE_TIMEOUT: Duration = Duration::from_secs(10);

type CaptureResult = Result<Vec<u8>, String>;

/// Outstanding page captures, one per window.
#[derive(Debug, Default)]
pub struct CaptureRegistry {
    pending: Mutex<HashMap<String, oneshot::Sender<CaptureResult>>>,
}

impl CaptureRegistry {
    /// A newer capture for the same window replaces the older one.
    pub fn begin(&self, label: &str) -> oneshot::Receiver<CaptureResult> {
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(label.to_string(), tx);
        rx
    }

    /// Hand the page's answer to the waiting export. `false` when nothing
    /// was waiting.
    pub fn complete(&self, label: &str, result: CaptureResult) -> bool {
        match lock(&self.pending).remove(label) {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }

    pub fn cancel(&self, label: &str) {
        lock(&self.pending).remove(label);
    }

    /// Wait for the answer to a capture started with [`begin`](Self::begin).
    /// A capture that times out is dropped from the registry unless a newer
    /// one has taken its place.
    pub async fn wait(
        &self,
        label: &str,
        answer: oneshot::Receiver<CaptureResult>,
        timeout: Duration,
    ) -> CaptureResult {
        match tokio::time::timeout(timeout, answer).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err("the capture was superseded".to_string()),
            Err(_) => {
                let mut pending = lock(&self.pending);
                if pending.get(label).is_some_and(|tx| tx.is_closed()) {
                    pending.remove(label);
                }
                Err("the page did not finish drawing in time".to_string())
            }
        }
    }
}

fn decode_png(bytes: &[u8]) -> Result<RgbaImage, String> {
    image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map(|image| image.to_rgba8())
        .map_err(|e| format!("unreadable page capture: {e}"))
}

pub struct WebviewDisplay {
    app: AppHandle,
    label: String,
}

impl WebviewDisplay {
    pub fn new(app: AppHandle, label: String) -> Self {
        Self { app, label }
    }

    fn emit<S: Serialize + Clone>(&self, event: &str, payload: S) {
        if let Err(e) = self.app.emit_to(self.label.as_str(), event, payload) {
            log::warn!("{}: failed to emit {event}: {e}", self.label);
        }
    }
}

impl Display for WebviewDisplay {
    fn show_document(&self, html: &str) {
        self.emit(
            CONTENT_EVENT,
            ContentPayload {
                html: html.to_string(),
                is_error: false,
            },
        );
    }

    fn show_error_panel(&self, html: &str) {
        self.emit(
            CONTENT_EVENT,
            ContentPayload {
                html: html.to_string(),
                is_error: true,
            },
        );
    }

    fn apply_font(&self, font: FontId) {
        self.emit(FONT_EVENT, FontPayload::from(font));
    }

    fn apply_size(&self, size: Size) {
        self.emit(SIZE_EVENT, SizePayload { px: size.px() });
    }

    fn alert(&self, text: &str) {
        let mut dialog = self
            .app
            .dialog()
            .message(text)
            .title(mdview_surface::APP_TITLE)
            .kind(MessageDialogKind::Info);
        if let Some(window) = self.app.get_webview_window(&self.label) {
            dialog = dialog.parent(&window);
        }
        dialog.show(|_| {});
    }
}

/// Asks the page to draw itself and waits for the PNG it sends back
/// through the `capture_result` command.
pub struct WebviewRasterizer {
    app: AppHandle,
    label: String,
    captures: Arc<CaptureRegistry>,
}

impl WebviewRasterizer {
    pub fn new(app: AppHandle, label: String, captures: Arc<CaptureRegistry>) -> Self {
        Self {
            app,
            label,
            captures,
        }
    }
}

impl Rasterizer for WebviewRasterizer {
    async fn capture(&self) -> Result<RgbaImage, String> {
        let answer = self.captures.begin(&self.label);
        if let Err(e) = self.app.emit_to(self.label.as_str(), CAPTURE_EVENT, ()) {
            self.captures.cancel(&self.label);
            return Err(format!("could not ask the page for a capture: {e}"));
        }
        let png = self
            .captures
            .wait(&self.label, answer, CAPTURE_TIMEOUT)
            .await?;
        tokio::task::spawn_blocking(move || decode_png(&png))
            .await
            .map_err(|e| format!("decode task failed: {e}"))?
    }
}
