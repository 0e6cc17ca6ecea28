//! Data Transfer Objects (DTOs) for communication between the Rust side and
//! the page inside each window.
//!
//! Payloads going out are emitted as events; [`SurfaceEventDto`] comes back
//! through the `surface_event` command.

use mdview_protocol::FontId;
use mdview_surface::SurfaceEvent;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rendered HTML for the document area.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPayload {
    pub html: String,
    /// Error panels are styled differently and never exported.
    pub is_error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontPayload {
    pub id: FontId,
    /// Ready to assign to `font-family`.
    pub stack: String,
}

impl From<FontId> for FontPayload {
    fn from(font: FontId) -> Self {
        Self {
            id: font,
            stack: font.css_stack().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizePayload {
    pub px: u32,
}

/// Input from the page: shortcuts, clicks and drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SurfaceEventDto {
    ZoomIn,
    ZoomOut,
    ZoomReset,
    OpenDialog,
    #[serde(rename_all = "camelCase")]
    Dropped {
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        content: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    LinkClicked { href: String },
}

impl From<SurfaceEventDto> for SurfaceEvent {
    fn from(dto: SurfaceEventDto) -> Self {
        match dto {
            SurfaceEventDto::ZoomIn => SurfaceEvent::ZoomIn,
            SurfaceEventDto::ZoomOut => SurfaceEvent::ZoomOut,
            SurfaceEventDto::ZoomReset => SurfaceEvent::ZoomReset,
            SurfaceEventDto::OpenDialog => SurfaceEvent::OpenDialog,
            SurfaceEventDto::Dropped {
                path,
                name,
                content,
            } => SurfaceEvent::Dropped {
                path,
                name,
                content,
            },
            SurfaceEventDto::LinkClicked { href } => SurfaceEvent::LinkClicked(href),
        }
    }
}
