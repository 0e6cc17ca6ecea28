use image::RgbaImage;
use mdview_protocol::{FontId, Size};
use std::future::Future;

/// The view the surface draws into. Calls must not block.
pub trait Display: Send + Sync + 'static {
    /// Replace the document body with rendered HTML.
    fn show_document(&self, html: &str);

    fn show_error_panel(&self, html: &str);

    /// Implementations apply [`FontId::css_stack`].
    fn apply_font(&self, font: FontId);

    fn apply_size(&self, size: Size);

    fn alert(&self, text: &str);
}

/// Produces a full-height raster of the current document for export.
pub trait Rasterizer: Send + Sync + 'static {
    fn capture(&self) -> impl Future<Output = Result<RgbaImage, String>> + Send;
}
