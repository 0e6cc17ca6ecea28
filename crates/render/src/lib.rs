pub mod images;
pub mod markdown;
pub mod pdf;

pub use images::{ASSET_PREFIX, asset_url, resolve_image_src, rewrite_raw_html};
pub use markdown::{Renderer, escape_html, render_error_panel};
pub use pdf::{Band, PageGeometry, PdfDocument, PdfError, export_pdf, paginate};
